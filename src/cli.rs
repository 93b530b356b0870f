//! CLI argument parsing for the provisioning workflow.
//!
//! The CLI stays thin: flags only override values from the config file, and
//! every command resolves to the same `ProvisionConfig` before running.
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "azprov",
    version,
    about = "Provision the airline-review analytics pipeline on Azure",
    after_help = "Commands:\n  provision                 Create every resource, configure and deploy the function app\n  teardown                  Delete the six top-level resources (best-effort)\n  names                     Print the derived resource names\n  generate-reviews          Stream synthetic airline reviews as JSON lines\n\nExamples:\n  azprov provision\n  azprov provision --suffix 20261019 --recreate\n  azprov teardown --suffix 20261019\n  azprov names --suffix 20261019 --json\n  azprov generate-reviews --count 20 --interval-secs 1",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    Provision(ProvisionArgs),
    Teardown(TeardownArgs),
    Names(NamesArgs),
    GenerateReviews(GenerateReviewsArgs),
}

/// Options shared by every command that talks to the resource group.
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Path to a JSON config file (falls back to AZPROV_CONFIG)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Resource group that owns every provisioned resource
    #[arg(long, value_name = "NAME")]
    pub resource_group: Option<String>,

    /// Azure region for new resources
    #[arg(long, value_name = "REGION")]
    pub location: Option<String>,

    /// Name suffix (defaults to the current date, %Y%m%d)
    #[arg(long, value_name = "SUFFIX")]
    pub suffix: Option<String>,

    /// Emit a verbose transcript of the workflow
    #[arg(long)]
    pub verbose: bool,
}

/// Provision command inputs.
#[derive(Parser, Debug)]
#[command(about = "Create resources, inject settings and deploy the function app")]
pub struct ProvisionArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Function app source directory
    #[arg(long, value_name = "DIR")]
    pub source_dir: Option<PathBuf>,

    /// Delete existing resources before creating them
    #[arg(long)]
    pub recreate: bool,

    /// Emit the summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Mask secret values in the summary
    #[arg(long)]
    pub redact: bool,
}

/// Teardown command inputs.
#[derive(Parser, Debug)]
#[command(about = "Delete the provisioned resources (failures are ignored)")]
pub struct TeardownArgs {
    #[command(flatten)]
    pub target: TargetArgs,
}

/// Names command inputs.
#[derive(Parser, Debug)]
#[command(about = "Print the resource names a run would use")]
pub struct NamesArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

/// Review generator inputs.
#[derive(Parser, Debug)]
#[command(about = "Stream synthetic airline reviews as JSON lines")]
pub struct GenerateReviewsArgs {
    /// Number of reviews to emit (0 runs until interrupted)
    #[arg(long, default_value_t = 0)]
    pub count: u64,

    /// Seconds to wait between reviews
    #[arg(long, default_value_t = 5)]
    pub interval_secs: u64,

    /// Seed for reproducible output
    #[arg(long)]
    pub seed: Option<u64>,
}
