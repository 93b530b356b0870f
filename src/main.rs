use anyhow::{Context, Result};
use clap::Parser;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::filter::LevelFilter;

mod az;
mod cli;
mod config;
mod names;
mod provision;
mod retry;
mod reviews;
mod runner;

use cli::{
    Command, GenerateReviewsArgs, NamesArgs, ProvisionArgs, RootArgs, TargetArgs, TeardownArgs,
};
use config::{ConfigOverrides, ProvisionConfig};
use names::ResourceNames;
use provision::{ProvisionReport, Provisioner};
use runner::ProcessRunner;

fn main() -> Result<()> {
    let args = RootArgs::parse();
    init_tracing(verbose(&args.command));

    match args.command {
        Command::Provision(args) => cmd_provision(args),
        Command::Teardown(args) => cmd_teardown(args),
        Command::Names(args) => cmd_names(args),
        Command::GenerateReviews(args) => cmd_generate_reviews(args),
    }
}

fn verbose(command: &Command) -> bool {
    match command {
        Command::Provision(args) => args.target.verbose,
        Command::Teardown(args) => args.target.verbose,
        Command::Names(args) => args.target.verbose,
        Command::GenerateReviews(_) => false,
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_target(
    target: &TargetArgs,
    source_dir: Option<PathBuf>,
) -> Result<(ProvisionConfig, ResourceNames)> {
    let config = config::resolve_config(
        target.config.as_deref(),
        ConfigOverrides {
            resource_group: target.resource_group.clone(),
            location: target.location.clone(),
            source_dir,
        },
    )?;
    let suffix = match &target.suffix {
        Some(suffix) => suffix.clone(),
        None => names::date_suffix(&chrono::Local::now()),
    };
    let names = ResourceNames::derive(&config.prefixes, &suffix);
    names.validate().context("derive resource names")?;
    Ok((config, names))
}

fn cmd_provision(args: ProvisionArgs) -> Result<()> {
    let (config, names) = load_target(&args.target, args.source_dir.clone())?;
    let tools = config.tools.toolchain()?;
    let runner = ProcessRunner;
    let outputs = Provisioner::new(&runner, &config, &names, &tools)
        .recreate(args.recreate)
        .run()
        .with_context(|| {
            format!(
                "provision {} with suffix {} (rerun with --suffix {} to resume)",
                config.resource_group, names.suffix, names.suffix
            )
        })?;

    let report = ProvisionReport::new(&config, &names, &outputs, args.redact);
    if args.json {
        let json = serde_json::to_string_pretty(&report).context("serialize provision report")?;
        println!("{json}");
    } else {
        print!("{}", report.render_text());
    }
    Ok(())
}

fn cmd_teardown(args: TeardownArgs) -> Result<()> {
    let (config, names) = load_target(&args.target, None)?;
    let tools = config.tools.toolchain()?;
    let runner = ProcessRunner;
    let report = Provisioner::new(&runner, &config, &names, &tools).teardown();

    for deleted in &report.deleted {
        println!("deleted {deleted}");
    }
    for failed in &report.failed {
        println!("skipped {failed}");
    }
    Ok(())
}

fn cmd_names(args: NamesArgs) -> Result<()> {
    let (_, names) = load_target(&args.target, None)?;
    if args.json {
        let json = serde_json::to_string_pretty(&names).context("serialize resource names")?;
        println!("{json}");
        return Ok(());
    }
    for (field, _, name) in names.entries() {
        println!("{field:<20} {name}");
    }
    Ok(())
}

fn cmd_generate_reviews(args: GenerateReviewsArgs) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    reviews::stream_reviews(
        &mut out,
        args.count,
        Duration::from_secs(args.interval_secs),
        args.seed,
    )
}
