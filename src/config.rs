//! Provisioning configuration.
//!
//! Every field has a built-in default so a bare `azprov provision` works with
//! no file at all; a JSON file only needs the keys it changes.
use crate::retry::RetryPolicy;
use crate::runner::Toolchain;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Current schema version for config files.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Environment variable consulted when `--config` is not given.
pub const CONFIG_ENV_VAR: &str = "AZPROV_CONFIG";

const DEFAULT_CONFIG_FILE: &str = "azprov/config.json";

/// Resolved settings for one provisioning run.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct ProvisionConfig {
    pub schema_version: u32,
    pub resource_group: String,
    pub location: String,
    pub prefixes: NamePrefixes,
    /// Function app worker runtime (`node`, `python`, ...).
    pub runtime: String,
    pub runtime_version: String,
    pub functions_version: String,
    pub eventhub_sku: String,
    pub storage_sku: String,
    /// Text Analytics tiers, tried in order until one is accepted.
    pub cognitive_skus: Vec<String>,
    pub partition_key_path: String,
    /// Function app sources, relative to the working directory.
    pub source_dir: PathBuf,
    pub tools: ToolCommands,
    pub registration_retry: RetrySettings,
}

/// Base labels that resource names are derived from.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct NamePrefixes {
    pub eventhub_namespace: String,
    pub eventhub: String,
    pub send_rule: String,
    pub storage_account: String,
    pub function_app: String,
    pub cognitive_account: String,
    pub cosmos_account: String,
    pub cosmos_database: String,
    pub cosmos_container: String,
    pub logic_app: String,
}

/// External tool commands, each parsed with shell-words.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct ToolCommands {
    pub az: String,
    pub func: String,
    pub npm: String,
}

/// Backoff settings for provider registration polling.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_delay_secs: u64,
    pub multiplier: f64,
    pub max_delay_secs: u64,
    pub max_elapsed_secs: u64,
}

/// CLI values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub resource_group: Option<String>,
    pub location: Option<String>,
    pub source_dir: Option<PathBuf>,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            schema_version: CONFIG_SCHEMA_VERSION,
            resource_group: "rg-airline-reviews".to_string(),
            location: "francecentral".to_string(),
            prefixes: NamePrefixes::default(),
            runtime: "node".to_string(),
            runtime_version: "18".to_string(),
            functions_version: "4".to_string(),
            eventhub_sku: "Basic".to_string(),
            storage_sku: "Standard_LRS".to_string(),
            cognitive_skus: vec!["F0".to_string(), "S".to_string()],
            partition_key_path: "/airline".to_string(),
            source_dir: PathBuf::from("function_app"),
            tools: ToolCommands::default(),
            registration_retry: RetrySettings::default(),
        }
    }
}

impl Default for NamePrefixes {
    fn default() -> Self {
        Self {
            eventhub_namespace: "reviews-ns".to_string(),
            eventhub: "reviews".to_string(),
            send_rule: "send-only".to_string(),
            storage_account: "reviewstore".to_string(),
            function_app: "reviews-func".to_string(),
            cognitive_account: "reviews-lang".to_string(),
            cosmos_account: "reviewsdb".to_string(),
            cosmos_database: "reviews".to_string(),
            cosmos_container: "items".to_string(),
            logic_app: "reviews-alerts".to_string(),
        }
    }
}

impl Default for ToolCommands {
    fn default() -> Self {
        Self {
            az: "az".to_string(),
            func: "func".to_string(),
            npm: "npm".to_string(),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay_secs: 5,
            multiplier: 2.0,
            max_delay_secs: 30,
            max_elapsed_secs: 300,
        }
    }
}

impl RetrySettings {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_secs(self.initial_delay_secs),
            multiplier: self.multiplier,
            max_delay: Duration::from_secs(self.max_delay_secs),
            max_elapsed: Duration::from_secs(self.max_elapsed_secs),
        }
    }
}

impl ToolCommands {
    /// Split each configured command into program + leading args.
    pub fn toolchain(&self) -> Result<Toolchain> {
        Ok(Toolchain {
            az: split_command(&self.az, "az")?,
            func: split_command(&self.func, "func")?,
            npm: split_command(&self.npm, "npm")?,
        })
    }
}

fn split_command(command: &str, label: &str) -> Result<Vec<String>> {
    let words = shell_words::split(command)
        .with_context(|| format!("parse {label} command: {command}"))?;
    if words.is_empty() {
        return Err(anyhow!("{label} command is empty"));
    }
    Ok(words)
}

/// Pick the config file: explicit flag, then `AZPROV_CONFIG`, then the
/// per-user default if it exists.
pub fn resolve_config_path(flag: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = flag {
        return Some(path.to_path_buf());
    }
    if let Some(value) = env::var_os(CONFIG_ENV_VAR).filter(|value| !value.is_empty()) {
        return Some(PathBuf::from(value));
    }
    dirs::config_dir()
        .map(|dir| dir.join(DEFAULT_CONFIG_FILE))
        .filter(|path| path.is_file())
}

/// Load a config file from disk.
pub fn load_config(path: &Path) -> Result<ProvisionConfig> {
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let config: ProvisionConfig = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse config JSON {}", path.display()))?;
    Ok(config)
}

/// Load (or default) the config, apply CLI overrides and validate the result.
pub fn resolve_config(flag: Option<&Path>, overrides: ConfigOverrides) -> Result<ProvisionConfig> {
    let mut config = match resolve_config_path(flag) {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            load_config(&path)?
        }
        None => ProvisionConfig::default(),
    };
    apply_overrides(&mut config, overrides);
    validate_config(&config)?;
    Ok(config)
}

pub fn apply_overrides(config: &mut ProvisionConfig, overrides: ConfigOverrides) {
    if let Some(resource_group) = overrides.resource_group {
        config.resource_group = resource_group;
    }
    if let Some(location) = overrides.location {
        config.location = location;
    }
    if let Some(source_dir) = overrides.source_dir {
        config.source_dir = source_dir;
    }
}

/// Validate schema version and the values the run cannot recover from.
pub fn validate_config(config: &ProvisionConfig) -> Result<()> {
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported config schema_version {}",
            config.schema_version
        ));
    }
    if config.resource_group.trim().is_empty() {
        return Err(anyhow!("resource_group must be non-empty"));
    }
    if config.location.trim().is_empty() {
        return Err(anyhow!("location must be non-empty"));
    }
    if config.cognitive_skus.is_empty() {
        return Err(anyhow!("cognitive_skus must list at least one tier"));
    }
    if config.cognitive_skus.iter().any(|sku| sku.trim().is_empty()) {
        return Err(anyhow!(
            "cognitive_skus must not contain blank tiers (got {:?})",
            config.cognitive_skus
        ));
    }
    if !config.partition_key_path.starts_with('/') {
        return Err(anyhow!(
            "partition_key_path must start with '/' (got {:?})",
            config.partition_key_path
        ));
    }
    let retry = &config.registration_retry;
    if retry.max_attempts == 0 {
        return Err(anyhow!("registration_retry.max_attempts must be at least 1"));
    }
    if retry.multiplier.is_nan() || retry.multiplier < 1.0 {
        return Err(anyhow!(
            "registration_retry.multiplier must be >= 1.0 (got {})",
            retry.multiplier
        ));
    }
    config.tools.toolchain()?;
    Ok(())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
