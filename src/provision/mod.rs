//! Provisioning orchestrator for the review pipeline.
//!
//! A run is strictly sequential: preflight, provider registration, optional
//! teardown, resource creation, app-setting injection, then deployment. Steps
//! on the critical path return errors that end the run; best-effort steps
//! record a warning in `ProvisionOutputs` and continue with degraded values.
//! Nothing is rolled back on failure; rerunning converges because every
//! create is preceded by an existence check.
mod create;
mod deploy;
mod preflight;
mod providers;
mod settings;
mod summary;
mod teardown;

pub use summary::ProvisionReport;

use crate::az::AzureCli;
use crate::config::ProvisionConfig;
use crate::names::ResourceNames;
use crate::runner::{CommandRunner, Toolchain};
use anyhow::Result;
use serde::Serialize;
use std::time::Duration;

/// Values collected while provisioning.
///
/// Cognitive fields stay empty when no Text Analytics tier could be created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProvisionOutputs {
    pub eventhub_connection_string: String,
    pub cognitive_endpoint: String,
    pub cognitive_key: String,
    /// Tier that was created; `None` when reused or unavailable.
    pub cognitive_sku: Option<String>,
    pub cosmos_connection_string: String,
    pub cosmos_primary_key: String,
    /// Tolerated failures, in the order they happened.
    pub warnings: Vec<String>,
}

impl ProvisionOutputs {
    fn warn(&mut self, message: String) {
        tracing::warn!("{message}");
        self.warnings.push(message);
    }
}

/// Drives one provisioning run against a single resource group.
pub struct Provisioner<'a> {
    runner: &'a dyn CommandRunner,
    config: &'a ProvisionConfig,
    names: &'a ResourceNames,
    tools: &'a Toolchain,
    az: AzureCli<'a>,
    recreate: bool,
    sleep: fn(Duration),
}

impl<'a> Provisioner<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        config: &'a ProvisionConfig,
        names: &'a ResourceNames,
        tools: &'a Toolchain,
    ) -> Self {
        Self {
            runner,
            config,
            names,
            tools,
            az: AzureCli::new(runner, &tools.az, &config.resource_group),
            recreate: false,
            sleep: std::thread::sleep,
        }
    }

    /// Delete the top-level resources before creating them.
    pub fn recreate(mut self, recreate: bool) -> Self {
        self.recreate = recreate;
        self
    }

    #[cfg(test)]
    pub(crate) fn with_sleep(mut self, sleep: fn(Duration)) -> Self {
        self.sleep = sleep;
        self
    }

    /// Run every step; `Err` means a fatal step failed.
    pub fn run(&self) -> Result<ProvisionOutputs> {
        tracing::info!(
            resource_group = %self.config.resource_group,
            suffix = %self.names.suffix,
            recreate = self.recreate,
            "provisioning started"
        );
        self.preflight()?;

        let mut outputs = ProvisionOutputs::default();
        self.register_providers(&mut outputs);
        if self.recreate {
            let report = self.teardown();
            tracing::info!(
                deleted = report.deleted.len(),
                failed = report.failed.len(),
                "teardown finished"
            );
        }
        self.create_resources(&mut outputs)?;
        self.inject_settings(&mut outputs);
        self.deploy()?;

        tracing::info!(warnings = outputs.warnings.len(), "provisioning complete");
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests;
