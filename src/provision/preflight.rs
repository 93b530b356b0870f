use super::Provisioner;
use crate::runner::Invocation;
use anyhow::{bail, Context, Result};

/// npm package providing the `func` deployment tool.
const FUNC_TOOLS_PACKAGE: &str = "azure-functions-core-tools@4";

impl Provisioner<'_> {
    pub(super) fn preflight(&self) -> Result<()> {
        self.ensure_deploy_tool()?;
        self.ensure_source_dir()
    }

    /// Make sure `func` is on PATH, installing it through npm if needed.
    fn ensure_deploy_tool(&self) -> Result<()> {
        let func = Invocation::from_words(&self.tools.func)?.program;
        if let Some(path) = self.runner.locate(&func) {
            tracing::debug!(path = %path.display(), "deployment tool found");
            return Ok(());
        }

        let npm = Invocation::from_words(&self.tools.npm)?;
        if self.runner.locate(&npm.program).is_none() {
            bail!(
                "{func} is not installed and {} is not available to install it",
                npm.program
            );
        }
        tracing::warn!(program = %func, "deployment tool missing; installing {FUNC_TOOLS_PACKAGE}");
        let install = npm.args(["install", "-g", FUNC_TOOLS_PACKAGE, "--unsafe-perm", "true"]);
        let output = self
            .runner
            .run(&install)
            .with_context(|| format!("run {}", install.display()))?;
        if !output.success {
            bail!(
                "install {FUNC_TOOLS_PACKAGE} failed: {}",
                output.failure_detail()
            );
        }
        if self.runner.locate(&func).is_none() {
            bail!("{func} still not found on PATH after installing {FUNC_TOOLS_PACKAGE}");
        }
        Ok(())
    }

    fn ensure_source_dir(&self) -> Result<()> {
        let dir = &self.config.source_dir;
        if !dir.is_dir() {
            bail!("function app source directory {} not found", dir.display());
        }
        Ok(())
    }
}
