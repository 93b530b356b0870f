use super::Provisioner;
use crate::runner::Invocation;
use anyhow::{bail, Context, Result};

impl Provisioner<'_> {
    /// Install dependencies and publish the function app from its sources.
    ///
    /// Both commands run with the source directory as their working
    /// directory; the orchestrator's own cwd is left alone.
    pub(super) fn deploy(&self) -> Result<()> {
        let dir = self.config.source_dir.as_path();
        let app = &self.names.function_app;

        let install = Invocation::from_words(&self.tools.npm)?
            .args(["install"])
            .current_dir(dir);
        tracing::info!(dir = %dir.display(), "installing function dependencies");
        let output = self
            .runner
            .run(&install)
            .with_context(|| format!("run {}", install.display()))?;
        if !output.success {
            bail!(
                "dependency install in {} failed: {}",
                dir.display(),
                output.failure_detail()
            );
        }

        let publish = Invocation::from_words(&self.tools.func)?
            .args(["azure", "functionapp", "publish", app.as_str()])
            .current_dir(dir);
        tracing::info!(function_app = %app, "publishing function app");
        let output = self
            .runner
            .run(&publish)
            .with_context(|| format!("run {}", publish.display()))?;
        if !output.success {
            bail!("publish to {app} failed: {}", output.failure_detail());
        }
        Ok(())
    }
}
