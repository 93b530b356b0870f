//! Shared test infrastructure for integration tests.
//!
//! A `Sandbox` holds a config file, a function app source directory and fake
//! `az`/`func`/`npm` scripts that append their arguments to a call log.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Path to the freshly built binary under test.
pub fn azprov() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_azprov"));
    command.env("RUST_LOG", "warn").env_remove("AZPROV_CONFIG");
    command
}

/// Canned `az` behavior: providers registered, nothing exists yet, every
/// secret query answers with a fixed value.
const FAKE_AZ: &str = r#"case "$*" in
  *"provider show"*) echo Registered ;;
  *"primaryConnectionString"*) echo "Endpoint=sb://fake/;SharedAccessKey=abc" ;;
  *"cognitiveservices account keys list"*) echo "cog-key" ;;
  *"properties.endpoint"*) echo "https://lang.example/" ;;
  *"connection-strings"*) echo "AccountEndpoint=https://db/;AccountKey=xyz==;" ;;
  *"primaryMasterKey"*) echo "xyz==" ;;
  *" show "*) echo "ResourceNotFound" >&2; exit 3 ;;
esac
exit 0
"#;

pub struct Sandbox {
    pub dir: TempDir,
}

impl Sandbox {
    pub fn new() -> anyhow::Result<Self> {
        let dir = TempDir::new()?;
        fs::create_dir_all(dir.path().join("function_app"))?;
        fs::create_dir_all(dir.path().join("bin"))?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn source_dir(&self) -> PathBuf {
        self.path().join("function_app")
    }

    pub fn log_path(&self) -> PathBuf {
        self.path().join("calls.log")
    }

    pub fn config_path(&self) -> PathBuf {
        self.path().join("config.json")
    }

    /// Install a fake tool that logs `<name> <args>` and then runs `body`.
    #[cfg(unix)]
    pub fn install_tool(&self, name: &str, body: &str) -> anyhow::Result<PathBuf> {
        use std::os::unix::fs::PermissionsExt;

        let path = self.path().join("bin").join(name);
        let script = format!(
            "#!/bin/sh\necho \"{name} $*\" >> '{}'\n{body}",
            self.log_path().display()
        );
        fs::write(&path, script)?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
        Ok(path)
    }

    /// Fake az, func and npm wired into a config file.
    #[cfg(unix)]
    pub fn with_fake_tools(&self) -> anyhow::Result<()> {
        let az = self.install_tool("az", FAKE_AZ)?;
        let func = self.install_tool("func", "exit 0\n")?;
        let npm = self.install_tool("npm", "exit 0\n")?;
        self.write_config(serde_json::json!({
            "schema_version": 1,
            "resource_group": "rg-test",
            "source_dir": self.source_dir(),
            "tools": {
                "az": az,
                "func": func,
                "npm": npm,
            },
            "registration_retry": {
                "max_attempts": 2,
                "initial_delay_secs": 0,
                "max_elapsed_secs": 1,
            },
        }))
    }

    pub fn write_config(&self, value: serde_json::Value) -> anyhow::Result<()> {
        fs::write(self.config_path(), serde_json::to_vec_pretty(&value)?)?;
        Ok(())
    }

    /// Each logged tool call, in order.
    pub fn calls(&self) -> Vec<String> {
        fs::read_to_string(self.log_path())
            .map(|text| text.lines().map(String::from).collect())
            .unwrap_or_default()
    }

    pub fn run(&self, args: &[&str]) -> anyhow::Result<Output> {
        let output = azprov()
            .args(args)
            .arg("--config")
            .arg(self.config_path())
            .output()?;
        Ok(output)
    }
}
