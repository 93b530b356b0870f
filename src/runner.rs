//! External process execution.
//!
//! Everything the orchestrator does to the outside world goes through
//! `CommandRunner`, so the step sequence can be exercised against a scripted
//! runner without touching a real subscription.
use crate::retry::saturating_millis;
use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;

const REDACTED: &str = "<redacted>";

/// Parsed tool commands (program followed by any fixed leading args).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub az: Vec<String>,
    pub func: Vec<String>,
    pub npm: Vec<String>,
}

/// A single process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Mask `KEY=VALUE` argument values when the invocation is displayed.
    pub redact_values: bool,
}

impl Invocation {
    /// Build from shell-split command words; the first word is the program.
    pub fn from_words(words: &[String]) -> Result<Self> {
        let (program, rest) = words
            .split_first()
            .ok_or_else(|| anyhow!("command is empty"))?;
        Ok(Self {
            program: program.clone(),
            args: rest.to_vec(),
            cwd: None,
            redact_values: false,
        })
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: &Path) -> Self {
        self.cwd = Some(dir.to_path_buf());
        self
    }

    pub fn redacted(mut self) -> Self {
        self.redact_values = true;
        self
    }

    /// Program plus args, for matching and logging.
    pub fn words(&self) -> Vec<&str> {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }

    /// Shell-quoted command line safe to log.
    pub fn display(&self) -> String {
        let words: Vec<String> = self
            .words()
            .into_iter()
            .map(|word| match word.split_once('=') {
                Some((key, _)) if self.redact_values && !word.starts_with('-') => {
                    format!("{key}={REDACTED}")
                }
                _ => word.to_string(),
            })
            .collect();
        shell_words::join(words)
    }
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    #[cfg(test)]
    pub fn ok(stdout: &str) -> Self {
        Self {
            success: true,
            code: Some(0),
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    #[cfg(test)]
    pub fn failed(code: i32, stderr: &str) -> Self {
        Self {
            success: false,
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }

    /// Trimmed stdout; `-o tsv` queries end with a newline.
    pub fn value(&self) -> &str {
        self.stdout.trim()
    }

    /// First non-empty stderr line, or the exit status.
    pub fn failure_detail(&self) -> String {
        let line = self
            .stderr
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty());
        match (line, self.code) {
            (Some(line), _) => line.to_string(),
            (None, Some(code)) => format!("exit status {code}"),
            (None, None) => "terminated by signal".to_string(),
        }
    }
}

/// Seam between the orchestrator and the host.
///
/// `run` only returns `Err` when the process could not be started; a non-zero
/// exit is reported through `CommandOutput::success`.
pub trait CommandRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput>;

    /// Resolve a program on PATH.
    fn locate(&self, program: &str) -> Option<PathBuf>;
}

/// Runs real child processes and blocks until they exit.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput> {
        // Resolve through PATH/PATHEXT so `az.cmd` style shims work too.
        let program = self
            .locate(&invocation.program)
            .unwrap_or_else(|| PathBuf::from(&invocation.program));
        let mut command = Command::new(&program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &invocation.cwd {
            command.current_dir(cwd);
        }

        tracing::debug!(command = %invocation.display(), "spawn");
        let start = Instant::now();
        let output = command
            .output()
            .with_context(|| format!("spawn {}", invocation.program))?;
        let elapsed_ms = saturating_millis(start.elapsed());

        let result = CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };
        tracing::info!(
            elapsed_ms,
            program = %invocation.program,
            success = result.success,
            stdout_bytes = result.stdout.len(),
            "command complete"
        );
        Ok(result)
    }

    fn locate(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }
}
