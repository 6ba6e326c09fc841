//! Std adapters for omen.
//!
//! In clean-arch terms: this is where we touch the world. The only
//! external process omen runs is the bug-status command, so the runner
//! surface is small: argv in, captured stdout lines out.

use anyhow::Context;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub argv: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(argv: Vec<String>) -> Self {
        Self {
            argv,
            cwd: None,
            env: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// -1 when the process was killed by a signal. Recorded, not judged;
    /// callers decide whether the exit code matters.
    pub exit_code: i32,
    pub stdout_lines: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("command argv must not be empty")]
    EmptyArgv,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub trait ProcessRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, AdapterError>;
}

#[derive(Debug, Default, Clone)]
pub struct StdProcessRunner;

impl ProcessRunner for StdProcessRunner {
    fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, AdapterError> {
        use std::process::Command;

        if spec.argv.is_empty() {
            return Err(AdapterError::EmptyArgv);
        }

        let mut cmd = Command::new(&spec.argv[0]);
        if spec.argv.len() > 1 {
            cmd.args(&spec.argv[1..]);
        }

        if let Some(cwd) = &spec.cwd {
            cmd.current_dir(cwd);
        }

        for (k, v) in &spec.env {
            cmd.env(k, v);
        }

        let out = cmd
            .output()
            .with_context(|| format!("failed to run {:?}", spec.argv))
            .map_err(AdapterError::Other)?;

        let exit_code = out.status.code().unwrap_or(-1);
        let stdout_lines = String::from_utf8_lossy(&out.stdout)
            .lines()
            .map(str::to_string)
            .collect();

        Ok(CommandOutput {
            exit_code,
            stdout_lines,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_argv_returns_error() {
        let result = StdProcessRunner.run(&CommandSpec::new(vec![]));
        assert!(matches!(result, Err(AdapterError::EmptyArgv)));
    }

    #[test]
    fn empty_argv_error_message_is_descriptive() {
        let msg = AdapterError::EmptyArgv.to_string();
        assert!(msg.contains("argv") && msg.contains("empty"));
    }

    #[cfg(unix)]
    #[test]
    fn captures_stdout_lines() {
        let spec = CommandSpec::new(vec![
            "printf".to_string(),
            "100\n200\n".to_string(),
        ]);
        let out = StdProcessRunner.run(&spec).unwrap();
        assert_eq!(out.exit_code, 0);
        assert_eq!(out.stdout_lines, vec!["100", "200"]);
    }

    #[cfg(unix)]
    #[test]
    fn missing_binary_is_an_error() {
        let spec = CommandSpec::new(vec!["omen-no-such-binary-xyz".to_string()]);
        let err = StdProcessRunner.run(&spec).unwrap_err();
        assert!(err.to_string().contains("omen-no-such-binary-xyz"));
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_is_recorded_not_rejected() {
        let spec = CommandSpec::new(vec!["false".to_string()]);
        let out = StdProcessRunner.run(&spec).unwrap();
        assert_ne!(out.exit_code, 0);
    }
}
