// src/exec/mod.rs

//! Narrow seam for invoking external tools
//!
//! The pipeline delegates package building, pool scanning, and signing to
//! external commands. Everything goes through the [`ToolRunner`] trait --
//! argument list in, captured stdout/stderr/exit code out -- so the control
//! logic can be exercised in tests without spawning real processes.

use crate::error::{Error, Result};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::ErrorKind;
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::debug;
use wait_timeout::ChildExt;

/// Default wall-clock limit for a single tool invocation (5 minutes)
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Captured result of one tool invocation
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit code (-1 if terminated by signal)
    pub code: i32,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

impl ToolOutput {
    /// Whether the tool exited zero
    #[inline]
    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// A successful invocation with the given stdout
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed invocation with the given exit code and stderr
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Capability interface for running external tools
pub trait ToolRunner {
    /// Run `program` with `args`, blocking until it exits, and capture its
    /// output. Spawn failures and timeouts are errors; a non-zero exit is
    /// not -- callers decide what a failed exit means for their stage.
    fn run(&self, program: &str, args: &[&str]) -> Result<ToolOutput>;
}

/// Runs tools on the host system with a bounded wait
pub struct SystemRunner {
    timeout: Duration,
}

impl SystemRunner {
    /// Create a runner with the default timeout
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Override the per-invocation timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<ToolOutput> {
        debug!("Running: {} {:?}", program, args);

        // stdin is nullified so a tool waiting for input cannot hang the run
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    Error::ToolNotFound(program.to_string())
                } else {
                    Error::io(format!("spawning '{program}'"), e)
                }
            })?;

        match child
            .wait_timeout(self.timeout)
            .map_err(|e| Error::io(format!("waiting for '{program}'"), e))?
        {
            Some(status) => {
                let output = child
                    .wait_with_output()
                    .map_err(|e| Error::io(format!("collecting output of '{program}'"), e))?;
                Ok(ToolOutput {
                    code: status.code().unwrap_or(-1),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                })
            }
            None => {
                let _ = child.kill();
                Err(Error::ToolTimeout {
                    tool: program.to_string(),
                    seconds: self.timeout.as_secs(),
                })
            }
        }
    }
}

/// Replays canned results instead of spawning processes; records every
/// invocation so tests can assert on the exact argument lists.
///
/// Responses are consumed in push order. Running with no response queued is
/// an error, which makes an unexpected invocation fail loudly in tests.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    responses: RefCell<VecDeque<ToolOutput>>,
    calls: RefCell<Vec<Vec<String>>>,
}

impl ScriptedRunner {
    /// Create a runner with no scripted responses
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the next invocation's result
    pub fn push(&self, output: ToolOutput) {
        self.responses.borrow_mut().push_back(output);
    }

    /// Queue a successful invocation with the given stdout
    pub fn push_ok(&self, stdout: &str) {
        self.push(ToolOutput::ok(stdout));
    }

    /// Every invocation so far, as `[program, arg...]` vectors
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.borrow().clone()
    }
}

impl ToolRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<ToolOutput> {
        let mut call = vec![program.to_string()];
        call.extend(args.iter().map(|a| a.to_string()));
        self.calls.borrow_mut().push(call);

        self.responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| Error::ToolNotFound(format!("unscripted invocation of '{program}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_runner_replays_in_order() {
        let runner = ScriptedRunner::new();
        runner.push_ok("first");
        runner.push(ToolOutput::failed(2, "boom"));

        let one = runner.run("tool", &["a"]).unwrap();
        assert!(one.success());
        assert_eq!(one.stdout, "first");

        let two = runner.run("tool", &["b"]).unwrap();
        assert!(!two.success());
        assert_eq!(two.code, 2);
        assert_eq!(two.stderr, "boom");

        assert_eq!(
            runner.calls(),
            vec![vec!["tool".to_string(), "a".to_string()], vec![
                "tool".to_string(),
                "b".to_string()
            ]]
        );
    }

    #[test]
    fn test_scripted_runner_rejects_unexpected_calls() {
        let runner = ScriptedRunner::new();
        let err = runner.run("surprise", &[]).unwrap_err();
        assert!(matches!(err, Error::ToolNotFound(_)));
    }

    #[test]
    fn test_system_runner_missing_program() {
        let runner = SystemRunner::new();
        let err = runner
            .run("aptpress-no-such-binary-on-any-host", &[])
            .unwrap_err();
        assert!(matches!(err, Error::ToolNotFound(_)));
    }

    #[test]
    fn test_system_runner_captures_output() {
        let runner = SystemRunner::new();
        let output = runner.run("echo", &["hello"]).unwrap();
        assert!(output.success());
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[test]
    fn test_system_runner_timeout_kills_process() {
        let runner = SystemRunner::new().with_timeout(Duration::from_millis(100));
        let err = runner.run("sleep", &["5"]).unwrap_err();
        assert!(matches!(err, Error::ToolTimeout { .. }));
    }
}
