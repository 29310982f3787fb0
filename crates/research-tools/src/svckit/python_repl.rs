//! Python REPL Capability
//!
//! Runs model-written Python in a fresh interpreter process and returns
//! what it printed. Each call is isolated; no state carries over.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use agent_core::{Capability, Result as CoreResult};

use crate::error::{Result, ToolError};

pub const EXECUTION_LIMIT: Duration = Duration::from_secs(30);

const INTERPRETERS: &[&str] = &["python3", "python"];

/// First Python interpreter found on `PATH`
pub fn find_interpreter() -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    INTERPRETERS.iter().find_map(|name| {
        std::env::split_paths(&path)
            .map(|dir| dir.join(name))
            .find(|candidate| candidate.is_file())
    })
}

/// Strip markdown fences and a leading `python` tag from model output
fn sanitize(input: &str) -> &str {
    let code = input.trim().trim_matches('`').trim();
    code.strip_prefix("python")
        .map_or(code, |rest| if rest.starts_with(char::is_whitespace) { rest } else { code })
        .trim()
}

pub struct PythonRepl {
    interpreter: PathBuf,
    limit: Duration,
}

impl PythonRepl {
    pub const fn new(interpreter: PathBuf) -> Self {
        Self {
            interpreter,
            limit: EXECUTION_LIMIT,
        }
    }

    #[must_use]
    pub const fn with_limit(mut self, limit: Duration) -> Self {
        self.limit = limit;
        self
    }

    async fn execute(&self, code: &str) -> Result<String> {
        let child = Command::new(&self.interpreter)
            .arg("-c")
            .arg(code)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = tokio::time::timeout(self.limit, child.wait_with_output())
            .await
            .map_err(|_| ToolError::Timeout(self.limit))??;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if output.status.success() {
            Ok(stdout.into_owned())
        } else {
            // the traceback's last line carries the exception
            let error = stderr.trim().lines().last().unwrap_or("process exited with an error");
            Ok(format!("{stdout}{error}"))
        }
    }
}

#[async_trait]
impl Capability for PythonRepl {
    async fn run(&self, input: &str) -> CoreResult<String> {
        let code = sanitize(input);
        tracing::debug!(bytes = code.len(), "running python");
        Ok(self.execute(code).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("```python\nprint(1)\n```"), "print(1)");
        assert_eq!(sanitize("  print(2)  "), "print(2)");
        assert_eq!(sanitize("pythonic = 1"), "pythonic = 1");
    }

    #[tokio::test]
    async fn test_runs_when_interpreter_present() {
        let Some(interpreter) = find_interpreter() else {
            return;
        };
        let repl = PythonRepl::new(interpreter);

        assert_eq!(repl.run("print(6 * 7)").await.unwrap().trim(), "42");

        let failed = repl.run("1 / 0").await.unwrap();
        assert!(failed.contains("ZeroDivisionError"));
    }

    #[tokio::test]
    async fn test_runaway_code_is_killed() {
        let Some(interpreter) = find_interpreter() else {
            return;
        };
        let repl = PythonRepl::new(interpreter).with_limit(Duration::from_millis(200));
        let err = repl.execute("while True: pass").await.unwrap_err();
        assert!(matches!(err, ToolError::Timeout(_)));
    }
}
