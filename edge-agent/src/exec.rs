//! Local process execution
//!
//! The `exec` entry point runs a program directly (no shell) with the
//! positional arguments from the command line and captures stdout and
//! stderr together. A non-zero exit status is a failure.
//!
//! No timeout is enforced here; a slow command stalls only its own request.

use crate::error::{AgentError, Result};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command as AsyncCommand;
use tracing::debug;

#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `program` with `args`, returning the combined output on success.
    async fn run(&self, program: &str, args: &[String]) -> Result<Vec<u8>>;
}

/// Runs commands on the host with tokio's process support.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<Vec<u8>> {
        let start_time = Instant::now();
        debug!("Executing command: {} {:?}", program, args);

        let output = AsyncCommand::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(AgentError::Spawn)?;

        let mut combined = output.stdout;
        combined.extend_from_slice(&output.stderr);

        debug!(
            "Command {} finished with {} in {}ms",
            program,
            output.status,
            start_time.elapsed().as_millis()
        );

        if !output.status.success() {
            return Err(AgentError::Execution {
                program: program.to_string(),
                status: output.status.code(),
                output: String::from_utf8_lossy(&combined).into_owned(),
            });
        }

        Ok(combined)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_captures_stdout() {
        let output = SystemRunner.run("echo", &["hello".to_string()]).await.unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "hello\n");
    }

    #[tokio::test]
    async fn test_captures_stderr() {
        let args = vec!["-c".to_string(), "echo oops 1>&2".to_string()];
        let output = SystemRunner.run("sh", &args).await.unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "oops\n");
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_an_error() {
        let err = SystemRunner.run("false", &[]).await.unwrap_err();
        match err {
            AgentError::Execution { program, status, .. } => {
                assert_eq!(program, "false");
                assert_eq!(status, Some(1));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_program() {
        let err = SystemRunner
            .run("definitely-not-a-real-binary-4242", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Spawn(_)));
    }
}
