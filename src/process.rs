//! External process invocation.
//!
//! Extraction strategies never spawn processes directly; they go through a
//! [`ProcessRunner`] so tests can script tool behavior without `pdftotext`,
//! ImageMagick or tesseract installed.

use async_trait::async_trait;
use std::ffi::OsString;
use std::time::Duration;

use crate::error::ExtractError;

/// Captured result of a finished process.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Exit code; `None` when the process was killed by a signal.
    pub code: Option<i32>,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Turn a non-zero exit into [`ExtractError::ToolFailed`].
    pub fn check(self, tool: &str) -> Result<ToolOutput, ExtractError> {
        if self.success() {
            return Ok(self);
        }
        Err(ExtractError::ToolFailed {
            tool: tool.to_string(),
            status: self
                .code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string()),
            stderr: String::from_utf8_lossy(&self.stderr).trim().to_string(),
        })
    }
}

/// Runs an external tool to completion.
///
/// Implementations return [`ExtractError::ToolMissing`] when the tool cannot
/// be found, and `Ok` with a non-zero `code` when it ran but failed.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, tool: &str, args: &[OsString]) -> Result<ToolOutput, ExtractError>;
}

/// [`ProcessRunner`] backed by `tokio::process`, with a per-call timeout.
pub struct SystemRunner {
    timeout: Duration,
}

impl SystemRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn run(&self, tool: &str, args: &[OsString]) -> Result<ToolOutput, ExtractError> {
        tracing::debug!("running {} {:?}", tool, args);
        let child = tokio::process::Command::new(tool)
            .args(args)
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(self.timeout, child).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ExtractError::ToolMissing(tool.to_string()));
            }
            Ok(Err(e)) => return Err(ExtractError::Io(e)),
            Err(_) => {
                return Err(ExtractError::ToolTimedOut {
                    tool: tool.to_string(),
                    secs: self.timeout.as_secs(),
                });
            }
        };

        Ok(ToolOutput {
            stdout: output.stdout,
            stderr: output.stderr,
            code: output.status.code(),
        })
    }
}
