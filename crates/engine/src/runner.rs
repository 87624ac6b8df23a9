//! Engine child process supervision.
//!
//! Spawns the engine with both output pipes taken. Stdout is consumed line
//! by line by the caller (the executor checks for cancellation between
//! lines); stderr is drained concurrently by a spawned task so the child
//! can never block on a full pipe. Any captured stderr is fatal.

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader, Lines};
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;

use crate::invocation::EngineInvocation;

/// Maximum stderr captured (1 MiB). Output past this limit is truncated to
/// bound memory on a pathologically chatty engine failure.
const MAX_CAPTURED_STDERR: u64 = 1024 * 1024;

/// Errors from running the engine process.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Spawning or reading the child failed at the OS level.
    #[error("Engine I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The engine wrote to stderr; the text is the failure message.
    #[error("Engine reported an error: {0}")]
    Stderr(String),

    /// The engine exited non-zero without explaining itself on stderr.
    #[error("Engine exited with status {code}")]
    Exit { code: i32 },
}

/// A running engine child process.
///
/// `kill_on_drop` is set, so dropping this on any exit path takes the
/// child down with it.
pub struct EngineProcess {
    child: Child,
    stdout: Lines<BufReader<ChildStdout>>,
    stderr_task: JoinHandle<String>,
}

impl EngineProcess {
    /// Spawn the engine described by `invocation`.
    pub fn spawn(invocation: &EngineInvocation) -> Result<Self, EngineError> {
        let mut cmd = Command::new(&invocation.binary);
        cmd.args(&invocation.args)
            .current_dir(&invocation.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn()?;

        let stdout = child
            .stdout
            .take()
            .map(|out| BufReader::new(out).lines())
            .ok_or_else(|| {
                EngineError::Io(std::io::Error::other("engine stdout pipe missing"))
            })?;

        let stderr_handle = child.stderr.take();
        let stderr_task = tokio::spawn(async move { read_capped(stderr_handle).await });

        Ok(Self {
            child,
            stdout,
            stderr_task,
        })
    }

    /// Next stdout line, or `None` once the stream closes.
    pub async fn next_line(&mut self) -> Result<Option<String>, EngineError> {
        Ok(self.stdout.next_line().await?)
    }

    /// Kill the child immediately (cooperative abort observed).
    ///
    /// Best effort: the process may already have exited, and nothing it
    /// produced is going to be read.
    pub async fn kill(mut self) {
        if let Err(e) = self.child.kill().await {
            tracing::warn!(error = %e, "Failed to kill engine process");
        }
        self.stderr_task.abort();
    }

    /// Wait for the child to exit and classify the outcome.
    ///
    /// Call after stdout is exhausted. Non-empty stderr wins over the exit
    /// status so the recorded failure carries the engine's own words.
    pub async fn finish(mut self) -> Result<(), EngineError> {
        let status = self.child.wait().await?;
        let stderr = self.stderr_task.await.unwrap_or_default();

        let stderr = stderr.trim();
        if !stderr.is_empty() {
            return Err(EngineError::Stderr(stderr.to_string()));
        }
        if !status.success() {
            return Err(EngineError::Exit {
                code: status.code().unwrap_or(-1),
            });
        }
        Ok(())
    }
}

/// Drain a stream to a string, capped at [`MAX_CAPTURED_STDERR`].
async fn read_capped<R: AsyncRead + Unpin>(handle: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut h) = handle {
        let _ = (&mut h)
            .take(MAX_CAPTURED_STDERR)
            .read_to_end(&mut buf)
            .await;
    }
    String::from_utf8_lossy(&buf).into_owned()
}
