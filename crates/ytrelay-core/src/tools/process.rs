//! Spawning one tool, feeding stdin, draining output, waiting with an optional timeout.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::command::ToolCommand;
use super::error::ToolError;
use super::sink::OutputSink;

/// Stderr lines kept for error messages.
const STDERR_TAIL_LINES: usize = 5;

/// Runs `cmd` to completion and returns the last `keep_stdout` stdout lines.
pub(crate) async fn run_tool(
    cmd: &ToolCommand,
    sink: OutputSink,
    keep_stdout: usize,
    timeout: Option<Duration>,
) -> Result<Vec<String>, ToolError> {
    let tool = cmd.tool;
    tracing::debug!(tool, "running {}", cmd);

    let mut child = Command::new(&cmd.program)
        .args(&cmd.args)
        .stdin(if cmd.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ToolError::Spawn {
            tool,
            program: cmd.program.display().to_string(),
            source,
        })?;

    let stdin_task = match (child.stdin.take(), cmd.stdin.clone()) {
        (Some(mut pipe), Some(body)) => Some(tokio::spawn(async move {
            pipe.write_all(&body).await?;
            pipe.shutdown().await
        })),
        _ => None,
    };
    let stdout_task = child
        .stdout
        .take()
        .map(|out| tokio::spawn(sink.pump(out, tool, "stdout", keep_stdout)));
    let stderr_task = child
        .stderr
        .take()
        .map(|err| tokio::spawn(sink.pump(err, tool, "stderr", STDERR_TAIL_LINES)));

    let waited = match timeout {
        Some(limit) => match tokio::time::timeout(limit, child.wait()).await {
            Ok(res) => res,
            Err(_) => {
                if let Err(e) = child.kill().await {
                    tracing::warn!(tool, "could not kill timed out tool: {}", e);
                }
                for task in [stdout_task, stderr_task].into_iter().flatten() {
                    task.abort();
                }
                return Err(ToolError::TimedOut { tool, after: limit });
            }
        },
        None => child.wait().await,
    };
    let status = waited.map_err(|source| ToolError::Io { tool, source })?;

    let stdin_written = match stdin_task {
        Some(task) => task.await.unwrap_or_else(|e| {
            tracing::warn!(tool, "stdin writer task: {}", e);
            Ok(())
        }),
        None => Ok(()),
    };
    let stdout = collect(stdout_task, tool).await?;
    let stderr = collect(stderr_task, tool).await?;

    // A tool that exits early leaves our stdin write with EPIPE; its exit
    // status and stderr say more than that.
    if !status.success() {
        return Err(ToolError::Failed {
            tool,
            status,
            stderr,
        });
    }
    stdin_written.map_err(|source| ToolError::Io { tool, source })?;
    Ok(stdout)
}

async fn collect(
    task: Option<tokio::task::JoinHandle<std::io::Result<Vec<String>>>>,
    tool: &'static str,
) -> Result<Vec<String>, ToolError> {
    let Some(task) = task else {
        return Ok(Vec::new());
    };
    match task.await {
        Ok(res) => res.map_err(|source| ToolError::Io { tool, source }),
        Err(e) => {
            tracing::warn!(tool, "output reader task: {}", e);
            Ok(Vec::new())
        }
    }
}
