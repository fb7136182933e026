//! External tools: youtube-dl for fetching, nncp-file for transfer,
//! nncp-exec for notifications.
//!
//! [`Toolchain`] is the seam the executor talks to; [`ExternalTools`] is the
//! implementation that actually spawns processes.

mod command;
mod error;
mod process;
mod sink;

pub use command::{
    fetch_command, filename_command, notify_command, output_template, transfer_command,
    ToolCommand, FETCH_TOOL, NOTIFY_TOOL, OUTPUT_TEMPLATE, TRANSFER_TOOL,
};
pub use error::ToolError;
pub use sink::OutputSink;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::RunConfig;
use crate::request::Quality;

use self::process::run_tool;

/// Stdout lines kept from the `--get-filename` run; the filename is the last one.
const FILENAME_PROBE_LINES: usize = 16;

/// Operations a job needs from the outside world. Each call is one blocking
/// step from the job's point of view.
#[async_trait]
pub trait Toolchain: Send + Sync + 'static {
    /// Path the fetch tool will write for `url` at `quality`.
    async fn resolve_filename(&self, url: &str, quality: Quality) -> Result<PathBuf, ToolError>;

    /// Downloads `url` into the download directory.
    async fn fetch(&self, url: &str, quality: Quality) -> Result<(), ToolError>;

    /// Sends `file` to `destination`.
    async fn transfer(&self, file: &Path, destination: &str) -> Result<(), ToolError>;

    /// Delivers an already framed message to `destination`.
    async fn notify(&self, destination: &str, body: &str) -> Result<(), ToolError>;
}

/// [`Toolchain`] backed by real subprocesses configured from [`RunConfig`].
#[derive(Debug, Clone)]
pub struct ExternalTools {
    cfg: Arc<RunConfig>,
    sink: OutputSink,
}

impl ExternalTools {
    pub fn new(cfg: Arc<RunConfig>) -> Self {
        let sink = OutputSink::for_debug(cfg.debug);
        Self { cfg, sink }
    }

    async fn run(&self, cmd: &ToolCommand, keep_stdout: usize) -> Result<Vec<String>, ToolError> {
        run_tool(cmd, self.sink, keep_stdout, self.cfg.tool_timeout).await
    }
}

#[async_trait]
impl Toolchain for ExternalTools {
    async fn resolve_filename(&self, url: &str, quality: Quality) -> Result<PathBuf, ToolError> {
        let cmd = filename_command(&self.cfg, url, quality);
        let stdout = self.run(&cmd, FILENAME_PROBE_LINES).await?;
        stdout
            .iter()
            .rev()
            .map(|line| line.trim())
            .find(|line| !line.is_empty())
            .map(PathBuf::from)
            .ok_or(ToolError::NoFilename { tool: cmd.tool })
    }

    async fn fetch(&self, url: &str, quality: Quality) -> Result<(), ToolError> {
        let cmd = fetch_command(&self.cfg, url, quality);
        self.run(&cmd, 0).await.map(drop)
    }

    async fn transfer(&self, file: &Path, destination: &str) -> Result<(), ToolError> {
        let cmd = transfer_command(&self.cfg, file, destination);
        self.run(&cmd, 0).await.map(drop)
    }

    async fn notify(&self, destination: &str, body: &str) -> Result<(), ToolError> {
        let exec_tool = self
            .cfg
            .exec_tool
            .as_deref()
            .ok_or(ToolError::NotConfigured { tool: NOTIFY_TOOL })?;
        let cmd = notify_command(
            exec_tool,
            self.cfg.transfer_config.as_deref(),
            destination,
            body,
        );
        self.run(&cmd, 0).await.map(drop)
    }
}
