//! Argument vectors for the fetch, transfer and notify tools.
//!
//! Pure builders; nothing here spawns a process, so `ytrelay check` and the
//! tests can inspect exactly what would run.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::RunConfig;
use crate::request::Quality;

/// Output template handed to the fetch tool; it substitutes title and extension.
pub const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

pub const FETCH_TOOL: &str = "youtube-dl";
pub const TRANSFER_TOOL: &str = "nncp-file";
pub const NOTIFY_TOOL: &str = "nncp-exec";

/// A fully built tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    /// Short label used in logs and errors.
    pub tool: &'static str,
    pub program: PathBuf,
    pub args: Vec<OsString>,
    /// Bytes written to the child's stdin, if any.
    pub stdin: Option<Vec<u8>>,
}

impl ToolCommand {
    fn new(tool: &'static str, program: &Path) -> Self {
        Self {
            tool,
            program: program.to_path_buf(),
            args: Vec::new(),
            stdin: None,
        }
    }

    fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn arg_pair(self, flag: &str, value: impl Into<OsString>) -> Self {
        self.arg(flag).arg(value)
    }

    fn opt_pair(self, flag: &str, value: Option<impl Into<OsString>>) -> Self {
        match value {
            Some(v) => self.arg_pair(flag, v),
            None => self,
        }
    }

    /// True if `arg` appears verbatim in the argument list.
    pub fn has_arg(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }

    /// The value following `flag`, if present.
    pub fn flag_value(&self, flag: &str) -> Option<String> {
        let pos = self.args.iter().position(|a| a == flag)?;
        self.args
            .get(pos + 1)
            .map(|v| v.to_string_lossy().into_owned())
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            let arg = arg.to_string_lossy();
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " '{}'", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// `<download_dir>/%(title)s.%(ext)s`
pub fn output_template(download_dir: &Path) -> OsString {
    download_dir.join(OUTPUT_TEMPLATE).into_os_string()
}

/// Asks the fetch tool which file a real fetch of `url` would produce.
pub fn filename_command(cfg: &RunConfig, url: &str, quality: Quality) -> ToolCommand {
    ToolCommand::new(FETCH_TOOL, &cfg.fetch_tool)
        .arg_pair("-o", output_template(&cfg.download_dir))
        .arg("--restrict-filenames")
        .arg("--get-filename")
        .arg_pair("--merge-output-format", cfg.merge_format.as_str())
        .opt_pair("-f", quality.format_selector())
        .arg(url)
}

/// Downloads `url` into the templated path.
pub fn fetch_command(cfg: &RunConfig, url: &str, quality: Quality) -> ToolCommand {
    ToolCommand::new(FETCH_TOOL, &cfg.fetch_tool)
        .arg_pair("-o", output_template(&cfg.download_dir))
        .arg("--restrict-filenames")
        .arg("-q")
        .arg_pair("--merge-output-format", cfg.merge_format.as_str())
        .opt_pair("-f", quality.format_selector())
        .opt_pair("--external-downloader", cfg.external_downloader.as_deref())
        .arg(url)
}

/// Queues `file` for `destination` through NNCP.
pub fn transfer_command(cfg: &RunConfig, file: &Path, destination: &str) -> ToolCommand {
    ToolCommand::new(TRANSFER_TOOL, &cfg.transfer_tool)
        .opt_pair("-cfg", cfg.transfer_config.as_deref())
        .arg("-quiet")
        .arg(file)
        .arg(format!("{}:", destination))
}

/// Runs the `notify` handler on `destination`, with `body` on stdin.
pub fn notify_command(
    exec_tool: &Path,
    transfer_config: Option<&Path>,
    destination: &str,
    body: &str,
) -> ToolCommand {
    let mut cmd = ToolCommand::new(NOTIFY_TOOL, exec_tool)
        .opt_pair("-cfg", transfer_config)
        .arg("-quiet")
        .arg(destination)
        .arg("notify");
    cmd.stdin = Some(body.as_bytes().to_vec());
    cmd
}
