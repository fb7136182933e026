//! Failures of a single external tool invocation.

use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("could not start {tool} ({program}): {source}")]
    Spawn {
        tool: &'static str,
        program: String,
        #[source]
        source: io::Error,
    },
    /// Waiting on the child or talking to its pipes failed.
    #[error("{tool}: {source}")]
    Io {
        tool: &'static str,
        #[source]
        source: io::Error,
    },
    #[error("{tool} exited with {status}{}", stderr_suffix(.stderr))]
    Failed {
        tool: &'static str,
        status: ExitStatus,
        /// Last few stderr lines, for the error notification.
        stderr: Vec<String>,
    },
    #[error("{tool} timed out after {after:?}")]
    TimedOut { tool: &'static str, after: Duration },
    #[error("{tool} did not print a filename")]
    NoFilename { tool: &'static str },
    #[error("{tool} is not configured")]
    NotConfigured { tool: &'static str },
}

fn stderr_suffix(stderr: &[String]) -> String {
    match stderr.last() {
        Some(line) => format!(": {}", line),
        None => String::new(),
    }
}
