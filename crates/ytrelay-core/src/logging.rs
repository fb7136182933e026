//! Logging init: the relay log under the XDG state dir, or stderr.

use anyhow::Result;
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

const LOG_FILE_NAME: &str = "ytrelay.log";

/// One event's destination. Events go to stderr when the relay log handle
/// cannot be duplicated, so a job's log line is never dropped.
enum RelayLogSink {
    File(fs::File),
    Stderr,
}

impl io::Write for RelayLogSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            RelayLogSink::File(f) => f.write(buf),
            RelayLogSink::Stderr => io::stderr().lock().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            RelayLogSink::File(f) => f.flush(),
            RelayLogSink::Stderr => io::stderr().lock().flush(),
        }
    }
}

/// Shared append handle to `ytrelay.log`; each job task writes through its own clone.
struct RelayLog(fs::File);

impl<'a> MakeWriter<'a> for RelayLog {
    type Writer = RelayLogSink;

    fn make_writer(&'a self) -> Self::Writer {
        self.0
            .try_clone()
            .map(RelayLogSink::File)
            .unwrap_or(RelayLogSink::Stderr)
    }
}

fn default_directives(debug: bool) -> &'static str {
    if debug {
        "info,ytrelay_core=debug,ytrelay=debug"
    } else {
        "info"
    }
}

/// `RUST_LOG` wins; otherwise `--debug` raises our crates (and streamed tool output) to debug.
fn default_filter(debug: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(debug)))
}

/// Where the relay log lives: `~/.local/state/ytrelay/ytrelay.log`.
pub fn log_file_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("ytrelay")?;
    Ok(xdg_dirs.get_state_home().join(LOG_FILE_NAME))
}

/// Install the subscriber writing to [`log_file_path`]. Errors leave no
/// subscriber installed so the caller can fall back to stderr.
pub fn init_logging(debug: bool) -> Result<PathBuf> {
    let path = log_file_path()?;
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let file = fs::OpenOptions::new().create(true).append(true).open(&path)?;

    tracing_subscriber::fmt()
        .with_env_filter(default_filter(debug))
        .with_writer(BoxMakeWriter::new(RelayLog(file)))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("install tracing subscriber: {}", e))?;

    tracing::info!("ytrelay logging initialized at {}", path.display());
    Ok(path)
}

/// Stderr-only logging, for `--stderr` and for when the relay log can't be opened.
pub fn init_logging_stderr(debug: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(default_filter(debug))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}
