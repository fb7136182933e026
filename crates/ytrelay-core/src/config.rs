use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_FETCH_TOOL: &str = "youtube-dl";
const DEFAULT_TRANSFER_TOOL: &str = "nncp-file";
const DEFAULT_EXEC_TOOL: &str = "nncp-exec";

/// Global configuration loaded from `~/.config/ytrelay/config.toml`.
///
/// Every field has a default so a partial file is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Maximum number of jobs fetching or transferring at once.
    pub max_jobs: usize,
    /// youtube-dl compatible fetch tool.
    pub fetch_tool: PathBuf,
    /// `nncp-file` binary used to send fetched files.
    pub transfer_tool: PathBuf,
    /// `nncp-exec` binary used for notifications.
    pub exec_tool: PathBuf,
    /// NNCP configuration passed as `-cfg` to both NNCP tools (None = tool default).
    pub transfer_config: Option<PathBuf>,
    /// Directory the fetch tool writes into before transfer.
    pub download_dir: PathBuf,
    /// Container the fetch tool merges streams into.
    pub merge_format: String,
    /// Accelerated downloader handed to the fetch tool (empty = none).
    pub external_downloader: String,
    /// Delete the local file after a successful transfer.
    pub remove_after_send: bool,
    /// Notify the destination node on completion and on failure.
    pub notify: bool,
    /// Kill a tool that runs longer than this (None = wait forever).
    pub tool_timeout_secs: Option<u64>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_jobs: 3,
            fetch_tool: PathBuf::from(DEFAULT_FETCH_TOOL),
            transfer_tool: PathBuf::from(DEFAULT_TRANSFER_TOOL),
            exec_tool: PathBuf::from(DEFAULT_EXEC_TOOL),
            transfer_config: None,
            download_dir: PathBuf::from("/tmp"),
            merge_format: "mkv".to_string(),
            external_downloader: "aria2c".to_string(),
            remove_after_send: true,
            notify: true,
            tool_timeout_secs: None,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("ytrelay")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<RelayConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = RelayConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    load_from_path(&path)
}

/// Load configuration from an explicit file. The file must exist.
pub fn load_from_path(path: &Path) -> Result<RelayConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("read config file {}", path.display()))?;
    let cfg: RelayConfig =
        toml::from_str(&data).with_context(|| format!("parse config file {}", path.display()))?;
    Ok(cfg)
}

/// Values from the command line or environment that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub max_jobs: Option<usize>,
    pub fetch_tool: Option<PathBuf>,
    pub transfer_tool: Option<PathBuf>,
    pub exec_tool: Option<PathBuf>,
    pub transfer_config: Option<PathBuf>,
    pub download_dir: Option<PathBuf>,
    pub tool_timeout_secs: Option<u64>,
    /// Only ever turns removal off.
    pub keep_files: bool,
    /// Only ever turns notification off.
    pub no_notify: bool,
    pub debug: bool,
}

/// Process-wide settings for a relay run. Built once at startup and shared
/// read-only by every job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub fetch_tool: PathBuf,
    pub transfer_tool: PathBuf,
    /// `None` whenever notification is disabled; never consulted in that case.
    pub exec_tool: Option<PathBuf>,
    pub transfer_config: Option<PathBuf>,
    pub download_dir: PathBuf,
    pub merge_format: String,
    pub external_downloader: Option<String>,
    pub remove_after_send: bool,
    pub notify: bool,
    pub debug: bool,
    pub max_jobs: usize,
    pub tool_timeout: Option<Duration>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::resolve(RelayConfig::default(), Overrides::default())
    }
}

impl RunConfig {
    /// Merges the config file with overrides. Overrides win; paths that name a
    /// location (not a bare program looked up on PATH) are made absolute.
    pub fn resolve(file: RelayConfig, overrides: Overrides) -> Self {
        let notify = file.notify && !overrides.no_notify;
        let exec_tool = notify.then(|| {
            absolutize(&overrides.exec_tool.unwrap_or(file.exec_tool))
        });
        let external_downloader = Some(file.external_downloader)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Self {
            fetch_tool: absolutize(&overrides.fetch_tool.unwrap_or(file.fetch_tool)),
            transfer_tool: absolutize(&overrides.transfer_tool.unwrap_or(file.transfer_tool)),
            exec_tool,
            transfer_config: overrides
                .transfer_config
                .or(file.transfer_config)
                .filter(|p| !p.as_os_str().is_empty())
                .map(|p| absolutize(&p)),
            download_dir: absolutize(&overrides.download_dir.unwrap_or(file.download_dir)),
            merge_format: file.merge_format,
            external_downloader,
            remove_after_send: file.remove_after_send && !overrides.keep_files,
            notify,
            debug: overrides.debug,
            max_jobs: overrides.max_jobs.unwrap_or(file.max_jobs).max(1),
            tool_timeout: overrides
                .tool_timeout_secs
                .or(file.tool_timeout_secs)
                .filter(|s| *s > 0)
                .map(Duration::from_secs),
        }
    }
}

/// Bare program names stay as-is so the OS resolves them on PATH.
fn absolutize(path: &Path) -> PathBuf {
    if path.components().count() <= 1 && !path.has_root() {
        return path.to_path_buf();
    }
    match std::path::absolute(path) {
        Ok(abs) => abs,
        Err(e) => {
            tracing::debug!(path = %path.display(), "could not make path absolute: {}", e);
            path.to_path_buf()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = RelayConfig::default();
        assert_eq!(cfg.max_jobs, 3);
        assert_eq!(cfg.fetch_tool, PathBuf::from("youtube-dl"));
        assert_eq!(cfg.transfer_tool, PathBuf::from("nncp-file"));
        assert_eq!(cfg.exec_tool, PathBuf::from("nncp-exec"));
        assert!(cfg.remove_after_send);
        assert!(cfg.notify);
        assert!(cfg.tool_timeout_secs.is_none());
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = RelayConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: RelayConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn config_toml_partial_file_uses_defaults() {
        let toml = r#"
            max_jobs = 8
            transfer_config = "/etc/nncp.hjson"
            notify = false
        "#;
        let cfg: RelayConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.max_jobs, 8);
        assert_eq!(cfg.transfer_config, Some(PathBuf::from("/etc/nncp.hjson")));
        assert!(!cfg.notify);
        assert_eq!(cfg.merge_format, "mkv");
        assert_eq!(cfg.external_downloader, "aria2c");
    }

    #[test]
    fn load_from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "max_jobs = 5\ntool_timeout_secs = 600\n").unwrap();
        let cfg = load_from_path(&path).unwrap();
        assert_eq!(cfg.max_jobs, 5);
        assert_eq!(cfg.tool_timeout_secs, Some(600));
    }

    #[test]
    fn load_from_path_reports_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "max_jobs = \"many\"\n").unwrap();
        let err = load_from_path(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("parse config file"));
    }

    #[test]
    fn resolve_defaults() {
        let run = RunConfig::default();
        assert_eq!(run.fetch_tool, PathBuf::from("youtube-dl"));
        assert_eq!(run.exec_tool, Some(PathBuf::from("nncp-exec")));
        assert_eq!(run.external_downloader.as_deref(), Some("aria2c"));
        assert_eq!(run.download_dir, PathBuf::from("/tmp"));
        assert_eq!(run.max_jobs, 3);
        assert!(run.transfer_config.is_none());
        assert!(run.tool_timeout.is_none());
        assert!(!run.debug);
    }

    #[test]
    fn resolve_overrides_win() {
        let overrides = Overrides {
            max_jobs: Some(7),
            fetch_tool: Some(PathBuf::from("/opt/yt-dlp")),
            transfer_config: Some(PathBuf::from("/etc/nncp.hjson")),
            tool_timeout_secs: Some(30),
            keep_files: true,
            debug: true,
            ..Overrides::default()
        };
        let run = RunConfig::resolve(RelayConfig::default(), overrides);
        assert_eq!(run.max_jobs, 7);
        assert_eq!(run.fetch_tool, PathBuf::from("/opt/yt-dlp"));
        assert_eq!(run.transfer_config, Some(PathBuf::from("/etc/nncp.hjson")));
        assert_eq!(run.tool_timeout, Some(Duration::from_secs(30)));
        assert!(!run.remove_after_send);
        assert!(run.debug);
    }

    #[test]
    fn resolve_drops_exec_tool_when_notify_disabled() {
        let overrides = Overrides {
            exec_tool: Some(PathBuf::from("/usr/bin/nncp-exec")),
            no_notify: true,
            ..Overrides::default()
        };
        let run = RunConfig::resolve(RelayConfig::default(), overrides);
        assert!(!run.notify);
        assert!(run.exec_tool.is_none());

        let file = RelayConfig {
            notify: false,
            ..RelayConfig::default()
        };
        let run = RunConfig::resolve(file, Overrides::default());
        assert!(run.exec_tool.is_none());
    }

    #[test]
    fn resolve_clamps_max_jobs_and_empty_values() {
        let file = RelayConfig {
            max_jobs: 0,
            external_downloader: "  ".to_string(),
            transfer_config: Some(PathBuf::new()),
            tool_timeout_secs: Some(0),
            ..RelayConfig::default()
        };
        let run = RunConfig::resolve(file, Overrides::default());
        assert_eq!(run.max_jobs, 1);
        assert!(run.external_downloader.is_none());
        assert!(run.transfer_config.is_none());
        assert!(run.tool_timeout.is_none());
    }

    #[test]
    fn resolve_makes_relative_paths_absolute() {
        let overrides = Overrides {
            transfer_tool: Some(PathBuf::from("bin/nncp-file")),
            ..Overrides::default()
        };
        let run = RunConfig::resolve(RelayConfig::default(), overrides);
        assert!(run.transfer_tool.is_absolute());
        assert!(run.transfer_tool.ends_with("bin/nncp-file"));
        assert_eq!(run.fetch_tool, PathBuf::from("youtube-dl"));
    }
}
