//! Shell-script stand-ins for youtube-dl, nncp-file and nncp-exec.
//!
//! The scripts are written once per test binary, before anything is spawned.
//! Each scenario gets its own state directory, which the scripts find through
//! the `-o` template (fetch) or the `-cfg` path (transfer, notify).

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tempfile::TempDir;
use ytrelay_core::config::RunConfig;

const FETCH_SCRIPT: &str = r#"#!/bin/sh
tmpl=""; name_only=0; url=""
while [ $# -gt 0 ]; do
  case "$1" in
    -o) tmpl="$2"; shift 2 ;;
    -f|--merge-output-format|--external-downloader) shift 2 ;;
    --get-filename) name_only=1; shift ;;
    --restrict-filenames|-q) shift ;;
    *) url="$1"; shift ;;
  esac
done
dir=$(dirname "$tmpl")
name=$(basename "$url" | tr -c 'A-Za-z0-9_\n' '_')
file="$dir/$name.mkv"
case "$url" in
  *slow*) exec sleep 30 ;;
esac
if [ "$name_only" = 1 ]; then
  echo "$file"
  exit 0
fi
case "$url" in
  *broken*) echo "ERROR: unsupported URL: $url" >&2; exit 1 ;;
esac
mkdir -p "$dir" && printf 'video:%s' "$url" > "$file"
"#;

const TRANSFER_SCRIPT: &str = r#"#!/bin/sh
cfg=""
while [ $# -gt 0 ]; do
  case "$1" in
    -cfg) cfg="$2"; shift 2 ;;
    -quiet) shift ;;
    *) break ;;
  esac
done
file="$1"; dest="$2"
[ -f "$file" ] || { echo "no such file: $file" >&2; exit 2; }
echo "$(basename "$file") $dest" >> "$(dirname "$cfg")/transfers.log"
"#;

const NOTIFY_SCRIPT: &str = r#"#!/bin/sh
cfg=""
while [ $# -gt 0 ]; do
  case "$1" in
    -cfg) cfg="$2"; shift 2 ;;
    -quiet) shift ;;
    *) break ;;
  esac
done
notes="$(dirname "$cfg")/notes"
mkdir -p "$notes"
{ echo "to: $1 $2"; cat; } > "$notes/$$"
"#;

struct Scripts {
    _dir: TempDir,
    fetch: PathBuf,
    transfer: PathBuf,
    notify: PathBuf,
}

fn scripts() -> &'static Scripts {
    static SCRIPTS: OnceLock<Scripts> = OnceLock::new();
    SCRIPTS.get_or_init(|| {
        let dir = tempfile::tempdir().expect("script dir");
        let install = |name: &str, body: &str| {
            let path = dir.path().join(name);
            fs::write(&path, body).expect("write script");
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
            path
        };
        let fetch = install("youtube-dl", FETCH_SCRIPT);
        let transfer = install("nncp-file", TRANSFER_SCRIPT);
        let notify = install("nncp-exec", NOTIFY_SCRIPT);
        Scripts {
            _dir: dir,
            fetch,
            transfer,
            notify,
        }
    })
}

/// Isolated state for one test: downloads, transfer log, notifications.
pub struct Scenario {
    dir: TempDir,
}

impl Scenario {
    pub fn new() -> Self {
        scripts();
        Self {
            dir: tempfile::tempdir().expect("scenario dir"),
        }
    }

    pub fn downloads(&self) -> PathBuf {
        self.dir.path().join("downloads")
    }

    pub fn run_config(&self, max_jobs: usize) -> RunConfig {
        let tools = scripts();
        RunConfig {
            fetch_tool: tools.fetch.clone(),
            transfer_tool: tools.transfer.clone(),
            exec_tool: Some(tools.notify.clone()),
            transfer_config: Some(self.dir.path().join("nncp.hjson")),
            download_dir: self.downloads(),
            max_jobs,
            ..RunConfig::default()
        }
    }

    /// `"<file name> <destination>:"` per transfer, sorted.
    pub fn transfers(&self) -> Vec<String> {
        let mut lines: Vec<String> = read_or_empty(&self.dir.path().join("transfers.log"))
            .lines()
            .map(str::to_string)
            .collect();
        lines.sort();
        lines
    }

    /// Full stdin of every notification, sorted.
    pub fn notes(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(self.dir.path().join("notes")) else {
            return Vec::new();
        };
        let mut notes: Vec<String> = entries
            .map(|e| read_or_empty(&e.expect("note entry").path()))
            .collect();
        notes.sort();
        notes
    }
}

fn read_or_empty(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_default()
}
