//! CLI for the ytrelay video relay.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use ytrelay_core::config::{self, Overrides, RelayConfig, RunConfig};

use commands::{run_check, run_config, run_relay};

/// Top-level CLI for ytrelay.
#[derive(Debug, Parser)]
#[command(name = "ytrelay")]
#[command(about = "ytrelay: fetch videos with youtube-dl and relay them over NNCP", long_about = None)]
pub struct Cli {
    /// Log to stderr instead of ~/.local/state/ytrelay/ytrelay.log.
    #[arg(long, global = true)]
    pub stderr: bool,

    /// Verbose logging, including output of the external tools.
    #[arg(long, global = true)]
    pub debug: bool,

    /// Config file to use instead of ~/.config/ytrelay/config.toml.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Read requests from a queue and relay them until the queue closes.
    Run(RunArgs),

    /// Parse one request line and print the commands it would run.
    Check {
        /// Request line: `<destination> <url> [best|worst|bestaudio]`.
        line: String,

        #[command(flatten)]
        tools: ToolArgs,
    },

    /// Show the config file path and the effective settings.
    Config {
        #[command(flatten)]
        tools: ToolArgs,
    },
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Named pipe (or file) with one request per line; `-` reads stdin.
    #[arg(long, value_name = "PATH")]
    pub pipe: PathBuf,

    /// Maximum concurrent downloads (default 3, or `max_jobs` from the config file).
    #[arg(long = "max", value_name = "N")]
    pub max_jobs: Option<usize>,

    /// Keep downloaded files after they have been sent.
    #[arg(long)]
    pub keep_files: bool,

    /// Do not notify destination nodes.
    #[arg(long)]
    pub no_notify: bool,

    #[command(flatten)]
    pub tools: ToolArgs,
}

/// Tool locations and limits; each overrides the config file.
#[derive(Debug, Clone, Default, Args)]
pub struct ToolArgs {
    /// youtube-dl compatible fetch tool.
    #[arg(long, env = "YTDL_PATH", value_name = "PATH")]
    pub fetch_tool: Option<PathBuf>,

    /// nncp-file binary.
    #[arg(long, env = "NNCP_PATH", value_name = "PATH")]
    pub transfer_tool: Option<PathBuf>,

    /// nncp-exec binary used for notifications.
    #[arg(long, env = "NNCP_EXEC_PATH", value_name = "PATH")]
    pub exec_tool: Option<PathBuf>,

    /// NNCP configuration file passed as -cfg.
    #[arg(long, env = "NNCP_CFG_PATH", value_name = "PATH")]
    pub transfer_config: Option<PathBuf>,

    /// Directory downloads are written to before sending.
    #[arg(long, value_name = "DIR")]
    pub download_dir: Option<PathBuf>,

    /// Kill any external tool that runs longer than this many seconds.
    #[arg(long = "timeout", value_name = "SECS")]
    pub tool_timeout_secs: Option<u64>,
}

impl ToolArgs {
    fn overrides(&self, debug: bool) -> Overrides {
        let path = |p: &Option<PathBuf>| p.clone().filter(|p| !p.as_os_str().is_empty());
        Overrides {
            fetch_tool: path(&self.fetch_tool),
            transfer_tool: path(&self.transfer_tool),
            exec_tool: path(&self.exec_tool),
            transfer_config: path(&self.transfer_config),
            download_dir: path(&self.download_dir),
            tool_timeout_secs: self.tool_timeout_secs,
            debug,
            ..Overrides::default()
        }
    }
}

impl RunArgs {
    fn overrides(&self, debug: bool) -> Overrides {
        Overrides {
            max_jobs: self.max_jobs,
            keep_files: self.keep_files,
            no_notify: self.no_notify,
            ..self.tools.overrides(debug)
        }
    }
}

impl Cli {
    fn load_config(&self) -> Result<RelayConfig> {
        match &self.config {
            Some(path) => config::load_from_path(path),
            None => config::load_or_init(),
        }
    }

    pub async fn run(self) -> Result<()> {
        let file_cfg = self.load_config()?;
        tracing::debug!("loaded config: {:?}", file_cfg);

        match &self.command {
            CliCommand::Run(args) => {
                let cfg = RunConfig::resolve(file_cfg, args.overrides(self.debug));
                run_relay(cfg, &args.pipe).await?;
            }
            CliCommand::Check { line, tools } => {
                let cfg = RunConfig::resolve(file_cfg, tools.overrides(self.debug));
                run_check(&cfg, line)?;
            }
            CliCommand::Config { tools } => {
                let cfg = RunConfig::resolve(file_cfg, tools.overrides(self.debug));
                run_config(self.config.as_deref(), &cfg)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
