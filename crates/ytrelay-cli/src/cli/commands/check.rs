//! `ytrelay check <line>` – dry run for one request line.

use anyhow::{Context, Result};
use std::path::PathBuf;
use ytrelay_core::config::RunConfig;
use ytrelay_core::executor::validate_url;
use ytrelay_core::request::parse_line;
use ytrelay_core::tools::{
    fetch_command, filename_command, notify_command, output_template, transfer_command,
};

pub fn run_check(cfg: &RunConfig, line: &str) -> Result<()> {
    let request = parse_line(line).context("invalid request line")?;
    validate_url(&request.url)?;

    println!("destination: {}", request.destination);
    println!("url:         {}", request.url);
    println!("quality:     {}", request.quality);
    println!();
    println!("{}", filename_command(cfg, &request.url, request.quality));
    println!("{}", fetch_command(cfg, &request.url, request.quality));

    let file = PathBuf::from(output_template(&cfg.download_dir));
    println!("{}", transfer_command(cfg, &file, &request.destination));
    if let Some(exec_tool) = cfg.exec_tool.as_deref() {
        let cmd = notify_command(
            exec_tool,
            cfg.transfer_config.as_deref(),
            &request.destination,
            "",
        );
        println!("{} < message", cmd);
    }
    if cfg.remove_after_send {
        println!("# local file removed after sending");
    }
    Ok(())
}
