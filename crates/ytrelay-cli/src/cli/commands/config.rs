//! `ytrelay config` – show where settings come from and what they resolve to.

use anyhow::Result;
use std::path::Path;
use ytrelay_core::config::{self, RunConfig};

pub fn run_config(explicit: Option<&Path>, cfg: &RunConfig) -> Result<()> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => config::config_path()?,
    };
    println!("config file: {}", path.display());
    println!("{:#?}", cfg);
    Ok(())
}
