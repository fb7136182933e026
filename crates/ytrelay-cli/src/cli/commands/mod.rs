//! CLI command handlers. Each command is in its own file.

mod check;
mod config;
mod run;

pub use check::run_check;
pub use config::run_config;
pub use run::run_relay;
