use clap::Parser;
use ytrelay_core::logging;

mod cli;

use crate::cli::Cli;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging as early as possible; fall back to stderr.
    if cli.stderr {
        logging::init_logging_stderr(cli.debug);
    } else if let Err(err) = logging::init_logging(cli.debug) {
        logging::init_logging_stderr(cli.debug);
        tracing::warn!("file logging unavailable, using stderr: {:#}", err);
    }

    let code = match cli.run().await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("ytrelay error: {:#}", err);
            1
        }
    };
    // An interrupted stdin read still holds a blocking thread that runtime
    // shutdown would wait on forever.
    std::process::exit(code);
}
