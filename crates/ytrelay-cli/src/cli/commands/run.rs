//! `ytrelay run` – read the queue and relay requests until it closes.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::io::BufReader;
use ytrelay_core::config::RunConfig;
use ytrelay_core::dispatcher::Dispatcher;
use ytrelay_core::executor::JobExecutor;
use ytrelay_core::intake;
use ytrelay_core::tools::ExternalTools;

pub async fn run_relay(cfg: RunConfig, pipe: &Path) -> Result<()> {
    let cfg = Arc::new(cfg);
    let queue = intake::open_queue(pipe).await?;
    tracing::info!(
        pipe = %pipe.display(),
        max_jobs = cfg.max_jobs,
        notify = cfg.notify,
        remove_after_send = cfg.remove_after_send,
        "starting"
    );

    let tools = Arc::new(ExternalTools::new(Arc::clone(&cfg)));
    let executor = Arc::new(JobExecutor::new(Arc::clone(&cfg), tools));
    let dispatcher = Dispatcher::new(cfg.max_jobs);
    let (tx, rx) = intake::channel();
    let dispatch = tokio::spawn(async move { dispatcher.run(rx, executor).await });

    // First Ctrl-C stops reading; running jobs are allowed to finish.
    let fed = tokio::select! {
        res = intake::feed(BufReader::new(queue), &tx) => Some(res),
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted, waiting for running jobs (Ctrl-C again to abort)");
            None
        }
    };
    drop(tx);

    let summary = tokio::select! {
        res = dispatch => res.context("dispatcher task")?,
        _ = tokio::signal::ctrl_c() => anyhow::bail!("interrupted with jobs still running"),
    };

    if let Some(stats) = fed.transpose()? {
        tracing::info!(
            lines = stats.lines,
            queued = stats.queued,
            rejected = stats.rejected,
            "request queue closed"
        );
    }
    tracing::info!(
        admitted = summary.admitted,
        delivered = summary.delivered,
        failed = summary.failed,
        panicked = summary.panicked,
        "exiting"
    );
    println!(
        "Relayed {} of {} request(s).",
        summary.delivered, summary.admitted
    );
    Ok(())
}
