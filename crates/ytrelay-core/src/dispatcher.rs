//! Admission control: run incoming requests with at most `max_jobs` in flight.
//!
//! Each admitted job carries an owned semaphore permit inside its task, so the
//! slot comes back when the task ends however it ends, panics included. While
//! every slot is taken the loop stops receiving, and the bounded intake
//! channel pushes that stall back to the line reader.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tracing::Instrument;

use crate::executor::JobOutcome;
use crate::request::Request;

/// Runs one admitted request to completion.
#[async_trait]
pub trait JobHandler: Send + Sync + 'static {
    async fn handle(&self, request: Request) -> JobOutcome;
}

/// Counts for one dispatcher run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSummary {
    pub admitted: u64,
    pub delivered: u64,
    pub failed: u64,
    /// Jobs whose task panicked. Their slot was still released.
    pub panicked: u64,
}

impl DispatchSummary {
    fn record(&mut self, res: Result<JobOutcome, JoinError>) {
        match res {
            Ok(outcome) if outcome.is_delivered() => self.delivered += 1,
            Ok(_) => self.failed += 1,
            Err(e) => {
                self.panicked += 1;
                tracing::error!("job task ended abnormally: {}", e);
            }
        }
    }

    pub fn finished(&self) -> u64 {
        self.delivered + self.failed + self.panicked
    }
}

#[derive(Debug)]
pub struct Dispatcher {
    gate: Arc<Semaphore>,
    max_jobs: usize,
}

impl Dispatcher {
    pub fn new(max_jobs: usize) -> Self {
        let max_jobs = max_jobs.max(1);
        Self {
            gate: Arc::new(Semaphore::new(max_jobs)),
            max_jobs,
        }
    }

    pub fn max_jobs(&self) -> usize {
        self.max_jobs
    }

    /// Slots not currently held by a running job.
    pub fn available_slots(&self) -> usize {
        self.gate.available_permits()
    }

    /// Admits requests until `requests` closes, then waits for the jobs still
    /// running. Job failures never stop the loop.
    pub async fn run<H: JobHandler>(
        &self,
        mut requests: mpsc::Receiver<Request>,
        handler: Arc<H>,
    ) -> DispatchSummary {
        let mut summary = DispatchSummary::default();
        let mut join_set = JoinSet::new();

        while let Some(request) = requests.recv().await {
            let permit = match Arc::clone(&self.gate).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    tracing::error!(url = %request.url, "admission gate closed, dropping request");
                    break;
                }
            };
            summary.admitted += 1;
            let job = summary.admitted;
            tracing::info!(
                job,
                url = %request.url,
                destination = %request.destination,
                in_flight = self.max_jobs - self.gate.available_permits(),
                "admitted request"
            );

            let handler = Arc::clone(&handler);
            let span = tracing::info_span!("job", id = job, destination = %request.destination);
            join_set.spawn(
                async move {
                    let _permit = permit;
                    handler.handle(request).await
                }
                .instrument(span),
            );

            while let Some(res) = join_set.try_join_next() {
                summary.record(res);
            }
        }

        tracing::debug!(in_flight = join_set.len(), "intake closed, draining jobs");
        while let Some(res) = join_set.join_next().await {
            summary.record(res);
        }
        summary
    }
}
