//! One job, start to finish: validate → resolve filename → fetch → transfer →
//! cleanup → notify.
//!
//! Steps run strictly in order and stop at the first failure. Nothing here
//! returns an error to the caller; failures end the job and are reported to
//! the destination through the [`Notifier`].

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

use crate::config::RunConfig;
use crate::dispatcher::JobHandler;
use crate::notify::Notifier;
use crate::request::Request;
use crate::tools::{ToolError, Toolchain};

/// Query keys that mark a playlist link.
const PLAYLIST_KEYS: [&str; 2] = ["list", "playlist"];

#[derive(Debug, Error)]
pub enum JobError {
    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("invalid URL {url} provided, perhaps playlist?")]
    Playlist { url: String },
    #[error("could not resolve filename for {url}: {source}")]
    Filename {
        url: String,
        #[source]
        source: ToolError,
    },
    #[error("could not fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: ToolError,
    },
    #[error("could not send {} to {destination}: {source}", .file.display())]
    Transfer {
        file: PathBuf,
        destination: String,
        #[source]
        source: ToolError,
    },
}

/// How a job ended.
#[derive(Debug)]
pub enum JobOutcome {
    /// The file reached the transfer tool. A failed local cleanup does not
    /// change that.
    Delivered { file: PathBuf, cleanup_failed: bool },
    Failed(JobError),
}

impl JobOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, JobOutcome::Delivered { .. })
    }
}

/// Scheme assumed for links like `youtu.be/ID`; the fetch tool accepts them as-is.
const IMPLIED_SCHEME: &str = "https://";

/// Checks that `raw` is a well-formed URL and not a playlist. A missing scheme
/// is tolerated. The returned [`Url`] is only for inspection; tools get `raw`.
pub fn validate_url(raw: &str) -> Result<Url, JobError> {
    let url = match Url::parse(raw) {
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(&format!("{IMPLIED_SCHEME}{raw}"))
        }
        parsed => parsed,
    }
    .map_err(|source| JobError::InvalidUrl {
        url: raw.to_string(),
        source,
    })?;
    if url
        .query_pairs()
        .any(|(key, _)| PLAYLIST_KEYS.contains(&key.as_ref()))
    {
        return Err(JobError::Playlist {
            url: raw.to_string(),
        });
    }
    Ok(url)
}

/// Message sent to the destination when a job fails.
pub fn failure_message(err: &JobError) -> String {
    format!("Error sending file: {}", err)
}

/// Message sent to the destination after a successful transfer.
pub fn success_message(url: &str, file: &std::path::Path) -> String {
    format!("Downloaded {} to {}", url, file.display())
}

pub struct JobExecutor<T> {
    cfg: Arc<RunConfig>,
    tools: Arc<T>,
    notifier: Notifier<T>,
}

impl<T: Toolchain> JobExecutor<T> {
    pub fn new(cfg: Arc<RunConfig>, tools: Arc<T>) -> Self {
        let notifier = Notifier::new(Arc::clone(&tools), cfg.notify);
        Self {
            cfg,
            tools,
            notifier,
        }
    }

    /// Runs every step for `request`. Always returns; the outcome is for
    /// accounting only.
    pub async fn execute(&self, request: &Request) -> JobOutcome {
        let file = match self.deliver(request).await {
            Ok(file) => file,
            Err(err) => {
                tracing::error!(url = %request.url, destination = %request.destination, "{}", err);
                self.notifier
                    .send_best_effort(&failure_message(&err), &request.destination)
                    .await;
                return JobOutcome::Failed(err);
            }
        };

        let mut cleanup_failed = false;
        if self.cfg.remove_after_send {
            if let Err(e) = tokio::fs::remove_file(&file).await {
                cleanup_failed = true;
                tracing::warn!(file = %file.display(), "could not remove file: {}", e);
            } else {
                tracing::debug!(file = %file.display(), "removed local copy");
            }
        }

        self.notifier
            .send_best_effort(&success_message(&request.url, &file), &request.destination)
            .await;

        tracing::info!(url = %request.url, file = %file.display(), "processed video request");
        JobOutcome::Delivered {
            file,
            cleanup_failed,
        }
    }

    /// Steps 1 to 4. Returns the path that was handed to the transfer tool.
    async fn deliver(&self, request: &Request) -> Result<PathBuf, JobError> {
        validate_url(&request.url)?;
        tracing::info!(url = %request.url, quality = %request.quality, "fetching video");

        let file = self
            .tools
            .resolve_filename(&request.url, request.quality)
            .await
            .map_err(|source| JobError::Filename {
                url: request.url.clone(),
                source,
            })?;
        tracing::debug!(file = %file.display(), "video filename");

        self.tools
            .fetch(&request.url, request.quality)
            .await
            .map_err(|source| JobError::Fetch {
                url: request.url.clone(),
                source,
            })?;

        self.tools
            .transfer(&file, &request.destination)
            .await
            .map_err(|source| JobError::Transfer {
                file: file.clone(),
                destination: request.destination.clone(),
                source,
            })?;
        tracing::debug!(file = %file.display(), destination = %request.destination, "queued for transfer");

        Ok(file)
    }
}

#[async_trait]
impl<T: Toolchain> JobHandler for JobExecutor<T> {
    async fn handle(&self, request: Request) -> JobOutcome {
        self.execute(&request).await
    }
}
