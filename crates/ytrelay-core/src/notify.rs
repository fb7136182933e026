//! Best-effort notifications to the destination node.
//!
//! Delivery problems are logged and swallowed; a failed notification never
//! triggers another notification.

use std::sync::Arc;

use thiserror::Error;

use crate::tools::{ToolError, Toolchain};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification exec tool not set")]
    ExecToolUnset,
    #[error("could not notify {destination}: {source}")]
    Delivery {
        destination: String,
        #[source]
        source: ToolError,
    },
}

/// Frames `message` for the notify handler: a `Subject:` header built from the
/// first line, followed by the full text when it spans several lines.
pub fn compose_message(message: &str) -> String {
    let message = message.trim();
    let subject = message.lines().next().unwrap_or_default();
    if message.contains('\n') {
        format!("Subject: {}\n\n{}\n", subject, message)
    } else {
        format!("Subject: {}\n", subject)
    }
}

pub struct Notifier<T> {
    tools: Arc<T>,
    enabled: bool,
}

impl<T: Toolchain> Notifier<T> {
    pub fn new(tools: Arc<T>, enabled: bool) -> Self {
        Self { tools, enabled }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Sends `message` to `destination` and reports the outcome.
    pub async fn notify(&self, message: &str, destination: &str) -> Result<(), NotifyError> {
        let body = compose_message(message);
        tracing::debug!(destination, "sending notification: {}", message);
        self.tools
            .notify(destination, &body)
            .await
            .map_err(|source| match source {
                ToolError::NotConfigured { .. } => NotifyError::ExecToolUnset,
                source => NotifyError::Delivery {
                    destination: destination.to_string(),
                    source,
                },
            })
    }

    /// Like [`Notifier::notify`] but only logs failures. Does nothing when
    /// notifications are disabled. Returns whether the message went out.
    pub async fn send_best_effort(&self, message: &str, destination: &str) -> bool {
        if !self.enabled {
            return false;
        }
        match self.notify(message, destination).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(destination, "error sending notification: {}", e);
                false
            }
        }
    }
}
