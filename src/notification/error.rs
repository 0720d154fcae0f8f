//! Notification error definitions.

use thiserror::Error;

/// Errors raised while delivering a notification. Delivery failures are
/// per-pair: the pair's state is not committed, so the events are retried
/// on the next cycle.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// The HTTP request to the webhook failed.
    #[error("Webhook request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The webhook endpoint rejected the message.
    #[error("Webhook returned status {status}")]
    Rejected {
        /// HTTP status code returned by the webhook.
        status: reqwest::StatusCode,
    },

    /// No webhook URL is configured for the resolved route.
    #[error("No webhook configured for channel '{0}'")]
    MissingWebhook(String),
}
