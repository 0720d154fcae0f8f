//! Notification delivery.

pub mod error;
pub mod slack;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

pub use error::NotificationError;
pub use slack::SlackNotifier;

use crate::engine::router::Route;
use crate::models::WatchEvent;

/// A delivery capability for classified events. Delivery happens before the
/// pair's state is committed, so an implementation must tolerate seeing the
/// same event again after a crash.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Delivers one event to its resolved route.
    async fn deliver(&self, event: &WatchEvent, route: &Route) -> Result<(), NotificationError>;
}
