//! Notification dispatch for committed status transitions.
//!
//! The engine produces one [`vigil_common::types::NotificationEvent`] per
//! committed transition and hands it to the [`Dispatcher`], which queues
//! it and delivers through the external [`Notifier`] with bounded
//! redelivery, preserving per-instance order. Transports (email, chat,
//! webhooks) live behind the [`Notifier`] boundary and are not part of
//! this crate.

pub mod dispatcher;
pub mod error;


use async_trait::async_trait;
use vigil_common::types::NotificationEvent;

pub use dispatcher::Dispatcher;
pub use error::{NotifyError, Result};

/// The external notifier the engine hands committed transitions to.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, event: &NotificationEvent) -> Result<()>;
}
