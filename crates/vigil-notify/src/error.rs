/// Errors in the notification subsystem.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The external notifier rejected or failed a delivery attempt.
    #[error("delivery failed: {0}")]
    Delivery(String),

    /// The dispatch queue is gone; the engine is shutting down.
    #[error("dispatch queue closed")]
    QueueClosed,
}

pub type Result<T> = std::result::Result<T, NotifyError>;
