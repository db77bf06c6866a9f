use crate::{Notifier, NotifyError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use vigil_common::types::NotificationEvent;

const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Queue front of the notification pipeline.
///
/// The engine fires exactly one event per committed transition; the
/// dispatcher's obligation is at-least-once handoff to the external
/// [`Notifier`]. A single worker drains the queue in order, so successive
/// transitions of the same instance are never delivered out of order.
/// A failed delivery is retried with backoff up to `max_attempts`, then
/// logged and dropped (the notifier owns further redelivery).
#[derive(Clone)]
pub struct Dispatcher {
    tx: mpsc::UnboundedSender<NotificationEvent>,
}

impl Dispatcher {
    /// Spawn the delivery worker. The handle completes once every queued
    /// event has been drained after the last `Dispatcher` clone is
    /// dropped.
    pub fn spawn(notifier: Arc<dyn Notifier>, max_attempts: u32) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(deliver_loop(rx, notifier, max_attempts.max(1)));
        (Self { tx }, handle)
    }

    /// Enqueue one transition event. The engine's obligation ends here.
    pub fn dispatch(&self, event: NotificationEvent) -> Result<()> {
        self.tx.send(event).map_err(|_| NotifyError::QueueClosed)
    }
}

async fn deliver_loop(
    mut rx: mpsc::UnboundedReceiver<NotificationEvent>,
    notifier: Arc<dyn Notifier>,
    max_attempts: u32,
) {
    while let Some(event) = rx.recv().await {
        let mut delay = RETRY_BASE_DELAY;
        let mut delivered = false;

        for attempt in 1..=max_attempts {
            match notifier.deliver(&event).await {
                Ok(()) => {
                    tracing::debug!(
                        event_id = %event.id,
                        instance_id = %event.instance_id,
                        from = %event.previous,
                        to = %event.current,
                        "Notification delivered"
                    );
                    delivered = true;
                    break;
                }
                Err(e) => {
                    tracing::warn!(
                        event_id = %event.id,
                        attempt,
                        error = %e,
                        "Notification delivery failed"
                    );
                    if attempt < max_attempts {
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                    }
                }
            }
        }

        if !delivered {
            tracing::error!(
                event_id = %event.id,
                instance_id = %event.instance_id,
                attempts = max_attempts,
                "Dropping notification after exhausting delivery attempts"
            );
        }
    }
}
