use env_defs::{DeliveryError, DigestPage, EventKey, StoreError};
use futures::future::join_all;
use log::{info, warn};

use crate::interface::{EventStore, NotificationSink};
use crate::CloseOutPolicy;

/// Sends pages one after another, page 1 first. Stops at the first failure
/// and returns the 1-based index of the page that failed with the error.
pub async fn deliver_pages(
    sink: &dyn NotificationSink,
    pages: &[DigestPage],
) -> Result<(), (usize, DeliveryError)> {
    for page in pages {
        match sink.send(page).await {
            Ok(()) => info!("Sent page {} of digest for {}", page.label(), page.stack_id),
            Err(e) => {
                warn!(
                    "Failed to send page {} of digest for {}: {}",
                    page.label(),
                    page.stack_id,
                    e
                );
                return Err((page.page_index, e));
            }
        }
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct CloseOutSummary {
    pub closed: usize,
    /// Already flipped by a concurrent invocation
    pub already_closed: usize,
    pub failures: Vec<(EventKey, StoreError)>,
}

impl CloseOutSummary {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Marks or deletes every event a delivered digest covered.
pub async fn close_out(
    store: &dyn EventStore,
    keys: &[EventKey],
    policy: CloseOutPolicy,
) -> CloseOutSummary {
    let mut summary = CloseOutSummary::default();

    match policy {
        CloseOutPolicy::Delete => {
            info!("Deleting {} notified events", keys.len());
            match store.delete_batch(keys).await {
                Ok(()) => summary.closed = keys.len(),
                Err(e) => {
                    warn!("Failed to delete notified events: {}", e);
                    if let Some(first) = keys.first() {
                        summary.failures.push((first.clone(), e));
                    }
                }
            }
        }
        CloseOutPolicy::MarkNotified => {
            info!("Marking {} events as notified", keys.len());
            let results = join_all(keys.iter().map(|key| store.mark_notified(key))).await;

            for (key, result) in keys.iter().zip(results) {
                match result {
                    Ok(()) => summary.closed += 1,
                    Err(StoreError::ConditionalCheckFailed { .. }) => {
                        info!(
                            "Event {}@{} was already marked as notified",
                            key.stack_id, key.time
                        );
                        summary.already_closed += 1;
                    }
                    Err(e) => {
                        warn!("Failed to mark {}@{} as notified: {}", key.stack_id, key.time, e);
                        summary.failures.push((key.clone(), e));
                    }
                }
            }
        }
    }

    summary
}
