use async_trait::async_trait;
use env_defs::{EventKey, StoreError, StoredEvent};
use log::debug;

/// One backend page of pending events. `next` is the key to resume after,
/// `None` once the backend has nothing more to return.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingPage {
    pub events: Vec<StoredEvent>,
    pub next: Option<EventKey>,
}

/// Append-only per-stack event log keyed by (stack id, time).
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Upsert by (stack id, time); a redelivered event overwrites its earlier
    /// copy while that copy is still pending. Once notified, the stored copy is
    /// kept and the write is a no-op.
    async fn put(&self, event: &StoredEvent) -> Result<(), StoreError>;

    async fn query_pending_page(
        &self,
        stack_id: &str,
        start_after: Option<EventKey>,
    ) -> Result<PendingPage, StoreError>;

    /// Flips `notified` from false to true. Fails with
    /// `StoreError::ConditionalCheckFailed` when it was already true.
    async fn mark_notified(&self, key: &EventKey) -> Result<(), StoreError>;

    async fn delete_batch(&self, keys: &[EventKey]) -> Result<(), StoreError>;

    /// All events of a stack with `notified == false`, across every backend page.
    async fn query_pending(&self, stack_id: &str) -> Result<Vec<StoredEvent>, StoreError> {
        let mut pending = Vec::new();
        let mut start_after = None;

        loop {
            let page = self.query_pending_page(stack_id, start_after).await?;
            debug!(
                "Fetched {} pending events for {} (more: {})",
                page.events.len(),
                stack_id,
                page.next.is_some()
            );
            pending.extend(page.events);

            match page.next {
                Some(next) => start_after = Some(next),
                None => break,
            }
        }

        Ok(pending)
    }
}
