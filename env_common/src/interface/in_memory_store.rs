use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use env_defs::{EventKey, StoreError, StoredEvent};
use env_utils::get_epoch;

use super::{EventStore, PendingPage};

/// Event store held in process memory.
///
/// Items keep their insertion order, like a secondary index whose sort key
/// carries no time information, so callers cannot rely on the store to order
/// events. `page_size` mimics the backend's query limit.
pub struct InMemoryEventStore {
    events: Mutex<Vec<StoredEvent>>,
    page_size: usize,
    fail_writes: AtomicBool,
    fail_queries: AtomicBool,
}

impl InMemoryEventStore {
    pub fn new(page_size: usize) -> Self {
        InMemoryEventStore {
            events: Mutex::new(Vec::new()),
            page_size: page_size.max(1),
            fail_writes: AtomicBool::new(false),
            fail_queries: AtomicBool::new(false),
        }
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    /// Every stored event of a stack, notified or not.
    pub fn events_for_stack(&self, stack_id: &str) -> Vec<StoredEvent> {
        match self.lock() {
            Ok(events) => events
                .iter()
                .filter(|e| e.stack_id == stack_id)
                .cloned()
                .collect(),
            Err(_) => vec![],
        }
    }

    pub fn len(&self) -> usize {
        self.lock().map(|events| events.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<StoredEvent>>, StoreError> {
        self.events
            .lock()
            .map_err(|e| StoreError::Write(format!("event store lock poisoned: {}", e)))
    }

    fn check_writes(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Write("in-memory store is failing writes".to_string()));
        }
        Ok(())
    }
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        InMemoryEventStore::new(10)
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn put(&self, event: &StoredEvent) -> Result<(), StoreError> {
        self.check_writes()?;
        let mut events = self.lock()?;
        let key = event.key();
        match events.iter_mut().find(|e| e.key() == key) {
            // already notified, the stored copy wins
            Some(existing) if existing.notified => {}
            Some(existing) => *existing = event.clone(),
            None => events.push(event.clone()),
        }
        Ok(())
    }

    async fn query_pending_page(
        &self,
        stack_id: &str,
        start_after: Option<EventKey>,
    ) -> Result<PendingPage, StoreError> {
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(StoreError::Query("in-memory store is failing queries".to_string()));
        }
        let events = self.lock()?;

        // Resume right after the start key's slot, which does not move when the
        // key itself gets notified. A deleted start key resumes by key order.
        let resume = start_after
            .as_ref()
            .map(|start| (start, events.iter().position(|e| e.key() == *start)));
        let remaining = match resume {
            Some((_, Some(index))) => &events[index + 1..],
            _ => &events[..],
        };
        let mut pending = remaining.iter().filter(|e| {
            e.stack_id == stack_id
                && !e.notified
                && match resume {
                    Some((start, None)) => e.key() > *start,
                    _ => true,
                }
        });

        let page: Vec<StoredEvent> = pending.by_ref().take(self.page_size).cloned().collect();
        let next = if page.len() == self.page_size {
            page.last().map(|e| e.key())
        } else {
            None
        };

        Ok(PendingPage { events: page, next })
    }

    async fn mark_notified(&self, key: &EventKey) -> Result<(), StoreError> {
        self.check_writes()?;
        let mut events = self.lock()?;
        let event = events
            .iter_mut()
            .find(|e| e.key() == *key)
            .ok_or_else(|| StoreError::ConditionalCheckFailed {
                stack_id: key.stack_id.clone(),
                time: key.time,
            })?;

        if event.notified {
            return Err(StoreError::ConditionalCheckFailed {
                stack_id: key.stack_id.clone(),
                time: key.time,
            });
        }
        event.notified = true;
        event.notified_time = Some(get_epoch());
        Ok(())
    }

    async fn delete_batch(&self, keys: &[EventKey]) -> Result<(), StoreError> {
        self.check_writes()?;
        let mut events = self.lock()?;
        events.retain(|e| !keys.contains(&e.key()));
        Ok(())
    }
}
