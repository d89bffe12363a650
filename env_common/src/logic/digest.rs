use env_defs::{DigestLine, DigestPage, EventKey, NotificationTrigger, StoreError, StoredEvent};
use log::info;

use crate::interface::{EventFormatter, EventStore};

/// Pages ready to send, plus the keys of every event they cover.
#[derive(Debug, Clone, PartialEq)]
pub struct Digest {
    pub pages: Vec<DigestPage>,
    pub keys: Vec<EventKey>,
}

/// Ascending by event time. The sort is stable, so events sharing a
/// timestamp keep the order the store returned them in.
pub fn order_events(events: &mut [StoredEvent]) {
    events.sort_by_key(|event| event.time);
}

pub fn paginate(
    lines: Vec<DigestLine>,
    chunk_size: usize,
    trigger: &NotificationTrigger,
) -> Vec<DigestPage> {
    let chunk_size = chunk_size.max(1);
    let total_pages = lines.len().div_ceil(chunk_size);

    lines
        .chunks(chunk_size)
        .enumerate()
        .map(|(i, chunk)| DigestPage {
            lines: chunk.to_vec(),
            page_index: i + 1,
            total_pages,
            stack_id: trigger.stack_id.clone(),
            region: trigger.region.clone(),
            account: trigger.account.clone(),
            trigger_status: trigger.status.clone(),
        })
        .collect()
}

/// Builds the digest for a triggered stack from its pending events.
/// Returns `None` when nothing is pending, e.g. an earlier invocation already
/// flushed the stack.
pub async fn assemble(
    store: &dyn EventStore,
    formatter: &dyn EventFormatter,
    trigger: &NotificationTrigger,
    chunk_size: usize,
) -> Result<Option<Digest>, StoreError> {
    let mut pending = store.query_pending(&trigger.stack_id).await?;
    if pending.is_empty() {
        info!(
            "No pending events for {}, it was already notified",
            trigger.stack_id
        );
        return Ok(None);
    }
    info!(
        "Assembling digest of {} pending events for {}",
        pending.len(),
        trigger.stack_id
    );

    order_events(&mut pending);

    let keys = pending.iter().map(|event| event.key()).collect();
    let lines = pending.iter().map(|event| formatter.render(event)).collect();

    Ok(Some(Digest {
        pages: paginate(lines, chunk_size, trigger),
        keys,
    }))
}
