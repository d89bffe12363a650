use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::{AttributeValue, DeleteRequest, Select, WriteRequest};
use env_common::{EventStore, PendingPage};
use env_defs::{EventKey, StoreError, StoredEvent, NOTIFIED_FALSE, NOTIFIED_TRUE};
use env_utils::get_epoch;
use log::{debug, info};
use serde_dynamo::{from_item, to_item};

/// Max number of requests in a single BatchWriteItem call
pub const BATCH_WRITE_LIMIT: usize = 25;

type Item = HashMap<String, AttributeValue>;

/// Event store backed by a DynamoDB table keyed on `stackId` (S) and `time` (N),
/// with a local secondary index sorting on `notified` to fetch pending events.
pub struct DynamoEventStore {
    client: aws_sdk_dynamodb::Client,
    table_name: String,
    pending_index: String,
    page_limit: i32,
}

impl DynamoEventStore {
    pub fn new(
        client: aws_sdk_dynamodb::Client,
        table_name: &str,
        pending_index: &str,
        page_limit: i32,
    ) -> Self {
        DynamoEventStore {
            client,
            table_name: table_name.to_string(),
            pending_index: pending_index.to_string(),
            page_limit,
        }
    }
}

fn key_attributes(key: &EventKey) -> Item {
    HashMap::from([
        ("stackId".to_string(), AttributeValue::S(key.stack_id.clone())),
        ("time".to_string(), AttributeValue::N(key.time.to_string())),
    ])
}

// Resuming a query on the index needs the index sort key in the start key too.
fn resume_key(key: &EventKey) -> Item {
    let mut item = key_attributes(key);
    item.insert(
        "notified".to_string(),
        AttributeValue::S(NOTIFIED_FALSE.to_string()),
    );
    item
}

fn next_key(last_evaluated_key: Option<&Item>) -> Result<Option<EventKey>, StoreError> {
    match last_evaluated_key {
        Some(key) if !key.is_empty() => from_item(key.clone())
            .map(Some)
            .map_err(|e| StoreError::Serialization(e.to_string())),
        _ => Ok(None),
    }
}

#[async_trait]
impl EventStore for DynamoEventStore {
    async fn put(&self, event: &StoredEvent) -> Result<(), StoreError> {
        let item: Item = to_item(event).map_err(|e| StoreError::Serialization(e.to_string()))?;

        // A redelivered envelope must not reopen an event that was already notified
        let result = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(#si) OR #ny = :n")
            .expression_attribute_names("#si", "stackId")
            .expression_attribute_names("#ny", "notified")
            .expression_attribute_values(":n", AttributeValue::S(NOTIFIED_FALSE.to_string()))
            .send()
            .await;

        match result {
            Ok(_) => {
                debug!("DynamoDB put_item completed for {}@{}", event.stack_id, event.time);
                Ok(())
            }
            Err(e) => match e.as_service_error() {
                Some(service_err) if service_err.is_conditional_check_failed_exception() => {
                    info!(
                        "Event {}@{} was already notified, keeping the stored copy",
                        event.stack_id, event.time
                    );
                    Ok(())
                }
                _ => Err(StoreError::Write(DisplayErrorContext(&e).to_string())),
            },
        }
    }

    async fn query_pending_page(
        &self,
        stack_id: &str,
        start_after: Option<EventKey>,
    ) -> Result<PendingPage, StoreError> {
        let mut query = self
            .client
            .query()
            .table_name(&self.table_name)
            .index_name(&self.pending_index)
            // Events stored earlier in the same invocation must be visible, and
            // attributes missing from the index projection are fetched from the table
            .consistent_read(true)
            .select(Select::AllAttributes)
            .key_condition_expression("#si = :s and #ny = :n")
            .expression_attribute_names("#si", "stackId")
            .expression_attribute_names("#ny", "notified")
            .expression_attribute_values(":s", AttributeValue::S(stack_id.to_string()))
            .expression_attribute_values(":n", AttributeValue::S(NOTIFIED_FALSE.to_string()))
            .limit(self.page_limit);

        if let Some(key) = start_after.as_ref() {
            query = query.set_exclusive_start_key(Some(resume_key(key)));
        }

        let output = query.send().await.map_err(|e| {
            log::error!("DynamoDB query failed: {}", DisplayErrorContext(&e));
            StoreError::Query(DisplayErrorContext(&e).to_string())
        })?;

        let events = output
            .items()
            .iter()
            .map(|item| from_item(item.clone()))
            .collect::<Result<Vec<StoredEvent>, _>>()
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        Ok(PendingPage {
            events,
            next: next_key(output.last_evaluated_key())?,
        })
    }

    async fn mark_notified(&self, key: &EventKey) -> Result<(), StoreError> {
        let result = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .set_key(Some(key_attributes(key)))
            .update_expression("SET #ny = :new, #nyt = :time")
            .condition_expression("#ny = :old")
            .expression_attribute_names("#ny", "notified")
            .expression_attribute_names("#nyt", "notifiedTime")
            .expression_attribute_values(":new", AttributeValue::S(NOTIFIED_TRUE.to_string()))
            .expression_attribute_values(":old", AttributeValue::S(NOTIFIED_FALSE.to_string()))
            .expression_attribute_values(":time", AttributeValue::N(get_epoch().to_string()))
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => match e.as_service_error() {
                Some(service_err) if service_err.is_conditional_check_failed_exception() => {
                    Err(StoreError::ConditionalCheckFailed {
                        stack_id: key.stack_id.clone(),
                        time: key.time,
                    })
                }
                _ => Err(StoreError::Write(DisplayErrorContext(&e).to_string())),
            },
        }
    }

    async fn delete_batch(&self, keys: &[EventKey]) -> Result<(), StoreError> {
        for chunk in keys.chunks(BATCH_WRITE_LIMIT) {
            let requests = chunk
                .iter()
                .map(|key| {
                    DeleteRequest::builder()
                        .set_key(Some(key_attributes(key)))
                        .build()
                        .map(|delete| WriteRequest::builder().delete_request(delete).build())
                        .map_err(|e| StoreError::Write(e.to_string()))
                })
                .collect::<Result<Vec<_>, _>>()?;

            let output = self
                .client
                .batch_write_item()
                .request_items(&self.table_name, requests)
                .send()
                .await
                .map_err(|e| StoreError::Write(DisplayErrorContext(&e).to_string()))?;

            let unprocessed = output
                .unprocessed_items()
                .and_then(|items| items.get(&self.table_name))
                .map(|requests| requests.len())
                .unwrap_or(0);
            if unprocessed > 0 {
                return Err(StoreError::Write(format!(
                    "{} of {} deletes were not processed",
                    unprocessed,
                    chunk.len()
                )));
            }
            info!("Deleted {} events from {}", chunk.len(), self.table_name);
        }
        Ok(())
    }
}
