use anyhow::{anyhow, Context, Result};
use env_common::{
    CloseOutPolicy, ForwarderConfig, TriggerRules, DEFAULT_CHUNK_SIZE,
    DEFAULT_DRIFT_STATUS_PATTERN, DEFAULT_STACK_STATUS_PATTERN,
};

pub const DEFAULT_PENDING_INDEX: &str = "LSI_NOTIFIED";
pub const DEFAULT_QUERY_PAGING_LIMIT: i32 = 10;

/// Settings of the stack event processor, read once per cold start.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessorConfig {
    pub table_name: String,
    pub pending_index: String,
    pub query_paging_limit: i32,
    pub chunk_size: usize,
    pub close_out: CloseOutPolicy,
    pub stack_status_pattern: String,
    pub drift_status_pattern: String,
    pub slack_hook: String,
    pub error_slack_hook: Option<String>,
    pub error_topic_arn: Option<String>,
    pub region: Option<String>,
}

/// Settings of the dead-letter forwarder.
#[derive(Debug, Clone, PartialEq)]
pub struct DeadLetterConfig {
    pub topic_arn: String,
    pub region: Option<String>,
}

fn first_set(lookup: &impl Fn(&str) -> Option<String>, names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| lookup(name))
        .find(|value| !value.trim().is_empty())
}

fn required(lookup: &impl Fn(&str) -> Option<String>, names: &[&str]) -> Result<String> {
    first_set(lookup, names)
        .ok_or_else(|| anyhow!("Environment variable {} not found", names.join(" or ")))
}

fn positive_number<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr + PartialOrd + Default,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = match first_set(lookup, &[name]) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{} must be a positive number, got '{}'", name, raw))?,
        None => return Ok(default),
    };
    if value <= T::default() {
        return Err(anyhow!("{} must be a positive number", name));
    }
    Ok(value)
}

impl ProcessorConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let close_out = match first_set(&lookup, &["DELETE_NOTIFIED"]) {
            Some(value) if value.trim().eq_ignore_ascii_case("true") => CloseOutPolicy::Delete,
            _ => CloseOutPolicy::MarkNotified,
        };

        let config = ProcessorConfig {
            table_name: required(&lookup, &["EVENT_STORE", "DYNAMODB_EVENTS_TABLE_NAME"])?,
            pending_index: first_set(&lookup, &["EVENT_STORE_PENDING_INDEX"])
                .unwrap_or_else(|| DEFAULT_PENDING_INDEX.to_string()),
            query_paging_limit: positive_number(
                &lookup,
                "DYNAMODB_QUERY_PAGING_LIMIT",
                DEFAULT_QUERY_PAGING_LIMIT,
            )?,
            chunk_size: positive_number(&lookup, "PER_POST_EVENT_COUNT", DEFAULT_CHUNK_SIZE)?,
            close_out,
            stack_status_pattern: first_set(&lookup, &["TERMINAL_STACK_STATUS_PATTERN"])
                .unwrap_or_else(|| DEFAULT_STACK_STATUS_PATTERN.to_string()),
            drift_status_pattern: first_set(&lookup, &["DRIFT_STATUS_PATTERN"])
                .unwrap_or_else(|| DEFAULT_DRIFT_STATUS_PATTERN.to_string()),
            slack_hook: required(&lookup, &["SLACK_HOOK"])?,
            error_slack_hook: first_set(&lookup, &["ERROR_SLACK_HOOK"]),
            error_topic_arn: first_set(&lookup, &["ERROR_TOPIC_ARN", "TOPIC_ARN"]),
            region: first_set(&lookup, &["AWS_REGION"]),
        };

        // Surface bad patterns at startup rather than on the first batch
        config.forwarder_config()?;
        Ok(config)
    }

    pub fn forwarder_config(&self) -> Result<ForwarderConfig> {
        let trigger_rules =
            TriggerRules::new(&self.stack_status_pattern, &self.drift_status_pattern)
                .context("Invalid trigger status pattern")?;

        Ok(ForwarderConfig {
            chunk_size: self.chunk_size,
            close_out: self.close_out,
            trigger_rules,
        })
    }
}

impl DeadLetterConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(DeadLetterConfig {
            topic_arn: required(&lookup, &["ERROR_TOPIC_ARN", "TOPIC_ARN"])?,
            region: first_set(&lookup, &["AWS_REGION"]),
        })
    }
}
