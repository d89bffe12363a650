use env_defs::{EventType, NotificationTrigger, StoredEvent};
use log::{debug, info};
use regex::Regex;

pub const DEFAULT_STACK_STATUS_PATTERN: &str =
    r"^((CREATE|UPDATE|DELETE)_COMPLETE|UPDATE_ROLLBACK_COMPLETE)$";
pub const DEFAULT_DRIFT_STATUS_PATTERN: &str = r"^(DRIFTED|IN_SYNC)$";

/// Which statuses mean a stack's event stream is ready to be summarized.
#[derive(Debug, Clone)]
pub struct TriggerRules {
    stack_status: Regex,
    drift_status: Regex,
}

impl TriggerRules {
    pub fn new(
        stack_status_pattern: &str,
        drift_status_pattern: &str,
    ) -> Result<Self, regex::Error> {
        Ok(TriggerRules {
            stack_status: Regex::new(stack_status_pattern)?,
            drift_status: Regex::new(drift_status_pattern)?,
        })
    }

    pub fn is_notable(&self, event: &StoredEvent) -> bool {
        match event.event_type {
            EventType::StackChange => self.stack_status.is_match(&event.status),
            EventType::DriftChange => self.drift_status.is_match(&event.status),
            EventType::ResourceChange | EventType::Unclassified => false,
        }
    }
}

impl Default for TriggerRules {
    fn default() -> Self {
        TriggerRules::new(DEFAULT_STACK_STATUS_PATTERN, DEFAULT_DRIFT_STATUS_PATTERN)
            .expect("default trigger patterns are valid regexes")
    }
}

fn to_trigger(event: &StoredEvent) -> NotificationTrigger {
    NotificationTrigger {
        stack_id: event.stack_id.clone(),
        region: event.region.clone(),
        account: event.account.clone(),
        status: event.status.clone(),
        event_type: event.event_type,
    }
}

/// Last notable event of the batch, in processing order.
pub fn detect(rules: &TriggerRules, batch: &[StoredEvent]) -> Option<NotificationTrigger> {
    batch
        .iter()
        .rev()
        .find(|event| rules.is_notable(event))
        .map(to_trigger)
}

/// One trigger per stack with a notable event in the batch. Within a stack the
/// last notable event wins; stacks keep the order of their first appearance.
pub fn detect_all(rules: &TriggerRules, batch: &[StoredEvent]) -> Vec<NotificationTrigger> {
    let mut triggers: Vec<NotificationTrigger> = Vec::new();

    for event in batch.iter().filter(|event| rules.is_notable(event)) {
        info!(
            "Notifiable event found in batch: {} {} ({})",
            event.stack_id,
            event.status,
            event.event_type.as_str()
        );
        let trigger = to_trigger(event);
        match triggers.iter_mut().find(|t| t.stack_id == trigger.stack_id) {
            Some(existing) => *existing = trigger,
            None => triggers.push(trigger),
        }
    }

    if triggers.is_empty() {
        debug!("No stack reached a notable status in a batch of {}", batch.len());
    }
    triggers
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn event(stack_id: &str, event_type: EventType, status: &str) -> StoredEvent {
        StoredEvent {
            stack_id: stack_id.to_string(),
            event_type,
            status: status.to_string(),
            region: "eu-west-1".to_string(),
            account: "111122223333".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_trigger_detection_matrix() {
        let rules = TriggerRules::default();
        let cases = [
            (EventType::StackChange, "UPDATE_COMPLETE", true),
            (EventType::StackChange, "CREATE_COMPLETE", true),
            (EventType::StackChange, "DELETE_COMPLETE", true),
            (EventType::StackChange, "UPDATE_ROLLBACK_COMPLETE", true),
            (EventType::StackChange, "UPDATE_IN_PROGRESS", false),
            (EventType::StackChange, "UPDATE_COMPLETE_CLEANUP_IN_PROGRESS", false),
            (EventType::StackChange, "ROLLBACK_COMPLETE", false),
            (EventType::DriftChange, "DRIFTED", true),
            (EventType::DriftChange, "IN_SYNC", true),
            (EventType::DriftChange, "DETECTION_IN_PROGRESS", false),
            (EventType::ResourceChange, "UPDATE_COMPLETE", false),
            (EventType::Unclassified, "DRIFTED", false),
        ];

        for (event_type, status, expected) in cases {
            let batch = vec![event("stack", event_type, status)];
            assert_eq!(
                detect(&rules, &batch).is_some(),
                expected,
                "{:?} {}",
                event_type,
                status
            );
        }
    }

    #[test]
    fn test_detect_keeps_last_notable_event() {
        let rules = TriggerRules::default();
        let batch = vec![
            event("stack-a", EventType::StackChange, "CREATE_COMPLETE"),
            event("stack-a", EventType::ResourceChange, "UPDATE_COMPLETE"),
            event("stack-b", EventType::DriftChange, "IN_SYNC"),
        ];

        let trigger = detect(&rules, &batch).unwrap();
        assert_eq!(trigger.stack_id, "stack-b");
        assert_eq!(trigger.status, "IN_SYNC");
        assert_eq!(trigger.event_type, EventType::DriftChange);
    }

    #[test]
    fn test_detect_all_returns_one_trigger_per_stack() {
        let rules = TriggerRules::default();
        let batch = vec![
            event("stack-a", EventType::StackChange, "UPDATE_COMPLETE"),
            event("stack-b", EventType::StackChange, "CREATE_COMPLETE"),
            event("stack-a", EventType::DriftChange, "DRIFTED"),
            event("stack-c", EventType::StackChange, "CREATE_IN_PROGRESS"),
        ];

        let triggers = detect_all(&rules, &batch);
        let summary: Vec<(&str, &str)> = triggers
            .iter()
            .map(|t| (t.stack_id.as_str(), t.status.as_str()))
            .collect();
        assert_eq!(summary, vec![("stack-a", "DRIFTED"), ("stack-b", "CREATE_COMPLETE")]);
    }

    #[test]
    fn test_custom_rules() {
        let rules = TriggerRules::new(r"^ROLLBACK_COMPLETE$", r"^DRIFTED$").unwrap();
        assert!(rules.is_notable(&event("s", EventType::StackChange, "ROLLBACK_COMPLETE")));
        assert!(!rules.is_notable(&event("s", EventType::StackChange, "CREATE_COMPLETE")));
        assert!(!rules.is_notable(&event("s", EventType::DriftChange, "IN_SYNC")));
        assert!(TriggerRules::new("(", DEFAULT_DRIFT_STATUS_PATTERN).is_err());
    }
}
