use serde::{Deserialize, Serialize};

use crate::EventType;

/// Signal that a stack's pending events are ready to be digested.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct NotificationTrigger {
    pub stack_id: String,
    pub region: String,
    pub account: String,
    pub status: String,
    pub event_type: EventType,
}

/// One rendered line of a digest page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DigestLine {
    Plain(String),
    Markdown(String),
}

impl DigestLine {
    pub fn text(&self) -> &str {
        match self {
            DigestLine::Plain(text) | DigestLine::Markdown(text) => text,
        }
    }
}

/// A single message of a digest. `page_index` is 1-based.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DigestPage {
    pub lines: Vec<DigestLine>,
    pub page_index: usize,
    pub total_pages: usize,
    pub stack_id: String,
    pub region: String,
    pub account: String,
    pub trigger_status: String,
}

impl DigestPage {
    pub fn label(&self) -> String {
        format!("{}/{}", self.page_index, self.total_pages)
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct ErrorReport {
    pub subject: String, // Short summary, used as the SNS subject
    pub message: String,
    pub context: serde_json::Value,
}
