use async_trait::async_trait;
use aws_sdk_sns::error::DisplayErrorContext;
use env_common::ErrorSink;
use env_defs::ErrorReport;
use log::info;
use serde_json::Value;

const MAX_SUBJECT_LENGTH: usize = 99;

/// Publishes error reports to an SNS topic.
pub struct SnsErrorSink {
    client: aws_sdk_sns::Client,
    topic_arn: String,
}

impl SnsErrorSink {
    pub fn new(client: aws_sdk_sns::Client, topic_arn: &str) -> Self {
        SnsErrorSink {
            client,
            topic_arn: topic_arn.to_string(),
        }
    }
}

// SNS subjects must be a single line of printable ASCII under 100 characters
fn sns_subject(subject: &str) -> String {
    subject
        .chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { ' ' })
        .take(MAX_SUBJECT_LENGTH)
        .collect::<String>()
        .trim()
        .to_string()
}

fn sns_message(report: &ErrorReport) -> String {
    match &report.context {
        Value::Null => report.message.clone(),
        Value::Object(map) if map.is_empty() => report.message.clone(),
        context => format!("{}\n\nContext: {}", report.message, context),
    }
}

#[async_trait]
impl ErrorSink for SnsErrorSink {
    async fn report(&self, report: &ErrorReport) -> anyhow::Result<()> {
        let result = self
            .client
            .publish()
            .topic_arn(&self.topic_arn)
            .subject(sns_subject(&report.subject))
            .message(sns_message(report))
            .send()
            .await
            .map_err(|e| {
                anyhow::anyhow!(
                    "Failed to publish to {}: {}",
                    self.topic_arn,
                    DisplayErrorContext(&e)
                )
            })?;

        info!(
            "Published '{}' to {} (message id {})",
            report.subject,
            self.topic_arn,
            result.message_id().unwrap_or("")
        );
        Ok(())
    }
}
