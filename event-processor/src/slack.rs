use std::time::Duration;

use async_trait::async_trait;
use env_common::{ErrorSink, EventFormatter, NotificationSink};
use env_defs::{DeliveryError, DigestLine, DigestPage, ErrorReport, EventType, StoredEvent};
use env_utils::{
    epoch_to_timestamp, region_from_arn, resource_console_link, stack_console_link,
    stack_name_from_id, template_designer_link,
};
use log::{debug, info};
use reqwest::Client;
use serde_json::{json, Value};

// Slack block kit limits
const MAX_HEADER_LENGTH: usize = 150;
const MAX_FIELD_LENGTH: usize = 2000;
const MAX_FIELDS_PER_SECTION: usize = 10;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const ERROR_COLOR: &str = "#d40e0d";

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    truncated.push('…');
    truncated
}

fn escape_mrkdwn(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Renders stored events as Slack section fields.
pub struct SlackFormatter;

impl EventFormatter for SlackFormatter {
    fn render(&self, event: &StoredEvent) -> DigestLine {
        let note = format!(
            "{} | {}",
            event.event_type.as_str(),
            epoch_to_timestamp(event.time)
        );

        match event.event_type {
            EventType::ResourceChange => {
                let text = format!(
                    "{} | Change : {} | Reason : {} | Resource Type : {} | Resource-logical : {}",
                    note,
                    event.status,
                    event.status_reason,
                    event.resource_type,
                    event.logical_resource_id
                );
                if event.physical_resource_id.is_empty() {
                    return DigestLine::Plain(text);
                }
                // Items read back through a narrow index projection carry no region
                let region = Some(event.region.as_str())
                    .filter(|region| !region.is_empty())
                    .or_else(|| region_from_arn(&event.stack_id));
                let link = region.and_then(|region| {
                    resource_console_link(&event.resource_type, region, &event.physical_resource_id)
                });
                match link {
                    Some(link) => DigestLine::Markdown(format!(
                        "{} | Resource : <{}|{}>",
                        escape_mrkdwn(&text),
                        link,
                        escape_mrkdwn(&event.physical_resource_id)
                    )),
                    None => DigestLine::Plain(format!(
                        "{} | Resource-physical : {}",
                        text, event.physical_resource_id
                    )),
                }
            }
            EventType::StackChange => DigestLine::Plain(format!(
                "{} | Change : {} | Reason : {}",
                note, event.status, event.status_reason
            )),
            EventType::DriftChange => DigestLine::Plain(format!(
                "{} | Drift Status : {} | Detection Status : {}",
                note, event.status, event.detection_status
            )),
            EventType::Unclassified => {
                let detail = serde_json::from_str::<Value>(&event.detail)
                    .and_then(|value| serde_json::to_string_pretty(&value))
                    .unwrap_or_else(|_| event.detail.clone());
                // room for the fences
                let detail = truncate(&escape_mrkdwn(&detail), MAX_FIELD_LENGTH - 6);
                DigestLine::Markdown(format!("```{}```", detail))
            }
        }
    }
}

fn text_object(line: &DigestLine) -> Value {
    match line {
        DigestLine::Plain(text) => json!({
            "type": "plain_text",
            "text": truncate(text, MAX_FIELD_LENGTH),
        }),
        DigestLine::Markdown(text) => json!({
            "type": "mrkdwn",
            "text": truncate(text, MAX_FIELD_LENGTH),
        }),
    }
}

/// Builds the webhook message of one digest page.
pub fn render_page(page: &DigestPage) -> Result<Value, DeliveryError> {
    if page.lines.is_empty() {
        return Err(DeliveryError::Render(format!(
            "page {} of {} has no lines",
            page.label(),
            page.stack_id
        )));
    }

    let title = format!(
        "{} events on {}",
        stack_name_from_id(&page.stack_id),
        page.region
    );
    let divider = json!({ "type": "divider" });

    let mut blocks = vec![
        json!({
            "type": "header",
            "text": {
                "type": "plain_text",
                "text": truncate(&title, MAX_HEADER_LENGTH),
                "emoji": true
            },
        }),
        json!({
            "type": "context",
            "elements": [{
                "type": "mrkdwn",
                "text": format!(
                    "Account *{}* | Status *{}* | Page *{}*",
                    page.account,
                    page.trigger_status,
                    page.label()
                ),
            }],
        }),
        divider.clone(),
    ];

    for fields in page.lines.chunks(MAX_FIELDS_PER_SECTION) {
        blocks.push(json!({
            "type": "section",
            "fields": fields.iter().map(text_object).collect::<Vec<_>>(),
        }));
    }

    blocks.push(divider);
    blocks.push(json!({
        "type": "section",
        "text": {
            "type": "mrkdwn",
            "text": format!(
                "<{}|View Stack in AWS Console>",
                stack_console_link(&page.region, &page.stack_id)
            ),
        },
    }));
    blocks.push(json!({
        "type": "section",
        "text": {
            "type": "mrkdwn",
            "text": format!(
                "<{}|View CloudFormation Template Designer in AWS Console>",
                template_designer_link(&page.region, &page.stack_id)
            ),
        },
    }));

    Ok(json!({
        "text": format!("{} ({})", title, page.label()),
        "blocks": blocks,
        "unfurl_links": false,
        "unfurl_media": false,
    }))
}

pub fn render_error(report: &ErrorReport) -> Value {
    let message = truncate(&escape_mrkdwn(&report.message), MAX_FIELD_LENGTH - 6);
    let mut blocks = vec![json!({
        "type": "section",
        "text": {
            "type": "mrkdwn",
            "text": format!("*{}*\n```{}```", escape_mrkdwn(&report.subject), message)
        },
    })];
    if !report.context.is_null() {
        blocks.push(json!({
            "type": "context",
            "elements": [{
                "type": "plain_text",
                "text": truncate(&report.context.to_string(), MAX_FIELD_LENGTH)
            }],
        }));
    }

    json!({
        "text": report.subject,
        "attachments": [{ "color": ERROR_COLOR, "blocks": blocks }],
    })
}

async fn post_webhook(client: &Client, url: &str, payload: &Value) -> Result<(), DeliveryError> {
    let response = client
        .post(url)
        .json(payload)
        .send()
        .await
        .map_err(|e| DeliveryError::Transport(e.to_string()))?;

    let status = response.status();
    if status.is_success() {
        debug!("Webhook answered {}", status);
        return Ok(());
    }

    let body = response.text().await.unwrap_or_default();
    Err(DeliveryError::Rejected {
        status: status.as_u16(),
        body,
    })
}

fn webhook_client() -> reqwest::Result<Client> {
    Client::builder().timeout(REQUEST_TIMEOUT).build()
}

/// Posts digest pages to a Slack incoming webhook.
pub struct SlackWebhookSink {
    client: Client,
    url: String,
}

impl SlackWebhookSink {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        Ok(SlackWebhookSink {
            client: webhook_client()?,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl NotificationSink for SlackWebhookSink {
    async fn send(&self, page: &DigestPage) -> Result<(), DeliveryError> {
        let message = render_page(page)?;
        post_webhook(&self.client, &self.url, &message).await?;
        info!(
            "Posted digest page {} for {}",
            page.label(),
            stack_name_from_id(&page.stack_id)
        );
        Ok(())
    }
}

/// Posts error reports to a separate Slack webhook.
pub struct SlackErrorSink {
    client: Client,
    url: String,
}

impl SlackErrorSink {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        Ok(SlackErrorSink {
            client: webhook_client()?,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl ErrorSink for SlackErrorSink {
    async fn report(&self, report: &ErrorReport) -> anyhow::Result<()> {
        post_webhook(&self.client, &self.url, &render_error(report)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const STACK_ID: &str = "arn:aws:cloudformation:eu-west-1:111122223333:stack/demo/1a2b";

    fn event(event_type: EventType) -> StoredEvent {
        StoredEvent {
            event_id: "evt-1".to_string(),
            stack_id: STACK_ID.to_string(),
            time: 1617000000000,
            event_type,
            status: "CREATE_FAILED".to_string(),
            status_reason: "Resource creation cancelled".to_string(),
            resource_type: "AWS::SQS::Queue".to_string(),
            logical_resource_id: "Queue".to_string(),
            region: "eu-west-1".to_string(),
            ..Default::default()
        }
    }

    fn page(lines: Vec<DigestLine>) -> DigestPage {
        DigestPage {
            lines,
            page_index: 2,
            total_pages: 3,
            stack_id: STACK_ID.to_string(),
            region: "eu-west-1".to_string(),
            account: "111122223333".to_string(),
            trigger_status: "UPDATE_COMPLETE".to_string(),
        }
    }

    #[test]
    fn test_resource_change_line() {
        assert_eq!(
            SlackFormatter.render(&event(EventType::ResourceChange)),
            DigestLine::Plain(
                "CloudFormation Resource Status Change | 2021-03-29T06:40:00.000Z \
                 | Change : CREATE_FAILED | Reason : Resource creation cancelled \
                 | Resource Type : AWS::SQS::Queue | Resource-logical : Queue"
                    .to_string()
            )
        );
    }

    #[test]
    fn test_resource_change_line_links_known_resources() {
        let mut lambda = event(EventType::ResourceChange);
        lambda.resource_type = "AWS::Lambda::Function".to_string();
        lambda.physical_resource_id = "demo-handler".to_string();

        match SlackFormatter.render(&lambda) {
            DigestLine::Markdown(text) => assert!(text.ends_with(
                "| Resource : <https://eu-west-1.console.aws.amazon.com/lambda/home\
                 ?region=eu-west-1#functions/demo-handler|demo-handler>"
            )),
            other => panic!("expected a markdown line, got {:?}", other),
        }

        let mut queue = event(EventType::ResourceChange);
        let queue_url = "https://sqs.eu-west-1.amazonaws.com/111122223333/q";
        queue.physical_resource_id = queue_url.to_string();
        let expected_suffix = format!("| Resource-physical : {}", queue_url);
        assert!(matches!(
            SlackFormatter.render(&queue),
            DigestLine::Plain(text) if text.ends_with(&expected_suffix)
        ));
    }

    #[test]
    fn test_resource_link_without_stored_region_uses_stack_region() {
        let mut lambda = event(EventType::ResourceChange);
        lambda.region = String::new();
        lambda.resource_type = "AWS::DynamoDB::Table".to_string();
        lambda.physical_resource_id = "stack-events".to_string();

        let line = SlackFormatter.render(&lambda);
        assert!(line.text().ends_with(
            "| Resource : <https://eu-west-1.console.aws.amazon.com/dynamodb/home\
             ?region=eu-west-1#tables:selected=stack-events|stack-events>"
        ));
        assert!(!line.text().contains("https://.console"));

        lambda.stack_id = "demo".to_string();
        assert!(matches!(
            SlackFormatter.render(&lambda),
            DigestLine::Plain(text) if text.ends_with("| Resource-physical : stack-events")
        ));
    }

    #[test]
    fn test_stack_and_drift_lines() {
        let mut stack = event(EventType::StackChange);
        stack.status = "UPDATE_COMPLETE".to_string();
        stack.status_reason = String::new();
        assert_eq!(
            SlackFormatter.render(&stack).text(),
            "CloudFormation Stack Status Change | 2021-03-29T06:40:00.000Z \
             | Change : UPDATE_COMPLETE | Reason : "
        );

        let mut drift = event(EventType::DriftChange);
        drift.status = "DRIFTED".to_string();
        drift.detection_status = "DETECTION_COMPLETE".to_string();
        assert!(SlackFormatter
            .render(&drift)
            .text()
            .ends_with("| Drift Status : DRIFTED | Detection Status : DETECTION_COMPLETE"));
    }

    #[test]
    fn test_unclassified_line_is_code_block() {
        let mut unknown = event(EventType::Unclassified);
        unknown.detail = r#"{"a":"<b>"}"#.to_string();
        assert_eq!(
            SlackFormatter.render(&unknown),
            DigestLine::Markdown("```{\n  \"a\": \"&lt;b&gt;\"\n}```".to_string())
        );

        unknown.detail = "x".repeat(5000);
        assert_eq!(SlackFormatter.render(&unknown).text().chars().count(), MAX_FIELD_LENGTH);
    }

    #[test]
    fn test_render_page_layout() {
        let lines = (0..12)
            .map(|i| DigestLine::Plain(format!("line {}", i)))
            .collect();
        let message = render_page(&page(lines)).unwrap();
        let blocks = message["blocks"].as_array().unwrap();

        assert_eq!(blocks[0]["text"]["text"], "demo events on eu-west-1");
        assert_eq!(
            blocks[1]["elements"][0]["text"],
            "Account *111122223333* | Status *UPDATE_COMPLETE* | Page *2/3*"
        );
        assert_eq!(blocks[3]["fields"].as_array().unwrap().len(), 10);
        assert_eq!(blocks[4]["fields"].as_array().unwrap().len(), 2);
        assert_eq!(blocks[4]["fields"][1]["text"], "line 11");
        assert!(blocks[6]["text"]["text"]
            .as_str()
            .unwrap()
            .contains("cloudformation/home?region=eu-west-1&stackId=arn%3Aaws%3Acloudformation"));
        assert!(blocks[7]["text"]["text"]
            .as_str()
            .unwrap()
            .contains("cloudformation/designer/home"));
        assert_eq!(message["text"], "demo events on eu-west-1 (2/3)");
    }

    #[test]
    fn test_render_empty_page_fails() {
        assert!(matches!(
            render_page(&page(vec![])),
            Err(DeliveryError::Render(_))
        ));
    }

    #[test]
    fn test_render_error() {
        let message = render_error(&ErrorReport {
            subject: "Failed to deliver stack event digest".to_string(),
            message: "status 500".to_string(),
            context: json!({"page": 2}),
        });
        assert_eq!(message["text"], "Failed to deliver stack event digest");
        assert_eq!(message["attachments"][0]["color"], ERROR_COLOR);
        assert_eq!(
            message["attachments"][0]["blocks"][1]["elements"][0]["text"],
            "{\"page\":2}"
        );
    }

    #[tokio::test]
    async fn test_webhook_sink_posts_page() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/services/T/B/X"))
            .and(body_partial_json(json!({"text": "demo events on eu-west-1 (2/3)"})))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let sink = SlackWebhookSink::new(&format!("{}/services/T/B/X", server.uri())).unwrap();
        sink.send(&page(vec![DigestLine::Plain("line".to_string())]))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_webhook_sink_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no_service"))
            .mount(&server)
            .await;

        let sink = SlackWebhookSink::new(&server.uri()).unwrap();
        let err = sink
            .send(&page(vec![DigestLine::Plain("line".to_string())]))
            .await
            .unwrap_err();
        match err {
            DeliveryError::Rejected { status, body } => {
                assert_eq!(status, 404);
                assert_eq!(body, "no_service");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_error_sink_surfaces_failures() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let sink = SlackErrorSink::new(&server.uri()).unwrap();
        let result = sink
            .report(&ErrorReport {
                subject: "s".to_string(),
                message: "m".to_string(),
                context: Value::Null,
            })
            .await;
        assert!(result.unwrap_err().to_string().contains("500"));
    }
}
