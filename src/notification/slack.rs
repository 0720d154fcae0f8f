//! Slack incoming-webhook notifier.

use std::collections::HashMap;

use async_trait::async_trait;

use super::{NotificationError, Notifier};
use crate::config::{NotificationConfig, SlackConfig};
use crate::engine::router::{EventRouter, Route};
use crate::models::{SourceKind, WatchEvent};

fn source_icon(source: SourceKind) -> &'static str {
    match source {
        SourceKind::Github => "\u{1F419}",       // octopus
        SourceKind::Huggingface => "\u{1F917}",  // hugging face
        SourceKind::Modelscope => "\u{1F4E6}",   // package
        SourceKind::Arxiv => "\u{1F4C4}",        // page
        SourceKind::News => "\u{1F4F0}",         // newspaper
        SourceKind::Leaderboard => "\u{1F3C6}",  // trophy
    }
}

/// Delivers events to Slack incoming webhooks. The route's channel name is
/// resolved through the configured channel map; unknown names fall back to
/// the default webhook.
pub struct SlackNotifier {
    default_webhook: String,
    channels: HashMap<String, String>,
    include_icons: bool,
    include_timestamp: bool,
    client: reqwest::Client,
}

impl SlackNotifier {
    /// Creates a notifier from the Slack and notification settings.
    pub fn new(
        slack: &SlackConfig,
        notifications: &NotificationConfig,
        client: reqwest::Client,
    ) -> Self {
        Self {
            default_webhook: slack.webhook_url.clone(),
            channels: slack.channels.clone(),
            include_icons: notifications.include_icons,
            include_timestamp: notifications.include_timestamp,
            client,
        }
    }

    fn webhook_for(&self, channel: &str) -> Result<&str, NotificationError> {
        if let Some(url) = self.channels.get(channel) {
            return Ok(url);
        }
        if channel != EventRouter::DEFAULT_CHANNEL {
            tracing::warn!(channel, "No webhook for channel, falling back to default.");
        }
        if self.default_webhook.is_empty() {
            return Err(NotificationError::MissingWebhook(channel.to_string()));
        }
        Ok(&self.default_webhook)
    }

    fn format_message(&self, event: &WatchEvent, route: &Route) -> String {
        let mut text = String::new();
        if route.mention {
            text.push_str("<!channel> ");
        }
        if self.include_icons {
            text.push_str(source_icon(event.source));
            text.push(' ');
        }
        text.push_str(&format!("*{}*\n{}\n{}", event.item.title, event.item.description, event.item.url));
        text.push_str(&format!("\n_{} \u{00B7} {}_", event.entity, event.source));
        if self.include_timestamp {
            text.push_str(&format!(
                "\n_detected {}_",
                event.detected_at.format("%Y-%m-%d %H:%M UTC")
            ));
        }
        text
    }

    async fn post(&self, webhook: &str, text: &str) -> Result<(), NotificationError> {
        let response = self
            .client
            .post(webhook)
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotificationError::Rejected { status });
        }
        Ok(())
    }

    /// Posts a short message to the default webhook to verify connectivity.
    pub async fn test_connection(&self) -> Result<(), NotificationError> {
        let webhook = self.webhook_for(EventRouter::DEFAULT_CHANNEL)?;
        self.post(webhook, "modelwatch connectivity test").await
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    #[tracing::instrument(
        skip(self, event, route),
        fields(kind = %event.kind, entity = %event.entity, channel = %route.channel),
        level = "debug"
    )]
    async fn deliver(&self, event: &WatchEvent, route: &Route) -> Result<(), NotificationError> {
        let webhook = self.webhook_for(&route.channel)?;
        let text = self.format_message(event, route);
        self.post(webhook, &text).await?;
        tracing::info!(kind = %event.kind, entity = %event.entity, "Notification delivered.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::EventKind;
    use crate::test_helpers::ItemBuilder;

    fn event() -> WatchEvent {
        WatchEvent {
            kind: EventKind::NewRelease,
            entity: "Z-Image".to_string(),
            entity_key: "github:Z-Image".to_string(),
            source: SourceKind::Github,
            item: ItemBuilder::new("release:1").title("Release: v1.0").build(),
            detected_at: Utc::now(),
        }
    }

    fn notifier(default_webhook: String, channels: HashMap<String, String>) -> SlackNotifier {
        SlackNotifier::new(
            &SlackConfig { webhook_url: default_webhook, channels },
            &NotificationConfig::default(),
            reqwest::Client::new(),
        )
    }

    #[tokio::test]
    async fn delivers_with_mention_prefix_to_named_channel() {
        let mut server = mockito::Server::new_async().await;
        let hook = server
            .mock("POST", "/releases")
            .match_body(mockito::Matcher::AllOf(vec![
                mockito::Matcher::PartialJsonString(r#"{}"#.to_string()),
                mockito::Matcher::Regex("<!channel>".to_string()),
            ]))
            .with_status(200)
            .create_async()
            .await;

        let notifier = notifier(
            String::new(),
            [("releases".to_string(), format!("{}/releases", server.url()))]
                .into_iter()
                .collect(),
        );
        let route = Route { channel: "releases".to_string(), mention: true };

        notifier.deliver(&event(), &route).await.unwrap();
        hook.assert_async().await;
    }

    #[tokio::test]
    async fn unknown_channel_falls_back_to_default_webhook() {
        let mut server = mockito::Server::new_async().await;
        let hook = server.mock("POST", "/default").with_status(200).create_async().await;

        let notifier = notifier(format!("{}/default", server.url()), HashMap::new());
        let route = Route { channel: "missing".to_string(), mention: false };

        notifier.deliver(&event(), &route).await.unwrap();
        hook.assert_async().await;
    }

    #[tokio::test]
    async fn no_webhook_at_all_is_an_error() {
        let notifier = notifier(String::new(), HashMap::new());
        let route = Route { channel: "default".to_string(), mention: false };

        let err = notifier.deliver(&event(), &route).await.unwrap_err();
        assert!(matches!(err, NotificationError::MissingWebhook(_)));
    }

    #[tokio::test]
    async fn rejected_webhook_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server.mock("POST", "/default").with_status(500).create_async().await;

        let notifier = notifier(format!("{}/default", server.url()), HashMap::new());
        let route = Route { channel: "default".to_string(), mention: false };

        let err = notifier.deliver(&event(), &route).await.unwrap_err();
        assert!(matches!(err, NotificationError::Rejected { .. }));
    }

    #[test]
    fn message_includes_title_url_and_entity() {
        let notifier = notifier("https://example.invalid".to_string(), HashMap::new());
        let route = Route { channel: "default".to_string(), mention: false };
        let text = notifier.format_message(&event(), &route);

        assert!(text.contains("*Release: v1.0*"));
        assert!(text.contains("https://example.com/release:1"));
        assert!(text.contains("Z-Image"));
        assert!(!text.contains("<!channel>"));
    }
}
