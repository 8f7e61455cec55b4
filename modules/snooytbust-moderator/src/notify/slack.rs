use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use snooytbust_common::{ModerationAction, ModerationEvent};

use super::backend::NotifyBackend;

const SLACK_API: &str = "https://slack.com/api";

/// Text of a removal notice, in Slack mrkdwn.
pub fn removal_message(event: &ModerationEvent) -> String {
    let headline = match event.action {
        ModerationAction::Removed => "The following item has been removed.",
        ModerationAction::RemovalFailed => {
            "The following item links a blacklisted channel but could not be removed."
        }
    };
    format!(
        "*Attention:* _{}_\n\
         *Channel Author:* {}\n\
         *Reddit Author:* {}\n\
         *Subreddit:* /r/{}\n\
         *Reddit Link:* {}",
        headline,
        event.publisher.display_name,
        event.item.author,
        event.item.community,
        event.item.permalink,
    )
}

/// Envelope shared by Slack Web API responses. HTTP 200 with `ok: false`
/// is still a failure.
#[derive(Debug, Deserialize)]
struct SlackResponse {
    ok: bool,
    error: Option<String>,
    user: Option<String>,
    user_id: Option<String>,
}

/// Identity returned by `auth.test`.
#[derive(Debug, Clone)]
pub struct SlackIdentity {
    pub user: String,
    pub user_id: String,
}

/// Posts notices with a bot token via `chat.postMessage`.
pub struct SlackBot {
    token: String,
    channel: String,
    /// Set by `auth_test`; messages are then posted as this user.
    user_id: Option<String>,
    http: reqwest::Client,
}

impl SlackBot {
    pub fn new(token: String, channel: String) -> Self {
        Self {
            token,
            channel,
            user_id: None,
            http: reqwest::Client::new(),
        }
    }

    /// Verify the token and remember the bot's user ID. Called once at startup.
    pub async fn auth_test(&mut self) -> anyhow::Result<SlackIdentity> {
        let resp = self.call("auth.test", json!({})).await?;
        let identity = SlackIdentity {
            user: resp.user.unwrap_or_default(),
            user_id: resp.user_id.unwrap_or_default(),
        };
        if !identity.user_id.is_empty() {
            self.user_id = Some(identity.user_id.clone());
        }
        Ok(identity)
    }

    /// Post a message. `as_user` posts under the bot's own identity;
    /// `disable_link_preview` suppresses unfurling of the Reddit link.
    pub async fn post_message(
        &self,
        channel: &str,
        text: &str,
        as_user: bool,
        disable_link_preview: bool,
    ) -> anyhow::Result<()> {
        let payload = self.message_payload(channel, text, as_user, disable_link_preview);
        self.call("chat.postMessage", payload).await?;
        Ok(())
    }

    fn message_payload(
        &self,
        channel: &str,
        text: &str,
        as_user: bool,
        disable_link_preview: bool,
    ) -> serde_json::Value {
        let mut payload = json!({
            "channel": channel,
            "text": text,
            "as_user": as_user,
            "unfurl_links": !disable_link_preview,
            "unfurl_media": !disable_link_preview,
        });
        if let Some(user_id) = &self.user_id {
            payload["user"] = json!(user_id);
        }
        payload
    }

    async fn call(&self, method: &str, payload: serde_json::Value) -> anyhow::Result<SlackResponse> {
        let resp = self
            .http
            .post(format!("{SLACK_API}/{method}"))
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, method, "Slack API returned non-success");
            anyhow::bail!("Slack {method} returned {status}");
        }

        let parsed: SlackResponse = resp.json().await?;
        if !parsed.ok {
            let error = parsed.error.unwrap_or_else(|| "unknown_error".to_string());
            anyhow::bail!("Slack {method} failed: {error}");
        }
        Ok(parsed)
    }
}

#[async_trait]
impl NotifyBackend for SlackBot {
    async fn send(&self, event: &ModerationEvent) -> anyhow::Result<()> {
        let text = removal_message(event);
        self.post_message(&self.channel, &text, true, true).await
    }
}

/// Slack incoming webhook notification backend.
pub struct SlackWebhook {
    webhook_url: String,
    http: reqwest::Client,
}

impl SlackWebhook {
    pub fn new(webhook_url: String) -> Self {
        Self {
            webhook_url,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl NotifyBackend for SlackWebhook {
    async fn send(&self, event: &ModerationEvent) -> anyhow::Result<()> {
        let payload = json!({
            "text": removal_message(event),
            "unfurl_links": false,
            "unfurl_media": false,
        });

        let resp = self
            .http
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!(status = %status, body = %body, "Slack webhook returned non-success");
            anyhow::bail!("Slack webhook returned {status}");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snooytbust_common::{
        BlacklistEntry, DiscussionItem, ItemId, PublisherRecord, VideoId,
    };

    fn event(action: ModerationAction) -> ModerationEvent {
        let item = DiscussionItem {
            id: ItemId::post("abc"),
            author: "alice".into(),
            community: "videos".into(),
            body: "https://youtu.be/dQw4w9WgXcQ".into(),
            permalink: "https://www.reddit.com/r/videos/comments/abc/t/".into(),
        };
        let publisher = PublisherRecord {
            publisher_id: "UC123".into(),
            display_name: "Bad Channel".into(),
        };
        ModerationEvent::new(
            &item,
            &publisher,
            BlacklistEntry { id: 7 },
            &VideoId::new("dQw4w9WgXcQ"),
            action,
        )
    }

    #[test]
    fn message_lists_channel_author_and_link() {
        let text = removal_message(&event(ModerationAction::Removed));
        assert_eq!(
            text,
            "*Attention:* _The following item has been removed._\n\
             *Channel Author:* Bad Channel\n\
             *Reddit Author:* alice\n\
             *Subreddit:* /r/videos\n\
             *Reddit Link:* https://www.reddit.com/r/videos/comments/abc/t/"
        );
    }

    #[test]
    fn failed_removal_message_says_item_is_still_up() {
        let text = removal_message(&event(ModerationAction::RemovalFailed));
        assert!(text.starts_with(
            "*Attention:* _The following item links a blacklisted channel but could not be removed._\n"
        ));
        assert!(text.contains("*Channel Author:* Bad Channel"));
    }

    #[test]
    fn payload_posts_as_authenticated_user() {
        let mut bot = SlackBot::new("xoxb-test".into(), "#mods".into());
        let before = bot.message_payload("#mods", "hi", true, true);
        assert!(before.get("user").is_none());
        assert_eq!(before["unfurl_links"], json!(false));

        bot.user_id = Some("U0BOT".into());
        let after = bot.message_payload("#mods", "hi", true, true);
        assert_eq!(after["user"], json!("U0BOT"));
        assert_eq!(after["as_user"], json!(true));
    }
}
