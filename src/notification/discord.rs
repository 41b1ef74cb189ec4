//! Discord alert delivery over the REST API.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, Jitter, RetryTransientMiddleware};
use serde_json::json;

use super::{AlertSink, NotificationError};
use crate::{
    config::{DiscordConfig, HttpRetryConfig, JitterSetting},
    models::Incident,
};

const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// Builds the client alerts are delivered with. Transient failures on the
/// Discord REST API (rate limits, resets mid-handshake) are retried with
/// exponential backoff under the configured policy, so a flapping network
/// does not silently eat an incident notification.
fn alert_client(retry: &HttpRetryConfig) -> ClientWithMiddleware {
    let jitter = match retry.jitter {
        JitterSetting::None => Jitter::None,
        JitterSetting::Full => Jitter::Full,
    };
    let policy = ExponentialBackoff::builder()
        .jitter(jitter)
        .base(retry.base_for_backoff)
        .retry_bounds(retry.initial_backoff, retry.max_backoff)
        .build_with_max_retries(retry.max_retries);

    ClientBuilder::new(reqwest::Client::new())
        .with(RetryTransientMiddleware::new_with_policy(policy))
        .build()
}

/// Posts incident transitions to a Discord channel using a bot token.
///
/// An empty `alert_channel_id` turns every post into a no-op, matching the
/// degrade-silently rule for missing optional integration config.
pub struct DiscordAlerter {
    api_base: String,
    channel_id: String,
    mention: String,
    bot_token: String,
    client: ClientWithMiddleware,
}

impl DiscordAlerter {
    /// Creates an alerter from the Discord section of the configuration.
    pub fn new(discord: &DiscordConfig, retry: &HttpRetryConfig) -> Self {
        Self {
            api_base: DISCORD_API_BASE.to_string(),
            channel_id: discord.alert_channel_id.clone(),
            mention: discord.mention.clone(),
            bot_token: discord.bot_token.clone(),
            client: alert_client(retry),
        }
    }

    /// Points the alerter at a different API base. Test aid.
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    async fn post_message(&self, content: &str) -> Result<(), NotificationError> {
        let url = format!("{}/channels/{}/messages", self.api_base, self.channel_id);
        let mut headers = HeaderMap::new();
        let token = HeaderValue::from_str(&format!("Bot {}", self.bot_token))
            .map_err(|e| NotificationError::ConfigError(format!("Invalid bot token: {e}")))?;
        headers.insert(AUTHORIZATION, token);

        let response = self
            .client
            .post(&url)
            .headers(headers)
            .json(&json!({ "content": content }))
            .send()
            .await
            .map_err(|e| NotificationError::NotifyFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotificationError::NotifyFailed(format!(
                "Discord returned status {}",
                response.status()
            )));
        }
        Ok(())
    }

    fn open_message(&self, incident: &Incident) -> String {
        let prefix =
            if self.mention.is_empty() { String::new() } else { format!("{} ", self.mention) };
        format!(
            "{prefix}**🚨 Incident opened**\n**{}** / {}\nSeverity: {}\n{}\nStarted: {}",
            incident.entity_kind,
            incident.entity_name,
            incident.severity,
            incident.summary,
            incident.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
        )
    }

    fn close_message(&self, incident: &Incident) -> String {
        let ended = incident
            .ended_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_default();
        format!(
            "**✅ Incident closed**\n**{}** / {}\n{}\nEnded: {}",
            incident.entity_kind, incident.entity_name, incident.summary, ended,
        )
    }
}

#[async_trait]
impl AlertSink for DiscordAlerter {
    async fn incident_opened(&self, incident: &Incident) -> Result<(), NotificationError> {
        if self.channel_id.is_empty() {
            return Ok(());
        }
        self.post_message(&self.open_message(incident)).await?;
        tracing::info!(entity = %incident.entity_name, incident_id = incident.id, "Alert posted for opened incident.");
        Ok(())
    }

    async fn incident_closed(&self, incident: &Incident) -> Result<(), NotificationError> {
        if self.channel_id.is_empty() {
            return Ok(());
        }
        self.post_message(&self.close_message(incident)).await?;
        tracing::info!(entity = %incident.entity_name, incident_id = incident.id, "Alert posted for closed incident.");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use mockito::Matcher;

    use super::*;
    use crate::models::{EntityKind, IncidentState, Severity};

    fn sample_incident() -> Incident {
        Incident {
            id: 7,
            entity_kind: EntityKind::Rpc,
            entity_name: "aptoslabs".into(),
            entity_url: "https://fullnode.mainnet.aptoslabs.com".into(),
            state: IncidentState::Open,
            severity: Severity::Crit,
            summary: "RPC unreachable or failing (consecutive failures).".into(),
            started_at: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
            ended_at: None,
            created_at: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        }
    }

    fn alerter(api_base: &str, channel_id: &str, mention: &str) -> DiscordAlerter {
        let discord = DiscordConfig {
            enabled: true,
            bot_token: "token".into(),
            alert_channel_id: channel_id.into(),
            mention: mention.into(),
            ..DiscordConfig::default()
        };
        DiscordAlerter::new(&discord, &HttpRetryConfig::default()).with_api_base(api_base)
    }

    #[tokio::test]
    async fn posts_open_alert_to_channel() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/channels/123/messages")
            .match_header("authorization", "Bot token")
            .match_body(Matcher::PartialJsonString(
                r#"{"content": "@here **🚨 Incident opened**\n**rpc** / aptoslabs\nSeverity: CRIT\nRPC unreachable or failing (consecutive failures).\nStarted: 2024-06-01 12:00:00 UTC"}"#.into(),
            ))
            .with_status(200)
            .create_async()
            .await;

        let alerter = alerter(&server.url(), "123", "@here");
        alerter.incident_opened(&sample_incident()).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn posts_close_alert_with_end_time() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/channels/123/messages")
            .match_body(Matcher::Regex("Incident closed".into()))
            .with_status(200)
            .create_async()
            .await;

        let mut incident = sample_incident();
        incident.state = IncidentState::Closed;
        incident.ended_at = Some(Utc.with_ymd_and_hms(2024, 6, 1, 13, 0, 0).unwrap());
        incident.summary = "RPC recovered after consecutive successes.".into();

        let alerter = alerter(&server.url(), "123", "");
        alerter.incident_closed(&incident).await.unwrap();

        mock.assert_async().await;
    }

    #[test]
    fn alert_client_builds_for_each_jitter_setting() {
        for jitter in [JitterSetting::Full, JitterSetting::None] {
            let retry = HttpRetryConfig { jitter, ..HttpRetryConfig::default() };
            let _ = alert_client(&retry);
        }
    }

    #[tokio::test]
    async fn empty_channel_is_a_no_op() {
        let server = mockito::Server::new_async().await;
        let alerter = alerter(&server.url(), "", "");

        // No mock is registered; a request would fail the test via the error.
        alerter.incident_opened(&sample_incident()).await.unwrap();
    }

    #[tokio::test]
    async fn surfaces_error_status() {
        let mut server = mockito::Server::new_async().await;
        server.mock("POST", "/channels/123/messages").with_status(403).create_async().await;

        let alerter = alerter(&server.url(), "123", "");
        let err = alerter.incident_opened(&sample_incident()).await.unwrap_err();
        assert!(matches!(err, NotificationError::NotifyFailed(_)));
    }
}
