//! One-time codes read from a MailDev-compatible mailbox over HTTP.

use crate::core::config::ChannelConfig;
use crate::core::{ChannelKind, MessageChannel};
use crate::errors::{Result, ScenarioError, StepError};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MailMessage {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub subject: String,
    /// Plain-text body
    #[serde(default)]
    pub text: String,
}

pub struct MailboxChannel {
    client: reqwest::Client,
    config: ChannelConfig,
    pattern: Option<Regex>,
}

impl MailboxChannel {
    pub fn new(config: ChannelConfig) -> Result<Self> {
        let pattern = config
            .code_pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|e| ScenarioError::Config(format!("channel.code_pattern: {}", e)))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms.max(1)))
            .build()?;

        Ok(Self {
            client,
            config,
            pattern,
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/email", self.config.base_url.trim_end_matches('/'))
    }

    async fn fetch_messages(&self) -> Result<Vec<MailMessage>> {
        let response = self.client.get(self.messages_url()).send().await?;

        if !response.status().is_success() {
            return Err(StepError::channel(format!(
                "mailbox returned HTTP {}",
                response.status().as_u16()
            ))
            .into());
        }

        Ok(response.json::<Vec<MailMessage>>().await?)
    }

    /// Code in the newest message, if any message carries one.
    pub fn code_from(&self, messages: &[MailMessage]) -> Option<String> {
        let latest = messages.last()?;
        match &self.pattern {
            Some(pattern) => pattern
                .captures(&latest.text)
                .and_then(|caps| caps.get(1).or_else(|| caps.get(0)))
                .map(|m| m.as_str().to_string()),
            None => {
                let body = latest.text.trim();
                (!body.is_empty()).then(|| body.to_string())
            }
        }
    }
}

#[async_trait]
impl MessageChannel for MailboxChannel {
    async fn extract_latest_code(&self, kind: ChannelKind) -> Result<String> {
        let timeout = Duration::from_millis(self.config.timeout_ms);
        let interval = Duration::from_millis(self.config.poll_interval_ms.max(1));
        let start_time = Instant::now();
        let mut last_error: Option<ScenarioError> = None;

        info!("Waiting for {} code from {}", kind, self.messages_url());

        loop {
            match self.fetch_messages().await {
                Ok(messages) => {
                    debug!("Mailbox holds {} messages", messages.len());
                    if let Some(code) = self.code_from(&messages) {
                        info!(
                            "Extracted {} code after {} ms",
                            kind,
                            start_time.elapsed().as_millis()
                        );
                        return Ok(code);
                    }
                }
                Err(e) => {
                    debug!("Mailbox not ready: {}", e);
                    last_error = Some(e);
                }
            }

            if start_time.elapsed() >= timeout {
                let detail = match last_error {
                    Some(e) => format!("no {} code within {} ms: {}", kind, timeout.as_millis(), e),
                    None => format!("no {} code within {} ms", kind, timeout.as_millis()),
                };
                return Err(StepError::channel(detail).into());
            }

            tokio::time::sleep(interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(pattern: Option<&str>) -> MailboxChannel {
        MailboxChannel::new(ChannelConfig {
            code_pattern: pattern.map(|p| p.to_string()),
            ..ChannelConfig::default()
        })
        .unwrap()
    }

    fn messages(json: &str) -> Vec<MailMessage> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_latest_message_wins() {
        let inbox = messages(
            r#"[
                {"id": "a1", "subject": "CAS Passwordless Token", "text": "  111111\n"},
                {"id": "b2", "subject": "CAS Passwordless Token", "text": "482913\n", "html": "<p>482913</p>"}
            ]"#,
        );
        assert_eq!(channel(None).code_from(&inbox).as_deref(), Some("482913"));
    }

    #[test]
    fn test_pattern_capture_group() {
        let inbox = messages(
            r#"[{"text": "Use token 948213 to log in. It expires in 5 minutes."}]"#,
        );
        let channel = channel(Some(r"token (\d{6})"));
        assert_eq!(channel.code_from(&inbox).as_deref(), Some("948213"));
    }

    #[test]
    fn test_empty_mailbox_has_no_code() {
        assert_eq!(channel(None).code_from(&[]), None);
        assert_eq!(
            channel(None).code_from(&messages(r#"[{"text": "   "}]"#)),
            None
        );
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let result = MailboxChannel::new(ChannelConfig {
            code_pattern: Some("(".to_string()),
            ..ChannelConfig::default()
        });
        assert!(matches!(result, Err(ScenarioError::Config(_))));
    }

    #[test]
    fn test_messages_url() {
        let channel = MailboxChannel::new(ChannelConfig {
            base_url: "http://localhost:8282/".to_string(),
            ..ChannelConfig::default()
        })
        .unwrap();
        assert_eq!(channel.messages_url(), "http://localhost:8282/email");
    }
}
