use std::time::Duration;

use crate::notify::domain::chat_webhook::{ChatWebhook, WebhookMessage};
use crate::notify::domain::notify_error::NotifyError;

/// Posts JSON messages to a Slack-style incoming webhook.
pub struct SlackWebhook {
    client: reqwest::blocking::Client,
}

impl SlackWebhook {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl ChatWebhook for SlackWebhook {
    fn post(&self, url: &str, message: &WebhookMessage) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(url)
            .json(message)
            .send()
            .map_err(|e| NotifyError::Webhook(e.to_string()))?;

        let status = response.status();
        log::info!("Webhook answered {status}");
        if !status.is_success() {
            return Err(NotifyError::WebhookStatus(status.as_u16()));
        }
        Ok(())
    }
}
