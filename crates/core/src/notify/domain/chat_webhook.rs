use serde::Serialize;

use crate::notify::domain::notify_error::NotifyError;

/// Incoming-webhook payload: `{"text": "..."}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WebhookMessage {
    pub text: String,
}

pub trait ChatWebhook: Send + Sync {
    fn post(&self, url: &str, message: &WebhookMessage) -> Result<(), NotifyError>;
}
