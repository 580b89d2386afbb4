use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::notify::domain::chat_webhook::{ChatWebhook, WebhookMessage};
use crate::notify::domain::notifier::{NotifyReceipt, Notifier};
use crate::notify::domain::notify_error::NotifyError;
use crate::notify::domain::object_store::ObjectStore;
use crate::shared::constants::{ALERT_MESSAGE_PREFIX, PRESIGNED_URL_TTL, S3_KEY_PREFIX};

/// Where alert images go and who hears about them.
///
/// Bucket and webhook are optional so a half-configured deployment still
/// monitors and captures; each notify attempt reports what is missing.
#[derive(Clone, Debug)]
pub struct NotifierConfig {
    pub bucket: Option<String>,
    pub webhook_url: Option<String>,
    pub key_prefix: String,
    pub link_ttl: Duration,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            bucket: None,
            webhook_url: None,
            key_prefix: S3_KEY_PREFIX.to_string(),
            link_ttl: PRESIGNED_URL_TTL,
        }
    }
}

/// Upload → presign → webhook, after validating every precondition.
pub struct UploadNotifier {
    store: Arc<dyn ObjectStore>,
    webhook: Arc<dyn ChatWebhook>,
    config: NotifierConfig,
}

impl UploadNotifier {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        webhook: Arc<dyn ChatWebhook>,
        config: NotifierConfig,
    ) -> Self {
        Self {
            store,
            webhook,
            config,
        }
    }

    fn validate<'a>(
        &'a self,
        local_path: Option<&'a Path>,
    ) -> Result<(&'a Path, &'a str, &'a str), NotifyError> {
        let path = local_path.ok_or(NotifyError::MissingPath)?;
        if !path.is_file() {
            return Err(NotifyError::FileNotFound(path.to_path_buf()));
        }
        let bucket = non_empty(&self.config.bucket).ok_or(NotifyError::MissingBucket)?;
        let webhook_url =
            non_empty(&self.config.webhook_url).ok_or(NotifyError::MissingWebhook)?;
        Ok((path, bucket, webhook_url))
    }
}

impl Notifier for UploadNotifier {
    fn notify(&self, local_path: Option<&Path>) -> Result<NotifyReceipt, NotifyError> {
        let (path, bucket, webhook_url) = self.validate(local_path)?;

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| NotifyError::FileNotFound(path.to_path_buf()))?;
        let key = format!("{}{filename}", self.config.key_prefix);

        log::info!("Uploading {filename} to bucket {bucket}");
        self.store
            .upload(bucket, &key, path)
            .map_err(|message| NotifyError::Upload {
                key: key.clone(),
                message,
            })?;

        let url = self
            .store
            .presign_get(bucket, &key, self.config.link_ttl)
            .map_err(|message| NotifyError::Presign {
                key: key.clone(),
                message,
            })?;

        let message = WebhookMessage {
            text: format!("{ALERT_MESSAGE_PREFIX} {url}"),
        };
        self.webhook.post(webhook_url, &message)?;

        Ok(NotifyReceipt::Delivered { key, url })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
