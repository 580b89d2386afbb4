use std::path::PathBuf;

use thiserror::Error;

/// Why a notification did not go out.
///
/// The first four variants are precondition failures and are always
/// reported before any network traffic.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("no image path was given")]
    MissingPath,
    #[error("image file does not exist: {0}")]
    FileNotFound(PathBuf),
    #[error("destination bucket is not configured (set AWS_S3_BUCKET)")]
    MissingBucket,
    #[error("webhook URL is not configured (set SLACK_WEBHOOK_URL)")]
    MissingWebhook,
    #[error("upload of {key} failed: {message}")]
    Upload { key: String, message: String },
    #[error("could not presign {key}: {message}")]
    Presign { key: String, message: String },
    #[error("webhook request failed: {0}")]
    Webhook(String),
    #[error("webhook answered with HTTP {0}")]
    WebhookStatus(u16),
    #[error("notification queue is full, dropping {0}")]
    QueueFull(PathBuf),
    #[error("notification worker has stopped")]
    WorkerStopped,
}
