//! S3 object store on the async AWS SDK, driven from blocking code.

use std::path::Path;
use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

use crate::notify::domain::object_store::ObjectStore;
use crate::shared::constants::{DEFAULT_HTTP_TIMEOUT, DEFAULT_S3_REGION};

/// Connection settings for the alert-image bucket.
#[derive(Clone, Debug)]
pub struct S3Settings {
    pub region: String,
    /// Custom S3-compatible endpoint (MinIO, R2, ...). `None` means AWS.
    pub endpoint_url: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Per-attempt limit for a single S3 operation.
    pub timeout: Duration,
}

impl Default for S3Settings {
    fn default() -> Self {
        Self {
            region: DEFAULT_S3_REGION.to_string(),
            endpoint_url: None,
            access_key_id: None,
            secret_access_key: None,
            timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

/// Blocking facade over `aws_sdk_s3::Client`.
///
/// Owns a current-thread Tokio runtime so the monitor loop stays synchronous.
/// Uses the explicit key pair when both halves are set, otherwise the SDK's
/// default credential chain.
pub struct S3ObjectStore {
    runtime: tokio::runtime::Runtime,
    client: Client,
}

impl S3ObjectStore {
    pub fn new(settings: S3Settings) -> Result<Self, Box<dyn std::error::Error>> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let timeouts = aws_sdk_s3::config::timeout::TimeoutConfig::builder()
            .operation_attempt_timeout(settings.timeout)
            .build();

        let config = match (&settings.access_key_id, &settings.secret_access_key) {
            (Some(key_id), Some(secret)) => {
                let credentials = Credentials::new(key_id, secret, None, None, "env");
                let mut builder = Builder::new()
                    .behavior_version(BehaviorVersion::latest())
                    .region(Region::new(settings.region.clone()))
                    .credentials_provider(credentials)
                    .timeout_config(timeouts);
                if let Some(endpoint) = &settings.endpoint_url {
                    builder = builder.endpoint_url(endpoint).force_path_style(true);
                }
                builder.build()
            }
            _ => {
                log::debug!("No explicit S3 key pair, using the default credential chain");
                let shared = runtime.block_on(
                    aws_config::defaults(BehaviorVersion::latest())
                        .region(Region::new(settings.region.clone()))
                        .load(),
                );
                let mut builder = Builder::from(&shared).timeout_config(timeouts);
                if let Some(endpoint) = &settings.endpoint_url {
                    builder = builder.endpoint_url(endpoint).force_path_style(true);
                }
                builder.build()
            }
        };

        Ok(Self {
            runtime,
            client: Client::from_conf(config),
        })
    }
}

impl ObjectStore for S3ObjectStore {
    fn upload(&self, bucket: &str, key: &str, local_path: &Path) -> Result<(), String> {
        self.runtime.block_on(async {
            let body = ByteStream::from_path(local_path)
                .await
                .map_err(|e| e.to_string())?;
            self.client
                .put_object()
                .bucket(bucket)
                .key(key)
                .body(body)
                .content_type("image/jpeg")
                .send()
                .await
                .map_err(|e| format!("{e:?}"))?;
            log::debug!("Uploaded {} to s3://{bucket}/{key}", local_path.display());
            Ok::<(), String>(())
        })
    }

    fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, String> {
        let presign_config =
            PresigningConfig::expires_in(expires_in).map_err(|e| e.to_string())?;
        self.runtime.block_on(async {
            let presigned = self
                .client
                .get_object()
                .bucket(bucket)
                .key(key)
                .presigned(presign_config)
                .await
                .map_err(|e| format!("{e:?}"))?;
            Ok::<String, String>(presigned.uri().to_string())
        })
    }
}
