use std::path::Path;
use std::time::Duration;

/// Remote blob storage holding alert images.
pub trait ObjectStore: Send + Sync {
    fn upload(&self, bucket: &str, key: &str, local_path: &Path) -> Result<(), String>;

    /// Time-limited GET link for an uploaded object.
    fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, String>;
}
