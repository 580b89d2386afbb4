use std::path::PathBuf;

/// A fired alert whose evidence image is already on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlertEvent {
    /// Local time, `YYYYMMDD_HHMMSS_mmm`.
    pub timestamp: String,
    pub image_path: PathBuf,
}
