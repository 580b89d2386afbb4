use std::path::Path;

use crate::notify::domain::notify_error::NotifyError;

/// What a completed notification produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NotifyReceipt {
    /// Uploaded and announced; carries the shared link.
    Delivered { key: String, url: String },
    /// Handed to a background worker; the outcome is logged there.
    Queued,
}

/// Publishes a saved alert image to the outside world.
///
/// `None` stands for "no image was produced" and is rejected like any other
/// precondition failure.
pub trait Notifier: Send {
    fn notify(&self, local_path: Option<&Path>) -> Result<NotifyReceipt, NotifyError>;
}
