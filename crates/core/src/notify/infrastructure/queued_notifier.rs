use std::path::{Path, PathBuf};
use std::thread::JoinHandle;

use crossbeam_channel::{Sender, TrySendError};

use crate::notify::domain::notifier::{Notifier, NotifyReceipt};
use crate::notify::domain::notify_error::NotifyError;

/// Runs another notifier on a background thread behind a bounded queue.
///
/// `notify` validates nothing and never blocks: it enqueues the path and
/// returns `Queued`. When the queue is full the image is dropped with
/// `QueueFull` rather than stalling the monitor loop. Outcomes are logged
/// by the worker.
pub struct QueuedNotifier {
    sender: Option<Sender<Option<PathBuf>>>,
    worker: Option<JoinHandle<()>>,
}

impl QueuedNotifier {
    pub fn new(inner: Box<dyn Notifier>, capacity: usize) -> Self {
        let (sender, receiver) = crossbeam_channel::bounded::<Option<PathBuf>>(capacity.max(1));
        let worker = std::thread::spawn(move || {
            for path in receiver {
                match inner.notify(path.as_deref()) {
                    Ok(NotifyReceipt::Delivered { key, .. }) => {
                        log::info!("Notification sent for {key}");
                    }
                    Ok(NotifyReceipt::Queued) => {}
                    Err(e) => log::error!("Notification failed: {e}"),
                }
            }
            log::debug!("Notification worker drained");
        });
        Self {
            sender: Some(sender),
            worker: Some(worker),
        }
    }
}

impl Notifier for QueuedNotifier {
    fn notify(&self, local_path: Option<&Path>) -> Result<NotifyReceipt, NotifyError> {
        let sender = self.sender.as_ref().ok_or(NotifyError::WorkerStopped)?;
        match sender.try_send(local_path.map(Path::to_path_buf)) {
            Ok(()) => Ok(NotifyReceipt::Queued),
            Err(TrySendError::Full(path)) => {
                Err(NotifyError::QueueFull(path.unwrap_or_default()))
            }
            Err(TrySendError::Disconnected(_)) => Err(NotifyError::WorkerStopped),
        }
    }
}

impl Drop for QueuedNotifier {
    /// Closes the queue and waits for pending notifications to finish.
    fn drop(&mut self) {
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Notification worker panicked");
            }
        }
    }
}
