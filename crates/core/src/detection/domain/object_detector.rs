use crate::detection::domain::detection::Detection;
use crate::shared::frame::Frame;

/// Domain interface for per-frame object detection.
///
/// Returns every labelled object the model sees; filtering down to
/// people happens in the pipeline, not here.
pub trait ObjectDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>>;
}
