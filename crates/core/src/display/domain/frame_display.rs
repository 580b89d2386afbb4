use crate::shared::frame::Frame;
use crate::shared::geometry::{BoundingBox, Rect};

/// Something to draw on top of a frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Overlay {
    /// The danger zone outline.
    Zone(Rect),
    /// A detected person's box.
    Person(BoundingBox),
    /// Alert banner. The text is for sinks that can render it.
    Warning(String),
}

/// Shows annotated frames to an operator.
///
/// Implementations must not modify the caller's frame; they paint a copy.
pub trait FrameDisplay: Send {
    fn render(
        &mut self,
        frame: &Frame,
        overlays: &[Overlay],
    ) -> Result<(), Box<dyn std::error::Error>>;
}

/// Display that shows nothing. Used headless and in tests.
pub struct NullDisplay;

impl FrameDisplay for NullDisplay {
    fn render(
        &mut self,
        _frame: &Frame,
        _overlays: &[Overlay],
    ) -> Result<(), Box<dyn std::error::Error>> {
        Ok(())
    }
}
