use std::path::PathBuf;

use crate::display::domain::frame_display::{FrameDisplay, Overlay};
use crate::display::infrastructure::overlay_painter;
use crate::shared::frame::Frame;
use crate::video::domain::image_writer::ImageWriter;

/// Headless preview: periodically overwrites one image file with the
/// annotated frame, so an operator can watch it with any image viewer.
///
/// Warning frames are always written; plain frames every `every_n` renders.
pub struct SnapshotDisplay {
    writer: Box<dyn ImageWriter>,
    path: PathBuf,
    every_n: usize,
    renders: usize,
}

impl SnapshotDisplay {
    pub fn new(writer: Box<dyn ImageWriter>, path: impl Into<PathBuf>, every_n: usize) -> Self {
        Self {
            writer,
            path: path.into(),
            every_n: every_n.max(1),
            renders: 0,
        }
    }
}

impl FrameDisplay for SnapshotDisplay {
    fn render(
        &mut self,
        frame: &Frame,
        overlays: &[Overlay],
    ) -> Result<(), Box<dyn std::error::Error>> {
        let warning = overlays.iter().any(|o| matches!(o, Overlay::Warning(_)));
        let due = self.renders % self.every_n == 0;
        self.renders += 1;
        if !warning && !due {
            return Ok(());
        }

        let mut annotated = frame.clone();
        overlay_painter::paint(&mut annotated, overlays);
        self.writer.write(&self.path, &annotated, None)
    }
}
