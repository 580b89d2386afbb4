use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;
use crate::video::domain::frame_source::FrameSource;

/// Replays a directory of still images as a frame stream, in file-name order.
///
/// Useful for running the monitor against recorded footage without a camera.
pub struct ImageDirSource {
    pending: VecDeque<PathBuf>,
    frame_index: usize,
}

impl ImageDirSource {
    pub fn open(dir: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && is_image(p))
            .collect();
        files.sort();

        log::info!("Replaying {} images from {}", files.len(), dir.display());
        Ok(Self {
            pending: files.into(),
            frame_index: 0,
        })
    }
}

impl FrameSource for ImageDirSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let Some(path) = self.pending.pop_front() else {
            return Ok(None);
        };
        let img = image::open(&path)
            .map_err(|e| format!("Failed to read {}: {e}", path.display()))?
            .to_rgb8();
        let frame = Frame::from_rgb_image(img, self.frame_index);
        self.frame_index += 1;
        Ok(Some(frame))
    }
}

pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
