use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;

use crate::shared::frame::Frame;
use crate::video::domain::image_writer::ImageWriter;

/// Encodes frames as JPEG at a fixed quality using the `image` crate.
pub struct JpegImageWriter {
    quality: u8,
}

impl JpegImageWriter {
    /// `quality` is clamped to the encoder's 1..=100 range.
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }
}

impl ImageWriter for JpegImageWriter {
    fn write(
        &self,
        path: &Path,
        frame: &Frame,
        size: Option<(u32, u32)>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let img = frame
            .to_rgb_image()
            .ok_or("Failed to create image from frame data")?;
        let img = match size {
            Some((w, h)) if (w, h) != img.dimensions() => {
                image::imageops::resize(&img, w, h, image::imageops::FilterType::Triangle)
            }
            _ => img,
        };

        let mut out = BufWriter::new(File::create(path)?);
        JpegEncoder::new_with_quality(&mut out, self.quality).encode_image(&img)?;
        out.flush()?;
        Ok(())
    }
}
