use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;

use crate::shared::constants::SNAPSHOT_JPEG_QUALITY;
use crate::shared::frame::Frame;
use crate::video::domain::image_writer::ImageWriter;

/// Writes frames as JPEG files using the `image` crate.
pub struct ImageFileWriter {
    quality: u8,
}

impl ImageFileWriter {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }
}

impl Default for ImageFileWriter {
    fn default() -> Self {
        Self::new(SNAPSHOT_JPEG_QUALITY)
    }
}

impl ImageWriter for ImageFileWriter {
    fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        if frame.is_empty() {
            return Err("cannot encode an empty frame".into());
        }
        if frame.channels() != 3 {
            return Err(format!("expected RGB frame, got {} channels", frame.channels()).into());
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = BufWriter::new(File::create(path)?);
        let mut encoder = JpegEncoder::new_with_quality(file, self.quality);
        encoder.encode(
            frame.data(),
            frame.width(),
            frame.height(),
            ExtendedColorType::Rgb8,
        )?;
        Ok(())
    }
}
