use std::path::{Path, PathBuf};

use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;

/// Reads a directory of still images, sorted by file name, as a stream.
///
/// A single image file is accepted too and behaves as a one-frame stream.
/// Files without a known image extension are ignored.
pub struct ImageSequenceReader {
    files: Option<Vec<PathBuf>>,
}

impl ImageSequenceReader {
    pub fn new() -> Self {
        Self { files: None }
    }
}

impl Default for ImageSequenceReader {
    fn default() -> Self {
        Self::new()
    }
}

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

fn list_images(dir: &Path) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && is_image_file(p))
        .collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

fn load_frame(path: &Path, index: usize) -> Result<Frame, Box<dyn std::error::Error>> {
    let img = image::open(path)
        .map_err(|e| format!("{}: {e}", path.display()))?
        .to_rgb8();
    let (width, height) = img.dimensions();
    Ok(Frame::new(img.into_raw(), width, height, 3, index))
}

impl VideoReader for ImageSequenceReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        let files = if path.is_dir() {
            list_images(path)?
        } else if path.is_file() && is_image_file(path) {
            vec![path.to_path_buf()]
        } else {
            return Err(format!("{} is neither an image nor a directory", path.display()).into());
        };

        let first = files
            .first()
            .ok_or_else(|| format!("no images found in {}", path.display()))?;
        let (width, height) = image::image_dimensions(first)?;

        let metadata = VideoMetadata {
            width,
            height,
            fps: 0.0,
            total_frames: files.len(),
            codec: String::new(),
            source_path: Some(path.to_path_buf()),
        };
        self.files = Some(files);
        Ok(metadata)
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        match self.files.as_ref() {
            Some(files) => Box::new(
                files
                    .iter()
                    .enumerate()
                    .map(|(index, path)| load_frame(path, index)),
            ),
            None => Box::new(std::iter::once(Err("ImageSequenceReader: not opened".into()))),
        }
    }

    fn close(&mut self) {
        self.files = None;
    }
}
