/// FaceNet-style descriptor model served by ONNX Runtime.
///
/// The session is created once and shared behind a mutex, so one embedder
/// can serve every export worker.
use std::path::Path;
use std::sync::Mutex;

use ndarray::Array4;

use crate::detection::infrastructure::execution_provider::preferred_execution_providers;
use crate::export::domain::face_embedder::FaceEmbedder;
use crate::shared::constants::EMBEDDING_INPUT_SIZE;
use crate::shared::frame::Frame;

const NORM_MEAN: f32 = 0.5;
const NORM_STD: f32 = 0.5;

pub struct OnnxFaceEmbedder {
    session: Mutex<ort::session::Session>,
    input_size: u32,
}

impl OnnxFaceEmbedder {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let intra_threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let session = ort::session::Session::builder()?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
            .with_inter_threads(1)?
            .with_intra_threads(intra_threads)?
            .with_execution_providers(preferred_execution_providers())?
            .commit_from_file(model_path)?;
        log::info!("Loaded embedding model {}", model_path.display());

        Ok(Self {
            session: Mutex::new(session),
            input_size: EMBEDDING_INPUT_SIZE,
        })
    }
}

impl FaceEmbedder for OnnxFaceEmbedder {
    fn embed(&self, crop: &Frame) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
        let tensor = preprocess(crop, self.input_size)?;
        let input_value = ort::value::Tensor::from_array(tensor)?;
        let mut session = self
            .session
            .lock()
            .map_err(|e| format!("Lock poisoned: {e}"))?;
        let outputs = session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("embedding model produced no outputs".into());
        }
        let embedding = outputs[0].try_extract_array::<f32>()?;
        Ok(embedding.iter().copied().collect())
    }
}

/// Bilinear resize to `size`×`size`, scale to [-1, 1], NCHW layout.
pub fn preprocess(crop: &Frame, size: u32) -> Result<Array4<f32>, Box<dyn std::error::Error>> {
    if crop.is_empty() {
        return Err("cannot embed an empty crop".into());
    }
    if crop.channels() != 3 {
        return Err(format!("expected RGB crop, got {} channels", crop.channels()).into());
    }

    let img = image::RgbImage::from_raw(crop.width(), crop.height(), crop.data().to_vec())
        .ok_or("crop data does not match its dimensions")?;
    let resized = image::imageops::resize(&img, size, size, image::imageops::FilterType::Triangle);

    let side = size as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, side, side));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            let v = pixel.0[c] as f32 / 255.0;
            tensor[[0, c, y as usize, x as usize]] = (v - NORM_MEAN) / NORM_STD;
        }
    }
    Ok(tensor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Frame {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take((width * height * 3) as usize)
            .collect();
        Frame::new(data, width, height, 3, 0)
    }

    #[test]
    fn test_preprocess_shape() {
        let tensor = preprocess(&solid(37, 52, [10, 20, 30]), 160).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 160, 160]);
    }

    #[test]
    fn test_preprocess_normalizes_to_unit_range() {
        let white = preprocess(&solid(20, 20, [255, 255, 255]), 160).unwrap();
        let black = preprocess(&solid(20, 20, [0, 0, 0]), 160).unwrap();
        assert!(white.iter().all(|v| (v - 1.0).abs() < 1e-6));
        assert!(black.iter().all(|v| (v + 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_preprocess_channel_planes() {
        let tensor = preprocess(&solid(8, 8, [255, 0, 51]), 16).unwrap();
        assert_abs_diff_eq!(tensor[[0, 0, 5, 5]], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(tensor[[0, 1, 5, 5]], -1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(tensor[[0, 2, 5, 5]], -0.6, epsilon = 1e-6);
    }

    #[test]
    fn test_preprocess_rejects_empty_crop() {
        let empty = Frame::new(Vec::new(), 0, 0, 3, 0);
        assert!(preprocess(&empty, 160).is_err());
    }

    #[test]
    fn test_preprocess_rejects_non_rgb() {
        let gray = Frame::new(vec![0u8; 16], 4, 4, 1, 0);
        assert!(preprocess(&gray, 160).is_err());
    }
}
