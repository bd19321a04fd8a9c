use ndarray::{s, ArrayView3};

use super::bounding_box::BoundingBox;

/// A single decoded frame or face crop: contiguous RGB bytes in row-major order.
///
/// `index` is the 0-based position of the source frame in the stream; crops
/// inherit the index of the frame they were cut from.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// True for a zero-area frame, e.g. the crop of a box outside the source.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Copies the pixels under `bbox`, clipped to the frame bounds.
    pub fn crop(&self, bbox: &BoundingBox) -> Frame {
        let clipped = bbox.clip_to(self.width, self.height);
        let (x1, y1) = (clipped.x as usize, clipped.y as usize);
        let (w, h) = (clipped.width as usize, clipped.height as usize);

        let data = if w == 0 || h == 0 {
            Vec::new()
        } else {
            self.as_ndarray()
                .slice(s![y1..y1 + h, x1..x1 + w, ..])
                .iter()
                .copied()
                .collect()
        };

        Frame::new(data, w as u32, h as u32, self.channels, self.index)
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}
