use std::path::Path;

use ffmpeg_next::format::context::Input;
use ffmpeg_next::software::scaling;
use ffmpeg_next::util::frame::video::Video as VideoFrame;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;

/// Decodes the best video stream of any container ffmpeg understands into
/// RGB24 [`Frame`]s.
pub struct FfmpegReader {
    state: Option<DecodeState>,
}

struct DecodeState {
    input: Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: scaling::Context,
    stream_index: usize,
    width: u32,
    height: u32,
}

// Safety: the reader is owned by one thread at a time and never shares the
// raw ffmpeg pointers it holds.
unsafe impl Send for FfmpegReader {}

impl FfmpegReader {
    pub fn new() -> Self {
        Self { state: None }
    }
}

impl Default for FfmpegReader {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoReader for FfmpegReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;
        let input = ffmpeg_next::format::input(path)?;

        let stream = input
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("no video stream found")?;
        let stream_index = stream.index();
        let decoder = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?
            .decoder()
            .video()?;

        let rate = stream.rate();
        let fps = if rate.denominator() != 0 {
            rate.numerator() as f64 / rate.denominator() as f64
        } else {
            0.0
        };
        let total_frames = stream.frames().max(0) as usize;

        let (width, height) = (decoder.width(), decoder.height());
        let scaler = scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            scaling::Flags::BILINEAR,
        )?;

        let metadata = VideoMetadata {
            width,
            height,
            fps,
            total_frames,
            codec: decoder
                .codec()
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
            source_path: Some(path.to_path_buf()),
        };

        self.state = Some(DecodeState {
            input,
            decoder,
            scaler,
            stream_index,
            width,
            height,
        });
        Ok(metadata)
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        match self.state.as_mut() {
            Some(state) => Box::new(FrameIter {
                state,
                next_index: 0,
                eof_sent: false,
                done: false,
            }),
            None => Box::new(std::iter::once(Err("FfmpegReader: not opened".into()))),
        }
    }

    fn close(&mut self) {
        self.state = None;
    }
}

/// Decodes lazily, one frame per `next`.
struct FrameIter<'a> {
    state: &'a mut DecodeState,
    next_index: usize,
    eof_sent: bool,
    done: bool,
}

impl FrameIter<'_> {
    fn receive(&mut self) -> Option<Result<Frame, Box<dyn std::error::Error>>> {
        let mut decoded = VideoFrame::empty();
        self.state.decoder.receive_frame(&mut decoded).ok()?;

        let mut rgb = VideoFrame::empty();
        if let Err(e) = self.state.scaler.run(&decoded, &mut rgb) {
            return Some(Err(Box::new(e)));
        }

        let pixels = packed_rgb(&rgb, self.state.width, self.state.height);
        let frame = Frame::new(
            pixels,
            self.state.width,
            self.state.height,
            3,
            self.next_index,
        );
        self.next_index += 1;
        Some(Ok(frame))
    }
}

impl Iterator for FrameIter<'_> {
    type Item = Result<Frame, Box<dyn std::error::Error>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if let Some(result) = self.receive() {
            return Some(result);
        }
        if self.eof_sent {
            self.done = true;
            return None;
        }

        loop {
            let Some((stream, packet)) = self.state.input.packets().next() else {
                let _ = self.state.decoder.send_eof();
                self.eof_sent = true;
                let result = self.receive();
                self.done = result.is_none();
                return result;
            };
            if stream.index() != self.state.stream_index {
                continue;
            }
            if let Err(e) = self.state.decoder.send_packet(&packet) {
                log::debug!("Dropping undecodable packet: {e}");
                continue;
            }
            if let Some(result) = self.receive() {
                return Some(result);
            }
        }
    }
}

/// Strips per-row padding so pixels are tightly packed.
fn packed_rgb(rgb: &VideoFrame, width: u32, height: u32) -> Vec<u8> {
    let stride = rgb.stride(0);
    let data = rgb.data(0);
    let row_len = width as usize * 3;

    let mut pixels = Vec::with_capacity(row_len * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        pixels.extend_from_slice(&data[start..start + row_len]);
    }
    pixels
}
