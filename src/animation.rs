use std::{io::BufReader, path::Path, time::Duration};

use anyhow::{anyhow, bail, ensure, Context, Result};
use tracing::{debug, error, info, trace, warn};

use image::{codecs::gif::GifDecoder, imageops::FilterType, AnimationDecoder, RgbaImage};

/// Decoded GIF, every frame already scaled to the canvas.
pub struct AnimatedGif {
    pub frames: Vec<RgbaImage>,
    pub delays: Vec<Duration>,
}

impl AnimatedGif {
    pub fn load<P: AsRef<Path>>(
        path: P,
        canvas_size: (u32, u32),
        default_delay: Duration,
    ) -> Result<Self> {
        let path = path.as_ref();
        let file =
            std::fs::File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        let decoder = GifDecoder::new(BufReader::new(file))
            .with_context(|| format!("Not a GIF: {:?}", path))?;
        let raw = decoder
            .into_frames()
            .collect_frames()
            .with_context(|| format!("Failed to decode frames of {:?}", path))?;

        ensure!(!raw.is_empty(), "{:?} has no frames", path);

        let (w, h) = canvas_size;
        let mut frames = Vec::with_capacity(raw.len());
        let mut delays = Vec::with_capacity(raw.len());
        for frame in raw {
            let (numer, denom) = frame.delay().numer_denom_ms();
            let ms = if denom == 0 { 0 } else { numer / denom };
            delays.push(if ms == 0 {
                default_delay
            } else {
                Duration::from_millis(ms as u64)
            });

            let buffer = frame.into_buffer();
            if buffer.dimensions() == (w, h) {
                frames.push(buffer);
            } else {
                frames.push(image::imageops::resize(&buffer, w, h, FilterType::Lanczos3));
            }
        }

        debug!("Loaded {:?}: {} frames", path, frames.len());

        Ok(Self { frames, delays })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn color_image(&self, index: usize) -> egui::ColorImage {
        let img = &self.frames[index % self.frames.len()];
        egui::ColorImage::from_rgba_unmultiplied(
            [img.width() as usize, img.height() as usize],
            img.as_raw(),
        )
    }
}

/// Loops through frames with their own delays, driven by elapsed time.
#[derive(Debug, Clone)]
pub struct Playback {
    delays: Vec<Duration>,
    index: usize,
    elapsed: Duration,
}

impl Playback {
    pub fn new(delays: Vec<Duration>) -> Self {
        Self {
            delays,
            index: 0,
            elapsed: Duration::ZERO,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Returns true when the visible frame changed.
    pub fn advance(&mut self, dt: Duration) -> bool {
        if self.delays.len() < 2 {
            return false;
        }

        /// a full cycle changes nothing, so skip whole loops after long stalls
        let cycle: Duration = self.delays.iter().sum();
        self.elapsed += dt;
        if !cycle.is_zero() && self.elapsed >= cycle * 2 {
            let n = (self.elapsed.as_nanos() / cycle.as_nanos()) as u32;
            self.elapsed -= cycle * (n - 1);
        }

        let start = self.index;
        let mut changed = false;
        while self.elapsed >= self.delays[self.index] {
            self.elapsed -= self.delays[self.index];
            self.index = (self.index + 1) % self.delays.len();
            changed = true;
            if self.delays[self.index].is_zero() && self.index == start {
                break;
            }
        }

        changed
    }

    pub fn time_until_next(&self) -> Option<Duration> {
        if self.delays.len() < 2 {
            return None;
        }
        Some(self.delays[self.index].saturating_sub(self.elapsed))
    }
}
