//! Frame decoding and rendering.
//!
//! Payloads are decoded on the blocking pool and may complete out of order.
//! [`LatestFrame`] keeps a single slot tagged with the version of the payload
//! it came from, so a decode that finishes after a newer one is discarded
//! instead of overwriting it.

use crate::host::Surface;
use image::imageops::FilterType;
use image::RgbaImage;
use std::sync::Arc;

/// A decoded frame, shared with the surface that displays it.
pub type FrameImage = Arc<RgbaImage>;

/// Why a payload produced no frame.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("empty payload")]
    Empty,
    #[error("payload is not a decodable image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("decode worker failed: {0}")]
    Worker(String),
}

/// Decode an encoded image and scale it to `width` x `height`.
///
/// The format is sniffed from the payload. A zero dimension keeps the
/// image's native size.
pub fn decode_frame(payload: &[u8], width: u32, height: u32) -> Result<RgbaImage, FrameError> {
    if payload.is_empty() {
        return Err(FrameError::Empty);
    }

    let decoded = image::load_from_memory(payload)?;
    let fits = decoded.width() == width && decoded.height() == height;
    if fits || width == 0 || height == 0 {
        return Ok(decoded.into_rgba8());
    }
    Ok(decoded
        .resize_exact(width, height, FilterType::Triangle)
        .into_rgba8())
}

/// Single-slot buffer holding the newest completed decode.
#[derive(Debug, Default)]
pub struct LatestFrame {
    issued: u64,
    displayed: u64,
    current: Option<FrameImage>,
}

impl LatestFrame {
    /// Reserve a version for a payload about to be decoded.
    pub fn begin(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    /// Offer a finished decode.
    ///
    /// Returns the installed frame if `version` is newer than the one on
    /// display; the previous image is released. Stale versions are dropped.
    pub fn complete(&mut self, version: u64, image: RgbaImage) -> Option<&FrameImage> {
        if version <= self.displayed {
            return None;
        }
        self.displayed = version;
        self.current = Some(Arc::new(image));
        self.current.as_ref()
    }

    pub fn current(&self) -> Option<&FrameImage> {
        self.current.as_ref()
    }

    /// Version of the frame on display, if any.
    pub fn displayed_version(&self) -> Option<u64> {
        (self.displayed > 0).then_some(self.displayed)
    }
}

/// Counters kept by the [`Renderer`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub frames_drawn: u64,
    pub decode_failures: u64,
    /// Payloads replaced before their decode started, plus decodes that
    /// finished behind a newer one.
    pub stale_frames: u64,
    pub decodes_started: u64,
}

/// A payload cleared for decoding, tagged with its slot version.
#[derive(Debug)]
pub struct DecodeJob {
    pub version: u64,
    pub payload: Vec<u8>,
}

/// Owns the render target and the frame slot.
///
/// At most one decode is in flight. Payloads arriving meanwhile wait in a
/// single pending slot, each one replacing the last.
pub struct Renderer {
    surface: Box<dyn Surface>,
    slot: LatestFrame,
    decoding: bool,
    pending: Option<Vec<u8>>,
    stats: RenderStats,
}

impl Renderer {
    pub fn new(surface: Box<dyn Surface>) -> Self {
        Self {
            surface,
            slot: LatestFrame::default(),
            decoding: false,
            pending: None,
            stats: RenderStats::default(),
        }
    }

    pub fn target_size(&self) -> (u32, u32) {
        self.surface.size()
    }

    /// Accept a received payload. Returns a job if the decoder is idle.
    pub fn submit(&mut self, payload: Vec<u8>) -> Option<DecodeJob> {
        if !self.decoding {
            return Some(self.start(payload));
        }
        if self.pending.replace(payload).is_some() {
            self.stats.stale_frames += 1;
            tracing::debug!("Decoder busy, replacing pending payload");
        }
        None
    }

    /// Draw a finished decode if it is still the newest; drop it otherwise.
    /// Returns the next job when a payload was waiting.
    pub fn complete(
        &mut self,
        version: u64,
        result: Result<RgbaImage, FrameError>,
    ) -> Option<DecodeJob> {
        match result {
            Ok(image) => match self.slot.complete(version, image) {
                Some(frame) => {
                    self.surface.draw(frame);
                    self.stats.frames_drawn += 1;
                    tracing::trace!(version, "Frame drawn");
                }
                None => {
                    self.stats.stale_frames += 1;
                    tracing::debug!(version, "Discarding superseded frame");
                }
            },
            Err(e) => {
                self.stats.decode_failures += 1;
                tracing::debug!(version, "Dropping undecodable frame: {}", e);
            }
        }

        self.decoding = false;
        let next = self.pending.take()?;
        Some(self.start(next))
    }

    fn start(&mut self, payload: Vec<u8>) -> DecodeJob {
        self.decoding = true;
        self.stats.decodes_started += 1;
        DecodeJob {
            version: self.slot.begin(),
            payload,
        }
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    pub fn displayed_version(&self) -> Option<u64> {
        self.slot.displayed_version()
    }
}
