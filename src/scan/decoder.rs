//! QR decoder backed by rqrr.
//!
//! Frames are converted to luma and run through rqrr's grid detection.
//! When several codes are in frame, the first grid that decodes wins.

use super::{Decoder, PixelBuffer};

/// Stateless QR decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct QrDecoder;

impl QrDecoder {
    /// Create a new decoder.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for QrDecoder {
    fn decode(&self, buffer: &PixelBuffer) -> Option<String> {
        if buffer.is_empty() {
            return None;
        }

        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(
            buffer.width() as usize,
            buffer.height() as usize,
            |x, y| buffer.luma(x, y),
        );

        let grids = prepared.detect_grids();
        log::trace!(
            "{} candidate grid(s) in {}x{} frame",
            grids.len(),
            buffer.width(),
            buffer.height()
        );

        grids.iter().find_map(|grid| match grid.decode() {
            Ok((meta, content)) => {
                log::debug!("Decoded QR version {:?} ({} bytes)", meta.version, content.len());
                Some(content)
            }
            Err(e) => {
                log::trace!("Grid failed to decode: {:?}", e);
                None
            }
        })
    }
}
