//! RGBA to RGB or single-channel gray.
//!
//! No windowing or rescale happens here; the renderer already applied both.

use crate::{Error, Result};

/// Channel-reduced render output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscodedBuffer {
    /// Three bytes per pixel
    Rgb(Vec<u8>),
    /// One byte per pixel, taken from the red channel
    Gray(Vec<u8>),
}

impl TranscodedBuffer {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            TranscodedBuffer::Rgb(b) | TranscodedBuffer::Gray(b) => b,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            TranscodedBuffer::Rgb(b) | TranscodedBuffer::Gray(b) => b,
        }
    }

    pub fn is_color(&self) -> bool {
        matches!(self, TranscodedBuffer::Rgb(_))
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Drop alpha (color) or keep only red (gray).
///
/// Trailing bytes that do not form a whole pixel are ignored.
pub fn transcode(raw: &[u8], color: bool) -> TranscodedBuffer {
    if color {
        let mut out = Vec::with_capacity(raw.len() - raw.len() / 4);
        for px in raw.chunks_exact(4) {
            out.extend_from_slice(&px[..3]);
        }
        TranscodedBuffer::Rgb(out)
    } else {
        TranscodedBuffer::Gray(raw.chunks_exact(4).map(|px| px[0]).collect())
    }
}

/// Like [`transcode`], but a gray pixel whose R, G and B differ is an error.
pub fn transcode_checked(raw: &[u8], color: bool) -> Result<TranscodedBuffer> {
    if !color {
        if let Some(pixel) = raw
            .chunks_exact(4)
            .position(|px| px[0] != px[1] || px[1] != px[2])
        {
            return Err(Error::ChannelMismatch { pixel });
        }
    }
    Ok(transcode(raw, color))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_pixel() {
        let raw = [10, 20, 30, 40];
        assert_eq!(transcode(&raw, true), TranscodedBuffer::Rgb(vec![10, 20, 30]));
        assert_eq!(transcode(&raw, false), TranscodedBuffer::Gray(vec![10]));
    }

    #[test]
    fn lengths_follow_pixel_count() {
        let raw: Vec<u8> = (0..=255).cycle().take(4 * 37).collect();
        let rgb = transcode(&raw, true);
        let gray = transcode(&raw, false);
        assert_eq!(rgb.len(), raw.len() - raw.len() / 4);
        assert_eq!(gray.len(), raw.len() / 4);
        assert!(rgb.is_color());
        assert!(!gray.is_color());
        for (i, px) in raw.chunks_exact(4).enumerate() {
            assert_eq!(&rgb.as_bytes()[3 * i..3 * i + 3], &px[..3]);
            assert_eq!(gray.as_bytes()[i], px[0]);
        }
    }

    #[test]
    fn empty_input() {
        assert!(transcode(&[], true).is_empty());
        assert!(transcode(&[], false).is_empty());
    }

    #[test]
    fn checked_gray_reports_first_mismatch() {
        let raw = [5, 5, 5, 255, 7, 7, 7, 255, 9, 8, 9, 255];
        match transcode_checked(&raw, false) {
            Err(Error::ChannelMismatch { pixel }) => assert_eq!(pixel, 2),
            other => panic!("expected mismatch, got {:?}", other),
        }
        assert_eq!(
            transcode_checked(&raw[..8], false).unwrap().into_bytes(),
            vec![5, 7]
        );
        assert!(transcode_checked(&raw, true).is_ok());
    }
}
