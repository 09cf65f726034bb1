//! Modality and VOI lookup used by the CPU backend

use crate::dicom::DecodedImage;

/// Linear window over modality values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoiWindow {
    pub center: f64,
    pub width: f64,
}

impl VoiWindow {
    /// The image's own window, or one spanning its full modality range.
    pub fn for_image(image: &DecodedImage) -> Self {
        if let (Some(center), Some(width)) = (image.window_center, image.window_width) {
            return VoiWindow { center, width };
        }
        let a = modality(image, image.image_frame.smallest_pixel_value as f64);
        let b = modality(image, image.image_frame.largest_pixel_value as f64);
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let width = (hi - lo).max(1.0);
        VoiWindow {
            center: lo + width / 2.0,
            width,
        }
    }

    /// Map a modality value to an 8-bit display value.
    pub fn apply(&self, value: f64) -> u8 {
        let width = self.width.max(1.0);
        let center = self.center - 0.5;
        let half = (width - 1.0) / 2.0;
        if value <= center - half {
            0
        } else if value > center + half {
            255
        } else {
            (((value - center) / (width - 1.0) + 0.5) * 255.0)
                .round()
                .clamp(0.0, 255.0) as u8
        }
    }
}

fn modality(image: &DecodedImage, sample: f64) -> f64 {
    sample * image.slope + image.intercept
}

/// Render a decoded image to opaque straight-alpha RGBA.
///
/// Grayscale output always has R == G == B.
pub fn render_rgba(image: &DecodedImage) -> Vec<u8> {
    let pixels = image.width as usize * image.height as usize;
    let samples = &image.image_frame.pixel_data;
    let mut out = vec![0u8; pixels * 4];

    if image.color {
        for (i, px) in out.chunks_exact_mut(4).enumerate() {
            for c in 0..3 {
                px[c] = samples.get(i * 3 + c).unwrap_or(0).clamp(0, 255) as u8;
            }
            px[3] = 255;
        }
        return out;
    }

    let window = VoiWindow::for_image(image);
    for (i, px) in out.chunks_exact_mut(4).enumerate() {
        let raw = samples.get(i).unwrap_or(0) as f64;
        let mut v = window.apply(modality(image, raw));
        if image.invert {
            v = 255 - v;
        }
        px[..3].fill(v);
        px[3] = 255;
    }
    out
}
