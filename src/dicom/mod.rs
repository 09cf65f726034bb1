//! Decoded DICOM image model and the decoder seam.
//!
//! The pipeline only reads what a decoder produces. [`NativeDecoder`] covers
//! uncompressed little-endian files; other decoders plug in through
//! [`DicomDecoder`].

pub mod loader;
pub mod parser;

pub use loader::{FileManager, ImageLoader};
pub use parser::NativeDecoder;

use crate::Result;
use serde::{Deserialize, Serialize};

/// Full-precision source samples, serialized as a plain array of integers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PixelSamples {
    U8(Vec<u8>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    I32(Vec<i32>),
    U32(Vec<u32>),
}

impl PixelSamples {
    pub fn len(&self) -> usize {
        match self {
            PixelSamples::U8(v) => v.len(),
            PixelSamples::I16(v) => v.len(),
            PixelSamples::U16(v) => v.len(),
            PixelSamples::I32(v) => v.len(),
            PixelSamples::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, i: usize) -> Option<i64> {
        match self {
            PixelSamples::U8(v) => v.get(i).map(|&x| i64::from(x)),
            PixelSamples::I16(v) => v.get(i).map(|&x| i64::from(x)),
            PixelSamples::U16(v) => v.get(i).map(|&x| i64::from(x)),
            PixelSamples::I32(v) => v.get(i).map(|&x| i64::from(x)),
            PixelSamples::U32(v) => v.get(i).map(|&x| i64::from(x)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    /// Smallest and largest sample, or `(0, 0)` when empty.
    pub fn min_max(&self) -> (i64, i64) {
        self.iter()
            .fold(None, |acc: Option<(i64, i64)>, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
            .unwrap_or((0, 0))
    }
}

/// The decoded pixel frame
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFrame {
    pub samples_per_pixel: u16,
    pub photometric_interpretation: String,
    pub rows: u32,
    pub columns: u32,
    /// Interleaved samples (planar data is reordered during decode)
    pub pixel_data: PixelSamples,
    pub smallest_pixel_value: i64,
    pub largest_pixel_value: i64,
}

/// A decoded image as the rendering backend consumes it.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub image_id: String,
    pub width: u32,
    pub height: u32,
    pub color: bool,
    /// MONOCHROME1: low values display bright
    pub invert: bool,
    pub row_pixel_spacing: Option<f64>,
    pub column_pixel_spacing: Option<f64>,
    pub slope: f64,
    pub intercept: f64,
    pub window_center: Option<f64>,
    pub window_width: Option<f64>,
    pub image_frame: ImageFrame,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePixelModule {
    pub samples_per_pixel: u16,
    pub photometric_interpretation: String,
    pub rows: u32,
    pub columns: u32,
    pub bits_allocated: u16,
    pub bits_stored: u16,
    pub high_bit: u16,
    pub pixel_representation: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planar_configuration: Option<u16>,
    /// Vertical and horizontal pixel size ratio
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixel_aspect_ratio: Option<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImagePlaneModule {
    pub rows: u32,
    pub columns: u32,
    pub row_pixel_spacing: Option<f64>,
    pub column_pixel_spacing: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowRange {
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiLutModule {
    pub window_center: Vec<f64>,
    pub window_width: Vec<f64>,
}

impl VoiLutModule {
    /// Lower/upper display bounds for every center/width pair.
    ///
    /// Half-width is floored over the integer part of the width.
    pub fn window_ranges(&self) -> Vec<WindowRange> {
        self.window_center
            .iter()
            .zip(&self.window_width)
            .map(|(&center, &width)| {
                let half = ((width as i64) >> 1) as f64;
                WindowRange {
                    lower: center - half,
                    upper: center + half,
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModalityLutModule {
    pub rescale_slope: f64,
    pub rescale_intercept: f64,
    pub rescale_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SopCommonModule {
    pub sop_class_uid: Option<String>,
    pub sop_instance_uid: Option<String>,
}

/// Metadata modules available for a loaded image id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadata {
    pub image_pixel_module: ImagePixelModule,
    pub image_plane_module: ImagePlaneModule,
    pub voi_lut_module: VoiLutModule,
    pub modality_lut_module: ModalityLutModule,
    pub sop_common_module: SopCommonModule,
    pub transfer_syntax: String,
}

/// What a decoder yields for one payload
#[derive(Debug, Clone)]
pub struct Decoded {
    pub image: DecodedImage,
    pub metadata: ImageMetadata,
}

/// Decoding seam for DICOM payloads
pub trait DicomDecoder: Send + Sync {
    fn decode(&self, image_id: &str, bytes: &[u8]) -> Result<Decoded>;
}
