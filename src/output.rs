//! Result assembly and emission.
//!
//! An invocation produces exactly one [`OutputEnvelope`]: compressed image
//! bytes or a structured JSON record. [`OutputEnvelope::emit`] writes it in a
//! single call.

use crate::dicom::{DecodedImage, ImageMetadata, ImagePixelModule, PixelSamples};
use crate::platform::RawPixelBuffer;
use crate::transcode::TranscodedBuffer;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::str::FromStr;

/// Wire protocol version reported by `--version-info`
pub const PROTOCOL_VERSION: u32 = 1;

/// Default JPEG quality
pub const DEFAULT_JPEG_QUALITY: u8 = 99;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Json,
    Jpeg,
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            other => Err(Error::ConfigError(format!(
                "unknown output format '{}' (expected json or jpeg)",
                other
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Json => "json",
            OutputFormat::Jpeg => "jpeg",
        })
    }
}

/// Metadata plus source and windowed pixels for one image.
///
/// Field order is part of the output contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredRecord {
    #[serde(flatten)]
    pub pixel_module: ImagePixelModule,
    pub min_pixel_value: i64,
    pub max_pixel_value: i64,
    pub color: bool,
    pub invert: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_pixel_spacing: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_pixel_spacing: Option<f64>,
    pub intercept: f64,
    pub slope: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_center: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_width: Option<f64>,
    pub pixel_data: PixelSamples,
    pub windowed_pixel_data: Vec<u8>,
    #[serde(rename = "_perf", default, skip_serializing_if = "Option::is_none")]
    pub perf: Option<String>,
}

impl StructuredRecord {
    pub fn assemble(
        image: &DecodedImage,
        metadata: &ImageMetadata,
        windowed: TranscodedBuffer,
        perf: Option<String>,
    ) -> Self {
        StructuredRecord {
            pixel_module: metadata.image_pixel_module.clone(),
            min_pixel_value: image.image_frame.smallest_pixel_value,
            max_pixel_value: image.image_frame.largest_pixel_value,
            color: image.color,
            invert: image.invert,
            column_pixel_spacing: image.column_pixel_spacing,
            row_pixel_spacing: image.row_pixel_spacing,
            intercept: image.intercept,
            slope: image.slope,
            window_center: image.window_center,
            window_width: image.window_width,
            pixel_data: image.image_frame.pixel_data.clone(),
            windowed_pixel_data: windowed.into_bytes(),
            perf,
        }
    }
}

/// The single result of an invocation
#[derive(Debug, Clone, PartialEq)]
pub enum OutputEnvelope {
    Compressed(Vec<u8>),
    Structured(StructuredRecord),
}

impl OutputEnvelope {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        match self {
            OutputEnvelope::Compressed(bytes) => Ok(bytes.clone()),
            OutputEnvelope::Structured(record) => Ok(serde_json::to_vec(record)?),
        }
    }

    /// Serialize fully, then write once and flush.
    pub fn emit<W: Write + ?Sized>(&self, out: &mut W) -> Result<()> {
        let bytes = self.to_bytes()?;
        out.write_all(&bytes)?;
        out.flush()?;
        log::debug!("emitted {} bytes", bytes.len());
        Ok(())
    }
}

/// Composite straight-alpha RGBA over black and drop alpha.
pub fn flatten_over_black(rgba: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);
    for px in rgba.chunks_exact(4) {
        let a = u16::from(px[3]);
        if a == 255 {
            rgb.extend_from_slice(&px[..3]);
            continue;
        }
        for &c in &px[..3] {
            rgb.push(mul_div255(u16::from(c), a) as u8);
        }
    }
    rgb
}

fn mul_div255(x: u16, y: u16) -> u16 {
    ((u32::from(x) * u32::from(y) + 127) / 255) as u16
}

/// Encode the raw render output as baseline JPEG.
#[cfg(feature = "jpeg")]
pub fn encode_jpeg(raw: &RawPixelBuffer, quality: u8) -> Result<Vec<u8>> {
    let rgb = flatten_over_black(&raw.data);
    let mut buf = Vec::new();
    let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality);
    encoder.encode(&rgb, raw.width, raw.height, image::ExtendedColorType::Rgb8)?;
    Ok(buf)
}

#[cfg(not(feature = "jpeg"))]
pub fn encode_jpeg(_raw: &RawPixelBuffer, _quality: u8) -> Result<Vec<u8>> {
    Err(Error::EncodeError(
        "built without the `jpeg` feature".to_string(),
    ))
}

/// Build and version identification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub pipeline: String,
    pub protocol_version: u32,
}

pub fn version_info() -> VersionInfo {
    VersionInfo {
        pipeline: format!("{}-v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        protocol_version: PROTOCOL_VERSION,
    }
}
