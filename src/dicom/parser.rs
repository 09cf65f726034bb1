//! Minimal DICOM Part 10 decoder.
//!
//! Handles explicit and implicit VR little endian with native (uncompressed)
//! pixel data. Nested sequences are skipped; only top-level attributes are
//! read. Encapsulated pixel data is rejected.

use super::{
    Decoded, DecodedImage, DicomDecoder, ImageFrame, ImageMetadata, ImagePixelModule,
    ImagePlaneModule, ModalityLutModule, PixelSamples, SopCommonModule, VoiLutModule,
};
use crate::{Error, Result};
use std::collections::HashMap;

pub const IMPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2";
pub const EXPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2.1";
pub const EXPLICIT_VR_BIG_ENDIAN: &str = "1.2.840.10008.1.2.2";

type Tag = (u16, u16);

const TRANSFER_SYNTAX_UID: Tag = (0x0002, 0x0010);
const SOP_CLASS_UID: Tag = (0x0008, 0x0016);
const SOP_INSTANCE_UID: Tag = (0x0008, 0x0018);
const SAMPLES_PER_PIXEL: Tag = (0x0028, 0x0002);
const PHOTOMETRIC_INTERPRETATION: Tag = (0x0028, 0x0004);
const PLANAR_CONFIGURATION: Tag = (0x0028, 0x0006);
const ROWS: Tag = (0x0028, 0x0010);
const COLUMNS: Tag = (0x0028, 0x0011);
const PIXEL_SPACING: Tag = (0x0028, 0x0030);
const PIXEL_ASPECT_RATIO: Tag = (0x0028, 0x0034);
const BITS_ALLOCATED: Tag = (0x0028, 0x0100);
const BITS_STORED: Tag = (0x0028, 0x0101);
const HIGH_BIT: Tag = (0x0028, 0x0102);
const PIXEL_REPRESENTATION: Tag = (0x0028, 0x0103);
const WINDOW_CENTER: Tag = (0x0028, 0x1050);
const WINDOW_WIDTH: Tag = (0x0028, 0x1051);
const RESCALE_INTERCEPT: Tag = (0x0028, 0x1052);
const RESCALE_SLOPE: Tag = (0x0028, 0x1053);
const RESCALE_TYPE: Tag = (0x0028, 0x1054);
const PIXEL_DATA: Tag = (0x7FE0, 0x0010);

const ITEM: Tag = (0xFFFE, 0xE000);
const ITEM_DELIMITATION: Tag = (0xFFFE, 0xE00D);
const SEQUENCE_DELIMITATION: Tag = (0xFFFE, 0xE0DD);
const UNDEFINED_LENGTH: u32 = 0xFFFF_FFFF;
/// Deepest sequence nesting accepted before a payload is rejected
const MAX_SEQUENCE_DEPTH: usize = 64;

fn decode_err(msg: impl Into<String>) -> Error {
    Error::DecodeError(msg.into())
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8], pos: usize) -> Self {
        Cursor { buf, pos }
    }

    fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(decode_err(format!(
                "truncated data: need {} bytes at offset {}, {} left",
                n,
                self.pos,
                self.remaining()
            )));
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn tag(&mut self) -> Result<Tag> {
        Ok((self.u16()?, self.u16()?))
    }

    fn peek_group(&self) -> Option<u16> {
        self.buf
            .get(self.pos..self.pos + 2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VrEncoding {
    Explicit,
    Implicit,
}

fn has_long_length(vr: &[u8]) -> bool {
    matches!(
        vr,
        b"OB" | b"OD" | b"OF" | b"OL" | b"OV" | b"OW" | b"SQ" | b"SV" | b"UC" | b"UN" | b"UR" | b"UT" | b"UV"
    )
}

fn read_header(cur: &mut Cursor<'_>, enc: VrEncoding) -> Result<(Tag, u32)> {
    let tag = cur.tag()?;
    // Items and delimiters never carry a VR.
    if tag.0 == 0xFFFE {
        return Ok((tag, cur.u32()?));
    }
    match enc {
        VrEncoding::Implicit => Ok((tag, cur.u32()?)),
        VrEncoding::Explicit => {
            let vr = cur.take(2)?;
            if has_long_length(vr) {
                cur.take(2)?;
                Ok((tag, cur.u32()?))
            } else {
                Ok((tag, u32::from(cur.u16()?)))
            }
        }
    }
}

type Attributes<'a> = HashMap<Tag, &'a [u8]>;

/// Read elements to the end of the buffer, or to an item delimiter when
/// `in_item` is set. Values are collected only when `out` is given.
fn read_elements<'a>(
    cur: &mut Cursor<'a>,
    enc: VrEncoding,
    mut out: Option<&mut Attributes<'a>>,
    in_item: bool,
    depth: usize,
) -> Result<()> {
    while cur.remaining() > 0 {
        let (tag, len) = read_header(cur, enc)?;
        if tag == ITEM_DELIMITATION {
            if in_item {
                return Ok(());
            }
            return Err(decode_err("item delimiter outside of a sequence"));
        }
        if len == UNDEFINED_LENGTH {
            if tag == PIXEL_DATA {
                return Err(decode_err("encapsulated pixel data is not supported"));
            }
            skip_sequence(cur, enc, depth + 1)?;
            continue;
        }
        let value = cur.take(len as usize)?;
        if let Some(map) = out.as_deref_mut() {
            map.insert(tag, value);
        }
    }
    if in_item {
        return Err(decode_err("unterminated sequence item"));
    }
    Ok(())
}

fn skip_sequence(cur: &mut Cursor<'_>, enc: VrEncoding, depth: usize) -> Result<()> {
    if depth > MAX_SEQUENCE_DEPTH {
        return Err(decode_err(format!(
            "sequence nesting deeper than {} levels",
            MAX_SEQUENCE_DEPTH
        )));
    }
    loop {
        let tag = cur.tag()?;
        let len = cur.u32()?;
        match tag {
            SEQUENCE_DELIMITATION => return Ok(()),
            ITEM if len == UNDEFINED_LENGTH => read_elements(cur, enc, None, true, depth)?,
            ITEM => {
                cur.take(len as usize)?;
            }
            (g, e) => {
                return Err(decode_err(format!(
                    "unexpected tag ({:04X},{:04X}) inside sequence",
                    g, e
                )))
            }
        }
    }
}

fn text(value: &[u8]) -> String {
    String::from_utf8_lossy(value)
        .trim_matches(|c: char| c == '\0' || c.is_whitespace())
        .to_string()
}

fn numbers(value: &[u8]) -> Vec<f64> {
    text(value)
        .split('\\')
        .filter_map(|s| s.trim().parse::<f64>().ok())
        .collect()
}

struct Dataset<'a> {
    transfer_syntax: String,
    attrs: Attributes<'a>,
}

impl<'a> Dataset<'a> {
    fn parse(bytes: &'a [u8]) -> Result<Self> {
        let mut transfer_syntax = IMPLICIT_VR_LITTLE_ENDIAN.to_string();
        let mut cur = Cursor::new(bytes, 0);

        if bytes.len() >= 132 && &bytes[128..132] == b"DICM" {
            cur = Cursor::new(bytes, 132);
            let mut meta = Attributes::new();
            while cur.peek_group() == Some(0x0002) {
                let (tag, len) = read_header(&mut cur, VrEncoding::Explicit)?;
                let value = cur.take(len as usize)?;
                meta.insert(tag, value);
            }
            if let Some(ts) = meta.get(&TRANSFER_SYNTAX_UID) {
                transfer_syntax = text(ts);
            }
        } else {
            log::debug!("no DICM preamble, assuming implicit VR little endian");
        }

        let enc = match transfer_syntax.as_str() {
            IMPLICIT_VR_LITTLE_ENDIAN => VrEncoding::Implicit,
            EXPLICIT_VR_LITTLE_ENDIAN => VrEncoding::Explicit,
            EXPLICIT_VR_BIG_ENDIAN => {
                return Err(decode_err("explicit VR big endian is not supported"))
            }
            other => {
                return Err(decode_err(format!(
                    "unsupported transfer syntax {}: only uncompressed little endian data can be decoded",
                    other
                )))
            }
        };

        let mut attrs = Attributes::new();
        read_elements(&mut cur, enc, Some(&mut attrs), false, 0)?;
        Ok(Dataset { transfer_syntax, attrs })
    }

    fn us(&self, tag: Tag) -> Option<u16> {
        self.attrs
            .get(&tag)
            .filter(|v| v.len() >= 2)
            .map(|v| u16::from_le_bytes([v[0], v[1]]))
    }

    fn required_us(&self, tag: Tag, name: &str) -> Result<u16> {
        self.us(tag)
            .ok_or_else(|| decode_err(format!("missing required attribute {}", name)))
    }

    fn text(&self, tag: Tag) -> Option<String> {
        self.attrs.get(&tag).map(|v| text(v)).filter(|s| !s.is_empty())
    }

    fn numbers(&self, tag: Tag) -> Vec<f64> {
        self.attrs.get(&tag).map(|v| numbers(v)).unwrap_or_default()
    }
}

/// Reorder color-by-plane samples (RRR..GGG..BBB..) to color-by-pixel.
fn interleave_planes(bytes: &[u8], pixels: usize, sample_width: usize) -> Vec<u8> {
    let plane = pixels * sample_width;
    let mut out = vec![0u8; plane * 3];
    for i in 0..pixels {
        for p in 0..3 {
            let src = p * plane + i * sample_width;
            let dst = (i * 3 + p) * sample_width;
            out[dst..dst + sample_width].copy_from_slice(&bytes[src..src + sample_width]);
        }
    }
    out
}

fn samples_from_bytes(bytes: &[u8], bits_allocated: u16, signed: bool) -> Result<PixelSamples> {
    Ok(match (bits_allocated, signed) {
        (8, false) => PixelSamples::U8(bytes.to_vec()),
        (8, true) => PixelSamples::I16(bytes.iter().map(|&b| i16::from(b as i8)).collect()),
        (16, false) => PixelSamples::U16(
            bytes
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]))
                .collect(),
        ),
        (16, true) => PixelSamples::I16(
            bytes
                .chunks_exact(2)
                .map(|c| i16::from_le_bytes([c[0], c[1]]))
                .collect(),
        ),
        (32, false) => PixelSamples::U32(
            bytes
                .chunks_exact(4)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        ),
        (32, true) => PixelSamples::I32(
            bytes
                .chunks_exact(4)
                .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        ),
        (bits, _) => {
            return Err(decode_err(format!(
                "unsupported bits allocated: {}",
                bits
            )))
        }
    })
}

/// Decoder for uncompressed little-endian DICOM files
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeDecoder;

impl NativeDecoder {
    pub fn new() -> Self {
        NativeDecoder
    }
}

impl DicomDecoder for NativeDecoder {
    fn decode(&self, image_id: &str, bytes: &[u8]) -> Result<Decoded> {
        let ds = Dataset::parse(bytes)?;

        let rows = ds.required_us(ROWS, "Rows")?;
        let columns = ds.required_us(COLUMNS, "Columns")?;
        let bits_allocated = ds.required_us(BITS_ALLOCATED, "BitsAllocated")?;
        let samples_per_pixel = ds.us(SAMPLES_PER_PIXEL).unwrap_or(1);
        let photometric = ds.text(PHOTOMETRIC_INTERPRETATION).unwrap_or_else(|| {
            let default = if samples_per_pixel == 3 { "RGB" } else { "MONOCHROME2" };
            default.to_string()
        });
        let bits_stored = ds.us(BITS_STORED).unwrap_or(bits_allocated);
        let high_bit = ds.us(HIGH_BIT).unwrap_or(bits_stored.saturating_sub(1));
        let pixel_representation = ds.us(PIXEL_REPRESENTATION).unwrap_or(0);
        let planar_configuration = ds.us(PLANAR_CONFIGURATION);

        match (photometric.as_str(), samples_per_pixel) {
            ("MONOCHROME1" | "MONOCHROME2", 1) | ("RGB", 3) => {}
            (p, spp) => {
                return Err(decode_err(format!(
                    "unsupported photometric interpretation {} with {} samples per pixel",
                    p, spp
                )))
            }
        }
        if rows == 0 || columns == 0 {
            return Err(decode_err("image has zero rows or columns"));
        }

        let pixels = usize::from(rows) * usize::from(columns);
        let sample_width = usize::from(bits_allocated / 8).max(1);
        let needed = pixels * usize::from(samples_per_pixel) * sample_width;
        let raw = ds
            .attrs
            .get(&PIXEL_DATA)
            .ok_or_else(|| decode_err("missing pixel data"))?;
        if raw.len() < needed {
            return Err(decode_err(format!(
                "pixel data holds {} bytes, expected {}",
                raw.len(),
                needed
            )));
        }
        let raw = &raw[..needed];
        let interleaved;
        let raw = if samples_per_pixel == 3 && planar_configuration == Some(1) {
            interleaved = interleave_planes(raw, pixels, sample_width);
            &interleaved[..]
        } else {
            raw
        };
        let pixel_data = samples_from_bytes(raw, bits_allocated, pixel_representation == 1)?;
        let (smallest, largest) = pixel_data.min_max();

        let spacing = ds.numbers(PIXEL_SPACING);
        let window_center = ds.numbers(WINDOW_CENTER);
        let window_width = ds.numbers(WINDOW_WIDTH);
        let slope = ds
            .numbers(RESCALE_SLOPE)
            .first()
            .copied()
            .filter(|s| *s != 0.0)
            .unwrap_or(1.0);
        let intercept = ds.numbers(RESCALE_INTERCEPT).first().copied().unwrap_or(0.0);

        let image = DecodedImage {
            image_id: image_id.to_string(),
            width: u32::from(columns),
            height: u32::from(rows),
            color: samples_per_pixel == 3,
            invert: photometric == "MONOCHROME1",
            row_pixel_spacing: spacing.first().copied(),
            column_pixel_spacing: spacing.get(1).copied(),
            slope,
            intercept,
            window_center: window_center.first().copied(),
            window_width: window_width.first().copied(),
            image_frame: ImageFrame {
                samples_per_pixel,
                photometric_interpretation: photometric.clone(),
                rows: u32::from(rows),
                columns: u32::from(columns),
                pixel_data,
                smallest_pixel_value: smallest,
                largest_pixel_value: largest,
            },
        };

        let metadata = ImageMetadata {
            image_pixel_module: ImagePixelModule {
                samples_per_pixel,
                photometric_interpretation: photometric,
                rows: u32::from(rows),
                columns: u32::from(columns),
                bits_allocated,
                bits_stored,
                high_bit,
                pixel_representation,
                planar_configuration,
                pixel_aspect_ratio: Some(ds.numbers(PIXEL_ASPECT_RATIO))
                    .filter(|r| r.len() == 2),
            },
            image_plane_module: ImagePlaneModule {
                rows: u32::from(rows),
                columns: u32::from(columns),
                row_pixel_spacing: image.row_pixel_spacing,
                column_pixel_spacing: image.column_pixel_spacing,
            },
            voi_lut_module: VoiLutModule {
                window_center,
                window_width,
            },
            modality_lut_module: ModalityLutModule {
                rescale_slope: slope,
                rescale_intercept: intercept,
                rescale_type: ds.text(RESCALE_TYPE),
            },
            sop_common_module: SopCommonModule {
                sop_class_uid: ds.text(SOP_CLASS_UID),
                sop_instance_uid: ds.text(SOP_INSTANCE_UID),
            },
            transfer_syntax: ds.transfer_syntax.clone(),
        };

        log::debug!(
            "decoded {}: {}x{} {} ({} bits)",
            image_id,
            columns,
            rows,
            metadata.image_pixel_module.photometric_interpretation,
            bits_allocated
        );
        Ok(Decoded { image, metadata })
    }
}
