#![allow(dead_code)]

//! Synthetic DICOM Part 10 files for integration tests.

pub const EXPLICIT_LE: &str = "1.2.840.10008.1.2.1";

fn pad(s: &str, fill: u8) -> Vec<u8> {
    let mut v = s.as_bytes().to_vec();
    if v.len() % 2 == 1 {
        v.push(fill);
    }
    v
}

fn element(out: &mut Vec<u8>, group: u16, elem: u16, vr: &[u8; 2], value: &[u8]) {
    out.extend_from_slice(&group.to_le_bytes());
    out.extend_from_slice(&elem.to_le_bytes());
    out.extend_from_slice(vr);
    if matches!(vr, b"OB" | b"OW" | b"SQ" | b"UN" | b"UT") {
        out.extend_from_slice(&[0, 0]);
        out.extend_from_slice(&(value.len() as u32).to_le_bytes());
    } else {
        out.extend_from_slice(&(value.len() as u16).to_le_bytes());
    }
    out.extend_from_slice(value);
}

/// Builder for small explicit-VR little endian files.
#[derive(Debug, Clone)]
pub struct SyntheticDicom {
    pub rows: u16,
    pub columns: u16,
    pub photometric: &'static str,
    pub window: Option<(f64, f64)>,
    pub rescale: Option<(f64, f64)>,
    pub spacing: Option<(f64, f64)>,
    pub samples_u16: Vec<u16>,
    pub rgb: Option<Vec<u8>>,
}

impl SyntheticDicom {
    /// 16-bit MONOCHROME2 with the given samples in row-major order.
    pub fn mono16(rows: u16, columns: u16, samples: Vec<u16>) -> Self {
        SyntheticDicom {
            rows,
            columns,
            photometric: "MONOCHROME2",
            window: None,
            rescale: None,
            spacing: None,
            samples_u16: samples,
            rgb: None,
        }
    }

    /// 8-bit interleaved RGB.
    pub fn rgb8(rows: u16, columns: u16, rgb: Vec<u8>) -> Self {
        SyntheticDicom {
            rows,
            columns,
            photometric: "RGB",
            window: None,
            rescale: None,
            spacing: None,
            samples_u16: Vec::new(),
            rgb: Some(rgb),
        }
    }

    /// A deterministic 16-bit gradient with window and spacing set.
    pub fn gradient(rows: u16, columns: u16) -> Self {
        let n = usize::from(rows) * usize::from(columns);
        let samples = (0..n).map(|i| (i * 4095 / (n - 1).max(1)) as u16).collect();
        let mut d = Self::mono16(rows, columns, samples);
        d.window = Some((2048.0, 4096.0));
        d.rescale = Some((0.0, 1.0));
        d.spacing = Some((0.5, 0.5));
        d
    }

    pub fn monochrome1(mut self) -> Self {
        self.photometric = "MONOCHROME1";
        self
    }

    pub fn window(mut self, center: f64, width: f64) -> Self {
        self.window = Some((center, width));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = vec![0u8; 128];
        out.extend_from_slice(b"DICM");
        element(&mut out, 0x0002, 0x0010, b"UI", &pad(EXPLICIT_LE, 0));

        let color = self.rgb.is_some();
        element(&mut out, 0x0008, 0x0016, b"UI", &pad("1.2.840.10008.5.1.4.1.1.2", 0));
        element(&mut out, 0x0008, 0x0018, b"UI", &pad("1.2.826.0.1.3680043.2.1125.1", 0));
        element(&mut out, 0x0028, 0x0002, b"US", &(if color { 3u16 } else { 1 }).to_le_bytes());
        element(&mut out, 0x0028, 0x0004, b"CS", &pad(self.photometric, b' '));
        if color {
            element(&mut out, 0x0028, 0x0006, b"US", &0u16.to_le_bytes());
        }
        element(&mut out, 0x0028, 0x0010, b"US", &self.rows.to_le_bytes());
        element(&mut out, 0x0028, 0x0011, b"US", &self.columns.to_le_bytes());
        if let Some((r, c)) = self.spacing {
            element(&mut out, 0x0028, 0x0030, b"DS", &pad(&format!("{}\\{}", r, c), b' '));
        }
        let bits: u16 = if color { 8 } else { 16 };
        element(&mut out, 0x0028, 0x0100, b"US", &bits.to_le_bytes());
        element(&mut out, 0x0028, 0x0101, b"US", &(if color { 8u16 } else { 12 }).to_le_bytes());
        element(&mut out, 0x0028, 0x0102, b"US", &(if color { 7u16 } else { 11 }).to_le_bytes());
        element(&mut out, 0x0028, 0x0103, b"US", &0u16.to_le_bytes());
        if let Some((center, width)) = self.window {
            element(&mut out, 0x0028, 0x1050, b"DS", &pad(&center.to_string(), b' '));
            element(&mut out, 0x0028, 0x1051, b"DS", &pad(&width.to_string(), b' '));
        }
        if let Some((intercept, slope)) = self.rescale {
            element(&mut out, 0x0028, 0x1052, b"DS", &pad(&intercept.to_string(), b' '));
            element(&mut out, 0x0028, 0x1053, b"DS", &pad(&slope.to_string(), b' '));
        }

        let pixels: Vec<u8> = match &self.rgb {
            Some(rgb) => rgb.clone(),
            None => self.samples_u16.iter().flat_map(|v| v.to_le_bytes()).collect(),
        };
        let vr = if color { b"OB" } else { b"OW" };
        let mut pixels = pixels;
        if pixels.len() % 2 == 1 {
            pixels.push(0);
        }
        element(&mut out, 0x7FE0, 0x0010, vr, &pixels);
        out
    }
}
