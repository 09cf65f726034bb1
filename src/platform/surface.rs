//! Drawable surfaces and their 2D pixel context

use super::lock;
use crate::{Error, Result};
use std::sync::{Arc, Mutex};

/// Size given to a freshly created surface, matching an HTML canvas.
pub const DEFAULT_SURFACE_WIDTH: u32 = 300;
pub const DEFAULT_SURFACE_HEIGHT: u32 = 150;

/// Straight-alpha RGBA pixels read back from a surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPixelBuffer {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl RawPixelBuffer {
    /// Transparent black buffer of the given size
    pub fn new(width: u32, height: u32) -> Self {
        RawPixelBuffer {
            width,
            height,
            data: vec![0; rgba_len(width, height)],
        }
    }

    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        if data.len() != rgba_len(width, height) {
            return Err(Error::RenderError(format!(
                "rgba buffer of {} bytes does not match {}x{}",
                data.len(),
                width,
                height
            )));
        }
        Ok(RawPixelBuffer { width, height, data })
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

fn rgba_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 4
}

struct Canvas {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Canvas {
    fn reset(&mut self) {
        self.data.clear();
        self.data.resize(rgba_len(self.width, self.height), 0);
    }

    /// Clip a `w`x`h` rect at (`x`,`y`) to the canvas. Returns
    /// (dst_x, dst_y, src_x_offset, src_y_offset, w, h).
    fn clip(&self, x: i32, y: i32, w: u32, h: u32) -> Option<(usize, usize, usize, usize, usize, usize)> {
        let x0 = i64::from(x).max(0);
        let y0 = i64::from(y).max(0);
        let x1 = (i64::from(x) + i64::from(w)).min(i64::from(self.width));
        let y1 = (i64::from(y) + i64::from(h)).min(i64::from(self.height));
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some((
            x0 as usize,
            y0 as usize,
            (x0 - i64::from(x)) as usize,
            (y0 - i64::from(y)) as usize,
            (x1 - x0) as usize,
            (y1 - y0) as usize,
        ))
    }
}

/// Shared handle to one drawable surface.
///
/// Clones refer to the same pixels. Setting `width` or `height` clears the
/// surface, as a canvas does.
#[derive(Clone)]
pub struct SurfaceHandle {
    id: usize,
    canvas: Arc<Mutex<Canvas>>,
}

impl std::fmt::Debug for SurfaceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceHandle")
            .field("id", &self.id)
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

impl SurfaceHandle {
    pub(crate) fn new(id: usize) -> Self {
        let mut canvas = Canvas {
            width: DEFAULT_SURFACE_WIDTH,
            height: DEFAULT_SURFACE_HEIGHT,
            data: Vec::new(),
        };
        canvas.reset();
        SurfaceHandle {
            id,
            canvas: Arc::new(Mutex::new(canvas)),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn width(&self) -> u32 {
        lock(&self.canvas).width
    }

    pub fn height(&self) -> u32 {
        lock(&self.canvas).height
    }

    pub fn set_width(&self, width: u32) {
        log::debug!("surface {} width set to {}", self.id, width);
        let mut c = lock(&self.canvas);
        c.width = width;
        c.reset();
    }

    pub fn set_height(&self, height: u32) {
        log::debug!("surface {} height set to {}", self.id, height);
        let mut c = lock(&self.canvas);
        c.height = height;
        c.reset();
    }

    pub fn resize(&self, width: u32, height: u32) {
        log::debug!("surface {} resized to {}x{}", self.id, width, height);
        let mut c = lock(&self.canvas);
        c.width = width;
        c.height = height;
        c.reset();
    }

    /// Always the surface's own width; there is no layout engine to ask.
    pub fn client_width(&self) -> u32 {
        self.width()
    }

    /// Always the surface's own height.
    pub fn client_height(&self) -> u32 {
        self.height()
    }

    pub fn context_2d(&self) -> Context2d {
        Context2d { surface: self.clone() }
    }

    /// Whether both handles refer to the same surface.
    pub fn same_surface(&self, other: &SurfaceHandle) -> bool {
        Arc::ptr_eq(&self.canvas, &other.canvas)
    }
}

/// 2D pixel access to a surface
pub struct Context2d {
    surface: SurfaceHandle,
}

impl Context2d {
    /// Read a rect of pixels. Areas outside the surface read as transparent black.
    pub fn get_image_data(&self, x: i32, y: i32, width: u32, height: u32) -> RawPixelBuffer {
        let mut out = RawPixelBuffer::new(width, height);
        let c = lock(&self.surface.canvas);
        if let Some((cx, cy, ox, oy, w, h)) = c.clip(x, y, width, height) {
            let src_stride = c.width as usize * 4;
            let dst_stride = width as usize * 4;
            for row in 0..h {
                let s = (cy + row) * src_stride + cx * 4;
                let d = (oy + row) * dst_stride + ox * 4;
                out.data[d..d + w * 4].copy_from_slice(&c.data[s..s + w * 4]);
            }
        }
        out
    }

    /// Write pixels verbatim (no compositing) at (`dx`,`dy`).
    pub fn put_image_data(&self, image: &RawPixelBuffer, dx: i32, dy: i32) {
        let mut c = lock(&self.surface.canvas);
        if let Some((cx, cy, ox, oy, w, h)) = c.clip(dx, dy, image.width, image.height) {
            let dst_stride = c.width as usize * 4;
            let src_stride = image.width as usize * 4;
            for row in 0..h {
                let d = (cy + row) * dst_stride + cx * 4;
                let s = (oy + row) * src_stride + ox * 4;
                c.data[d..d + w * 4].copy_from_slice(&image.data[s..s + w * 4]);
            }
        }
    }

    pub fn fill_rect(&self, x: i32, y: i32, width: u32, height: u32, rgba: [u8; 4]) {
        let mut c = lock(&self.surface.canvas);
        if let Some((cx, cy, _, _, w, h)) = c.clip(x, y, width, height) {
            let stride = c.width as usize * 4;
            for row in 0..h {
                let start = (cy + row) * stride + cx * 4;
                for px in c.data[start..start + w * 4].chunks_exact_mut(4) {
                    px.copy_from_slice(&rgba);
                }
            }
        }
    }

    /// Composite another surface onto this one (source-over, straight alpha).
    pub fn draw_surface(&self, source: &SurfaceHandle, dx: i32, dy: i32) {
        if source.same_surface(&self.surface) {
            return;
        }
        let src = source
            .context_2d()
            .get_image_data(0, 0, source.width(), source.height());

        let mut c = lock(&self.surface.canvas);
        if let Some((cx, cy, ox, oy, w, h)) = c.clip(dx, dy, src.width, src.height) {
            let dst_stride = c.width as usize * 4;
            let src_stride = src.width as usize * 4;
            for row in 0..h {
                let d = (cy + row) * dst_stride + cx * 4;
                let s = (oy + row) * src_stride + ox * 4;
                let dst = &mut c.data[d..d + w * 4];
                for (dp, sp) in dst.chunks_exact_mut(4).zip(src.data[s..s + w * 4].chunks_exact(4)) {
                    blend_over(dp, sp);
                }
            }
        }
    }
}

fn blend_over(dst: &mut [u8], src: &[u8]) {
    let sa = u32::from(src[3]);
    match sa {
        255 => dst.copy_from_slice(src),
        0 => {}
        _ => {
            let inv = 255 - sa;
            let da = u32::from(dst[3]);
            let out_a = sa + (da * inv + 127) / 255;
            for i in 0..3 {
                let s = u32::from(src[i]) * sa;
                let d = (u32::from(dst[i]) * da * inv + 127) / 255;
                dst[i] = ((s + d + out_a / 2) / out_a).min(255) as u8;
            }
            dst[3] = out_a.min(255) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_surface_has_canvas_default_size() {
        let s = SurfaceHandle::new(0);
        assert_eq!((s.width(), s.height()), (300, 150));
        assert_eq!(s.client_width(), 300);
    }

    #[test]
    fn client_size_tracks_own_size() {
        let s = SurfaceHandle::new(0);
        s.set_width(17);
        s.set_height(9);
        assert_eq!((s.client_width(), s.client_height()), (17, 9));
    }

    #[test]
    fn put_then_get_roundtrips_and_clips() {
        let s = SurfaceHandle::new(0);
        s.resize(2, 2);
        let ctx = s.context_2d();
        let img = RawPixelBuffer::from_rgba(1, 1, vec![1, 2, 3, 4]).unwrap();
        ctx.put_image_data(&img, 1, 1);
        ctx.put_image_data(&img, 5, 5);
        let all = ctx.get_image_data(0, 0, 2, 2);
        assert_eq!(&all.data[12..16], &[1, 2, 3, 4]);
        assert!(all.data[..12].iter().all(|&b| b == 0));

        let shifted = ctx.get_image_data(1, 1, 2, 2);
        assert_eq!(&shifted.data[0..4], &[1, 2, 3, 4]);
        assert!(shifted.data[4..].iter().all(|&b| b == 0));
    }

    #[test]
    fn resizing_clears_pixels() {
        let s = SurfaceHandle::new(0);
        s.resize(1, 1);
        s.context_2d().fill_rect(0, 0, 1, 1, [9, 9, 9, 255]);
        s.set_width(1);
        assert_eq!(s.context_2d().get_image_data(0, 0, 1, 1).data, vec![0, 0, 0, 0]);
    }

    #[test]
    fn draw_surface_composites_opaque_and_skips_transparent() {
        let dst = SurfaceHandle::new(0);
        let src = SurfaceHandle::new(1);
        dst.resize(2, 1);
        src.resize(2, 1);
        dst.context_2d().fill_rect(0, 0, 2, 1, [0, 0, 0, 255]);
        src.context_2d().put_image_data(
            &RawPixelBuffer::from_rgba(2, 1, vec![200, 100, 50, 255, 7, 7, 7, 0]).unwrap(),
            0,
            0,
        );
        dst.context_2d().draw_surface(&src, 0, 0);
        let out = dst.context_2d().get_image_data(0, 0, 2, 1);
        assert_eq!(out.data, vec![200, 100, 50, 255, 0, 0, 0, 255]);
    }

    #[test]
    fn from_rgba_rejects_wrong_length() {
        assert!(RawPixelBuffer::from_rgba(2, 2, vec![0; 15]).is_err());
    }
}
