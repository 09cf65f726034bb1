//! Render orchestration.
//!
//! [`render_image`] drives a [`RenderBackend`] through one stack render on a
//! [`HostContext`] and reads the primary surface back once the backend
//! reports completion.

pub mod backend;
pub mod cpu;
pub mod voi;

pub use backend::{BackendOptions, RenderBackend, ViewportInput, ViewportType};
pub use cpu::CpuStackBackend;

use crate::dicom::DecodedImage;
use crate::platform::{completion_signal, EventType, HostContext, RawPixelBuffer};
use crate::{RenderConfig, Result};
use std::sync::Arc;
use std::time::Duration;

/// Viewport id used for the single stack viewport
pub const VIEWPORT_ID: &str = "CT_STACK";

/// Render `image` through `backend` and capture the primary surface.
///
/// A host context renders once; a second call returns
/// [`crate::Error::AlreadyRendered`]. A backend that never reports
/// completion yields [`crate::Error::Timeout`] after
/// `config.render_timeout_ms`.
pub async fn render_image(
    host: &HostContext,
    backend: &mut dyn RenderBackend,
    image: Arc<DecodedImage>,
    config: &RenderConfig,
) -> Result<RawPixelBuffer> {
    host.claim_render()?;
    let document = host.document();

    let surface = document
        .primary_surface()
        .unwrap_or_else(|| document.create_surface());
    surface.resize(image.width, image.height);

    backend.init(
        host,
        BackendOptions {
            use_cpu_rendering: true,
            use_shared_array_buffer: false,
        },
    )?;

    let element = document.create_element("div");
    backend.enable_element(ViewportInput {
        viewport_id: VIEWPORT_ID.to_string(),
        kind: ViewportType::Stack,
        element,
        background: config.viewport_background,
        pixel_replication: true,
    })?;
    backend.set_stack(VIEWPORT_ID, image.clone())?;

    let (signal, wait) = completion_signal::<()>();
    document.listen(move |event| {
        if event.kind == EventType::ImageRendered {
            signal.fire(());
        }
    });
    log::debug!("rendering {} ({}x{})", image.image_id, image.width, image.height);
    backend.render(VIEWPORT_ID)?;

    let waited = wait
        .wait(Duration::from_millis(config.render_timeout_ms))
        .await;
    document.clear_listener();
    waited?;

    document.capture_primary()
}
