//! CPU stack viewport backend

use super::backend::{BackendOptions, RenderBackend, ViewportInput, ViewportType};
use super::voi;
use crate::dicom::DecodedImage;
use crate::platform::element::CANVAS_SELECTOR;
use crate::platform::{
    next_animation_frame, Document, Event, EventType, GenericElement, HostContext, RawPixelBuffer,
    SurfaceHandle,
};
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;

struct StackViewport {
    element: GenericElement,
    canvas: SurfaceHandle,
    background: [u8; 3],
    image: Option<Arc<DecodedImage>>,
}

/// Paints single-image stacks on the CPU and signals completion through the
/// viewport element.
#[derive(Default)]
pub struct CpuStackBackend {
    document: Option<Document>,
    viewports: HashMap<String, StackViewport>,
}

impl CpuStackBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn viewport(&self, viewport_id: &str) -> Result<&StackViewport> {
        self.viewports
            .get(viewport_id)
            .ok_or_else(|| Error::RenderError(format!("no viewport enabled as {}", viewport_id)))
    }
}

impl RenderBackend for CpuStackBackend {
    fn init(&mut self, host: &HostContext, options: BackendOptions) -> Result<()> {
        if !options.use_cpu_rendering && !host.navigator().gpu_available() {
            return Err(Error::InitializationError(
                "GPU rendering requested but the host has no GPU".to_string(),
            ));
        }
        log::debug!(
            "cpu backend init (shared array buffer: {})",
            options.use_shared_array_buffer
        );
        self.document = Some(host.document().clone());
        Ok(())
    }

    fn enable_element(&mut self, input: ViewportInput) -> Result<()> {
        let document = self
            .document
            .as_ref()
            .ok_or_else(|| Error::InitializationError("backend used before init".to_string()))?;
        match input.kind {
            ViewportType::Stack => {}
        }
        let element = input
            .element
            .as_generic()
            .cloned()
            .ok_or_else(|| {
                Error::RenderError(format!(
                    "viewport must be a container element, got <{}>",
                    input.element.tag_name()
                ))
            })?;

        let canvas = element
            .query_selector(CANVAS_SELECTOR)
            .and_then(|found| found.as_surface().cloned())
            .unwrap_or_else(|| document.create_surface());
        canvas.resize(canvas.client_width(), canvas.client_height());

        element.set_attribute("data-viewport-uid", &input.viewport_id);
        log::debug!(
            "enabled stack viewport {} on {}x{} surface (pixel replication: {})",
            input.viewport_id,
            canvas.width(),
            canvas.height(),
            input.pixel_replication
        );
        element.dispatch_event(&Event::new(EventType::ElementEnabled, &input.viewport_id));

        self.viewports.insert(
            input.viewport_id,
            StackViewport {
                element,
                canvas,
                background: input.background,
                image: None,
            },
        );
        Ok(())
    }

    fn set_stack(&mut self, viewport_id: &str, image: Arc<DecodedImage>) -> Result<()> {
        let expected = image.width as usize
            * image.height as usize
            * usize::from(image.image_frame.samples_per_pixel.max(1));
        if image.image_frame.pixel_data.len() < expected {
            return Err(Error::RenderError(format!(
                "{} has {} samples, expected {}",
                image.image_id,
                image.image_frame.pixel_data.len(),
                expected
            )));
        }
        let viewport = self
            .viewports
            .get_mut(viewport_id)
            .ok_or_else(|| Error::RenderError(format!("no viewport enabled as {}", viewport_id)))?;
        viewport
            .element
            .dispatch_event(&Event::new(EventType::StackNewImage, viewport_id));
        viewport.image = Some(image);
        Ok(())
    }

    fn render(&mut self, viewport_id: &str) -> Result<()> {
        let document = self
            .document
            .clone()
            .ok_or_else(|| Error::InitializationError("backend used before init".to_string()))?;
        let viewport = self.viewport(viewport_id)?;
        let image = viewport
            .image
            .clone()
            .ok_or_else(|| Error::RenderError(format!("viewport {} has no stack", viewport_id)))?;
        let element = viewport.element.clone();
        let canvas = viewport.canvas.clone();
        let background = viewport.background;
        let viewport_id = viewport_id.to_string();

        tokio::spawn(async move {
            next_animation_frame().await;
            match paint(&document, &canvas, &image, background) {
                Ok(()) => {
                    element.dispatch_event(&Event::new(EventType::ImageRendered, &viewport_id));
                }
                Err(e) => log::error!("render of {} failed: {}", viewport_id, e),
            }
        });
        Ok(())
    }
}

fn paint(
    document: &Document,
    canvas: &SurfaceHandle,
    image: &DecodedImage,
    background: [u8; 3],
) -> Result<()> {
    let frame = RawPixelBuffer::from_rgba(image.width, image.height, voi::render_rgba(image))?;
    let scratch = document.create_surface();
    scratch.resize(image.width, image.height);
    scratch.context_2d().put_image_data(&frame, 0, 0);

    let [r, g, b] = background;
    let ctx = canvas.context_2d();
    ctx.fill_rect(0, 0, canvas.width(), canvas.height(), [r, g, b, 255]);
    let dx = (i64::from(canvas.width()) - i64::from(image.width)) / 2;
    let dy = (i64::from(canvas.height()) - i64::from(image.height)) / 2;
    ctx.draw_surface(&scratch, dx as i32, dy as i32);
    Ok(())
}
