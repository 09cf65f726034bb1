//! The seam between the orchestrator and a rendering engine

use crate::dicom::DecodedImage;
use crate::platform::{Element, HostContext};
use crate::Result;
use std::sync::Arc;

/// Backend initialization switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendOptions {
    /// Render on the CPU; the host has no GPU context
    pub use_cpu_rendering: bool,
    pub use_shared_array_buffer: bool,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            use_cpu_rendering: true,
            use_shared_array_buffer: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportType {
    Stack,
}

/// Parameters for binding a viewport to an element
#[derive(Debug, Clone)]
pub struct ViewportInput {
    pub viewport_id: String,
    pub kind: ViewportType,
    pub element: Element,
    pub background: [u8; 3],
    /// Nearest-neighbour scaling instead of smoothing
    pub pixel_replication: bool,
}

/// A rendering engine driven through the synthetic host.
///
/// `render` must not block: the backend paints later and announces
/// completion by dispatching [`crate::platform::EventType::ImageRendered`]
/// through the viewport element.
pub trait RenderBackend {
    fn init(&mut self, host: &HostContext, options: BackendOptions) -> Result<()>;

    fn enable_element(&mut self, input: ViewportInput) -> Result<()>;

    fn set_stack(&mut self, viewport_id: &str, image: Arc<DecodedImage>) -> Result<()>;

    fn render(&mut self, viewport_id: &str) -> Result<()>;
}
