//! Synthetic host environment for the rendering backend.
//!
//! A display-oriented renderer expects a document it can create drawing
//! surfaces in, an event sink it can dispatch completion events to, and a file
//! reader. This module provides just enough of each so the backend runs with
//! no windowing system. One [`HostContext`] is built per render operation and
//! passed explicitly to the orchestrator and backend.

pub mod document;
pub mod element;
pub mod events;
pub mod file_reader;
pub mod surface;

pub use document::Document;
pub use element::{Element, GenericElement};
pub use events::{completion_signal, CompletionSignal, CompletionWait, Event, EventType, ListenerSlot};
pub use file_reader::{Blob, FileReader, ReadSource};
pub use surface::{Context2d, RawPixelBuffer, SurfaceHandle};

use crate::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Delay used to emulate `requestAnimationFrame`
pub const ANIMATION_FRAME: Duration = Duration::from_millis(16);

pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Resolve on the next emulated animation frame.
pub async fn next_animation_frame() {
    log::debug!("scheduled animation frame");
    tokio::time::sleep(ANIMATION_FRAME).await;
}

/// Minimal navigator: a fixed user agent and no GPU.
#[derive(Debug, Clone)]
pub struct Navigator {
    pub user_agent: String,
}

impl Default for Navigator {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Rust; DICOM on the Server)".to_string(),
        }
    }
}

impl Navigator {
    pub fn gpu_available(&self) -> bool {
        false
    }
}

/// The per-operation environment handed to the rendering backend.
///
/// Holds the document (surfaces and the single listener slot) and the
/// navigator stub. A context supports exactly one render; see
/// [`crate::rendering::render_image`].
pub struct HostContext {
    document: Document,
    navigator: Navigator,
    rendered: AtomicBool,
}

impl HostContext {
    pub fn new() -> Self {
        HostContext {
            document: Document::new(),
            navigator: Navigator::default(),
            rendered: AtomicBool::new(false),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    /// A fresh file reader with no callbacks registered.
    pub fn file_reader(&self) -> FileReader {
        FileReader::new()
    }

    pub async fn request_animation_frame(&self) {
        next_animation_frame().await
    }

    /// Mark this context as used for a render. Fails on the second call.
    pub(crate) fn claim_render(&self) -> Result<()> {
        if self.rendered.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyRendered);
        }
        Ok(())
    }
}

impl Default for HostContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_context_has_no_primary_surface() {
        let host = HostContext::new();
        assert!(host.document().primary_surface().is_none());
        assert!(!host.navigator().gpu_available());
        assert!(host.navigator().user_agent.contains("DICOM"));
    }

    #[test]
    fn render_can_be_claimed_once() {
        let host = HostContext::new();
        assert!(host.claim_render().is_ok());
        assert!(matches!(host.claim_render(), Err(Error::AlreadyRendered)));
    }
}
