//! The synthetic document: surface factory, primary slot and listener slot

use super::element::{Element, GenericElement};
use super::events::{Event, ListenerSlot};
use super::lock;
use super::surface::{RawPixelBuffer, SurfaceHandle};
use crate::{Error, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub(crate) struct DocumentState {
    primary: Mutex<Option<SurfaceHandle>>,
    pub(crate) listener: ListenerSlot,
    created: AtomicUsize,
}

impl DocumentState {
    pub(crate) fn primary(&self) -> Option<SurfaceHandle> {
        lock(&self.primary).clone()
    }
}

/// Document-like factory the backend creates surfaces and elements through.
///
/// The first surface created becomes the primary surface; it is the only one
/// reachable through [`Document::primary_surface`] and
/// [`Document::capture_primary`]. Later surfaces are utility surfaces.
#[derive(Clone)]
pub struct Document {
    state: Arc<DocumentState>,
}

impl Document {
    pub fn new() -> Self {
        Document {
            state: Arc::new(DocumentState {
                primary: Mutex::new(None),
                listener: ListenerSlot::new(),
                created: AtomicUsize::new(0),
            }),
        }
    }

    pub fn create_surface(&self) -> SurfaceHandle {
        let id = self.state.created.fetch_add(1, Ordering::SeqCst);
        let surface = SurfaceHandle::new(id);

        let mut primary = lock(&self.state.primary);
        if primary.is_none() {
            log::debug!("created primary surface {}", id);
            *primary = Some(surface.clone());
        } else {
            log::debug!("created utility surface {}", id);
        }
        surface
    }

    /// Create an element. `canvas` yields a surface; every other tag a generic stub.
    pub fn create_element(&self, tag: &str) -> Element {
        if tag.eq_ignore_ascii_case("canvas") {
            return Element::Surface(self.create_surface());
        }
        log::debug!("created stub <{}> element", tag);
        Element::Generic(GenericElement::new(tag, self.state.clone()))
    }

    pub fn primary_surface(&self) -> Option<SurfaceHandle> {
        self.state.primary()
    }

    /// Snapshot the full primary surface.
    pub fn capture_primary(&self) -> Result<RawPixelBuffer> {
        let surface = self
            .primary_surface()
            .ok_or_else(|| Error::RenderError("no primary surface to capture".to_string()))?;
        Ok(surface
            .context_2d()
            .get_image_data(0, 0, surface.width(), surface.height()))
    }

    /// Register the single event callback, replacing any previous one.
    pub fn listen<F>(&self, cb: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.state.listener.listen(Arc::new(cb));
    }

    pub fn clear_listener(&self) {
        self.state.listener.clear();
    }

    pub fn dispatch(&self, event: &Event) -> bool {
        self.state.listener.dispatch(event)
    }

    pub fn surfaces_created(&self) -> usize {
        self.state.created.load(Ordering::SeqCst)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::EventType;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn first_surface_is_primary_and_later_ones_are_not() {
        let doc = Document::new();
        let first = doc.create_surface();
        let second = doc.create_surface();

        let primary = doc.primary_surface().unwrap();
        assert!(primary.same_surface(&first));
        assert!(!primary.same_surface(&second));
        assert_eq!(doc.surfaces_created(), 2);
    }

    #[test]
    fn capture_reads_only_the_primary() {
        let doc = Document::new();
        let primary = doc.create_surface();
        primary.resize(1, 1);
        let utility = doc.create_surface();
        utility.resize(1, 1);
        utility.context_2d().fill_rect(0, 0, 1, 1, [5, 5, 5, 255]);

        let snap = doc.capture_primary().unwrap();
        assert_eq!(snap.data, vec![0, 0, 0, 0]);
    }

    #[test]
    fn capture_without_primary_fails() {
        assert!(Document::new().capture_primary().is_err());
    }

    #[test]
    fn canvas_tag_is_case_insensitive() {
        let doc = Document::new();
        assert!(doc.create_element("CANVAS").as_surface().is_some());
        assert!(doc.create_element("div").as_surface().is_none());
    }

    #[test]
    fn listen_and_dispatch() {
        let doc = Document::new();
        let hit = Arc::new(AtomicBool::new(false));
        let h = hit.clone();
        doc.listen(move |e| {
            if e.kind == EventType::ImageRendered {
                h.store(true, Ordering::SeqCst);
            }
        });
        doc.dispatch(&Event::new(EventType::ImageRendered, "v"));
        assert!(hit.load(Ordering::SeqCst));
    }
}
