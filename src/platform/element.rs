//! Elements handed out by the document: surfaces or generic stubs

use super::document::DocumentState;
use super::events::Event;
use super::lock;
use super::surface::SurfaceHandle;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Selector the backend uses to find its viewport container
pub const VIEWPORT_SELECTOR: &str = "div.viewport-element";
/// Selector the backend uses to find its drawing surface
pub const CANVAS_SELECTOR: &str = "canvas.cornerstone-canvas";

/// An element created through [`crate::platform::Document::create_element`].
#[derive(Clone, Debug)]
pub enum Element {
    Surface(SurfaceHandle),
    Generic(GenericElement),
}

impl Element {
    pub fn tag_name(&self) -> &str {
        match self {
            Element::Surface(_) => "canvas",
            Element::Generic(g) => g.tag_name(),
        }
    }

    pub fn as_surface(&self) -> Option<&SurfaceHandle> {
        match self {
            Element::Surface(s) => Some(s),
            Element::Generic(_) => None,
        }
    }

    pub fn as_generic(&self) -> Option<&GenericElement> {
        match self {
            Element::Generic(g) => Some(g),
            Element::Surface(_) => None,
        }
    }
}

/// Non-surface element: attributes, event forwarding and the two selectors
/// the backend queries.
#[derive(Clone)]
pub struct GenericElement {
    tag: String,
    attrs: Arc<Mutex<HashMap<String, String>>>,
    document: Arc<DocumentState>,
}

impl std::fmt::Debug for GenericElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenericElement").field("tag", &self.tag).finish()
    }
}

impl GenericElement {
    pub(crate) fn new(tag: &str, document: Arc<DocumentState>) -> Self {
        GenericElement {
            tag: tag.to_ascii_lowercase(),
            attrs: Arc::new(Mutex::new(HashMap::new())),
            document,
        }
    }

    pub fn tag_name(&self) -> &str {
        &self.tag
    }

    pub fn set_attribute(&self, name: &str, value: &str) {
        log::debug!("<{}> attribute {:?} set to {:?}", self.tag, name, value);
        lock(&self.attrs).insert(name.to_string(), value.to_string());
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        lock(&self.attrs).get(name).cloned()
    }

    /// Forward an event to the document's registered listener, if any.
    pub fn dispatch_event(&self, event: &Event) -> bool {
        log::debug!("<{}> dispatching {}", self.tag, event.kind.as_str());
        self.document.listener.dispatch(event)
    }

    pub fn query_selector(&self, selector: &str) -> Option<Element> {
        match selector {
            VIEWPORT_SELECTOR => Some(Element::Generic(self.clone())),
            CANVAS_SELECTOR => self.document.primary().map(Element::Surface),
            other => {
                log::warn!("unknown selector queried: {}", other);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::platform::{Document, Element, Event, EventType};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn div(doc: &Document) -> super::GenericElement {
        match doc.create_element("div") {
            Element::Generic(g) => g,
            Element::Surface(_) => panic!("div should be generic"),
        }
    }

    #[test]
    fn attributes_are_stored() {
        let doc = Document::new();
        let el = div(&doc);
        el.set_attribute("data-viewport-uid", "CT_STACK");
        assert_eq!(el.attribute("data-viewport-uid").as_deref(), Some("CT_STACK"));
        assert_eq!(el.attribute("missing"), None);
    }

    #[test]
    fn dispatch_forwards_to_document_listener() {
        let doc = Document::new();
        let el = div(&doc);
        assert!(!el.dispatch_event(&Event::new(EventType::ImageRendered, "v")));

        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        doc.listen(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert!(el.dispatch_event(&Event::new(EventType::ImageRendered, "v")));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn selectors_resolve_viewport_and_primary_canvas() {
        let doc = Document::new();
        let el = div(&doc);
        assert!(el.query_selector(super::CANVAS_SELECTOR).is_none());

        let primary = doc.create_surface();
        let viewport = el.query_selector(super::VIEWPORT_SELECTOR).unwrap();
        let canvas = viewport
            .as_generic()
            .unwrap()
            .query_selector(super::CANVAS_SELECTOR)
            .unwrap();
        assert!(canvas.as_surface().unwrap().same_surface(&primary));
        assert!(el.query_selector("span.nothing").is_none());
    }
}
