//! Event types, the single-slot listener and the one-shot completion signal

use super::lock;
use crate::{Error, Result};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

/// Events the backend dispatches through viewport elements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    ElementEnabled,
    StackNewImage,
    ImageRendered,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::ElementEnabled => "CORNERSTONE_ELEMENT_ENABLED",
            EventType::StackNewImage => "CORNERSTONE_STACK_NEW_IMAGE",
            EventType::ImageRendered => "CORNERSTONE_IMAGE_RENDERED",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: EventType,
    pub viewport_id: Option<String>,
}

impl Event {
    pub fn new(kind: EventType, viewport_id: &str) -> Self {
        Event {
            kind,
            viewport_id: Some(viewport_id.to_string()),
        }
    }
}

pub type EventCallback = Arc<dyn Fn(&Event) + Send + Sync>;

/// Holds at most one event callback.
///
/// Registering replaces the previous callback; nothing is queued. Dispatching
/// with an empty slot does nothing.
#[derive(Default)]
pub struct ListenerSlot {
    callback: Mutex<Option<EventCallback>>,
}

impl ListenerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn listen(&self, cb: EventCallback) {
        *lock(&self.callback) = Some(cb);
    }

    pub fn clear(&self) {
        *lock(&self.callback) = None;
    }

    /// Invoke the registered callback. Returns whether one was registered.
    pub fn dispatch(&self, event: &Event) -> bool {
        // Release the slot before calling so the callback may re-register.
        let cb = lock(&self.callback).clone();
        match cb {
            Some(cb) => {
                cb(event);
                true
            }
            None => {
                log::debug!("dropped {} event: no listener", event.kind.as_str());
                false
            }
        }
    }
}

/// Sending half of a single-resolution signal. Fires at most once.
pub struct CompletionSignal<T> {
    tx: Mutex<Option<oneshot::Sender<T>>>,
}

/// Receiving half of a [`CompletionSignal`].
pub struct CompletionWait<T> {
    rx: oneshot::Receiver<T>,
}

/// Create a linked signal/wait pair.
pub fn completion_signal<T>() -> (Arc<CompletionSignal<T>>, CompletionWait<T>) {
    let (tx, rx) = oneshot::channel();
    (
        Arc::new(CompletionSignal { tx: Mutex::new(Some(tx)) }),
        CompletionWait { rx },
    )
}

impl<T> CompletionSignal<T> {
    /// Resolve the signal. Returns false if it already fired or the waiter is gone.
    pub fn fire(&self, value: T) -> bool {
        match lock(&self.tx).take() {
            Some(tx) => tx.send(value).is_ok(),
            None => false,
        }
    }

    pub fn has_fired(&self) -> bool {
        lock(&self.tx).is_none()
    }
}

impl<T> CompletionWait<T> {
    /// Wait without a bound.
    pub async fn recv(self) -> Result<T> {
        self.rx
            .await
            .map_err(|_| Error::Other("completion signal dropped before firing".to_string()))
    }

    /// Wait at most `timeout`; a signal that never fires becomes [`Error::Timeout`].
    pub async fn wait(self, timeout: Duration) -> Result<T> {
        match tokio::time::timeout(timeout, self.rx).await {
            Ok(Ok(v)) => Ok(v),
            Ok(Err(_)) => Err(Error::RenderError(
                "completion signal dropped before firing".to_string(),
            )),
            Err(_) => Err(Error::Timeout(timeout.as_millis() as u64)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn second_listener_replaces_first() {
        let slot = ListenerSlot::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let f = first.clone();
        slot.listen(Arc::new(move |_| {
            f.fetch_add(1, Ordering::SeqCst);
        }));
        let s = second.clone();
        slot.listen(Arc::new(move |_| {
            s.fetch_add(1, Ordering::SeqCst);
        }));

        assert!(slot.dispatch(&Event::new(EventType::ImageRendered, "v")));
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dispatch_without_listener_is_noop() {
        let slot = ListenerSlot::new();
        assert!(!slot.dispatch(&Event::new(EventType::ImageRendered, "v")));
    }

    #[test]
    fn cleared_slot_reports_no_listener() {
        let slot = ListenerSlot::new();
        slot.listen(Arc::new(|_| {}));
        assert!(slot.dispatch(&Event::new(EventType::ImageRendered, "v")));
        slot.clear();
        assert!(!slot.dispatch(&Event::new(EventType::ImageRendered, "v")));
    }

    #[tokio::test]
    async fn signal_fires_at_most_once() {
        let (signal, wait) = completion_signal::<u32>();
        assert!(signal.fire(7));
        assert!(!signal.fire(8));
        assert!(signal.has_fired());
        assert_eq!(wait.recv().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn unfired_signal_times_out() {
        let (_signal, wait) = completion_signal::<()>();
        let err = wait.wait(Duration::from_millis(20)).await.unwrap_err();
        assert!(matches!(err, Error::Timeout(20)));
    }
}
