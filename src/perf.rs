//! Checkpoint recorder for coarse pipeline timings.
//!
//! Recording is gated by [`RenderConfig::perf`](crate::RenderConfig); when
//! disabled every call is a no-op and [`Checkpoints::results`] returns `None`.

use std::io::Write;
use std::time::{SystemTime, UNIX_EPOCH};

/// One recorded checkpoint
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    pub label: String,
    /// Milliseconds since the Unix epoch
    pub ts: u64,
    /// Milliseconds since the previous entry (or the supplied reference)
    pub since: Option<u64>,
}

/// Append-only ordered timestamp log
#[derive(Debug, Clone)]
pub struct Checkpoints {
    enabled: bool,
    entries: Vec<Checkpoint>,
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl Checkpoints {
    pub fn new(enabled: bool) -> Self {
        let mut cp = Self { enabled, entries: Vec::new() };
        cp.checkpoint("perf-init");
        cp
    }

    pub fn disabled() -> Self {
        Self::new(false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn entries(&self) -> &[Checkpoint] {
        &self.entries
    }

    /// Record `label` with the delta since the previous entry.
    pub fn checkpoint(&mut self, label: &str) {
        let prev = self.entries.last().map(|c| c.ts);
        self.record(label, now_millis(), prev);
    }

    /// Record `label` with the delta since an explicit reference timestamp.
    pub fn checkpoint_since(&mut self, label: &str, since_ts: u64) {
        self.record(label, now_millis(), Some(since_ts));
    }

    /// Record an aggregate entry measured from the first checkpoint.
    pub fn total(&mut self, label: &str) {
        if let Some(first) = self.entries.first().map(|c| c.ts) {
            self.checkpoint_since(label, first);
        }
    }

    fn record(&mut self, label: &str, ts: u64, reference: Option<u64>) {
        if !self.enabled {
            return;
        }
        self.entries.push(Checkpoint {
            label: label.to_string(),
            ts,
            since: reference.map(|r| ts.saturating_sub(r)),
        });
    }

    /// Render the log as ordered lines.
    ///
    /// When `diag` is given a `total-runtime` entry is appended first and the
    /// dump is written to it. The primary output stream is never touched.
    pub fn results(&mut self, diag: Option<&mut dyn Write>) -> Option<String> {
        if !self.enabled {
            return None;
        }
        if diag.is_some() {
            self.total("total-runtime");
        }

        let lines = self
            .entries
            .iter()
            .map(|c| {
                let since = c.since.map(|s| s.to_string()).unwrap_or_default();
                format!("{} (+{}) {}", c.ts, since, c.label)
            })
            .collect::<Vec<_>>()
            .join("\n");

        if let Some(w) = diag {
            if let Err(e) = w.write_all(lines.as_bytes()).and_then(|_| w.flush()) {
                log::warn!("failed to write checkpoint dump: {}", e);
            }
        }
        Some(lines)
    }
}
