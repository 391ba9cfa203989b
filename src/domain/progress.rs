//! Progress events emitted while a run is in flight.
//!
//! Events are pushed to a [`ProgressSink`] in strict unit order. The sink is
//! owned by the caller, which typically forwards each event to a remote
//! client the instant it is produced.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::ViewKind;

/// A single progress notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    /// Kind of notification
    pub kind: ProgressKind,

    /// Units attempted so far
    pub current: u32,

    /// Units planned for the run, fixed at start
    pub total: u32,

    /// View being generated (progress events only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_kind: Option<ViewKind>,

    /// 1-based proposition number (progress events only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proposition_index: Option<u32>,

    /// Human-readable message
    pub message: String,
}

impl ProgressEvent {
    pub fn start(total: u32, message: impl Into<String>) -> Self {
        Self {
            kind: ProgressKind::Start,
            current: 0,
            total,
            view_kind: None,
            proposition_index: None,
            message: message.into(),
        }
    }

    pub fn progress(
        current: u32,
        total: u32,
        view_kind: ViewKind,
        proposition_index: u32,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: ProgressKind::Progress,
            current,
            total,
            view_kind: Some(view_kind),
            proposition_index: Some(proposition_index),
            message: message.into(),
        }
    }

    pub fn complete(total: u32, message: impl Into<String>) -> Self {
        Self {
            kind: ProgressKind::Complete,
            current: total,
            total,
            view_kind: None,
            proposition_index: None,
            message: message.into(),
        }
    }

    pub fn error(current: u32, total: u32, message: impl Into<String>) -> Self {
        Self {
            kind: ProgressKind::Error,
            current,
            total,
            view_kind: None,
            proposition_index: None,
            message: message.into(),
        }
    }
}

/// Kinds of progress notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressKind {
    /// Emitted once, before any remote call
    Start,

    /// A unit is about to be generated
    Progress,

    /// The run finished (even if nothing was generated)
    Complete,

    /// The run could not start or was cancelled
    Error,
}

/// Receiver of progress events
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Sink that drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn emit(&self, _event: ProgressEvent) {}
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn emit(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Forwards every event to several sinks, in order
#[derive(Default, Clone)]
pub struct FanOut {
    sinks: Vec<Arc<dyn ProgressSink>>,
}

impl FanOut {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl ProgressSink for FanOut {
    fn emit(&self, event: ProgressEvent) {
        for sink in &self.sinks {
            sink.emit(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_event_serialization() {
        let event = ProgressEvent::progress(3, 6, ViewKind::ThreeQuarter, 2, "rendering");
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["kind"], "progress");
        assert_eq!(json["viewKind"], "threeQuarter");
        assert_eq!(json["propositionIndex"], 2);
        assert_eq!(json["current"], 3);
    }

    #[test]
    fn test_start_omits_unit_fields() {
        let json = serde_json::to_value(ProgressEvent::start(6, "go")).unwrap();
        assert!(json.get("viewKind").is_none());
        assert!(json.get("propositionIndex").is_none());
        assert_eq!(json["current"], 0);
    }

    #[test]
    fn test_complete_reaches_total() {
        let event = ProgressEvent::complete(6, "done");
        assert_eq!(event.current, 6);
        assert_eq!(event.total, 6);
    }

    #[test]
    fn test_fan_out_preserves_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let a = {
            let seen = seen.clone();
            Arc::new(move |e: ProgressEvent| seen.lock().unwrap().push(("a", e.current)))
        };
        let b = {
            let seen = seen.clone();
            Arc::new(move |e: ProgressEvent| seen.lock().unwrap().push(("b", e.current)))
        };

        let fan = FanOut::new().with(a).with(b);
        fan.emit(ProgressEvent::start(2, "go"));

        assert_eq!(*seen.lock().unwrap(), vec![("a", 0), ("b", 0)]);
    }
}
