//! Event marshalling from the engine to the host.
//!
//! The engine is handed a [`Frontend`] during initialization and calls it
//! whenever its visible state changes. Every call is converted into exactly
//! one [`Event`] and delivered synchronously to the host's sink, in call
//! order. Calls happen on the engine thread.

use crate::event::{Event, EventSink};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Snapshot of panel state published by the engine thread.
///
/// Read from arbitrary threads for the synchronous queries. The engine thread
/// is the only writer.
#[derive(Debug)]
pub(crate) struct PanelSnapshot {
    empty: AtomicBool,
    candidate_count: AtomicUsize,
}

impl Default for PanelSnapshot {
    fn default() -> Self {
        Self {
            empty: AtomicBool::new(true),
            candidate_count: AtomicUsize::new(0),
        }
    }
}

impl PanelSnapshot {
    pub(crate) fn is_empty(&self) -> bool {
        self.empty.load(Ordering::Acquire)
    }

    pub(crate) fn set_empty(&self, empty: bool) {
        self.empty.store(empty, Ordering::Release);
    }

    pub(crate) fn candidate_count(&self) -> usize {
        self.candidate_count.load(Ordering::Acquire)
    }

    fn set_candidate_count(&self, count: usize) {
        self.candidate_count.store(count, Ordering::Release);
    }
}

/// The callbacks registered with the engine.
///
/// Cloning is cheap; all clones deliver to the same sink.
#[derive(Clone)]
pub struct Frontend {
    sink: Arc<dyn EventSink>,
    panel: Arc<PanelSnapshot>,
}

impl Frontend {
    /// Create a frontend delivering to `sink`.
    ///
    /// The bridge builds its own frontend during startup; this constructor is
    /// for driving an engine directly.
    pub fn new(sink: impl EventSink) -> Self {
        Self::with_snapshot(Arc::new(sink), Arc::new(PanelSnapshot::default()))
    }

    pub(crate) fn with_snapshot(sink: Arc<dyn EventSink>, panel: Arc<PanelSnapshot>) -> Self {
        Self { sink, panel }
    }

    /// The candidate list changed. `candidates` is the full ordered list.
    pub fn candidate_list(&self, candidates: Vec<String>) {
        self.panel.set_candidate_count(candidates.len());
        self.emit(Event::CandidateList { items: candidates });
    }

    /// Text was committed to the client.
    pub fn commit_string(&self, text: &str) {
        self.emit(Event::Commit {
            text: text.to_string(),
        });
    }

    /// The preedit changed.
    pub fn preedit(&self, display: &str, client_view: &str) {
        self.emit(Event::Preedit {
            display: display.to_string(),
            client_view: client_view.to_string(),
        });
    }

    /// The auxiliary text changed.
    pub fn input_panel_aux(&self, before: &str, after: &str) {
        self.emit(Event::AuxText {
            before: before.to_string(),
            after: after.to_string(),
        });
    }

    fn emit(&self, event: Event) {
        tracing::trace!(kind = ?event.kind(), "engine event");
        self.sink.handle_event(event);
    }
}

impl std::fmt::Debug for Frontend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frontend")
            .field("panel", &self.panel)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn recording_frontend() -> (Frontend, Arc<Mutex<Vec<Event>>>, Arc<PanelSnapshot>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink_events = events.clone();
        let panel = Arc::new(PanelSnapshot::default());
        let frontend = Frontend::with_snapshot(
            Arc::new(move |event: Event| sink_events.lock().push(event)),
            panel.clone(),
        );
        (frontend, events, panel)
    }

    #[test]
    fn test_each_callback_yields_one_event() {
        let (frontend, events, _) = recording_frontend();

        frontend.candidate_list(vec!["你".into(), "尼".into(), "泥".into()]);
        frontend.preedit("ni", "你");
        frontend.input_panel_aux("拼音", "1/2");
        frontend.commit_string("你");

        let events = events.lock();
        assert_eq!(events.len(), 4);
        assert_eq!(
            events[0],
            Event::CandidateList {
                items: vec!["你".into(), "尼".into(), "泥".into()]
            }
        );
        assert_eq!(
            events[1],
            Event::Preedit {
                display: "ni".into(),
                client_view: "你".into()
            }
        );
        assert_eq!(
            events[2],
            Event::AuxText {
                before: "拼音".into(),
                after: "1/2".into()
            }
        );
        assert_eq!(events[3], Event::Commit { text: "你".into() });
    }

    #[test]
    fn test_no_coalescing_of_repeated_events() {
        let (frontend, events, _) = recording_frontend();

        frontend.commit_string("a");
        frontend.commit_string("a");
        frontend.candidate_list(vec![]);
        frontend.candidate_list(vec![]);

        assert_eq!(events.lock().len(), 4);
    }

    #[test]
    fn test_candidate_count_is_published() {
        let (frontend, _, panel) = recording_frontend();
        assert_eq!(panel.candidate_count(), 0);

        frontend.candidate_list(vec!["a".into(), "b".into()]);
        assert_eq!(panel.candidate_count(), 2);

        frontend.candidate_list(vec![]);
        assert_eq!(panel.candidate_count(), 0);
    }

    #[test]
    fn test_snapshot_defaults_to_empty() {
        let panel = PanelSnapshot::default();
        assert!(panel.is_empty());
        panel.set_empty(false);
        assert!(!panel.is_empty());
    }
}
