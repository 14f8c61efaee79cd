//! Host-visible events and the sink they are delivered to.

use serde::Serialize;
use std::sync::mpsc::Sender;

/// The closed set of notifications the bridge delivers to the host.
///
/// Each engine notification yields exactly one `Event`, in the order the
/// engine raised it. Nothing is buffered, merged or reordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Full ordered candidate sequence. Empty means the panel was cleared.
    CandidateList { items: Vec<String> },

    /// Text to insert into the target field.
    Commit { text: String },

    /// Rich display form plus the simplified form shown in the client.
    Preedit { display: String, client_view: String },

    /// Upper and lower auxiliary strings. Either may be empty.
    AuxText { before: String, after: String },
}

/// Numeric event kinds, stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum EventKind {
    CandidateList = 0,
    Commit = 1,
    Preedit = 2,
    AuxText = 3,
}

impl EventKind {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::CandidateList { .. } => EventKind::CandidateList,
            Event::Commit { .. } => EventKind::Commit,
            Event::Preedit { .. } => EventKind::Preedit,
            Event::AuxText { .. } => EventKind::AuxText,
        }
    }

    /// Flatten into `(kind, payload...)`, the shape hosts with an untyped
    /// callback boundary expect.
    pub fn into_parts(self) -> (EventKind, Vec<String>) {
        match self {
            Event::CandidateList { items } => (EventKind::CandidateList, items),
            Event::Commit { text } => (EventKind::Commit, vec![text]),
            Event::Preedit {
                display,
                client_view,
            } => (EventKind::Preedit, vec![display, client_view]),
            Event::AuxText { before, after } => (EventKind::AuxText, vec![before, after]),
        }
    }

    /// True for a `CandidateList` with no items.
    pub fn is_empty_candidate_list(&self) -> bool {
        matches!(self, Event::CandidateList { items } if items.is_empty())
    }
}

/// Receiver of host-visible events.
///
/// Called synchronously on the engine thread. Implementations must return
/// quickly; hand the event off to another thread if handling is slow.
pub trait EventSink: Send + Sync + 'static {
    fn handle_event(&self, event: Event);
}

impl<F> EventSink for F
where
    F: Fn(Event) + Send + Sync + 'static,
{
    fn handle_event(&self, event: Event) {
        self(event)
    }
}

/// Sink that forwards every event into an unbounded channel.
///
/// Sending never blocks, so the engine thread is not held up by the host.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<Event>,
}

impl ChannelSink {
    pub fn new(tx: Sender<Event>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelSink {
    fn handle_event(&self, event: Event) {
        if self.tx.send(event).is_err() {
            tracing::trace!("event receiver dropped, discarding event");
        }
    }
}
