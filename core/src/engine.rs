//! The engine capability hosted by the bridge.
//!
//! The bridge treats the engine as a black box reachable only through
//! [`InputMethodEngine`]. Engines are built on the engine thread by a factory
//! closure and never leave it, so they need not be `Send`.

use crate::error::EngineError;
use crate::key::Key;
use crate::marshaller::Frontend;
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// Opaque, engine-issued identifier of one input session.
///
/// Only valid while the engine that issued it is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct InputContextId(Uuid);

impl InputContextId {
    /// Issue a fresh identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for InputContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Fixed command surface of an input-method engine.
///
/// Every method is called on the engine thread. Returning an error from any
/// of them ends the run loop: `EngineError::QuietQuit` as a clean exit,
/// `EngineError::Fault` as a failure.
pub trait InputMethodEngine: 'static {
    /// Replace the active input-method group and pick the default method.
    ///
    /// An empty `default` means "first in `methods`".
    fn set_input_methods(&mut self, methods: &[String], default: &str) -> Result<(), EngineError>;

    /// Register the callbacks the engine reports its output through.
    fn set_frontend(&mut self, frontend: Frontend);

    /// Create an input context owned by `program`.
    fn create_input_context(&mut self, program: &str) -> Result<InputContextId, EngineError>;

    /// Deliver a key. Returns whether the engine consumed it.
    fn key_event(
        &mut self,
        ic: InputContextId,
        key: &Key,
        is_release: bool,
    ) -> Result<bool, EngineError>;

    /// Select candidate `index` of the currently displayed list.
    fn select_candidate(&mut self, ic: InputContextId, index: usize) -> Result<(), EngineError>;

    /// Whether the input panel currently shows nothing.
    fn is_input_panel_empty(&self, ic: InputContextId) -> bool;

    /// Clear preedit, candidates and auxiliary text.
    fn reset_input_panel(&mut self, ic: InputContextId) -> Result<(), EngineError>;
}
