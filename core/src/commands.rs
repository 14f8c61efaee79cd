//! Per-keystroke commands addressed to the bridge's input context.
//!
//! Every command first checks that the engine is running. When it is not, the
//! call is logged and answered with `NotRunning` (or the documented safe
//! default for queries); nothing is scheduled and no event fires.
//!
//! Closures handed to the dispatcher capture only owned values: the resolved
//! key, the index, the input context handle.

use crate::error::BridgeError;
use crate::key::KeyDescriptor;
use crate::session::{Bridge, EngineState, Instance};
use std::sync::Arc;

impl Bridge {
    fn require_running(&self, command: &'static str) -> Result<Arc<EngineState>, BridgeError> {
        self.running().ok_or_else(|| {
            tracing::info!(command, "engine is not running, ignoring command");
            BridgeError::NotRunning
        })
    }

    /// Send a key, given as a symbolic descriptor or a single character.
    ///
    /// Descriptors that do not parse are rejected here and never reach the
    /// engine.
    pub fn send_key(&self, key: impl Into<KeyDescriptor>) -> Result<(), BridgeError> {
        let state = self.require_running("send_key")?;
        let descriptor = key.into();
        let key = descriptor.resolve().map_err(|err| {
            tracing::warn!(?descriptor, error = %err, "rejecting key");
            BridgeError::InvalidKey(err)
        })?;

        let ic = state.input_context;
        tracing::debug!(%key, "scheduling key event");
        state.dispatcher.schedule(move |instance: &mut Instance| {
            let handled = instance.engine.key_event(ic, &key, false)?;
            tracing::trace!(%key, handled, "key event delivered");
            Ok(())
        })
    }

    /// Send a key described as `"Modifier+...+sym"`.
    pub fn send_key_str(&self, descriptor: &str) -> Result<(), BridgeError> {
        self.send_key(descriptor)
    }

    /// Send a single character key.
    pub fn send_char(&self, ch: char) -> Result<(), BridgeError> {
        self.send_key(ch)
    }

    /// Select candidate `index` of the list most recently delivered.
    ///
    /// The index is checked on the engine thread, when the command runs,
    /// against the candidate count of the last `CandidateList` event. Indexes
    /// out of range are logged and dropped instead of reaching the engine.
    pub fn select_candidate(&self, index: usize) -> Result<(), BridgeError> {
        let state = self.require_running("select_candidate")?;
        let ic = state.input_context;
        tracing::debug!(index, "scheduling candidate selection");
        state.dispatcher.schedule(move |instance: &mut Instance| {
            let available = instance.panel.candidate_count();
            if index >= available {
                tracing::warn!(index, available, "candidate index out of range, not forwarded");
                return Ok(());
            }
            instance.engine.select_candidate(ic, index)
        })
    }

    /// Clear preedit, candidates and auxiliary text.
    pub fn reset_input_panel(&self) -> Result<(), BridgeError> {
        let state = self.require_running("reset_input_panel")?;
        let ic = state.input_context;
        state
            .dispatcher
            .schedule(move |instance: &mut Instance| instance.engine.reset_input_panel(ic))
    }

    /// Whether the input panel is empty. `true` when the engine is not running.
    ///
    /// Answered on the calling thread from the snapshot the engine thread
    /// republishes after every command; it may trail commands still queued.
    pub fn is_input_panel_empty(&self) -> bool {
        match self.require_running("is_input_panel_empty") {
            Ok(state) => state.panel.is_empty(),
            Err(_) => true,
        }
    }
}
