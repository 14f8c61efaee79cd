//! Error taxonomy for the bridge and the engine it hosts.
//!
//! Two layers of errors exist:
//!
//! - [`BridgeError`] is what callers of the command surface see. `NotRunning`
//!   is the common case and is always safe to ignore.
//! - [`EngineError`] is what the engine (or a scheduled command) reports from
//!   inside the run loop. Any `EngineError` ends the loop; `start` maps it to a
//!   `BridgeError` or a clean exit.

use crate::key::KeyParseError;
use thiserror::Error;

/// Status returned by `start` when the engine is already running.
pub const STATUS_ALREADY_RUNNING: i32 = 2;

/// Status returned by `start` for any unexpected failure.
pub const STATUS_FAILURE: i32 = 1;

/// Errors reported by the bridge command surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// `start` was called while an engine is starting, running or stopping.
    #[error("engine is already running")]
    AlreadyRunning,

    /// A command was issued while no engine is running. Logged and ignored.
    #[error("engine is not running")]
    NotRunning,

    /// The run loop ended with an uncaught failure.
    #[error("engine fault: {0}")]
    EngineFault(String),

    /// A key descriptor could not be resolved; nothing was scheduled.
    #[error("invalid key: {0}")]
    InvalidKey(#[from] KeyParseError),

    /// The startup configuration was rejected before the engine was built.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl BridgeError {
    /// Map the error onto the process-visible status code `start` reports.
    pub fn exit_status(&self) -> i32 {
        match self {
            BridgeError::AlreadyRunning => STATUS_ALREADY_RUNNING,
            _ => STATUS_FAILURE,
        }
    }
}

/// Errors raised inside the engine's execution context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Expected, intentional termination. Treated as a clean exit.
    #[error("engine requested a quiet quit")]
    QuietQuit,

    /// Anything else. Ends the loop and surfaces as `BridgeError::EngineFault`.
    #[error("{0}")]
    Fault(String),
}

impl EngineError {
    /// Convenience constructor for `EngineError::Fault`.
    pub fn fault(message: impl Into<String>) -> Self {
        EngineError::Fault(message.into())
    }

    /// Map how the run loop ended onto what `start` returns.
    ///
    /// A quiet quit is a clean exit with status 0, never a fault.
    pub fn into_exit_status(self) -> Result<i32, BridgeError> {
        match self {
            EngineError::QuietQuit => Ok(0),
            EngineError::Fault(message) => Err(BridgeError::EngineFault(message)),
        }
    }
}

impl From<anyhow::Error> for EngineError {
    fn from(err: anyhow::Error) -> Self {
        EngineError::Fault(format!("{:#}", err))
    }
}
