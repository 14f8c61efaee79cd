//! imebridge-table
//!
//! A small table-driven input-method engine implementing
//! `imebridge_core::InputMethodEngine`. It is the engine the host binary runs
//! and the one the end-to-end tests drive through the bridge.
//!
//! Public API:
//! - `TableEngine` - The engine; build it with `TableEngine::from_environment`
//! - `PhraseTable` - Code to phrase lookup, from TOML or the built-in sample
//! - `CandidatePager` - Paged view over a candidate list
//! - `InputBuffer` - Raw input with cursor

pub mod candidates;
pub mod engine;
pub mod input_buffer;
pub mod table;

pub use candidates::{CandidatePager, PAGE_SIZE};
pub use engine::{InputMethod, TableEngine};
pub use input_buffer::InputBuffer;
pub use table::{PhraseTable, TableError, TABLE_FILE};
