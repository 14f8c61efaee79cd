//! imebridge-core
//!
//! Embedding bridge between a host application and an input-method engine.
//! The engine runs its own loop on a thread the host dedicates to it; the
//! host drives it from any thread through a small command surface and
//! receives the engine's output as typed events.
//!
//! Public API:
//! - `Bridge` - Engine lifecycle (`start`/`stop`) and per-keystroke commands
//! - `InputMethodEngine` - The engine capability the bridge hosts
//! - `Frontend` / `Event` / `EventSink` - Engine output, marshalled to the host
//! - `Dispatcher` / `EventLoop` - Task queue onto the engine thread
//! - `BridgeConfig` / `Environment` - Startup paths and derived environment
//! - `Key` / `KeyDescriptor` - Key descriptors accepted by `send_key`
//! - `OutputRedirector` - Capture of stdout/stderr into the log
//!
//! ```no_run
//! use imebridge_core::{Bridge, BridgeConfig, Environment, Event, InputMethodEngine, StartupPaths};
//!
//! fn run<E: InputMethodEngine>(build: fn(&Environment) -> anyhow::Result<E>) {
//!     let paths = StartupPaths::new("/data/app", "/data/app/lib", "/sdcard/app");
//!     let config = BridgeConfig::new(paths);
//!     std::thread::spawn(move || {
//!         Bridge::global().start(&config, build, |event: Event| println!("{event:?}"))
//!     });
//!
//!     Bridge::global().send_key("n").ok();
//! }
//! ```

mod commands;
pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod event;
pub mod key;
pub mod logging;
pub mod marshaller;
pub mod redirect;
pub mod session;

pub use config::{BridgeConfig, ConfigError, Environment, StartupPaths};
pub use dispatcher::{Dispatcher, EventLoop, LoopControl, Task};
pub use engine::{InputContextId, InputMethodEngine};
pub use error::{BridgeError, EngineError, STATUS_ALREADY_RUNNING, STATUS_FAILURE};
pub use event::{ChannelSink, Event, EventKind, EventSink};
pub use key::{Key, KeyDescriptor, KeyParseError, KeyStates, KeySym, NamedKey};
pub use logging::{init_logging, DEFAULT_FILTER};
pub use marshaller::Frontend;
pub use redirect::{
    forward_lines, LineSink, OutputRedirector, RedirectError, SavedStreams, TracingLineSink,
    ENGINE_OUTPUT_TARGET,
};
pub use session::{Bridge, Phase};
