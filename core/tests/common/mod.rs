// core/tests/common/mod.rs
//
// Shared harness for the bridge integration tests: a scripted engine that
// records every call it receives (with the calling thread) and a helper that
// runs a bridge on a dedicated engine thread.

#![allow(dead_code)]

use imebridge_core::{
    Bridge, BridgeConfig, BridgeError, ChannelSink, EngineError, Event, Frontend, InputContextId,
    InputMethodEngine, Key, KeySym, NamedKey, StartupPaths,
};
use parking_lot::Mutex;
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

pub const TIMEOUT: Duration = Duration::from_secs(5);

/// One call the engine received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub op: String,
    pub thread: ThreadId,
}

pub type CallLog = Arc<Mutex<Vec<Call>>>;

/// Engine with predictable output.
///
/// - a character key appends to the buffer and publishes three candidates
///   (`<buffer>1`, `<buffer>2`, `<buffer>3`) followed by the preedit
/// - `BackSpace` removes the last character
/// - `!` fails the engine, `Control+q` quits quietly
/// - selecting candidate `i` commits it and clears the panel
/// - only the input method "scripted" exists
pub struct ScriptedEngine {
    calls: CallLog,
    frontend: Option<Frontend>,
    buffer: String,
    candidates: Vec<String>,
}

impl ScriptedEngine {
    pub fn new(calls: CallLog) -> Self {
        Self {
            calls,
            frontend: None,
            buffer: String::new(),
            candidates: Vec::new(),
        }
    }

    fn record(&self, op: impl Into<String>) {
        self.calls.lock().push(Call {
            op: op.into(),
            thread: thread::current().id(),
        });
    }

    fn publish(&mut self) {
        self.candidates = if self.buffer.is_empty() {
            Vec::new()
        } else {
            (1..=3).map(|i| format!("{}{}", self.buffer, i)).collect()
        };
        if let Some(frontend) = &self.frontend {
            frontend.candidate_list(self.candidates.clone());
            frontend.preedit(&self.buffer, &self.buffer);
        }
    }
}

impl InputMethodEngine for ScriptedEngine {
    fn set_input_methods(&mut self, methods: &[String], default: &str) -> Result<(), EngineError> {
        self.record(format!("set_input_methods:{}:{}", methods.join(","), default));
        if methods.iter().any(|m| m != "scripted") {
            return Err(EngineError::fault("unknown input method"));
        }
        Ok(())
    }

    fn set_frontend(&mut self, frontend: Frontend) {
        self.record("set_frontend");
        self.frontend = Some(frontend);
    }

    fn create_input_context(&mut self, program: &str) -> Result<InputContextId, EngineError> {
        self.record(format!("create_input_context:{}", program));
        Ok(InputContextId::generate())
    }

    fn key_event(
        &mut self,
        _ic: InputContextId,
        key: &Key,
        _is_release: bool,
    ) -> Result<bool, EngineError> {
        self.record(format!("key:{}", key));
        if key.states.ctrl && key.sym == KeySym::Char('q') {
            return Err(EngineError::QuietQuit);
        }
        match key.sym {
            KeySym::Char('!') => Err(EngineError::fault("boom")),
            KeySym::Char(ch) => {
                self.buffer.push(ch);
                self.publish();
                Ok(true)
            }
            KeySym::Named(NamedKey::BackSpace) => {
                let consumed = self.buffer.pop().is_some();
                self.publish();
                Ok(consumed)
            }
            KeySym::Named(_) => Ok(false),
        }
    }

    fn select_candidate(&mut self, _ic: InputContextId, index: usize) -> Result<(), EngineError> {
        self.record(format!("select:{}", index));
        let text = self
            .candidates
            .get(index)
            .cloned()
            .ok_or_else(|| EngineError::fault("select past end of candidate list"))?;
        if let Some(frontend) = &self.frontend {
            frontend.commit_string(&text);
        }
        self.buffer.clear();
        self.publish();
        Ok(())
    }

    fn is_input_panel_empty(&self, _ic: InputContextId) -> bool {
        self.buffer.is_empty()
    }

    fn reset_input_panel(&mut self, _ic: InputContextId) -> Result<(), EngineError> {
        self.record("reset");
        self.buffer.clear();
        self.publish();
        if let Some(frontend) = &self.frontend {
            frontend.input_panel_aux("", "");
        }
        Ok(())
    }
}

pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn test_config() -> BridgeConfig {
    let mut config = BridgeConfig::new(StartupPaths::new("/app/data", "/app/lib", "/ext"));
    config.input_methods = vec!["scripted".to_string()];
    config.default_input_method = "scripted".to_string();
    config.program = "harness".to_string();
    config.apply_environment = false;
    config
}

/// A bridge with a running [`ScriptedEngine`] on its own thread.
pub struct Harness {
    pub bridge: Arc<Bridge>,
    pub events: Receiver<Event>,
    pub calls: CallLog,
    pub engine_thread: ThreadId,
    handle: JoinHandle<Result<i32, BridgeError>>,
}

impl Harness {
    pub fn start() -> Self {
        Self::start_on(Arc::new(Bridge::new()), test_config())
    }

    pub fn start_on(bridge: Arc<Bridge>, config: BridgeConfig) -> Self {
        let (handle, events, calls) = spawn_engine(bridge.clone(), config);
        assert!(bridge.wait_until_running(TIMEOUT), "engine did not start");
        let engine_thread = handle.thread().id();
        Self {
            bridge,
            events,
            calls,
            engine_thread,
            handle,
        }
    }

    /// Stop the engine and wait for its thread; returns `start`'s result.
    pub fn stop(self) -> (Result<i32, BridgeError>, Vec<Call>, Vec<Event>) {
        self.bridge.stop().expect("engine should be running");
        self.join()
    }

    /// Wait for the engine thread without requesting a stop.
    pub fn join(self) -> (Result<i32, BridgeError>, Vec<Call>, Vec<Event>) {
        let result = self.handle.join().expect("engine thread panicked");
        let calls = self.calls.lock().clone();
        let events = self.events.try_iter().collect();
        (result, calls, events)
    }

    /// Next event, failing the test after [`TIMEOUT`].
    pub fn next_event(&self) -> Event {
        self.events
            .recv_timeout(TIMEOUT)
            .expect("timed out waiting for event")
    }

    /// Operations recorded after initialization.
    pub fn command_ops(calls: &[Call]) -> Vec<String> {
        calls.iter().skip(3).map(|c| c.op.clone()).collect()
    }
}

pub fn spawn_engine(
    bridge: Arc<Bridge>,
    config: BridgeConfig,
) -> (JoinHandle<Result<i32, BridgeError>>, Receiver<Event>, CallLog) {
    init_test_logging();
    let (tx, rx) = mpsc::channel();
    let calls: CallLog = Arc::new(Mutex::new(Vec::new()));
    let engine_calls = calls.clone();
    let handle = thread::Builder::new()
        .name("engine".to_string())
        .spawn(move || {
            bridge.start(
                &config,
                move |_| Ok(ScriptedEngine::new(engine_calls)),
                ChannelSink::new(tx),
            )
        })
        .expect("failed to spawn engine thread");
    (handle, rx, calls)
}

/// Poll `condition` until it holds or [`TIMEOUT`] elapses.
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + TIMEOUT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}
