//! Engine session: ownership of the single running engine and its lifecycle.
//!
//! A [`Bridge`] moves through `Stopped -> Starting -> Running -> Stopping ->
//! Stopped`. The whole lifecycle lives in one slot behind one lock, so "is the
//! engine present" is a single check. Only the engine thread promotes the
//! slot to `Running` (after initialization) and `start` always resets it to
//! `Stopped` on the way out.
//!
//! The engine instance itself never leaves the engine thread. What the slot
//! publishes to other threads is an [`EngineState`]: the dispatcher, the input
//! context handle and the panel snapshot.

use crate::config::{BridgeConfig, Environment};
use crate::dispatcher::{Dispatcher, EventLoop, LoopControl};
use crate::engine::{InputContextId, InputMethodEngine};
use crate::error::{BridgeError, EngineError};
use crate::event::EventSink;
use crate::marshaller::{Frontend, PanelSnapshot};
use once_cell::sync::Lazy;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::Duration;

/// Observable lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// State shared with other threads while the engine is running.
pub(crate) struct EngineState {
    pub(crate) dispatcher: Dispatcher<Instance>,
    pub(crate) input_context: InputContextId,
    pub(crate) panel: Arc<PanelSnapshot>,
}

enum Slot {
    Stopped,
    Starting,
    Running(Arc<EngineState>),
    Stopping,
}

impl Slot {
    fn phase(&self) -> Phase {
        match self {
            Slot::Stopped => Phase::Stopped,
            Slot::Starting => Phase::Starting,
            Slot::Running(_) => Phase::Running,
            Slot::Stopping => Phase::Stopping,
        }
    }
}

struct Shared {
    slot: Mutex<Slot>,
    changed: Condvar,
}

impl Shared {
    fn transition(&self, next: Slot) {
        let mut slot = self.slot.lock();
        tracing::debug!(from = ?slot.phase(), to = ?next.phase(), "engine phase change");
        *slot = next;
        self.changed.notify_all();
    }
}

/// Resets the slot to `Stopped` however `start` exits.
struct ResetOnExit<'a>(&'a Shared);

impl Drop for ResetOnExit<'_> {
    fn drop(&mut self) {
        self.0.transition(Slot::Stopped);
    }
}

/// The engine-side context every scheduled command runs against.
pub(crate) struct Instance {
    pub(crate) engine: Box<dyn InputMethodEngine>,
    pub(crate) input_context: Option<InputContextId>,
    pub(crate) dispatcher: Dispatcher<Instance>,
    pub(crate) control: LoopControl,
    pub(crate) panel: Arc<PanelSnapshot>,
    shared: Arc<Shared>,
}

/// What the initialization command needs; owned so it can cross threads.
struct InitPlan {
    input_methods: Vec<String>,
    default_input_method: String,
    program: String,
    frontend: Frontend,
}

impl Instance {
    fn initialize(&mut self, plan: InitPlan) -> Result<(), EngineError> {
        self.engine
            .set_input_methods(&plan.input_methods, &plan.default_input_method)?;
        self.engine.set_frontend(plan.frontend);

        let ic = self.engine.create_input_context(&plan.program)?;
        self.input_context = Some(ic);

        let state = Arc::new(EngineState {
            dispatcher: self.dispatcher.clone(),
            input_context: ic,
            panel: self.panel.clone(),
        });
        self.shared.transition(Slot::Running(state));
        tracing::info!(input_context = %ic, program = %plan.program, "engine ready");
        Ok(())
    }

    /// Detach the dispatcher, then ask the loop to exit.
    pub(crate) fn shutdown(&mut self) {
        self.dispatcher.detach();
        self.control.exit(0);
    }

    fn publish_panel(&mut self) {
        if let Some(ic) = self.input_context {
            self.panel.set_empty(self.engine.is_input_panel_empty(ic));
        }
    }
}

static GLOBAL: Lazy<Bridge> = Lazy::new(Bridge::new);

/// Owner of the engine lifecycle and the thread-safe command surface.
///
/// A process normally has exactly one; use [`Bridge::global`] when the host
/// cannot thread an owned value through, or keep your own with
/// [`Bridge::new`].
pub struct Bridge {
    shared: Arc<Shared>,
}

impl Bridge {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot::Stopped),
                changed: Condvar::new(),
            }),
        }
    }

    /// The process-wide bridge.
    pub fn global() -> &'static Bridge {
        &GLOBAL
    }

    /// Start the engine and run its loop on the calling thread.
    ///
    /// Blocks until the engine stops; call it on a thread dedicated to the
    /// engine. Returns the loop's exit status, `Ok(0)` for a quiet quit, or an
    /// error. Fails immediately with `AlreadyRunning`, without side effects,
    /// unless the bridge is stopped.
    pub fn start<E, F, S>(&self, config: &BridgeConfig, factory: F, sink: S) -> Result<i32, BridgeError>
    where
        E: InputMethodEngine,
        F: FnOnce(&Environment) -> anyhow::Result<E>,
        S: EventSink,
    {
        {
            let mut slot = self.shared.slot.lock();
            if !matches!(*slot, Slot::Stopped) {
                tracing::warn!(phase = ?slot.phase(), "engine already running");
                return Err(BridgeError::AlreadyRunning);
            }
            *slot = Slot::Starting;
            self.shared.changed.notify_all();
        }
        let _reset = ResetOnExit(&self.shared);

        tracing::info!("starting engine");
        self.run(config, factory, sink)
    }

    fn run<E, F, S>(&self, config: &BridgeConfig, factory: F, sink: S) -> Result<i32, BridgeError>
    where
        E: InputMethodEngine,
        F: FnOnce(&Environment) -> anyhow::Result<E>,
        S: EventSink,
    {
        config.validate().map_err(|err| {
            tracing::error!(error = %err, "refusing to start engine");
            BridgeError::InvalidConfig(err.to_string())
        })?;

        let env = config.environment();
        if config.apply_environment {
            env.apply();
        }

        let engine = factory(&env).map_err(|err| {
            tracing::error!(error = %format!("{:#}", err), "failed to construct engine");
            BridgeError::EngineFault(format!("{:#}", err))
        })?;

        let event_loop = EventLoop::new();
        let dispatcher = event_loop.dispatcher();
        let panel = Arc::new(PanelSnapshot::default());
        let mut instance = Instance {
            engine: Box::new(engine),
            input_context: None,
            dispatcher: dispatcher.clone(),
            control: event_loop.control(),
            panel: panel.clone(),
            shared: self.shared.clone(),
        };

        let plan = InitPlan {
            input_methods: config.input_methods.clone(),
            default_input_method: config.default_input_method.clone(),
            program: config.program.clone(),
            frontend: Frontend::with_snapshot(Arc::new(sink), panel),
        };
        // Queued before the loop runs, so it is the first thing executed.
        dispatcher.schedule(move |instance: &mut Instance| instance.initialize(plan))?;

        match event_loop.exec(&mut instance, Instance::publish_panel) {
            Ok(code) => {
                tracing::info!(code, "engine exited");
                Ok(code)
            }
            Err(EngineError::QuietQuit) => {
                tracing::info!("engine quit quietly");
                EngineError::QuietQuit.into_exit_status()
            }
            Err(err) => {
                tracing::error!(error = %err, "engine exited with fault");
                err.into_exit_status()
            }
        }
    }

    /// Request shutdown. Detach and exit both run on the engine thread.
    ///
    /// A logged no-op returning `NotRunning` unless the engine is running.
    pub fn stop(&self) -> Result<(), BridgeError> {
        let state = {
            let mut slot = self.shared.slot.lock();
            let state = match &*slot {
                Slot::Running(state) => state.clone(),
                other => {
                    tracing::info!(phase = ?other.phase(), "engine is not running, nothing to stop");
                    return Err(BridgeError::NotRunning);
                }
            };
            *slot = Slot::Stopping;
            self.shared.changed.notify_all();
            state
        };

        tracing::info!("shutting down engine");
        state
            .dispatcher
            .schedule(|instance: &mut Instance| {
                instance.shutdown();
                Ok(())
            })
    }

    pub fn phase(&self) -> Phase {
        self.shared.slot.lock().phase()
    }

    pub fn is_running(&self) -> bool {
        self.phase() == Phase::Running
    }

    /// Block until the engine is running or `timeout` elapses.
    pub fn wait_until_running(&self, timeout: Duration) -> bool {
        self.wait_for(timeout, |phase| phase == Phase::Running)
    }

    /// Block until the engine has stopped or `timeout` elapses.
    pub fn wait_until_stopped(&self, timeout: Duration) -> bool {
        self.wait_for(timeout, |phase| phase == Phase::Stopped)
    }

    fn wait_for(&self, timeout: Duration, done: impl Fn(Phase) -> bool) -> bool {
        let mut slot = self.shared.slot.lock();
        self.shared
            .changed
            .wait_while_for(&mut slot, |slot| !done(slot.phase()), timeout);
        done(slot.phase())
    }

    /// The running engine's state, if the engine is running.
    pub(crate) fn running(&self) -> Option<Arc<EngineState>> {
        match &*self.shared.slot.lock() {
            Slot::Running(state) => Some(state.clone()),
            _ => None,
        }
    }
}

impl Default for Bridge {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StartupPaths;
    use crate::event::Event;
    use crate::key::Key;
    use std::thread;

    struct IdleEngine;

    impl InputMethodEngine for IdleEngine {
        fn set_input_methods(&mut self, _: &[String], _: &str) -> Result<(), EngineError> {
            Ok(())
        }
        fn set_frontend(&mut self, _: Frontend) {}
        fn create_input_context(&mut self, _: &str) -> Result<InputContextId, EngineError> {
            Ok(InputContextId::generate())
        }
        fn key_event(&mut self, _: InputContextId, _: &Key, _: bool) -> Result<bool, EngineError> {
            Ok(false)
        }
        fn select_candidate(&mut self, _: InputContextId, _: usize) -> Result<(), EngineError> {
            Ok(())
        }
        fn is_input_panel_empty(&self, _: InputContextId) -> bool {
            true
        }
        fn reset_input_panel(&mut self, _: InputContextId) -> Result<(), EngineError> {
            Ok(())
        }
    }

    fn test_config() -> BridgeConfig {
        let mut config = BridgeConfig::new(StartupPaths::new("/a", "/b", "/c"));
        config.apply_environment = false;
        config
    }

    #[test]
    fn test_new_bridge_is_stopped() {
        let bridge = Bridge::new();
        assert_eq!(bridge.phase(), Phase::Stopped);
        assert!(!bridge.is_running());
        assert!(bridge.running().is_none());
    }

    #[test]
    fn test_stop_without_start_is_noop() {
        let bridge = Bridge::new();
        assert_eq!(bridge.stop(), Err(BridgeError::NotRunning));
        assert_eq!(bridge.phase(), Phase::Stopped);
    }

    #[test]
    fn test_start_run_stop_cycle() {
        let bridge = Bridge::new();
        thread::scope(|s| {
            let engine = s.spawn(|| bridge.start(&test_config(), |_| Ok(IdleEngine), |_: Event| {}));

            assert!(bridge.wait_until_running(Duration::from_secs(5)));
            assert!(bridge.running().is_some());
            bridge.stop().unwrap();

            assert_eq!(engine.join().unwrap(), Ok(0));
        });
        assert_eq!(bridge.phase(), Phase::Stopped);
    }

    #[test]
    fn test_stopping_phase_refuses_commands() {
        let bridge = Bridge::new();
        thread::scope(|s| {
            let engine = s.spawn(|| bridge.start(&test_config(), |_| Ok(IdleEngine), |_: Event| {}));
            assert!(bridge.wait_until_running(Duration::from_secs(5)));

            // Hold the engine thread so the shutdown task stays queued.
            let (release, blocked) = std::sync::mpsc::channel::<()>();
            let state = bridge.running().unwrap();
            state
                .dispatcher
                .schedule(move |_: &mut Instance| {
                    let _ = blocked.recv();
                    Ok(())
                })
                .unwrap();

            bridge.stop().unwrap();
            assert_eq!(bridge.phase(), Phase::Stopping);
            assert!(bridge.running().is_none());
            assert_eq!(bridge.stop(), Err(BridgeError::NotRunning));
            assert_eq!(bridge.send_char('a'), Err(BridgeError::NotRunning));
            assert!(bridge.is_input_panel_empty());

            release.send(()).unwrap();
            assert_eq!(engine.join().unwrap(), Ok(0));
        });
        assert_eq!(bridge.phase(), Phase::Stopped);
    }

    #[test]
    fn test_invalid_config_is_rejected_and_state_cleared() {
        let bridge = Bridge::new();
        let mut config = test_config();
        config.input_methods.clear();

        let result = bridge.start(&config, |_| Ok(IdleEngine), |_: Event| {});
        assert!(matches!(result, Err(BridgeError::InvalidConfig(_))));
        assert_eq!(bridge.phase(), Phase::Stopped);
    }

    #[test]
    fn test_factory_failure_is_engine_fault() {
        let bridge = Bridge::new();
        let result = bridge.start(
            &test_config(),
            |_| -> anyhow::Result<IdleEngine> { anyhow::bail!("no model files") },
            |_: Event| {},
        );
        assert_eq!(result, Err(BridgeError::EngineFault("no model files".into())));
        assert_eq!(bridge.phase(), Phase::Stopped);
    }

    #[test]
    fn test_factory_receives_derived_environment() {
        let bridge = Bridge::new();
        let mut seen = None;
        let result = bridge.start(
            &test_config(),
            |env| -> anyhow::Result<IdleEngine> {
                seen = env.get(crate::config::ENV_HOME).map(str::to_string);
                anyhow::bail!("stop here")
            },
            |_: Event| {},
        );
        assert!(result.is_err());
        assert_eq!(seen.as_deref(), Some("/c"));
    }
}
