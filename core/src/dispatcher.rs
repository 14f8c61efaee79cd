//! Command dispatch onto the engine's execution context.
//!
//! The [`EventLoop`] is the engine's run loop: it executes queued tasks, one
//! at a time, on the thread that calls [`EventLoop::exec`]. The
//! [`Dispatcher`] is the only way to get work onto that thread. It can be
//! cloned and used from any thread; `schedule` never blocks.
//!
//! Ordering: tasks run in the order they were scheduled, and never before
//! `exec` has started. Tasks scheduled before `exec` therefore run first.

use crate::error::{BridgeError, EngineError};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

/// A unit of work executed on the engine thread against context `C`.
pub type Task<C> = Box<dyn FnOnce(&mut C) -> Result<(), EngineError> + Send>;

/// Thread-safe handle for submitting tasks to an [`EventLoop`].
pub struct Dispatcher<C> {
    tx: Sender<Task<C>>,
    attached: Arc<AtomicBool>,
}

impl<C> Clone for Dispatcher<C> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            attached: self.attached.clone(),
        }
    }
}

impl<C> Dispatcher<C> {
    /// Queue `task` for execution on the engine thread.
    ///
    /// Fails with `NotRunning` once the dispatcher has been detached; the task
    /// is dropped unexecuted.
    pub fn schedule<F>(&self, task: F) -> Result<(), BridgeError>
    where
        F: FnOnce(&mut C) -> Result<(), EngineError> + Send + 'static,
    {
        if !self.is_attached() {
            tracing::debug!("dispatcher detached, dropping task");
            return Err(BridgeError::NotRunning);
        }
        self.tx.send(Box::new(task)).map_err(|_| {
            tracing::debug!("event loop gone, dropping task");
            BridgeError::NotRunning
        })
    }

    /// Stop accepting tasks. Must be called from the engine thread.
    pub fn detach(&self) {
        self.attached.store(false, Ordering::Release);
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }
}

/// Exit request shared between the loop and the tasks it runs.
#[derive(Debug, Clone)]
pub struct LoopControl {
    requested: Arc<AtomicBool>,
    code: Arc<AtomicI32>,
}

impl LoopControl {
    fn new() -> Self {
        Self {
            requested: Arc::new(AtomicBool::new(false)),
            code: Arc::new(AtomicI32::new(0)),
        }
    }

    /// Ask the loop to return `code` once the current task finishes.
    pub fn exit(&self, code: i32) {
        self.code.store(code, Ordering::Release);
        self.requested.store(true, Ordering::Release);
    }

    fn exit_code(&self) -> Option<i32> {
        if self.requested.load(Ordering::Acquire) {
            Some(self.code.load(Ordering::Acquire))
        } else {
            None
        }
    }
}

/// Single-threaded run loop executing tasks in FIFO order.
pub struct EventLoop<C> {
    rx: Receiver<Task<C>>,
    dispatcher: Dispatcher<C>,
    control: LoopControl,
}

impl<C> EventLoop<C> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            rx,
            dispatcher: Dispatcher {
                tx,
                attached: Arc::new(AtomicBool::new(true)),
            },
            control: LoopControl::new(),
        }
    }

    /// A dispatcher attached to this loop.
    pub fn dispatcher(&self) -> Dispatcher<C> {
        self.dispatcher.clone()
    }

    /// The exit control for tasks running on this loop.
    pub fn control(&self) -> LoopControl {
        self.control.clone()
    }

    /// Run tasks on the calling thread until an exit is requested or a task
    /// fails. `after_task` runs after every successful task.
    ///
    /// Tasks still queued when the loop returns are dropped with the loop.
    pub fn exec<A>(self, ctx: &mut C, mut after_task: A) -> Result<i32, EngineError>
    where
        A: FnMut(&mut C),
    {
        loop {
            if let Some(code) = self.control.exit_code() {
                return Ok(code);
            }

            // The loop holds a sender of its own, so `recv` only fails if that
            // invariant is broken.
            let task = self
                .rx
                .recv()
                .map_err(|_| EngineError::fault("task channel closed"))?;

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                task(ctx)?;
                after_task(ctx);
                Ok::<(), EngineError>(())
            }));

            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(err)) => return Err(err),
                Err(payload) => {
                    return Err(EngineError::Fault(format!(
                        "panic in engine task: {}",
                        panic_message(payload.as_ref())
                    )))
                }
            }
        }
    }
}

impl<C> Default for EventLoop<C> {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
