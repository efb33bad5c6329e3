//! Adapter: one frontend device, its command queue and its worker.
//!
//! Callers on any thread use [`Adapter::request_tune`], [`Adapter::flush`]
//! and [`Adapter::stop`]. The worker thread started by [`Adapter::start`]
//! performs all slow hardware calls, never while holding the adapter lock.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error, info, trace};
use parking_lot::{Condvar, Mutex};

use crate::diseqc::DEFAULT_STEP_GAP;
use crate::error::{FrontendError, Result};
use crate::frontend::{FrontendDevice, FrontendKind};
use crate::lnb::{LnbConfig, LnbSource};
use crate::queue::CommandQueue;
use crate::tables::{NoTables, TableManager};
use crate::target::{TargetRef, TargetState, TuningTarget};
use crate::worker::{StepOutcome, Worker};

/// Callback invoked whenever a target's state changes.
pub type StateHook = Arc<dyn Fn(&TuningTarget) + Send + Sync>;

/// Delays used by the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Idle wait between signal polls.
    pub poll_interval: Duration,
    /// Pause after the band switch before setting the frontend.
    pub lnb_settle: Duration,
    /// Pause after setting the frontend before trusting lock status.
    pub tune_settle: Duration,
    /// Pause between band-switch steps.
    pub diseqc_gap: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            lnb_settle: Duration::from_millis(50),
            tune_settle: Duration::from_secs(1),
            diseqc_gap: DEFAULT_STEP_GAP,
        }
    }
}

/// State guarded by the adapter mutex.
#[derive(Debug, Default)]
pub(crate) struct AdapterState {
    pub queue: CommandQueue,
    /// Holds the reference transferred from the tune command that made the
    /// target current.
    pub current: Option<TargetRef>,
}

pub(crate) struct AdapterInner {
    pub path: String,
    pub kind: FrontendKind,
    pub device: Arc<dyn FrontendDevice>,
    pub lnb: Arc<dyn LnbSource>,
    pub tables: Arc<dyn TableManager>,
    pub timings: Timings,
    hook: Option<StateHook>,
    pub state: Mutex<AdapterState>,
    pub wakeup: Condvar,
    closed: AtomicBool,
}

impl AdapterInner {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn notify_state_change(&self, target: &TuningTarget) {
        if let Some(hook) = &self.hook {
            hook(target);
        }
    }

    /// Idle `target`: clear the current slot if it points there, tear
    /// down its tables and stamp the idle time.
    ///
    /// The slot is cleared and the state set to idle under the adapter lock.
    pub fn stop(&self, target: &TuningTarget) {
        let changed = {
            let mut state = self.state.lock();
            if state.current.as_ref().is_some_and(|c| c.is(target)) {
                drop(state.current.take());
            }
            target.mark_idle()
        };

        self.tables.tear_down(target);

        if changed {
            self.notify_state_change(target);
        }
        debug!("\"{}\" stopped \"{}\"", self.path, target);
    }
}

/// Builder for [`Adapter`].
pub struct AdapterBuilder {
    path: String,
    kind: FrontendKind,
    device: Arc<dyn FrontendDevice>,
    lnb: Arc<dyn LnbSource>,
    tables: Arc<dyn TableManager>,
    timings: Timings,
    hook: Option<StateHook>,
}

impl AdapterBuilder {
    /// LNB settings for satellite frontends. Defaults to a universal LNB.
    pub fn lnb(mut self, lnb: Arc<dyn LnbSource>) -> Self {
        self.lnb = lnb;
        self
    }

    /// Table-filter manager. Defaults to [`NoTables`].
    pub fn tables(mut self, tables: Arc<dyn TableManager>) -> Self {
        self.tables = tables;
        self
    }

    pub fn timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    /// Install a target state-change callback. Not wired by default.
    pub fn on_state_change<F>(mut self, hook: F) -> Self
    where
        F: Fn(&TuningTarget) + Send + Sync + 'static,
    {
        self.hook = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> Adapter {
        Adapter {
            inner: Arc::new(AdapterInner {
                path: self.path,
                kind: self.kind,
                device: self.device,
                lnb: self.lnb,
                tables: self.tables,
                timings: self.timings,
                hook: self.hook,
                state: Mutex::new(AdapterState::default()),
                wakeup: Condvar::new(),
                closed: AtomicBool::new(false),
            }),
            worker: Mutex::new(None),
        }
    }
}

/// A frontend device and the worker that drives it.
pub struct Adapter {
    inner: Arc<AdapterInner>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Adapter {
    pub fn builder(
        path: impl Into<String>,
        kind: FrontendKind,
        device: Arc<dyn FrontendDevice>,
    ) -> AdapterBuilder {
        AdapterBuilder {
            path: path.into(),
            kind,
            device,
            lnb: Arc::new(LnbConfig::default()),
            tables: Arc::new(NoTables),
            timings: Timings::default(),
            hook: None,
        }
    }

    pub fn path(&self) -> &str {
        &self.inner.path
    }

    pub fn kind(&self) -> FrontendKind {
        self.inner.kind
    }

    /// Spawn the worker thread. Must be called once, before the first
    /// [`request_tune`](Self::request_tune).
    pub fn start(&self) -> Result<()> {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return Err(FrontendError::AlreadyStarted(self.inner.path.clone()));
        }

        let inner = Arc::clone(&self.inner);
        let handle = thread::Builder::new()
            .name(format!("fe:{}", self.inner.path))
            .spawn(move || Worker::new(inner).run())
            .map_err(|source| FrontendError::Spawn {
                path: self.inner.path.clone(),
                source,
            })?;

        *worker = Some(handle);
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.worker.lock().is_some()
    }

    /// Run one iteration of the worker loop on the calling thread.
    ///
    /// For adapters driven without a worker thread; mixing this with
    /// [`start`](Self::start) makes two consumers race for commands.
    pub fn step(&self) -> StepOutcome {
        Worker::new(Arc::clone(&self.inner)).step()
    }

    /// Queue a tune command for `target` and wake the worker.
    ///
    /// No deduplication: every call queues its own command and holds its
    /// own reference until the command is consumed or flushed.
    pub fn enqueue(&self, target: &TargetRef) -> Result<()> {
        let mut state = self.inner.state.lock();
        state.queue.push(target)?;
        self.inner.wakeup.notify_one();
        trace!(
            "\"{}\" queued \"{}\" ({} pending)",
            self.inner.path,
            **target,
            state.queue.len()
        );
        Ok(())
    }

    /// Drop the oldest queued command for `target`, if any.
    pub fn flush(&self, target: &TuningTarget) {
        let mut state = self.inner.state.lock();
        if let Some(command) = state.queue.remove_first(target) {
            drop(command);
            trace!("\"{}\" flushed \"{}\"", self.inner.path, target);
        }
    }

    /// Ask the adapter to tune to `target`.
    ///
    /// Stores `state` on the target, returns early if the target is already
    /// current, stops any other current target, registers the default
    /// tables and queues the command. The current slot itself is only
    /// updated by the worker once the hardware has been reconfigured.
    pub fn request_tune(&self, target: &TargetRef, may_log: bool, state: TargetState) -> Result<()> {
        if target.set_state(state) {
            self.inner.notify_state_change(target);
        }

        let previous = {
            let adapter = self.inner.state.lock();
            match &adapter.current {
                Some(current) if TargetRef::ptr_eq(current, target) => return Ok(()),
                Some(current) => Some(current.shared()),
                None => None,
            }
        };

        if let Some(previous) = previous {
            self.inner.stop(&previous);
        }

        if may_log {
            debug!("\"{}\" tuning to mux \"{}\"", self.inner.path, **target);
        }

        self.inner.tables.add_default(target);
        self.enqueue(target)
    }

    /// Idle `target`, releasing the adapter if it holds it.
    pub fn stop(&self, target: &TuningTarget) {
        self.inner.stop(target);
    }

    /// Counted handle to the current target.
    pub fn current(&self) -> Option<TargetRef> {
        self.inner.state.lock().current.clone()
    }

    pub fn is_current(&self, target: &TuningTarget) -> bool {
        self.inner
            .state
            .lock()
            .current
            .as_ref()
            .is_some_and(|c| c.is(target))
    }

    /// Number of queued commands.
    pub fn pending(&self) -> usize {
        self.inner.state.lock().queue.len()
    }

    /// Number of queued commands for `target`.
    pub fn pending_for(&self, target: &TuningTarget) -> usize {
        self.inner.state.lock().queue.pending_for(target)
    }

    /// Stop the worker, drop queued commands and idle the current target.
    ///
    /// Blocks until an in-flight hardware sequence finishes.
    pub fn shutdown(&self) {
        {
            let _state = self.inner.state.lock();
            if self.inner.closed.swap(true, Ordering::SeqCst) {
                return;
            }
            self.inner.wakeup.notify_all();
        }

        if let Some(handle) = self.worker.lock().take() {
            if handle.join().is_err() {
                error!("Frontend worker for \"{}\" panicked", self.inner.path);
            }
        }

        let current = {
            let mut state = self.inner.state.lock();
            drop(std::mem::take(&mut state.queue));
            state.current.as_ref().map(TargetRef::shared)
        };
        if let Some(current) = current {
            self.inner.stop(&current);
        }
        info!("Adapter \"{}\" shut down", self.inner.path);
    }
}

impl Drop for Adapter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adapter")
            .field("path", &self.inner.path)
            .field("kind", &self.inner.kind)
            .field("timings", &self.inner.timings)
            .finish()
    }
}
