//! Frontend worker loop.
//!
//! Each iteration either consumes one tune command or, when the wait times
//! out, polls the current target. After a tune the new target is polled in
//! the same iteration.

use std::sync::Arc;
use std::thread;
use std::time::Instant;

use log::{debug, error, info};

use crate::adapter::AdapterInner;
use crate::frontend::{FeStatus, PrepareContext};
use crate::quality::SignalStatus;
use crate::queue::TuneCommand;
use crate::target::{TargetRef, TargetState, TuningTarget};

/// What one worker iteration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The adapter is shutting down.
    Shutdown,
    /// A queued command was dropped because its target was abandoned.
    Discarded,
    /// No target is current; nothing was polled.
    Idle,
    /// A command was executed and the current target polled.
    Tuned(SignalStatus),
    /// The wait timed out and the current target was polled.
    Polled(SignalStatus),
}

enum Wakeup {
    Shutdown,
    Discarded,
    Command(TuneCommand),
    Timeout,
}

pub(crate) struct Worker {
    inner: Arc<AdapterInner>,
}

impl Worker {
    pub fn new(inner: Arc<AdapterInner>) -> Self {
        Self { inner }
    }

    pub fn run(self) {
        info!("Frontend worker started for \"{}\" ({})", self.inner.path, self.inner.kind);
        while self.step() != StepOutcome::Shutdown {}
        info!("Frontend worker stopped for \"{}\"", self.inner.path);
    }

    pub fn step(&self) -> StepOutcome {
        let tuned = match self.wait() {
            Wakeup::Shutdown => return StepOutcome::Shutdown,
            Wakeup::Discarded => return StepOutcome::Discarded,
            Wakeup::Command(command) => {
                self.tune(command);
                true
            }
            Wakeup::Timeout => false,
        };

        let current = self
            .inner
            .state
            .lock()
            .current
            .as_ref()
            .map(TargetRef::shared);
        let Some(target) = current else {
            return StepOutcome::Idle;
        };

        let status = self.poll(&target);
        if tuned {
            StepOutcome::Tuned(status)
        } else {
            StepOutcome::Polled(status)
        }
    }

    /// Block until a command arrives or the poll interval elapses.
    fn wait(&self) -> Wakeup {
        let mut state = self.inner.state.lock();
        if state.queue.is_empty() && !self.inner.is_closed() {
            let deadline = Instant::now() + self.inner.timings.poll_interval;
            self.inner.wakeup.wait_until(&mut state, deadline);
        }

        if self.inner.is_closed() {
            return Wakeup::Shutdown;
        }

        let popped = state.queue.pop_front();
        match popped {
            Some(command) if command.is_stale() => {
                debug!(
                    "\"{}\" discarding stale tune to \"{}\"",
                    self.inner.path,
                    **command.target()
                );
                // Release the last reference while still holding the lock.
                drop(command);
                Wakeup::Discarded
            }
            Some(command) => Wakeup::Command(command),
            None => Wakeup::Timeout,
        }
    }

    /// Reconfigure the hardware for the command's target and make it
    /// current. Runs without the adapter lock.
    fn tune(&self, command: TuneCommand) {
        let target = command.into_target();
        let inner = &*self.inner;

        let ctx = PrepareContext {
            path: &inner.path,
            device: inner.device.as_ref(),
            lnb: inner.lnb.as_ref(),
            diseqc_gap: inner.timings.diseqc_gap,
            lnb_settle: inner.timings.lnb_settle,
        };
        let params = inner.kind.prepare(&target, &ctx);

        if let Err(e) = inner.device.set_frontend(&params) {
            error!(
                "\"{}\" tuning to \"{}\" -- Front configuration failed -- {}",
                inner.path, *target, e
            );
        }

        target.mark_active();

        inner.tables.arm_pending(&target);

        thread::sleep(inner.timings.tune_settle);

        // Reading clears errors accumulated before the tune.
        if let Err(e) = inner.device.read_uncorrected_blocks() {
            debug!("\"{}\" failed to reset FEC counter: {}", inner.path, e);
        }

        self.make_current(target);
    }

    /// Install `target` in the current slot, stopping any other current
    /// target first. The idle check and the assignment happen under the
    /// same adapter lock acquisition.
    fn make_current(&self, target: TargetRef) {
        let inner = &*self.inner;

        loop {
            let mut state = inner.state.lock();

            if target.state() == TargetState::Idle {
                debug!(
                    "\"{}\" \"{}\" was stopped while tuning, not making it current",
                    inner.path, *target
                );
                drop(target);
                return;
            }

            let previous = match &state.current {
                // Re-tune of the current target: keep the reference it has.
                Some(current) if TargetRef::ptr_eq(current, &target) => {
                    drop(target);
                    return;
                }
                Some(current) => current.shared(),
                None => {
                    state.current = Some(target);
                    return;
                }
            };

            // Stopping tears down tables, which must not run under the
            // adapter lock. Re-check once it is done.
            drop(state);
            inner.stop(&previous);
        }
    }

    /// Read status and error counters for `target`.
    fn poll(&self, target: &TuningTarget) -> SignalStatus {
        let inner = &*self.inner;

        let fe_status = inner.device.read_status().unwrap_or_else(|e| {
            debug!("\"{}\" failed to read frontend status: {}", inner.path, e);
            FeStatus::empty()
        });
        let status = SignalStatus::from_fe_status(fe_status);

        let uncorrected = match inner.device.read_uncorrected_blocks() {
            Ok(v) => u32::try_from(v).unwrap_or(0),
            Err(e) => {
                debug!("\"{}\" failed to read uncorrected blocks: {}", inner.path, e);
                0
            }
        };

        let previous = target.record_poll(status, uncorrected);
        if previous != Some(status) {
            info!("\"{}\" \"{}\": {}", inner.path, target, status);
        }
        status
    }
}
