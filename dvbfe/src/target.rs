//! Tuning targets and the counted handles that keep them alive.

use std::fmt;
use std::ops::Deref;
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use parking_lot::Mutex;

use crate::params::{Polarisation, TuningParams};
use crate::quality::{FecHistogram, SignalStatus};
use crate::tables::TableFilter;

/// Caller-driven intent for a target. The adapter only compares and
/// stores it, except that `stop` always sets [`TargetState::Idle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetState {
    #[default]
    Idle,
    Tuning,
    Active,
}

#[derive(Debug, Default)]
struct Lifecycle {
    state: TargetState,
    became_active: Option<DateTime<Utc>>,
    became_idle: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct Telemetry {
    status: Option<SignalStatus>,
    fec: FecHistogram,
}

/// One multiplex an adapter can be tuned to, with its runtime state.
pub struct TuningTarget {
    name: Option<String>,
    params: TuningParams,
    polarisation: Option<Polarisation>,
    refs: AtomicUsize,
    lifecycle: Mutex<Lifecycle>,
    telemetry: Mutex<Telemetry>,
    /// Guarded independently of the adapter lock so filter I/O never
    /// blocks queue operations.
    tables: Mutex<Vec<TableFilter>>,
}

impl TuningTarget {
    pub fn new(params: TuningParams) -> Self {
        Self {
            name: None,
            params,
            polarisation: None,
            refs: AtomicUsize::new(0),
            lifecycle: Mutex::new(Lifecycle::default()),
            telemetry: Mutex::new(Telemetry::default()),
            tables: Mutex::new(Vec::new()),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_polarisation(mut self, polarisation: Polarisation) -> Self {
        self.polarisation = Some(polarisation);
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn params(&self) -> &TuningParams {
        &self.params
    }

    pub fn polarisation(&self) -> Option<Polarisation> {
        self.polarisation
    }

    pub fn is_horizontal(&self) -> bool {
        self.polarisation.is_some_and(Polarisation::is_horizontal)
    }

    /// Number of live [`TargetRef`] handles.
    pub fn ref_count(&self) -> usize {
        self.refs.load(Ordering::SeqCst)
    }

    fn acquire(&self) {
        self.refs.fetch_add(1, Ordering::SeqCst);
    }

    fn release(&self) {
        let prev = self.refs.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(prev > 0, "target reference count underflow");
    }

    pub fn state(&self) -> TargetState {
        self.lifecycle.lock().state
    }

    /// Returns true if the state changed.
    pub(crate) fn set_state(&self, state: TargetState) -> bool {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.state == state {
            return false;
        }
        lifecycle.state = state;
        true
    }

    /// When the target last got the adapter.
    pub fn became_active(&self) -> Option<DateTime<Utc>> {
        self.lifecycle.lock().became_active
    }

    /// When the target last lost the adapter.
    pub fn became_idle(&self) -> Option<DateTime<Utc>> {
        self.lifecycle.lock().became_idle
    }

    pub(crate) fn mark_active(&self) {
        self.lifecycle.lock().became_active = Some(Utc::now());
    }

    /// Set the state to idle and stamp the time. Returns true if the state
    /// changed.
    pub(crate) fn mark_idle(&self) -> bool {
        let mut lifecycle = self.lifecycle.lock();
        let changed = lifecycle.state != TargetState::Idle;
        lifecycle.state = TargetState::Idle;
        lifecycle.became_idle = Some(Utc::now());
        changed
    }

    /// Last polled signal status; `None` before the first poll.
    pub fn status(&self) -> Option<SignalStatus> {
        self.telemetry.lock().status
    }

    /// Problem description from the last poll. `None` means locked or not
    /// yet polled.
    pub fn status_text(&self) -> Option<&'static str> {
        self.status().and_then(SignalStatus::description)
    }

    /// Snapshot of the uncorrected-block history.
    pub fn fec_histogram(&self) -> FecHistogram {
        self.telemetry.lock().fec.clone()
    }

    /// Store one poll result and return the previous status. Samples are
    /// only kept while locked.
    pub(crate) fn record_poll(
        &self,
        status: SignalStatus,
        uncorrected_blocks: u32,
    ) -> Option<SignalStatus> {
        let mut telemetry = self.telemetry.lock();
        if status.is_locked() {
            telemetry.fec.record(uncorrected_blocks);
        }
        telemetry.status.replace(status)
    }

    /// Bind a table filter. It stays pending until the target is tuned.
    ///
    /// A table whose name is already bound is dropped and `false` is
    /// returned.
    pub fn add_table(&self, table: TableFilter) -> bool {
        let mut tables = self.tables.lock();
        if tables.iter().any(|t| t.name == table.name) {
            return false;
        }
        tables.push(table);
        true
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.lock().iter().any(|t| t.name == name)
    }

    pub fn table_count(&self) -> usize {
        self.tables.lock().len()
    }

    pub fn armed_table_count(&self) -> usize {
        self.tables.lock().iter().filter(|t| t.is_armed()).count()
    }

    /// Arm every pending filter. Failures are logged and the filter is
    /// left unarmed. Returns the number of filters armed.
    pub fn arm_pending_tables(&self) -> usize {
        let mut tables = self.tables.lock();
        let mut armed = 0;
        for table in tables.iter_mut() {
            match table.arm() {
                Ok(true) => armed += 1,
                Ok(false) => {}
                Err(e) => warn!(
                    "Failed to set filter for table \"{}\" (pid {:#06x}) on \"{}\": {}",
                    table.name, table.pid, self, e
                ),
            }
        }
        armed
    }

    /// Stop and drop every bound filter. Returns how many were removed.
    pub fn tear_down_tables(&self) -> usize {
        let mut tables = self.tables.lock();
        let count = tables.len();
        for mut table in tables.drain(..) {
            if let Err(e) = table.stop() {
                debug!("Failed to stop table \"{}\" on \"{}\": {}", table.name, self, e);
            }
        }
        count
    }
}

impl fmt::Display for TuningTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.name, self.polarisation) {
            (Some(name), _) => f.write_str(name),
            (None, Some(pol)) => write!(f, "{} {}", self.params.frequency, pol),
            (None, None) => write!(f, "{}", self.params.frequency),
        }
    }
}

impl fmt::Debug for TuningTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TuningTarget")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("polarisation", &self.polarisation)
            .field("refs", &self.ref_count())
            .field("state", &self.state())
            .finish()
    }
}

/// Counted handle to a [`TuningTarget`].
///
/// The count tracks logical holders: the owner's table of record, each
/// queued tune command, and the adapter's current slot. Cloning acquires,
/// dropping releases, so a release is always paired with an acquire.
pub struct TargetRef {
    inner: Arc<TuningTarget>,
}

impl TargetRef {
    /// Wrap a new target. The returned handle is the baseline reference.
    pub fn new(target: TuningTarget) -> Self {
        target.refs.store(1, Ordering::SeqCst);
        Self {
            inner: Arc::new(target),
        }
    }

    /// True if both handles point at the same target.
    pub fn ptr_eq(a: &TargetRef, b: &TargetRef) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    /// True if this handle points at `target`.
    pub fn is(&self, target: &TuningTarget) -> bool {
        ptr::eq(Arc::as_ptr(&self.inner), target)
    }

    /// Uncounted access for work that must outlive a lock scope.
    pub(crate) fn shared(&self) -> Arc<TuningTarget> {
        Arc::clone(&self.inner)
    }
}

impl Clone for TargetRef {
    fn clone(&self) -> Self {
        self.inner.acquire();
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Drop for TargetRef {
    fn drop(&mut self) {
        self.inner.release();
    }
}

impl Deref for TargetRef {
    type Target = TuningTarget;

    fn deref(&self) -> &TuningTarget {
        &self.inner
    }
}

impl fmt::Debug for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.inner, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::{SectionDemux, SectionFilter};
    use std::io;
    use std::sync::atomic::AtomicBool;

    struct FlagDemux {
        armed: Arc<AtomicBool>,
        stopped: Arc<AtomicBool>,
        fail: bool,
    }

    impl SectionDemux for FlagDemux {
        fn set_filter(&mut self, _filter: &SectionFilter) -> io::Result<()> {
            if self.fail {
                return Err(io::Error::new(io::ErrorKind::Other, "busy"));
            }
            self.armed.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn stop(&mut self) -> io::Result<()> {
            self.stopped.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn sat_target() -> TuningTarget {
        TuningTarget::new(TuningParams::qpsk(12_000_000, 27_500_000))
            .with_polarisation(Polarisation::Horizontal)
    }

    #[test]
    fn test_ref_counting() {
        let target = TargetRef::new(sat_target());
        assert_eq!(target.ref_count(), 1);

        let second = target.clone();
        assert_eq!(target.ref_count(), 2);
        assert!(TargetRef::ptr_eq(&target, &second));
        assert!(second.is(&target));

        drop(second);
        assert_eq!(target.ref_count(), 1);
    }

    #[test]
    fn test_shared_is_uncounted() {
        let target = TargetRef::new(sat_target());
        let shared = target.shared();
        assert_eq!(target.ref_count(), 1);
        assert!(target.is(&shared));
    }

    #[test]
    fn test_display_name() {
        assert_eq!(sat_target().to_string(), "12000000 H");
        assert_eq!(sat_target().with_name("Astra 1KR").to_string(), "Astra 1KR");
        assert_eq!(TuningTarget::new(TuningParams::ofdm(506_000_000)).to_string(), "506000000");
    }

    #[test]
    fn test_lifecycle() {
        let target = sat_target();
        assert_eq!(target.state(), TargetState::Idle);
        assert!(target.set_state(TargetState::Tuning));
        assert!(!target.set_state(TargetState::Tuning));

        target.mark_active();
        assert!(target.became_active().is_some());
        assert!(target.mark_idle());
        assert_eq!(target.state(), TargetState::Idle);
        assert!(target.became_idle().is_some());
        assert!(!target.mark_idle());
    }

    #[test]
    fn test_unlocked_poll_does_not_touch_histogram() {
        let target = sat_target();
        target.record_poll(SignalStatus::Locked, 3);
        target.record_poll(SignalStatus::CarrierOnly, 99);
        assert_eq!(target.status_text(), Some("Carrier only"));
        assert_eq!(target.fec_histogram().chronological(), vec![3]);
        target.record_poll(SignalStatus::Locked, 0);
        assert_eq!(target.status_text(), None);
        assert_eq!(target.fec_histogram().chronological(), vec![3, 0]);
    }

    #[test]
    fn test_add_table_ignores_duplicate_name() {
        let target = sat_target();
        let demux = || {
            Box::new(FlagDemux {
                armed: Arc::new(AtomicBool::new(false)),
                stopped: Arc::new(AtomicBool::new(false)),
                fail: false,
            })
        };
        assert!(target.add_table(TableFilter::new("PAT", SectionFilter::for_table(0, 0), demux())));
        assert!(!target.add_table(TableFilter::new("PAT", SectionFilter::for_table(0, 0), demux())));
        assert!(target.add_table(TableFilter::new("SDT", SectionFilter::for_table(0x11, 0x42), demux())));
        assert_eq!(target.table_count(), 2);
        assert!(target.has_table("PAT"));
        assert!(!target.has_table("NIT"));
    }

    #[test]
    fn test_table_arm_and_tear_down() {
        let target = sat_target();
        let armed = Arc::new(AtomicBool::new(false));
        let stopped = Arc::new(AtomicBool::new(false));
        target.add_table(TableFilter::new(
            "pat",
            SectionFilter::for_table(0, 0),
            Box::new(FlagDemux {
                armed: Arc::clone(&armed),
                stopped: Arc::clone(&stopped),
                fail: false,
            }),
        ));
        target.add_table(TableFilter::new(
            "sdt",
            SectionFilter::for_table(0x11, 0x42),
            Box::new(FlagDemux {
                armed: Arc::new(AtomicBool::new(false)),
                stopped: Arc::new(AtomicBool::new(false)),
                fail: true,
            }),
        ));

        assert_eq!(target.arm_pending_tables(), 1);
        assert!(armed.load(Ordering::SeqCst));
        // The failed filter is not retried.
        assert_eq!(target.arm_pending_tables(), 0);
        assert_eq!(target.armed_table_count(), 2);

        assert_eq!(target.tear_down_tables(), 2);
        assert!(stopped.load(Ordering::SeqCst));
        assert_eq!(target.table_count(), 0);
    }
}
