//! Table-filter collaborator boundary.
//!
//! Section filters are registered on a target while it waits in the
//! command queue and armed by the worker once the frontend has been
//! reconfigured. Stopping a target tears all of them down.

use std::fmt;
use std::io;

use crate::target::TuningTarget;

/// Size of the filter, mask and mode arrays.
pub const FILTER_LEN: usize = 16;

/// Section filter flags.
pub mod flags {
    pub const CHECK_CRC: u32 = 1;
    pub const ONESHOT: u32 = 2;
    pub const IMMEDIATE_START: u32 = 4;
}

/// Parameters for DMX_SET_FILTER.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionFilter {
    pub pid: u16,
    pub filter: [u8; FILTER_LEN],
    pub mask: [u8; FILTER_LEN],
    pub mode: [u8; FILTER_LEN],
    pub timeout_ms: u32,
    pub flags: u32,
}

impl SectionFilter {
    /// Match every section with `table_id` on `pid`, CRC checked.
    pub fn for_table(pid: u16, table_id: u8) -> Self {
        let mut filter = [0u8; FILTER_LEN];
        let mut mask = [0u8; FILTER_LEN];
        filter[0] = table_id;
        mask[0] = 0xff;
        Self {
            pid,
            filter,
            mask,
            mode: [0u8; FILTER_LEN],
            timeout_ms: 0,
            flags: flags::CHECK_CRC | flags::IMMEDIATE_START,
        }
    }
}

/// One demux filter handle.
pub trait SectionDemux: Send {
    fn set_filter(&mut self, filter: &SectionFilter) -> io::Result<()>;
    fn stop(&mut self) -> io::Result<()>;
}

/// A table bound to a target. `pending` holds the filter until it is armed.
pub struct TableFilter {
    pub name: String,
    pub pid: u16,
    pub pending: Option<SectionFilter>,
    demux: Box<dyn SectionDemux>,
}

impl TableFilter {
    pub fn new(name: impl Into<String>, filter: SectionFilter, demux: Box<dyn SectionDemux>) -> Self {
        Self {
            name: name.into(),
            pid: filter.pid,
            pending: Some(filter),
            demux,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_none()
    }

    /// Hand the pending filter to the demux. The pending filter is cleared
    /// whether or not the call succeeds.
    pub(crate) fn arm(&mut self) -> io::Result<bool> {
        match self.pending.take() {
            Some(filter) => self.demux.set_filter(&filter).map(|()| true),
            None => Ok(false),
        }
    }

    pub(crate) fn stop(&mut self) -> io::Result<()> {
        self.demux.stop()
    }
}

impl fmt::Debug for TableFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableFilter")
            .field("name", &self.name)
            .field("pid", &self.pid)
            .field("armed", &self.is_armed())
            .finish()
    }
}

/// Manages the table filters bound to tuning targets.
pub trait TableManager: Send + Sync {
    /// Register the filters every tuned target should carry. Called by
    /// `request_tune` before the command is queued.
    fn add_default(&self, target: &TuningTarget);

    /// Arm the filters registered while the target was queued.
    fn arm_pending(&self, target: &TuningTarget) {
        target.arm_pending_tables();
    }

    /// Tear down every filter bound to the target.
    fn tear_down(&self, target: &TuningTarget) {
        target.tear_down_tables();
    }
}

/// Registers nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTables;

impl TableManager for NoTables {
    fn add_default(&self, _target: &TuningTarget) {}
}
