//! Signal status derivation and FEC error history.

use std::fmt;

use crate::frontend::FeStatus;

/// Number of uncorrected-block samples kept per target.
pub const FEC_HISTOGRAM_SIZE: usize = 10;

/// Human-facing summary of the frontend status bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalStatus {
    Locked,
    SyncOnly,
    FecStable,
    CarrierOnly,
    FaintSignal,
    NoSignal,
}

impl SignalStatus {
    /// Pick the highest-priority condition present in `status`.
    pub fn from_fe_status(status: FeStatus) -> Self {
        if status.contains(FeStatus::LOCK) {
            SignalStatus::Locked
        } else if status.contains(FeStatus::SYNC) {
            SignalStatus::SyncOnly
        } else if status.contains(FeStatus::VITERBI) {
            SignalStatus::FecStable
        } else if status.contains(FeStatus::CARRIER) {
            SignalStatus::CarrierOnly
        } else if status.contains(FeStatus::SIGNAL) {
            SignalStatus::FaintSignal
        } else {
            SignalStatus::NoSignal
        }
    }

    /// Problem description, or `None` when locked.
    pub fn description(self) -> Option<&'static str> {
        match self {
            SignalStatus::Locked => None,
            SignalStatus::SyncOnly => Some("No lock, Sync Ok"),
            SignalStatus::FecStable => Some("No lock, FEC stable"),
            SignalStatus::CarrierOnly => Some("Carrier only"),
            SignalStatus::FaintSignal => Some("Faint signal"),
            SignalStatus::NoSignal => Some("No signal"),
        }
    }

    pub fn is_locked(self) -> bool {
        self == SignalStatus::Locked
    }
}

impl fmt::Display for SignalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description().unwrap_or("OK"))
    }
}

/// Ring buffer of uncorrected-block counts sampled while locked.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FecHistogram {
    samples: [u32; FEC_HISTOGRAM_SIZE],
    ptr: usize,
    filled: usize,
}

impl FecHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` at the write pointer and advance it.
    pub fn record(&mut self, value: u32) {
        self.samples[self.ptr] = value;
        self.ptr = (self.ptr + 1) % FEC_HISTOGRAM_SIZE;
        self.filled = (self.filled + 1).min(FEC_HISTOGRAM_SIZE);
    }

    /// Raw slots in storage order.
    pub fn samples(&self) -> &[u32; FEC_HISTOGRAM_SIZE] {
        &self.samples
    }

    /// Index the next sample will be written to.
    pub fn write_pointer(&self) -> usize {
        self.ptr
    }

    /// Number of slots holding a recorded sample.
    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    /// Recorded samples, oldest first.
    pub fn chronological(&self) -> Vec<u32> {
        let start = (self.ptr + FEC_HISTOGRAM_SIZE - self.filled) % FEC_HISTOGRAM_SIZE;
        (0..self.filled)
            .map(|i| self.samples[(start + i) % FEC_HISTOGRAM_SIZE])
            .collect()
    }

    /// Average uncorrected blocks per sample, if any were recorded.
    pub fn mean(&self) -> Option<f64> {
        if self.filled == 0 {
            return None;
        }
        let sum: u64 = self.chronological().iter().map(|&v| u64::from(v)).sum();
        Some(sum as f64 / self.filled as f64)
    }
}
