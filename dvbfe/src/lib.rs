//! dvbfe - asynchronous frontend tuning for DVB adapters.
//!
//! Hardware reconfiguration on DVB frontends is slow (hundreds of
//! milliseconds per call), so every [`Adapter`] owns one worker thread that
//! drains a FIFO of tune commands, drives the LNB band switch for satellite
//! frontends, and samples signal quality once a second while a
//! [`TuningTarget`] is current.

pub mod adapter;
pub mod diseqc;
pub mod error;
pub mod frontend;
pub mod lnb;
pub mod params;
pub mod quality;
pub mod queue;
pub mod tables;
pub mod target;
mod worker;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(not(target_os = "linux"))]
mod unsupported;

#[cfg(target_os = "linux")]
pub use self::linux::{DemuxTables, DvbDemux, DvbFrontend};
#[cfg(not(target_os = "linux"))]
pub use self::unsupported::{DemuxTables, DvbDemux, DvbFrontend};

// Re-export commonly used types
pub use adapter::{Adapter, AdapterBuilder, StateHook, Timings};
pub use error::{FrontendError, Result};
pub use frontend::{FeStatus, FrontendDevice, FrontendInfo, FrontendKind};
pub use lnb::{Band, LnbConfig, LnbSource};
pub use params::{Delivery, Polarisation, TuningParams};
pub use quality::{FecHistogram, SignalStatus, FEC_HISTOGRAM_SIZE};
pub use tables::{NoTables, SectionDemux, SectionFilter, TableFilter, TableManager};
pub use target::{TargetRef, TargetState, TuningTarget};
pub use worker::StepOutcome;
