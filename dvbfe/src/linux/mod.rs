//! Linux DVB v3 API binding.

mod demux;
mod frontend;
mod sys;

pub use demux::{DemuxTables, DvbDemux};
pub use frontend::DvbFrontend;
