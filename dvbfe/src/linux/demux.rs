use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::io::AsRawFd;

use log::warn;

use super::sys;
use crate::tables::{SectionDemux, SectionFilter, TableFilter, TableManager};
use crate::target::TuningTarget;

/// PSI tables every tuned target carries: (name, pid, table id).
const DEFAULT_TABLES: [(&str, u16, u8); 3] = [
    ("PAT", 0x0000, 0x00),
    ("NIT", 0x0010, 0x40),
    ("SDT", 0x0011, 0x42),
];

/// One open handle on `/dev/dvb/adapterN/demux0`.
#[derive(Debug)]
pub struct DvbDemux {
    file: File,
}

impl DvbDemux {
    pub fn open(adapter_path: &str) -> io::Result<Self> {
        let path = format!("{}/demux0", adapter_path.trim_end_matches('/'));
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self { file })
    }
}

impl SectionDemux for DvbDemux {
    fn set_filter(&mut self, filter: &SectionFilter) -> io::Result<()> {
        let raw = sys::DmxSctFilterParams::from(filter);
        unsafe { sys::dmx_set_filter(self.file.as_raw_fd(), &raw) }?;
        Ok(())
    }

    fn stop(&mut self) -> io::Result<()> {
        unsafe { sys::dmx_stop(self.file.as_raw_fd()) }?;
        Ok(())
    }
}

/// Registers PAT, NIT and SDT section filters on the adapter's demux.
#[derive(Debug, Clone)]
pub struct DemuxTables {
    adapter_path: String,
}

impl DemuxTables {
    pub fn new(adapter_path: impl Into<String>) -> Self {
        Self {
            adapter_path: adapter_path.into(),
        }
    }
}

impl TableManager for DemuxTables {
    fn add_default(&self, target: &TuningTarget) {
        for (name, pid, table_id) in DEFAULT_TABLES {
            // Already bound by an earlier request for the same target.
            if target.has_table(name) {
                continue;
            }
            match DvbDemux::open(&self.adapter_path) {
                Ok(demux) => {
                    target.add_table(TableFilter::new(
                        name,
                        SectionFilter::for_table(pid, table_id),
                        Box::new(demux),
                    ));
                }
                Err(e) => warn!(
                    "\"{}\" cannot open demux for {} on \"{}\": {}",
                    self.adapter_path, name, target, e
                ),
            }
        }
    }
}
