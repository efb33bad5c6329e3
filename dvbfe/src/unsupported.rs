use std::io;
use std::io::ErrorKind;

use crate::error::{FrontendError, Result};
use crate::frontend::{
    DiseqcMessage, FeStatus, FrontendDevice, FrontendInfo, FrontendKind, MiniCommand, SecTone,
    SecVoltage,
};
use crate::params::TuningParams;
use crate::tables::{SectionDemux, SectionFilter, TableManager};
use crate::target::TuningTarget;

const UNSUPPORTED_MSG: &str = "DVB device access is not supported on this platform (supported: Linux)";

fn unsupported() -> io::Error {
    io::Error::new(ErrorKind::Unsupported, UNSUPPORTED_MSG)
}

#[derive(Debug)]
pub struct DvbFrontend {
    path: String,
}

impl DvbFrontend {
    pub fn open(adapter_path: &str, index: u32) -> Result<Self> {
        Err(FrontendError::Open {
            path: format!("{}/frontend{}", adapter_path, index),
            source: unsupported(),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> Result<FrontendKind> {
        Err(FrontendError::Open {
            path: self.path.clone(),
            source: unsupported(),
        })
    }
}

impl FrontendDevice for DvbFrontend {
    fn info(&self) -> io::Result<FrontendInfo> {
        Err(unsupported())
    }

    fn set_frontend(&self, _params: &TuningParams) -> io::Result<()> {
        Err(unsupported())
    }

    fn read_status(&self) -> io::Result<FeStatus> {
        Err(unsupported())
    }

    fn read_uncorrected_blocks(&self) -> io::Result<i32> {
        Err(unsupported())
    }

    fn set_tone(&self, _tone: SecTone) -> io::Result<()> {
        Err(unsupported())
    }

    fn set_voltage(&self, _voltage: SecVoltage) -> io::Result<()> {
        Err(unsupported())
    }

    fn send_diseqc(&self, _message: &DiseqcMessage) -> io::Result<()> {
        Err(unsupported())
    }

    fn send_burst(&self, _burst: MiniCommand) -> io::Result<()> {
        Err(unsupported())
    }
}

#[derive(Debug)]
pub struct DvbDemux {
    _private: (),
}

impl DvbDemux {
    pub fn open(_adapter_path: &str) -> io::Result<Self> {
        Err(unsupported())
    }
}

impl SectionDemux for DvbDemux {
    fn set_filter(&mut self, _filter: &SectionFilter) -> io::Result<()> {
        Err(unsupported())
    }

    fn stop(&mut self) -> io::Result<()> {
        Err(unsupported())
    }
}

#[derive(Debug, Clone)]
pub struct DemuxTables {
    _private: (),
}

impl DemuxTables {
    pub fn new(_adapter_path: impl Into<String>) -> Self {
        Self { _private: () }
    }
}

impl TableManager for DemuxTables {
    fn add_default(&self, _target: &TuningTarget) {}
}
