use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::io::AsRawFd;

use log::info;

use super::sys;
use crate::error::{FrontendError, Result};
use crate::frontend::{
    DiseqcMessage, FeStatus, FrontendDevice, FrontendInfo, FrontendKind, MiniCommand, SecTone,
    SecVoltage,
};
use crate::params::TuningParams;

/// A `/dev/dvb/adapterN/frontendM` node.
#[derive(Debug)]
pub struct DvbFrontend {
    path: String,
    file: File,
}

impl DvbFrontend {
    /// Open frontend `index` of the adapter directory `adapter_path`.
    pub fn open(adapter_path: &str, index: u32) -> Result<Self> {
        let path = format!("{}/frontend{}", adapter_path.trim_end_matches('/'), index);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|source| FrontendError::Open {
                path: path.clone(),
                source,
            })?;
        info!("Opened frontend {}", path);
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Query the device and map its type to a [`FrontendKind`].
    pub fn kind(&self) -> Result<FrontendKind> {
        let raw = self.raw_info().map_err(|source| FrontendError::Open {
            path: self.path.clone(),
            source,
        })?;
        FrontendKind::from_raw(raw.fe_type)
    }

    fn raw_info(&self) -> io::Result<sys::DvbFrontendInfo> {
        let mut info = sys::DvbFrontendInfo::default();
        unsafe { sys::fe_get_info(self.file.as_raw_fd(), &mut info) }?;
        Ok(info)
    }
}

impl FrontendDevice for DvbFrontend {
    fn info(&self) -> io::Result<FrontendInfo> {
        let raw = self.raw_info()?;
        let kind = FrontendKind::from_raw(raw.fe_type)
            .map_err(|e| io::Error::new(io::ErrorKind::Unsupported, e))?;
        Ok(FrontendInfo {
            name: raw.name(),
            kind,
            frequency_min: raw.frequency_min,
            frequency_max: raw.frequency_max,
        })
    }

    fn set_frontend(&self, params: &TuningParams) -> io::Result<()> {
        let raw = sys::DvbFrontendParameters::from(params);
        unsafe { sys::fe_set_frontend(self.file.as_raw_fd(), &raw) }?;
        Ok(())
    }

    fn read_status(&self) -> io::Result<FeStatus> {
        let mut status = 0u32;
        unsafe { sys::fe_read_status(self.file.as_raw_fd(), &mut status) }?;
        Ok(FeStatus::from_bits(status))
    }

    fn read_uncorrected_blocks(&self) -> io::Result<i32> {
        let mut blocks = 0i32;
        unsafe { sys::fe_read_uncorrected_blocks(self.file.as_raw_fd(), &mut blocks) }?;
        Ok(blocks)
    }

    fn set_tone(&self, tone: SecTone) -> io::Result<()> {
        unsafe { sys::fe_set_tone(self.file.as_raw_fd(), tone as i32) }?;
        Ok(())
    }

    fn set_voltage(&self, voltage: SecVoltage) -> io::Result<()> {
        unsafe { sys::fe_set_voltage(self.file.as_raw_fd(), voltage as i32) }?;
        Ok(())
    }

    fn send_diseqc(&self, message: &DiseqcMessage) -> io::Result<()> {
        let raw = sys::DvbDiseqcMasterCmd {
            msg: message.msg,
            msg_len: message.len,
        };
        unsafe { sys::fe_diseqc_send_master_cmd(self.file.as_raw_fd(), &raw) }?;
        Ok(())
    }

    fn send_burst(&self, burst: MiniCommand) -> io::Result<()> {
        unsafe { sys::fe_diseqc_send_burst(self.file.as_raw_fd(), burst as i32) }?;
        Ok(())
    }
}
