//! Kernel structures and ioctl numbers from `linux/dvb/frontend.h` and
//! `linux/dvb/dmx.h`.

use nix::{ioctl_none, ioctl_read, ioctl_write_int_bad, ioctl_write_ptr, request_code_none};

use crate::params::{Delivery, TuningParams};
use crate::tables::{SectionFilter, FILTER_LEN};

/// `struct dvb_frontend_parameters`. The delivery union is laid out as
/// seven consecutive words; unused words stay zero.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DvbFrontendParameters {
    pub frequency: u32,
    pub inversion: u32,
    pub u: [u32; 7],
}

impl From<&TuningParams> for DvbFrontendParameters {
    fn from(params: &TuningParams) -> Self {
        let mut u = [0u32; 7];
        match params.delivery {
            Delivery::Qpsk {
                symbol_rate,
                fec_inner,
            } => {
                u[0] = symbol_rate;
                u[1] = fec_inner.as_raw();
            }
            Delivery::Qam {
                symbol_rate,
                fec_inner,
                modulation,
            } => {
                u[0] = symbol_rate;
                u[1] = fec_inner.as_raw();
                u[2] = modulation.as_raw();
            }
            Delivery::Ofdm {
                bandwidth,
                code_rate_hp,
                code_rate_lp,
                constellation,
                transmission_mode,
                guard_interval,
                hierarchy,
            } => {
                u = [
                    bandwidth.as_raw(),
                    code_rate_hp.as_raw(),
                    code_rate_lp.as_raw(),
                    constellation.as_raw(),
                    transmission_mode.as_raw(),
                    guard_interval.as_raw(),
                    hierarchy.as_raw(),
                ];
            }
        }
        Self {
            frequency: params.frequency,
            inversion: params.inversion.as_raw(),
            u,
        }
    }
}

/// `struct dvb_frontend_info`
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct DvbFrontendInfo {
    pub name: [u8; 128],
    pub fe_type: u32,
    pub frequency_min: u32,
    pub frequency_max: u32,
    pub frequency_stepsize: u32,
    pub frequency_tolerance: u32,
    pub symbol_rate_min: u32,
    pub symbol_rate_max: u32,
    pub symbol_rate_tolerance: u32,
    pub notifier_delay: u32,
    pub caps: u32,
}

impl Default for DvbFrontendInfo {
    fn default() -> Self {
        Self {
            name: [0; 128],
            fe_type: 0,
            frequency_min: 0,
            frequency_max: 0,
            frequency_stepsize: 0,
            frequency_tolerance: 0,
            symbol_rate_min: 0,
            symbol_rate_max: 0,
            symbol_rate_tolerance: 0,
            notifier_delay: 0,
            caps: 0,
        }
    }
}

impl DvbFrontendInfo {
    pub fn name(&self) -> String {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(self.name.len());
        String::from_utf8_lossy(&self.name[..end]).into_owned()
    }
}

/// `struct dvb_diseqc_master_cmd`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct DvbDiseqcMasterCmd {
    pub msg: [u8; 6],
    pub msg_len: u8,
}

/// `struct dmx_sct_filter_params`
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct DmxSctFilterParams {
    pub pid: u16,
    pub filter: [u8; FILTER_LEN],
    pub mask: [u8; FILTER_LEN],
    pub mode: [u8; FILTER_LEN],
    pub timeout: u32,
    pub flags: u32,
}

impl From<&SectionFilter> for DmxSctFilterParams {
    fn from(f: &SectionFilter) -> Self {
        Self {
            pid: f.pid,
            filter: f.filter,
            mask: f.mask,
            mode: f.mode,
            timeout: f.timeout_ms,
            flags: f.flags,
        }
    }
}

ioctl_read!(fe_get_info, b'o', 61, DvbFrontendInfo);
ioctl_write_ptr!(fe_diseqc_send_master_cmd, b'o', 63, DvbDiseqcMasterCmd);
ioctl_write_int_bad!(fe_diseqc_send_burst, request_code_none!(b'o', 65));
ioctl_write_int_bad!(fe_set_tone, request_code_none!(b'o', 66));
ioctl_write_int_bad!(fe_set_voltage, request_code_none!(b'o', 67));
ioctl_read!(fe_read_status, b'o', 69, u32);
ioctl_read!(fe_read_uncorrected_blocks, b'o', 72, i32);
ioctl_write_ptr!(fe_set_frontend, b'o', 76, DvbFrontendParameters);

ioctl_none!(dmx_stop, b'o', 42);
ioctl_write_ptr!(dmx_set_filter, b'o', 43, DmxSctFilterParams);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{CodeRate, Modulation};
    use std::mem::size_of;

    #[test]
    fn test_struct_sizes_match_kernel() {
        assert_eq!(size_of::<DvbFrontendParameters>(), 36);
        assert_eq!(size_of::<DvbFrontendInfo>(), 168);
        assert_eq!(size_of::<DvbDiseqcMasterCmd>(), 7);
        assert_eq!(size_of::<DmxSctFilterParams>(), 60);
    }

    #[test]
    fn test_qam_layout() {
        let mut params = TuningParams::qam(346_000_000, 6_900_000);
        if let Delivery::Qam { modulation, fec_inner, .. } = &mut params.delivery {
            *modulation = Modulation::Qam256;
            *fec_inner = CodeRate::None;
        }
        let raw = DvbFrontendParameters::from(&params);
        assert_eq!(raw.frequency, 346_000_000);
        assert_eq!(raw.inversion, 2);
        assert_eq!(raw.u, [6_900_000, 0, 5, 0, 0, 0, 0]);
    }

    #[test]
    fn test_info_name() {
        let mut info = DvbFrontendInfo::default();
        info.name[..8].copy_from_slice(b"STV0299\0");
        assert_eq!(info.name(), "STV0299");
    }
}
