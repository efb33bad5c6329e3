//! Frontend device contract.
//!
//! [`FrontendDevice`] is the only binary boundary of the crate. The Linux
//! binding implements it with ioctls; tests implement it with recorders.

use std::fmt;
use std::io;
use std::ops::BitOr;
use std::thread;
use std::time::Duration;

use log::{debug, warn};
use serde::Deserialize;

use crate::diseqc::{BandSwitch, DEFAULT_SWITCH_POSITION};
use crate::error::FrontendError;
use crate::lnb::{Band, LnbSource};
use crate::params::TuningParams;
use crate::target::TuningTarget;

/// Status bits reported by FE_READ_STATUS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeStatus(u32);

impl FeStatus {
    pub const SIGNAL: FeStatus = FeStatus(0x01);
    pub const CARRIER: FeStatus = FeStatus(0x02);
    pub const VITERBI: FeStatus = FeStatus(0x04);
    pub const SYNC: FeStatus = FeStatus(0x08);
    pub const LOCK: FeStatus = FeStatus(0x10);
    pub const TIMEDOUT: FeStatus = FeStatus(0x20);
    pub const REINIT: FeStatus = FeStatus(0x40);

    pub const fn empty() -> Self {
        FeStatus(0)
    }

    pub const fn from_bits(bits: u32) -> Self {
        FeStatus(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: FeStatus) -> bool {
        self.0 & other.0 == other.0 && other.0 != 0
    }

    pub const fn has_lock(self) -> bool {
        self.contains(Self::LOCK)
    }
}

impl BitOr for FeStatus {
    type Output = FeStatus;

    fn bitor(self, rhs: FeStatus) -> FeStatus {
        FeStatus(self.0 | rhs.0)
    }
}

/// LNB supply voltage, which selects polarisation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum SecVoltage {
    V13 = 0,
    V18 = 1,
    Off = 2,
}

/// 22 kHz continuous tone, which selects the LNB local oscillator band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum SecTone {
    On = 0,
    Off = 1,
}

/// Tone-burst ("mini DiSEqC") satellite selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum MiniCommand {
    A = 0,
    B = 1,
}

/// A DiSEqC master command of up to six bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiseqcMessage {
    pub msg: [u8; 6],
    pub len: u8,
}

impl DiseqcMessage {
    pub fn bytes(&self) -> &[u8] {
        &self.msg[..usize::from(self.len).min(self.msg.len())]
    }
}

/// Kind of demodulator behind the frontend node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrontendKind {
    /// DVB-S (QPSK), reached through an LNB.
    Satellite,
    /// DVB-C (QAM)
    Cable,
    /// DVB-T (OFDM)
    Terrestrial,
}

impl FrontendKind {
    /// Map the kernel `fe_type_t` reported by FE_GET_INFO.
    pub fn from_raw(fe_type: u32) -> Result<Self, FrontendError> {
        match fe_type {
            0 => Ok(FrontendKind::Satellite),
            1 => Ok(FrontendKind::Cable),
            2 => Ok(FrontendKind::Terrestrial),
            other => Err(FrontendError::UnsupportedType(other)),
        }
    }

    /// Produce the parameters to hand to FE_SET_FRONTEND for `target`.
    ///
    /// Satellite frontends switch the LNB to the right polarisation and band
    /// first and get the frequency rewritten to the LNB intermediate
    /// frequency. The other kinds pass the target parameters through.
    pub(crate) fn prepare(self, target: &TuningTarget, ctx: &PrepareContext<'_>) -> TuningParams {
        let mut params = *target.params();
        if self != FrontendKind::Satellite {
            return params;
        }

        let lnb = ctx.lnb.lnb_config();
        let band = Band::select(params.frequency, &lnb);
        let switch = BandSwitch::new(
            DEFAULT_SWITCH_POSITION,
            target.is_horizontal(),
            band == Band::High,
        );
        debug!(
            "\"{}\" band switch for \"{}\": {:?} band, horizontal={}",
            ctx.path,
            target,
            band,
            target.is_horizontal()
        );
        if let Err(e) = switch.execute(ctx.device, ctx.diseqc_gap) {
            warn!("\"{}\" tuning to \"{}\" -- DiSEqC setup failed -- {}", ctx.path, target, e);
        }

        thread::sleep(ctx.lnb_settle);

        params.frequency = lnb.intermediate_frequency(params.frequency, band);
        params
    }
}

impl fmt::Display for FrontendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrontendKind::Satellite => f.write_str("DVB-S"),
            FrontendKind::Cable => f.write_str("DVB-C"),
            FrontendKind::Terrestrial => f.write_str("DVB-T"),
        }
    }
}

/// Borrowed adapter state needed by [`FrontendKind::prepare`].
pub(crate) struct PrepareContext<'a> {
    pub path: &'a str,
    pub device: &'a dyn FrontendDevice,
    pub lnb: &'a dyn LnbSource,
    pub diseqc_gap: Duration,
    pub lnb_settle: Duration,
}

/// Static frontend description from FE_GET_INFO.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontendInfo {
    pub name: String,
    pub kind: FrontendKind,
    pub frequency_min: u32,
    pub frequency_max: u32,
}

/// Control calls issued against a frontend device.
///
/// Every call may block for a long time on real hardware, so callers must
/// not hold the adapter lock while invoking them.
pub trait FrontendDevice: Send + Sync {
    /// Describe the frontend.
    fn info(&self) -> io::Result<FrontendInfo>;

    /// FE_SET_FRONTEND
    fn set_frontend(&self, params: &TuningParams) -> io::Result<()>;

    /// FE_READ_STATUS
    fn read_status(&self) -> io::Result<FeStatus>;

    /// FE_READ_UNCORRECTED_BLOCKS. Reading resets the counter on most
    /// drivers; some report negative values transiently.
    fn read_uncorrected_blocks(&self) -> io::Result<i32>;

    /// FE_SET_TONE
    fn set_tone(&self, tone: SecTone) -> io::Result<()>;

    /// FE_SET_VOLTAGE
    fn set_voltage(&self, voltage: SecVoltage) -> io::Result<()>;

    /// FE_DISEQC_SEND_MASTER_CMD
    fn send_diseqc(&self, message: &DiseqcMessage) -> io::Result<()>;

    /// FE_DISEQC_SEND_BURST
    fn send_burst(&self, burst: MiniCommand) -> io::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_bits() {
        let status = FeStatus::SYNC | FeStatus::VITERBI;
        assert!(status.contains(FeStatus::SYNC));
        assert!(status.contains(FeStatus::VITERBI));
        assert!(!status.has_lock());
        assert!(!FeStatus::empty().contains(FeStatus::empty()));
        assert_eq!(FeStatus::from_bits(0x1f).bits(), 0x1f);
        assert!(FeStatus::from_bits(0x1f).has_lock());
    }

    #[test]
    fn test_kind_from_raw() {
        assert_eq!(FrontendKind::from_raw(0).unwrap(), FrontendKind::Satellite);
        assert_eq!(FrontendKind::from_raw(1).unwrap(), FrontendKind::Cable);
        assert_eq!(FrontendKind::from_raw(2).unwrap(), FrontendKind::Terrestrial);
        assert!(matches!(
            FrontendKind::from_raw(3),
            Err(FrontendError::UnsupportedType(3))
        ));
    }

    #[test]
    fn test_diseqc_message_bytes() {
        let message = DiseqcMessage {
            msg: [0xe0, 0x10, 0x38, 0xf3, 0, 0],
            len: 4,
        };
        assert_eq!(message.bytes(), &[0xe0, 0x10, 0x38, 0xf3]);
    }
}
