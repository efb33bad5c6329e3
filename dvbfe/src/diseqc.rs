//! LNB band-switch protocol encoder.
//!
//! Selects polarisation with the LNB supply voltage and the local
//! oscillator band with the 22 kHz tone, addressing a DiSEqC 1.0
//! committed switch along the way.

use std::io;
use std::thread;
use std::time::Duration;

use crate::frontend::{DiseqcMessage, FrontendDevice, MiniCommand, SecTone, SecVoltage};

/// Committed switch port used when nothing else is configured.
pub const DEFAULT_SWITCH_POSITION: u8 = 0;

/// Pause between steps of the sequence.
pub const DEFAULT_STEP_GAP: Duration = Duration::from_millis(15);

const FRAMING_COMMAND_NO_REPLY: u8 = 0xe0;
const ADDRESS_ANY_LNB: u8 = 0x10;
const CMD_WRITE_N0: u8 = 0x38;

/// One hardware action of the band-switch sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchStep {
    Tone(SecTone),
    Voltage(SecVoltage),
    Diseqc(DiseqcMessage),
    Burst(MiniCommand),
    /// Let the LNB react before the next step.
    Settle,
}

/// Band-switch request for one tune.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandSwitch {
    pub position: u8,
    pub horizontal: bool,
    pub hiband: bool,
}

impl BandSwitch {
    pub fn new(position: u8, horizontal: bool, hiband: bool) -> Self {
        Self {
            position,
            horizontal,
            hiband,
        }
    }

    /// Committed-switch data byte: port group, polarisation and band.
    pub fn data_byte(&self) -> u8 {
        let port = (self.position % 4) * 4
            + if self.horizontal { 2 } else { 0 }
            + if self.hiband { 1 } else { 0 };
        0xf0 | port
    }

    /// The ordered hardware sequence.
    pub fn encode(&self) -> Vec<SwitchStep> {
        let voltage = if self.horizontal {
            SecVoltage::V18
        } else {
            SecVoltage::V13
        };
        let burst = if (self.position / 4) % 2 == 1 {
            MiniCommand::B
        } else {
            MiniCommand::A
        };
        let tone = if self.hiband { SecTone::On } else { SecTone::Off };

        vec![
            SwitchStep::Tone(SecTone::Off),
            SwitchStep::Voltage(voltage),
            SwitchStep::Settle,
            SwitchStep::Diseqc(DiseqcMessage {
                msg: [
                    FRAMING_COMMAND_NO_REPLY,
                    ADDRESS_ANY_LNB,
                    CMD_WRITE_N0,
                    self.data_byte(),
                    0,
                    0,
                ],
                len: 4,
            }),
            SwitchStep::Settle,
            SwitchStep::Burst(burst),
            SwitchStep::Settle,
            SwitchStep::Tone(tone),
        ]
    }

    /// Run the sequence against `device`, pausing `gap` at each settle step.
    ///
    /// Stops at the first failing call. No retries; the caller owns the
    /// post-switch settle delay.
    pub fn execute(&self, device: &dyn FrontendDevice, gap: Duration) -> io::Result<()> {
        for step in self.encode() {
            match step {
                SwitchStep::Tone(tone) => device.set_tone(tone)?,
                SwitchStep::Voltage(voltage) => device.set_voltage(voltage)?,
                SwitchStep::Diseqc(message) => device.send_diseqc(&message)?,
                SwitchStep::Burst(burst) => device.send_burst(burst)?,
                SwitchStep::Settle => thread::sleep(gap),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_byte() {
        assert_eq!(BandSwitch::new(0, false, false).data_byte(), 0xf0);
        assert_eq!(BandSwitch::new(0, false, true).data_byte(), 0xf1);
        assert_eq!(BandSwitch::new(0, true, false).data_byte(), 0xf2);
        assert_eq!(BandSwitch::new(0, true, true).data_byte(), 0xf3);
        assert_eq!(BandSwitch::new(3, true, true).data_byte(), 0xff);
        assert_eq!(BandSwitch::new(5, false, false).data_byte(), 0xf4);
    }

    #[test]
    fn test_encode_horizontal_high_band() {
        let steps = BandSwitch::new(0, true, true).encode();
        assert_eq!(steps.first(), Some(&SwitchStep::Tone(SecTone::Off)));
        assert_eq!(steps[1], SwitchStep::Voltage(SecVoltage::V18));
        match steps[3] {
            SwitchStep::Diseqc(message) => {
                assert_eq!(message.bytes(), &[0xe0, 0x10, 0x38, 0xf3]);
            }
            other => panic!("unexpected step {:?}", other),
        }
        assert_eq!(steps[5], SwitchStep::Burst(MiniCommand::A));
        assert_eq!(steps.last(), Some(&SwitchStep::Tone(SecTone::On)));
    }

    #[test]
    fn test_encode_vertical_low_band() {
        let steps = BandSwitch::new(0, false, false).encode();
        assert_eq!(steps[1], SwitchStep::Voltage(SecVoltage::V13));
        assert_eq!(steps.last(), Some(&SwitchStep::Tone(SecTone::Off)));
    }

    #[test]
    fn test_encode_burst_b_for_second_group() {
        let steps = BandSwitch::new(4, false, false).encode();
        assert_eq!(steps[5], SwitchStep::Burst(MiniCommand::B));
    }
}
