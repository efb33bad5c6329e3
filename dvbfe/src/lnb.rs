//! LNB local oscillator configuration and band selection.

use parking_lot::RwLock;
use serde::Deserialize;

/// Default low-band local oscillator (kHz).
pub const DEFAULT_LOW_FREQ: u32 = 9_750_000;
/// Default high-band local oscillator (kHz).
pub const DEFAULT_HIGH_FREQ: u32 = 10_600_000;
/// Default switch frequency between bands (kHz).
pub const DEFAULT_SWITCH_FREQ: u32 = 11_700_000;

/// Universal LNB oscillator settings.
///
/// A `switch` of 0 disables band switching; every transponder is then
/// received through the low band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct LnbConfig {
    #[serde(rename = "lowfreq", default = "default_low")]
    pub low: u32,
    #[serde(rename = "hifreq", default = "default_high")]
    pub high: u32,
    #[serde(rename = "switchfreq", default = "default_switch")]
    pub switch: u32,
}

fn default_low() -> u32 {
    DEFAULT_LOW_FREQ
}

fn default_high() -> u32 {
    DEFAULT_HIGH_FREQ
}

fn default_switch() -> u32 {
    DEFAULT_SWITCH_FREQ
}

impl Default for LnbConfig {
    fn default() -> Self {
        Self {
            low: DEFAULT_LOW_FREQ,
            high: DEFAULT_HIGH_FREQ,
            switch: DEFAULT_SWITCH_FREQ,
        }
    }
}

impl LnbConfig {
    pub fn new(low: u32, high: u32, switch: u32) -> Self {
        Self { low, high, switch }
    }

    /// Convert an absolute transponder frequency to the intermediate
    /// frequency the LNB outputs on `band`.
    pub fn intermediate_frequency(&self, frequency: u32, band: Band) -> u32 {
        match band {
            Band::High => frequency.abs_diff(self.high),
            Band::Low => frequency.abs_diff(self.low),
        }
    }
}

/// Local oscillator band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Low,
    High,
}

impl Band {
    /// Pick the band for `frequency`: high only when switching is enabled
    /// and the frequency lies strictly above the switch point.
    pub fn select(frequency: u32, lnb: &LnbConfig) -> Band {
        if lnb.switch != 0 && frequency > lnb.switch {
            Band::High
        } else {
            Band::Low
        }
    }
}

/// Source of LNB settings, queried once per satellite tune.
pub trait LnbSource: Send + Sync {
    fn lnb_config(&self) -> LnbConfig;
}

impl LnbSource for LnbConfig {
    fn lnb_config(&self) -> LnbConfig {
        *self
    }
}

/// Settings that may be changed while the adapter is running.
impl LnbSource for RwLock<LnbConfig> {
    fn lnb_config(&self) -> LnbConfig {
        *self.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_universal_lnb_high_band() {
        let lnb = LnbConfig::default();
        let band = Band::select(12_000_000, &lnb);
        assert_eq!(band, Band::High);
        assert_eq!(lnb.intermediate_frequency(12_000_000, band), 1_400_000);
    }

    #[test]
    fn test_universal_lnb_low_band() {
        let lnb = LnbConfig::default();
        let band = Band::select(11_000_000, &lnb);
        assert_eq!(band, Band::Low);
        assert_eq!(lnb.intermediate_frequency(11_000_000, band), 1_250_000);
    }

    #[test]
    fn test_switch_frequency_itself_is_low_band() {
        let lnb = LnbConfig::default();
        assert_eq!(Band::select(11_700_000, &lnb), Band::Low);
        assert_eq!(Band::select(11_700_001, &lnb), Band::High);
    }

    #[test]
    fn test_switching_disabled() {
        let lnb = LnbConfig::new(5_150_000, 0, 0);
        for f in [3_700_000, 11_700_001, 12_750_000, u32::MAX] {
            assert_eq!(Band::select(f, &lnb), Band::Low);
        }
        // C-band LNBs sit above the transponder, hence the absolute difference.
        assert_eq!(lnb.intermediate_frequency(3_700_000, Band::Low), 1_450_000);
    }

    #[test]
    fn test_band_selection_sweep() {
        let lnb = LnbConfig::new(9_750_000, 10_600_000, 11_700_000);
        for f in (10_700_000..=12_750_000).step_by(50_000) {
            let band = Band::select(f, &lnb);
            let expected = if f > lnb.switch {
                f.abs_diff(lnb.high)
            } else {
                f.abs_diff(lnb.low)
            };
            assert_eq!(band == Band::High, f > lnb.switch);
            assert_eq!(lnb.intermediate_frequency(f, band), expected);
        }
    }

    #[test]
    fn test_runtime_source() {
        let source = RwLock::new(LnbConfig::default());
        source.write().switch = 0;
        assert_eq!(source.lnb_config().switch, 0);
    }
}
