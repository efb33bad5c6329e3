//! Frontend tuning parameters.
//!
//! Enum discriminants are the values the Linux DVB v3 API expects, so the
//! driver binding can pass them through with [`as_raw`](CodeRate::as_raw).

use std::fmt;

use serde::Deserialize;

/// LNB polarisation of a satellite transponder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarisation {
    #[serde(alias = "h")]
    Horizontal,
    #[serde(alias = "v")]
    Vertical,
}

impl Polarisation {
    pub fn is_horizontal(self) -> bool {
        self == Polarisation::Horizontal
    }
}

impl fmt::Display for Polarisation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Polarisation::Horizontal => f.write_str("H"),
            Polarisation::Vertical => f.write_str("V"),
        }
    }
}

/// Spectral inversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u32)]
pub enum Inversion {
    Off = 0,
    On = 1,
    #[default]
    Auto = 2,
}

/// Forward error correction code rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[repr(u32)]
pub enum CodeRate {
    #[serde(rename = "none")]
    None = 0,
    #[serde(rename = "1/2")]
    Fec1_2 = 1,
    #[serde(rename = "2/3")]
    Fec2_3 = 2,
    #[serde(rename = "3/4")]
    Fec3_4 = 3,
    #[serde(rename = "4/5")]
    Fec4_5 = 4,
    #[serde(rename = "5/6")]
    Fec5_6 = 5,
    #[serde(rename = "6/7")]
    Fec6_7 = 6,
    #[serde(rename = "7/8")]
    Fec7_8 = 7,
    #[serde(rename = "8/9")]
    Fec8_9 = 8,
    #[default]
    #[serde(rename = "auto")]
    Auto = 9,
}

/// Constellation used by cable and terrestrial frontends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[repr(u32)]
pub enum Modulation {
    #[serde(rename = "qpsk")]
    Qpsk = 0,
    #[serde(rename = "qam16")]
    Qam16 = 1,
    #[serde(rename = "qam32")]
    Qam32 = 2,
    #[serde(rename = "qam64")]
    Qam64 = 3,
    #[serde(rename = "qam128")]
    Qam128 = 4,
    #[serde(rename = "qam256")]
    Qam256 = 5,
    #[default]
    #[serde(rename = "auto")]
    QamAuto = 6,
}

/// Terrestrial channel bandwidth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[repr(u32)]
pub enum Bandwidth {
    #[serde(rename = "8mhz")]
    Mhz8 = 0,
    #[serde(rename = "7mhz")]
    Mhz7 = 1,
    #[serde(rename = "6mhz")]
    Mhz6 = 2,
    #[default]
    #[serde(rename = "auto")]
    Auto = 3,
}

/// Terrestrial OFDM carrier count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[repr(u32)]
pub enum TransmissionMode {
    #[serde(rename = "2k")]
    Mode2k = 0,
    #[serde(rename = "8k")]
    Mode8k = 1,
    #[default]
    #[serde(rename = "auto")]
    Auto = 2,
}

/// Terrestrial guard interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[repr(u32)]
pub enum GuardInterval {
    #[serde(rename = "1/32")]
    Interval1_32 = 0,
    #[serde(rename = "1/16")]
    Interval1_16 = 1,
    #[serde(rename = "1/8")]
    Interval1_8 = 2,
    #[serde(rename = "1/4")]
    Interval1_4 = 3,
    #[default]
    #[serde(rename = "auto")]
    Auto = 4,
}

/// Terrestrial hierarchical modulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[repr(u32)]
pub enum Hierarchy {
    #[serde(rename = "none")]
    None = 0,
    #[serde(rename = "1")]
    H1 = 1,
    #[serde(rename = "2")]
    H2 = 2,
    #[serde(rename = "4")]
    H4 = 3,
    #[default]
    #[serde(rename = "auto")]
    Auto = 4,
}

macro_rules! impl_as_raw {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $ty {
                /// Numeric value understood by the kernel driver.
                pub fn as_raw(self) -> u32 {
                    self as u32
                }
            }
        )*
    };
}

impl_as_raw!(
    Inversion,
    CodeRate,
    Modulation,
    Bandwidth,
    TransmissionMode,
    GuardInterval,
    Hierarchy,
);

/// Delivery-system specific part of the parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "system", rename_all = "lowercase")]
pub enum Delivery {
    /// DVB-S
    Qpsk {
        symbol_rate: u32,
        #[serde(default)]
        fec_inner: CodeRate,
    },
    /// DVB-C
    Qam {
        symbol_rate: u32,
        #[serde(default)]
        fec_inner: CodeRate,
        #[serde(default)]
        modulation: Modulation,
    },
    /// DVB-T
    Ofdm {
        #[serde(default)]
        bandwidth: Bandwidth,
        #[serde(default)]
        code_rate_hp: CodeRate,
        #[serde(default)]
        code_rate_lp: CodeRate,
        #[serde(default)]
        constellation: Modulation,
        #[serde(default)]
        transmission_mode: TransmissionMode,
        #[serde(default)]
        guard_interval: GuardInterval,
        #[serde(default)]
        hierarchy: Hierarchy,
    },
}

/// Everything the frontend needs to lock onto one multiplex.
///
/// `frequency` is in kHz for satellite and in Hz for cable and terrestrial,
/// following the kernel convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TuningParams {
    pub frequency: u32,
    #[serde(default)]
    pub inversion: Inversion,
    #[serde(flatten)]
    pub delivery: Delivery,
}

impl TuningParams {
    /// Satellite parameters with automatic FEC and inversion.
    pub fn qpsk(frequency: u32, symbol_rate: u32) -> Self {
        Self {
            frequency,
            inversion: Inversion::Auto,
            delivery: Delivery::Qpsk {
                symbol_rate,
                fec_inner: CodeRate::Auto,
            },
        }
    }

    /// Cable parameters with automatic FEC, inversion and constellation.
    pub fn qam(frequency: u32, symbol_rate: u32) -> Self {
        Self {
            frequency,
            inversion: Inversion::Auto,
            delivery: Delivery::Qam {
                symbol_rate,
                fec_inner: CodeRate::Auto,
                modulation: Modulation::QamAuto,
            },
        }
    }

    /// Terrestrial parameters with everything left to the demodulator.
    pub fn ofdm(frequency: u32) -> Self {
        Self {
            frequency,
            inversion: Inversion::Auto,
            delivery: Delivery::Ofdm {
                bandwidth: Bandwidth::Auto,
                code_rate_hp: CodeRate::Auto,
                code_rate_lp: CodeRate::Auto,
                constellation: Modulation::QamAuto,
                transmission_mode: TransmissionMode::Auto,
                guard_interval: GuardInterval::Auto,
                hierarchy: Hierarchy::Auto,
            },
        }
    }
}
