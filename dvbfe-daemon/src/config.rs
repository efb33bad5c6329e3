//! Configuration file format.

use std::io;
use std::path::{Path, PathBuf};

use dvbfe::{Delivery, FrontendKind, LnbConfig, Polarisation, TuningParams, TuningTarget};
use serde::Deserialize;
use thiserror::Error;

/// File looked up in the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "dvbfe.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("mux \"{mux}\" on {adapter} carries {delivery} parameters but the frontend is {kind}")]
    DeliveryMismatch {
        adapter: String,
        mux: String,
        delivery: &'static str,
        kind: FrontendKind,
    },

    #[error("satellite mux \"{mux}\" on {adapter} has no polarisation")]
    MissingPolarisation { adapter: String, mux: String },
}

#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub monitor: MonitorSection,
    #[serde(default)]
    pub lnb: LnbConfig,
    #[serde(default, rename = "adapter")]
    pub adapters: Vec<AdapterSection>,
}

#[derive(Debug, Deserialize, Default)]
pub struct LoggingSection {
    pub log_dir: Option<String>,
    pub retention_days: Option<u64>,
    pub level: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct MonitorSection {
    /// Seconds between status reports.
    pub status_interval: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct AdapterSection {
    /// Adapter directory, e.g. `/dev/dvb/adapter0`.
    pub path: String,
    #[serde(default)]
    pub frontend: u32,
    /// Overrides the kind reported by the driver.
    pub kind: Option<FrontendKind>,
    #[serde(default, rename = "mux")]
    pub muxes: Vec<MuxSection>,
}

#[derive(Debug, Deserialize)]
pub struct MuxSection {
    pub name: Option<String>,
    pub polarisation: Option<Polarisation>,
    /// Tune to this mux at startup.
    #[serde(default)]
    pub tune: bool,
    #[serde(flatten)]
    pub params: TuningParams,
}

impl ConfigFile {
    pub fn parse(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Read and parse `path`.
pub fn load_config(path: &Path) -> Result<ConfigFile, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    ConfigFile::parse(path, &contents)
}

/// Explicit path, else `dvbfe.toml` if it exists in the working directory.
pub fn resolve_config_path(explicit: Option<PathBuf>) -> Option<PathBuf> {
    explicit.or_else(|| {
        let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
        default_path.exists().then_some(default_path)
    })
}

fn delivery_kind(delivery: &Delivery) -> (FrontendKind, &'static str) {
    match delivery {
        Delivery::Qpsk { .. } => (FrontendKind::Satellite, "qpsk"),
        Delivery::Qam { .. } => (FrontendKind::Cable, "qam"),
        Delivery::Ofdm { .. } => (FrontendKind::Terrestrial, "ofdm"),
    }
}

impl MuxSection {
    pub fn display_name(&self) -> String {
        match (&self.name, self.polarisation) {
            (Some(name), _) => name.clone(),
            (None, Some(pol)) => format!("{} {}", self.params.frequency, pol),
            (None, None) => self.params.frequency.to_string(),
        }
    }

    /// Check the mux can be tuned on a frontend of `kind`.
    pub fn validate(&self, adapter: &str, kind: FrontendKind) -> Result<(), ConfigError> {
        let (expected, delivery) = delivery_kind(&self.params.delivery);
        if expected != kind {
            return Err(ConfigError::DeliveryMismatch {
                adapter: adapter.to_string(),
                mux: self.display_name(),
                delivery,
                kind,
            });
        }
        if kind == FrontendKind::Satellite && self.polarisation.is_none() {
            return Err(ConfigError::MissingPolarisation {
                adapter: adapter.to_string(),
                mux: self.display_name(),
            });
        }
        Ok(())
    }

    pub fn to_target(&self) -> TuningTarget {
        let mut target = TuningTarget::new(self.params);
        if let Some(name) = &self.name {
            target = target.with_name(name.clone());
        }
        if let Some(pol) = self.polarisation {
            target = target.with_polarisation(pol);
        }
        target
    }
}
