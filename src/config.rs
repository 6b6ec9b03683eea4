//! Harness configuration
//!
//! Loaded from a TOML file. Every field has a default, so an empty or missing
//! default file yields the classic JitterMark setup: 10 bins per millisecond,
//! 100 ms of range, 48 kHz stereo, 96-frame bursts.
//!
//! Default location: `<config_dir>/jittermark/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::harness::tuner::MAX_CPU_CORES;
use crate::measurement::{JitterGeometry, SummaryKind, NANOS_PER_SECOND};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Voices started before measuring
    pub num_voices: u32,
    pub sample_rate: u32,
    pub frames_per_burst: u32,
    pub channels: u32,
    /// Sink buffer depth in bursts; a delivery later than this many periods is an underrun
    pub buffer_bursts: u32,
    pub duration_secs: f64,
    pub bins_per_msec: u32,
    pub max_msec: u32,
    /// Headline measurement
    pub summary: SummaryKind,
    /// Lock memory and request SCHED_FIFO for the callback thread
    pub realtime: bool,
    /// Pin the callback thread to this core
    pub cpu_core: Option<usize>,
    /// `error`, `warn`, `info`, `debug` or `trace`
    pub log_level: String,
    /// Also append log lines to this file
    pub log_file: Option<PathBuf>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        HarnessConfig {
            num_voices: 8,
            sample_rate: 48_000,
            frames_per_burst: 96,
            channels: 2,
            buffer_bursts: 2,
            duration_secs: 10.0,
            bins_per_msec: 10,
            max_msec: 100,
            summary: SummaryKind::Zero,
            realtime: false,
            cpu_core: None,
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

impl HarnessConfig {
    /// Load a config file. A missing file is an error.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        let text = fs::read_to_string(path)?;
        let config: HarnessConfig = toml::from_str(&text)?;
        config.validate()?;
        log::debug!("[CONFIG] Loaded {}", path.display());
        Ok(config)
    }

    /// Load the default config file, falling back to defaults when absent
    pub fn load_default() -> Result<Self, ConfigError> {
        match default_config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::ValidationFailed(
                "sample_rate must be greater than zero".to_string(),
            ));
        }
        if self.frames_per_burst == 0 {
            return Err(ConfigError::ValidationFailed(
                "frames_per_burst must be greater than zero".to_string(),
            ));
        }
        if self.channels == 0 {
            return Err(ConfigError::ValidationFailed(
                "channels must be greater than zero".to_string(),
            ));
        }
        if !(self.duration_secs.is_finite() && self.duration_secs > 0.0) {
            return Err(ConfigError::ValidationFailed(format!(
                "duration_secs must be positive, got {}",
                self.duration_secs
            )));
        }
        self.geometry()
            .validate()
            .map_err(|e| ConfigError::ValidationFailed(e.to_string()))?;
        if let SummaryKind::Percentile { percentile, .. } = self.summary {
            if !(percentile > 0.0 && percentile <= 100.0) {
                return Err(ConfigError::ValidationFailed(format!(
                    "percentile must be in (0, 100], got {}",
                    percentile
                )));
            }
        }
        if let Some(core) = self.cpu_core {
            if core >= MAX_CPU_CORES {
                return Err(ConfigError::ValidationFailed(format!(
                    "cpu_core must be below {}, got {}",
                    MAX_CPU_CORES, core
                )));
            }
        }
        if self.log_level.parse::<log::LevelFilter>().is_err() {
            return Err(ConfigError::ValidationFailed(format!(
                "unknown log_level '{}'",
                self.log_level
            )));
        }
        Ok(())
    }

    pub fn geometry(&self) -> JitterGeometry {
        JitterGeometry::new(self.bins_per_msec, self.max_msec)
    }

    pub fn period_ns(&self) -> u64 {
        self.frames_per_burst as u64 * NANOS_PER_SECOND / self.sample_rate.max(1) as u64
    }

    /// Number of callback cycles covering `duration_secs` (at least one)
    pub fn cycle_count(&self) -> u64 {
        let frames = (self.duration_secs * self.sample_rate as f64).round() as u64;
        frames.div_ceil(self.frames_per_burst.max(1) as u64).max(1)
    }

    pub fn log_level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("jittermark").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = HarnessConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.geometry(), JitterGeometry::default());
        assert_eq!(config.period_ns(), 2_000_000);
        assert_eq!(config.cycle_count(), 5000);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: HarnessConfig = toml::from_str("num_voices = 32\nmax_msec = 50\n").unwrap();
        assert_eq!(config.num_voices, 32);
        assert_eq!(config.max_msec, 50);
        assert_eq!(config.bins_per_msec, 10);
        assert_eq!(config.summary, SummaryKind::Zero);
    }

    #[test]
    fn test_validation_failures() {
        let mut config = HarnessConfig::default();
        config.bins_per_msec = 0;
        assert!(config.validate().is_err());

        let mut config = HarnessConfig::default();
        config.duration_secs = 0.0;
        assert!(config.validate().is_err());

        let mut config = HarnessConfig::default();
        config.log_level = "loud".to_string();
        assert!(config.validate().is_err());

        let mut config = HarnessConfig::default();
        config.summary = SummaryKind::Percentile {
            stream: crate::measurement::JitterStream::Wakeup,
            percentile: 0.0,
        };
        assert!(config.validate().is_err());

        let mut config = HarnessConfig::default();
        config.realtime = true;
        config.cpu_core = Some(5000);
        assert!(config.validate().is_err());
        config.cpu_core = Some(MAX_CPU_CORES - 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_short_duration_still_runs_one_cycle() {
        let mut config = HarnessConfig::default();
        config.duration_secs = 0.000_001;
        assert_eq!(config.cycle_count(), 1);
    }
}
