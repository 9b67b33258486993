//! Run configuration loaded from environment variables
//!
//! Everything is read once at startup and validated before the first event
//! is processed.

use crate::pulse_core::decoder::NUM_SAMPLES;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackendType {
    Jsonl,
    Sqlite,
}

#[derive(Debug)]
pub enum ConfigError {
    MissingVariable(String),
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingVariable(var) => write!(f, "Missing environment variable: {}", var),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Parameters of the pulse reduction itself
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessorConfig {
    /// Number of leading samples averaged into the pedestal
    pub pedestal_samples: usize,
    /// Average pulses per (channel, gain) instead of writing every frame
    pub average: bool,
    /// Flush averages at every lumi-section boundary. Only honoured when
    /// `average` is set.
    pub split_by_lumi: bool,
    /// Frames peaking less than this above pedestal are left out of averages
    pub min_amplitude_for_average: f64,
    pub process_eb: bool,
    pub process_ee: bool,
    /// Bunch crossings to keep; empty keeps all
    pub filter_bx: Vec<u16>,
    pub invert_bx_selection: bool,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            pedestal_samples: 3,
            average: false,
            split_by_lumi: false,
            min_amplitude_for_average: -9e9,
            process_eb: true,
            process_ee: true,
            filter_bx: Vec::new(),
            invert_bx_selection: false,
        }
    }
}

impl ProcessorConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `N_PEDESTAL_SAMPLES` (default: 3)
    /// - `DO_AVERAGE` (default: false)
    /// - `SPLIT_BY_LUMI` (default: false)
    /// - `MIN_AMPLITUDE_FOR_AVERAGE` (default: -9e9)
    /// - `PROCESS_EB` / `PROCESS_EE` (default: true)
    /// - `FILTER_BX` comma-separated list (default: empty, no filtering)
    /// - `INVERT_BX_SELECTION` (default: false)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env` but reads variables through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let filter_bx = match lookup("FILTER_BX") {
            Some(list) => list
                .split(',')
                .map(|bx| bx.trim())
                .filter(|bx| !bx.is_empty())
                .map(|bx| {
                    bx.parse::<u16>().map_err(|_| {
                        ConfigError::InvalidValue(format!("FILTER_BX entry '{}' is not a bunch crossing", bx))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => defaults.filter_bx,
        };

        let config = Self {
            pedestal_samples: parse_var(&lookup, "N_PEDESTAL_SAMPLES", defaults.pedestal_samples)?,
            average: parse_var(&lookup, "DO_AVERAGE", defaults.average)?,
            split_by_lumi: parse_var(&lookup, "SPLIT_BY_LUMI", defaults.split_by_lumi)?,
            min_amplitude_for_average: parse_var(
                &lookup,
                "MIN_AMPLITUDE_FOR_AVERAGE",
                defaults.min_amplitude_for_average,
            )?,
            process_eb: parse_var(&lookup, "PROCESS_EB", defaults.process_eb)?,
            process_ee: parse_var(&lookup, "PROCESS_EE", defaults.process_ee)?,
            filter_bx,
            invert_bx_selection: parse_var(&lookup, "INVERT_BX_SELECTION", defaults.invert_bx_selection)?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pedestal_samples == 0 || self.pedestal_samples > NUM_SAMPLES {
            return Err(ConfigError::InvalidValue(format!(
                "N_PEDESTAL_SAMPLES must be between 1 and {}, got {}",
                NUM_SAMPLES, self.pedestal_samples
            )));
        }

        if self.min_amplitude_for_average.is_nan() {
            return Err(ConfigError::InvalidValue(
                "MIN_AMPLITUDE_FOR_AVERAGE cannot be NaN".to_string(),
            ));
        }

        if !self.process_eb && !self.process_ee {
            log::warn!("⚠️  Both PROCESS_EB and PROCESS_EE are disabled, no frames will be read");
        }

        if self.split_by_lumi && !self.average {
            log::warn!("⚠️  SPLIT_BY_LUMI has no effect without DO_AVERAGE");
        }

        Ok(())
    }

    /// Lumi splitting only applies to averaged output
    pub fn splits_by_lumi(&self) -> bool {
        self.average && self.split_by_lumi
    }
}

/// Input and output locations for the binary
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub backend: BackendType,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
}

impl RuntimeConfig {
    /// Environment variables:
    /// - `PULSE_INPUT_PATH` (required) JSONL event stream
    /// - `PULSE_OUTPUT_PATH` (default: pulses.jsonl, or data/pulses.db with --backend sqlite)
    pub fn from_env(backend: BackendType) -> Result<Self, ConfigError> {
        let input_path = env::var("PULSE_INPUT_PATH")
            .map_err(|_| ConfigError::MissingVariable("PULSE_INPUT_PATH".to_string()))?;

        let output_path = env::var("PULSE_OUTPUT_PATH").unwrap_or_else(|_| match backend {
            BackendType::Jsonl => "pulses.jsonl".to_string(),
            BackendType::Sqlite => "data/pulses.db".to_string(),
        });

        Ok(Self {
            backend,
            input_path: input_path.into(),
            output_path: output_path.into(),
        })
    }

    pub fn parse_backend_from_args() -> BackendType {
        let args: Vec<String> = env::args().collect();

        if let Some(idx) = args.iter().position(|x| x == "--backend") {
            match args.get(idx + 1).map(|s| s.as_str()) {
                Some("sqlite") => return BackendType::Sqlite,
                Some("jsonl") => return BackendType::Jsonl,
                other => log::warn!("Unknown backend {:?}, defaulting to JSONL", other),
            }
        }

        BackendType::Jsonl
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .to_lowercase()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(format!("{}='{}'", key, raw))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ProcessorConfig::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config, ProcessorConfig::default());
        assert_eq!(config.pedestal_samples, 3);
        assert!(!config.average);
        assert!(!config.splits_by_lumi());
        assert!(config.process_eb && config.process_ee);
        assert!(config.filter_bx.is_empty());
    }

    #[test]
    fn test_custom_config() {
        let config = ProcessorConfig::from_lookup(lookup_from(&[
            ("N_PEDESTAL_SAMPLES", "5"),
            ("DO_AVERAGE", "true"),
            ("SPLIT_BY_LUMI", "TRUE"),
            ("MIN_AMPLITUDE_FOR_AVERAGE", "25.5"),
            ("PROCESS_EE", "false"),
            ("FILTER_BX", "41, 1000,,2000"),
            ("INVERT_BX_SELECTION", "true"),
        ]))
        .unwrap();

        assert_eq!(config.pedestal_samples, 5);
        assert!(config.splits_by_lumi());
        assert_eq!(config.min_amplitude_for_average, 25.5);
        assert!(config.process_eb);
        assert!(!config.process_ee);
        assert_eq!(config.filter_bx, vec![41, 1000, 2000]);
        assert!(config.invert_bx_selection);
    }

    #[test]
    fn test_pedestal_samples_out_of_range() {
        for bad in ["0", "11"] {
            let result = ProcessorConfig::from_lookup(lookup_from(&[("N_PEDESTAL_SAMPLES", bad)]));
            assert!(matches!(result, Err(ConfigError::InvalidValue(_))), "{}", bad);
        }
        let result = ProcessorConfig::from_lookup(lookup_from(&[("N_PEDESTAL_SAMPLES", "10")]));
        assert!(result.is_ok());
    }

    #[test]
    fn test_unparsable_values_fail() {
        assert!(ProcessorConfig::from_lookup(lookup_from(&[("DO_AVERAGE", "yes")])).is_err());
        assert!(ProcessorConfig::from_lookup(lookup_from(&[("FILTER_BX", "41,abc")])).is_err());
        assert!(ProcessorConfig::from_lookup(lookup_from(&[("MIN_AMPLITUDE_FOR_AVERAGE", "NaN")])).is_err());
    }

    #[test]
    fn test_split_needs_average() {
        let config = ProcessorConfig {
            split_by_lumi: true,
            ..ProcessorConfig::default()
        };
        assert!(config.validate().is_ok());
        assert!(!config.splits_by_lumi());
    }
}
