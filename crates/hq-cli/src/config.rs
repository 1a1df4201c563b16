//! `hq.toml` configuration.
//!
//! Every section and field is optional; command-line flags override the
//! file, and defaults apply when neither is given.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use hq_algo::{PowerFlowMode, PowerFlowSettings, RedistributionSettings};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HqConfig {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub power_flow: PowerFlowConfig,
    #[serde(default)]
    pub redistribution: RedistributionConfig,
    #[serde(default)]
    pub geocoder: GeocoderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Time-series year studied when `--year` is not given
    #[serde(default)]
    pub year: Option<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            year: None,
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerFlowConfig {
    #[serde(default = "default_base_mva")]
    pub base_mva: f64,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default = "default_pf_iterations")]
    pub max_iterations: usize,
    /// Loading (%) above which a line is reported as critical
    #[serde(default = "default_critical_threshold")]
    pub critical_threshold: f64,
}

impl Default for PowerFlowConfig {
    fn default() -> Self {
        Self {
            base_mva: default_base_mva(),
            tolerance: default_tolerance(),
            max_iterations: default_pf_iterations(),
            critical_threshold: default_critical_threshold(),
        }
    }
}

fn default_base_mva() -> f64 {
    100.0
}

fn default_tolerance() -> f64 {
    1e-5
}

fn default_pf_iterations() -> usize {
    20
}

fn default_critical_threshold() -> f64 {
    90.0
}

impl PowerFlowConfig {
    pub fn settings(&self) -> PowerFlowSettings {
        PowerFlowSettings::default()
            .with_base_mva(self.base_mva)
            .with_tolerance(self.tolerance)
            .with_max_iterations(self.max_iterations)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedistributionConfig {
    #[serde(default = "default_loss_estimate")]
    pub loss_estimate_fraction: f64,
    #[serde(default = "default_tolerance_fraction")]
    pub tolerance_fraction: f64,
    #[serde(default = "default_redistribution_iterations")]
    pub max_iterations: usize,
}

impl Default for RedistributionConfig {
    fn default() -> Self {
        Self {
            loss_estimate_fraction: default_loss_estimate(),
            tolerance_fraction: default_tolerance_fraction(),
            max_iterations: default_redistribution_iterations(),
        }
    }
}

fn default_loss_estimate() -> f64 {
    0.10
}

fn default_tolerance_fraction() -> f64 {
    1e-3
}

fn default_redistribution_iterations() -> usize {
    50
}

impl RedistributionConfig {
    pub fn settings(&self, mode: PowerFlowMode, power_flow: PowerFlowSettings) -> RedistributionSettings {
        RedistributionSettings {
            loss_estimate_fraction: self.loss_estimate_fraction,
            tolerance_fraction: self.tolerance_fraction,
            max_iterations: self.max_iterations,
            mode,
            power_flow,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeocoderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Pause after every request (ms)
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            delay_ms: default_delay_ms(),
        }
    }
}

fn default_base_url() -> String {
    hq_io::geocode::NOMINATIM_URL.to_string()
}

fn default_user_agent() -> String {
    hq_io::geocode::DEFAULT_USER_AGENT.to_string()
}

fn default_delay_ms() -> u64 {
    hq_io::geocode::DEFAULT_DELAY_MS
}

impl GeocoderConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Read `path`, or return the defaults when no file is given.
pub fn load_config(path: Option<&Path>) -> Result<HqConfig> {
    let Some(path) = path else {
        return Ok(HqConfig::default());
    };
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading configuration {}", path.display()))?;
    parse_config(&contents).with_context(|| format!("parsing configuration {}", path.display()))
}

pub fn parse_config(contents: &str) -> Result<HqConfig> {
    Ok(toml::from_str(contents)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.data.data_dir, PathBuf::from("data"));
        assert_eq!(config.power_flow.critical_threshold, 90.0);
        assert_eq!(config.redistribution.max_iterations, 50);
        assert_eq!(config.geocoder.delay_ms, 250);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = parse_config(
            r#"
            [data]
            year = "2024"

            [power_flow]
            critical_threshold = 80.0

            [redistribution]
            loss_estimate_fraction = 0.05
            "#,
        )
        .unwrap();
        assert_eq!(config.data.year.as_deref(), Some("2024"));
        assert_eq!(config.power_flow.critical_threshold, 80.0);
        assert_eq!(config.power_flow.base_mva, 100.0);

        let settings = config
            .redistribution
            .settings(PowerFlowMode::Dc, config.power_flow.settings());
        assert_eq!(settings.loss_estimate_fraction, 0.05);
        assert_eq!(settings.tolerance_fraction, 1e-3);
        assert_eq!(settings.mode, PowerFlowMode::Dc);
    }

    #[test]
    fn unknown_types_are_rejected() {
        assert!(parse_config("[power_flow]\nbase_mva = \"lots\"").is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load_config(Some(Path::new("/no/such/hq.toml"))).unwrap_err();
        assert!(err.to_string().contains("reading configuration"));
    }
}
