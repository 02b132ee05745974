//! Pipeline configuration.
//!
//! All tunable constants are collected here with their documented defaults:
//!
//! | knob | default | meaning |
//! |------|---------|---------|
//! | `anomaly_threshold` | `3` | alert path iff `anomaly_count > threshold` (strict) |
//! | `hazard.pm25` | `250.0` µg/m³ | PM2.5 hazard cutoff (strict `>`) |
//! | `hazard.pm10` | `430.0` µg/m³ | PM10 hazard cutoff (strict `>`) |
//! | `bands` | `12.0 / 55.0 / 150.0` | classification bands over max PM2.5 |
//! | `model.timeout` | `30s` | per-attempt bound on the model call |
//! | `model.max_attempts` | `2` | bounded retry for the model call |
//!
//! Environment overrides (loaded via [`PipelineConfig::from_env`], `.env`
//! honoured through `dotenvy`): `AEROSENSE_ANOMALY_THRESHOLD`,
//! `AEROSENSE_HAZARD_PM25`, `AEROSENSE_HAZARD_PM10`, `AEROSENSE_MODEL_URL`,
//! `AEROSENSE_MODEL`, `AEROSENSE_MODEL_TIMEOUT_SECS`.

use std::time::Duration;

/// Default branch threshold: the alert path is taken when more than this many
/// readings exceed the hazard cutoffs.
pub const DEFAULT_ANOMALY_THRESHOLD: usize = 3;

/// Default PM2.5 hazard cutoff in µg/m³.
pub const DEFAULT_HAZARD_PM25: f64 = 250.0;

/// Default PM10 hazard cutoff in µg/m³.
pub const DEFAULT_HAZARD_PM10: f64 = 430.0;

/// Per-pollutant hazard cutoffs used by anomaly detection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HazardThresholds {
    pub pm25: f64,
    pub pm10: f64,
}

impl Default for HazardThresholds {
    fn default() -> Self {
        Self {
            pm25: DEFAULT_HAZARD_PM25,
            pm10: DEFAULT_HAZARD_PM10,
        }
    }
}

/// Classification bands: strict upper bounds on the series maximum PM2.5.
///
/// `Good < good_below ≤ Moderate < moderate_below ≤ Unhealthy <
/// unhealthy_below ≤ Hazardous`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClassificationBands {
    pub good_below: f64,
    pub moderate_below: f64,
    pub unhealthy_below: f64,
}

impl Default for ClassificationBands {
    fn default() -> Self {
        Self {
            good_below: 12.0,
            moderate_below: 55.0,
            unhealthy_below: 150.0,
        }
    }
}

/// Language-model service settings.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelConfig {
    /// Base URL of the Ollama-style service.
    pub base_url: String,
    /// Model identifier passed through to the service.
    pub model: String,
    /// Per-attempt timeout; expiry surfaces as `ModelUnavailable`.
    pub timeout: Duration,
    /// Total attempts for the model call (1 = no retry).
    pub max_attempts: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "mistral:7b".to_string(),
            timeout: Duration::from_secs(30),
            max_attempts: 2,
        }
    }
}

/// Complete pipeline configuration.
///
/// # Examples
///
/// ```rust
/// use aerosense::config::PipelineConfig;
///
/// let config = PipelineConfig::default()
///     .with_anomaly_threshold(5)
///     .with_hazard_cutoffs(200.0, 400.0);
/// assert_eq!(config.anomaly_threshold, 5);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    pub anomaly_threshold: usize,
    pub hazard: HazardThresholds,
    pub bands: ClassificationBands,
    pub model: ModelConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            anomaly_threshold: DEFAULT_ANOMALY_THRESHOLD,
            hazard: HazardThresholds::default(),
            bands: ClassificationBands::default(),
            model: ModelConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Defaults layered with `AEROSENSE_*` environment variables.
    ///
    /// A `.env` file in the working directory is honoured. Unparseable values
    /// fall back to the default rather than failing startup.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let mut config = Self::default();

        if let Some(threshold) = env_parse::<usize>("AEROSENSE_ANOMALY_THRESHOLD") {
            config.anomaly_threshold = threshold;
        }
        if let Some(pm25) = env_parse::<f64>("AEROSENSE_HAZARD_PM25") {
            config.hazard.pm25 = pm25;
        }
        if let Some(pm10) = env_parse::<f64>("AEROSENSE_HAZARD_PM10") {
            config.hazard.pm10 = pm10;
        }
        if let Ok(url) = std::env::var("AEROSENSE_MODEL_URL") {
            config.model.base_url = url;
        }
        if let Ok(model) = std::env::var("AEROSENSE_MODEL") {
            config.model.model = model;
        }
        if let Some(secs) = env_parse::<u64>("AEROSENSE_MODEL_TIMEOUT_SECS") {
            config.model.timeout = Duration::from_secs(secs);
        }

        config
    }

    #[must_use]
    pub fn with_anomaly_threshold(mut self, threshold: usize) -> Self {
        self.anomaly_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_hazard_cutoffs(mut self, pm25: f64, pm10: f64) -> Self {
        self.hazard = HazardThresholds { pm25, pm10 };
        self
    }

    #[must_use]
    pub fn with_bands(mut self, bands: ClassificationBands) -> Self {
        self.bands = bands;
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: ModelConfig) -> Self {
        self.model = model;
        self
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, raw = %raw, "unparseable env override ignored");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documented_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.anomaly_threshold, DEFAULT_ANOMALY_THRESHOLD);
        assert_eq!(config.hazard.pm25, 250.0);
        assert_eq!(config.hazard.pm10, 430.0);
        assert_eq!(config.bands.good_below, 12.0);
        assert_eq!(config.bands.moderate_below, 55.0);
        assert_eq!(config.bands.unhealthy_below, 150.0);
        assert_eq!(config.model.max_attempts, 2);
    }
}
