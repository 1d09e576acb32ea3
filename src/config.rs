// SPDX-License-Identifier: PMPL-1.0-or-later
//! Configuration handling for accessgrade

use crate::error::{GradeError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory names skipped by batch scans
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,

    /// Dynamic probing settings
    #[serde(default)]
    pub probe: ProbeConfig,

    /// Metric and category weights
    #[serde(default)]
    pub weights: WeightsConfig,

    /// Quality-level threshold ladder
    #[serde(default)]
    pub quality: QualityConfig,

    /// Logging configuration
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exclude: default_exclude(),
            probe: ProbeConfig::default(),
            weights: WeightsConfig::default(),
            quality: QualityConfig::default(),
            log: LogConfig::default(),
        }
    }
}

fn default_exclude() -> Vec<String> {
    vec![
        ".git".to_string(),
        "node_modules".to_string(),
        "target".to_string(),
        "vendor".to_string(),
        ".venv".to_string(),
    ]
}

impl Config {
    /// Reject weight and threshold settings the scorer cannot use
    pub fn validate(&self) -> Result<()> {
        self.quality.validate()?;
        self.weights.validate()?;
        if self.probe.max_scenarios_per_field == 0 {
            return Err(GradeError::Config(
                "probe.max_scenarios_per_field must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Dynamic probing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Wait after each scenario's notifications, in milliseconds
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Scenarios kept per field
    #[serde(default = "default_max_scenarios")]
    pub max_scenarios_per_field: usize,

    /// Outer deadline for the whole dynamic pass, in seconds
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
            max_scenarios_per_field: default_max_scenarios(),
            deadline_secs: default_deadline_secs(),
        }
    }
}

fn default_settle_delay_ms() -> u64 {
    100
}

fn default_max_scenarios() -> usize {
    3
}

fn default_deadline_secs() -> u64 {
    30
}

/// Weights of the perceptibility sub-metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerceptibilityWeights {
    pub alt_text: f64,
    pub contrast: f64,
    pub media_accessibility: f64,
    /// Normalization divisor applied when every metric is present
    pub divisor: f64,
}

impl Default for PerceptibilityWeights {
    fn default() -> Self {
        Self {
            alt_text: 0.5,
            contrast: 0.5,
            media_accessibility: 0.4,
            divisor: 1.4,
        }
    }
}

/// Weights of the operability sub-metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OperabilityWeights {
    pub keyboard_navigation: f64,
    pub structured_navigation: f64,
    pub divisor: f64,
}

impl Default for OperabilityWeights {
    fn default() -> Self {
        Self {
            keyboard_navigation: 0.6,
            structured_navigation: 0.4,
            divisor: 1.0,
        }
    }
}

/// Weights of the understandability sub-metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UnderstandabilityWeights {
    pub instruction_clarity: f64,
    pub input_assistance: f64,
    pub error_support: f64,
    pub divisor: f64,
}

impl Default for UnderstandabilityWeights {
    fn default() -> Self {
        Self {
            instruction_clarity: 0.4,
            input_assistance: 0.3,
            error_support: 0.3,
            divisor: 1.0,
        }
    }
}

/// Category weights: the inner fold into "main", then main against localization
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryWeights {
    pub perceptibility: f64,
    pub operability: f64,
    pub understandability: f64,
    pub main: f64,
    pub localization: f64,
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self {
            perceptibility: 0.3,
            operability: 0.3,
            understandability: 0.4,
            main: 0.6,
            localization: 0.4,
        }
    }
}

/// Static/dynamic blend of the error-support scorer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridWeights {
    #[serde(rename = "static")]
    pub static_weight: f64,
    #[serde(rename = "dynamic")]
    pub dynamic_weight: f64,
}

impl Default for HybridWeights {
    fn default() -> Self {
        Self {
            static_weight: 0.4,
            dynamic_weight: 0.6,
        }
    }
}

/// All scoring weights
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeightsConfig {
    #[serde(default)]
    pub perceptibility: PerceptibilityWeights,
    #[serde(default)]
    pub operability: OperabilityWeights,
    #[serde(default)]
    pub understandability: UnderstandabilityWeights,
    #[serde(default)]
    pub categories: CategoryWeights,
    #[serde(default)]
    pub hybrid: HybridWeights,
}

impl WeightsConfig {
    fn validate(&self) -> Result<()> {
        let p = &self.perceptibility;
        let o = &self.operability;
        let u = &self.understandability;
        let c = &self.categories;
        let h = &self.hybrid;
        let all = [
            ("perceptibility.alt_text", p.alt_text),
            ("perceptibility.contrast", p.contrast),
            ("perceptibility.media_accessibility", p.media_accessibility),
            ("operability.keyboard_navigation", o.keyboard_navigation),
            ("operability.structured_navigation", o.structured_navigation),
            ("understandability.instruction_clarity", u.instruction_clarity),
            ("understandability.input_assistance", u.input_assistance),
            ("understandability.error_support", u.error_support),
            ("categories.perceptibility", c.perceptibility),
            ("categories.operability", c.operability),
            ("categories.understandability", c.understandability),
            ("categories.main", c.main),
            ("categories.localization", c.localization),
            ("hybrid.static", h.static_weight),
            ("hybrid.dynamic", h.dynamic_weight),
        ];
        for (name, weight) in all {
            if !weight.is_finite() || weight < 0.0 {
                return Err(GradeError::Config(format!(
                    "weights.{} must be a non-negative number, got {}",
                    name, weight
                )));
            }
        }
        for (name, divisor) in [
            ("perceptibility", p.divisor),
            ("operability", o.divisor),
            ("understandability", u.divisor),
        ] {
            if !divisor.is_finite() || divisor <= 0.0 {
                return Err(GradeError::Config(format!(
                    "weights.{}.divisor must be positive, got {}",
                    name, divisor
                )));
            }
        }
        Ok(())
    }
}

/// Lower bounds of the quality levels, best first
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    pub excellent: f64,
    pub good: f64,
    pub satisfactory: f64,
    pub poor: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            excellent: 0.618,
            good: 0.382,
            satisfactory: 0.236,
            poor: 0.146,
        }
    }
}

impl QualityConfig {
    /// Thresholds must lie in [0, 1] and strictly decrease
    pub fn validate(&self) -> Result<()> {
        let ladder = [self.excellent, self.good, self.satisfactory, self.poor];
        if ladder.iter().any(|t| !(0.0..=1.0).contains(t)) {
            return Err(GradeError::Config(format!(
                "quality thresholds must lie in [0, 1], got {:?}",
                ladder
            )));
        }
        if ladder.windows(2).any(|pair| pair[0] <= pair[1]) {
            return Err(GradeError::Config(format!(
                "quality thresholds must strictly decrease, got {:?}",
                ladder
            )));
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (pretty, compact)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn is_toml(path: &Path) -> bool {
    path.extension().map(|e| e == "toml").unwrap_or(false)
}

/// Load configuration from a path; a missing file yields defaults
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        debug!("Config file not found at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)?;

    let config: Config = if is_toml(path) {
        toml::from_str(&content)?
    } else {
        serde_yaml::from_str(&content)?
    };

    config.validate()?;
    debug!(?config, "Loaded configuration");
    Ok(config)
}

/// Default config location
pub fn default_config_path() -> PathBuf {
    PathBuf::from(".accessgrade/config.yml")
}

/// Write default configuration to a file
pub fn write_default_config(path: &Path) -> Result<()> {
    let config = Config::default();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let content = if is_toml(path) {
        toml::to_string_pretty(&config).map_err(|e| GradeError::Config(e.to_string()))?
    } else {
        serde_yaml::to_string(&config)?
    };

    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.probe.settle_delay_ms, 100);
        assert_eq!(config.probe.max_scenarios_per_field, 3);
        assert_eq!(config.weights.perceptibility.divisor, 1.4);
        assert_eq!(config.quality.excellent, 0.618);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: Config = serde_yaml::from_str("probe:\n  settle_delay_ms: 0\n").unwrap();
        assert_eq!(config.probe.settle_delay_ms, 0);
        assert_eq!(config.probe.deadline_secs, 30);
        assert_eq!(config.weights.categories.main, 0.6);
        assert_eq!(config.log.level, "warn");
        assert!(config.exclude.contains(&"node_modules".to_string()));
    }

    #[test]
    fn test_partial_weight_section() {
        let config: Config =
            serde_yaml::from_str("weights:\n  perceptibility:\n    alt_text: 0.7\n").unwrap();
        assert_eq!(config.weights.perceptibility.alt_text, 0.7);
        assert_eq!(config.weights.perceptibility.divisor, 1.4);
    }

    #[test]
    fn test_rejects_non_monotonic_ladder() {
        let mut config = Config::default();
        config.quality.good = 0.7;
        assert!(matches!(config.validate(), Err(GradeError::Config(_))));

        let mut config = Config::default();
        config.quality.excellent = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_negative_weight() {
        let mut config = Config::default();
        config.weights.hybrid.dynamic_weight = -0.1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.weights.operability.divisor = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_round_trip_toml_and_yaml() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["config.toml", "nested/config.yml"] {
            let path = dir.path().join(name);
            write_default_config(&path).unwrap();
            let loaded = load_config(&path).unwrap();
            assert_eq!(loaded.weights.hybrid.static_weight, 0.4);
            assert_eq!(loaded.quality.poor, 0.146);
        }
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.yml")).unwrap();
        assert_eq!(config.probe.deadline_secs, 30);
    }

    #[test]
    fn test_invalid_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yml");
        std::fs::write(&path, "quality:\n  excellent: 0.1\n  good: 0.2\n  satisfactory: 0.3\n  poor: 0.4\n").unwrap();
        assert!(load_config(&path).is_err());
    }
}
