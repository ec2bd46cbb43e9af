//! Optional `turnover.toml` configuration.
//!
//! ```toml
//! [turnover]
//! anomaly_z = 2.0
//! numeric_policy = "propagate"  # or "strict"
//!
//! [classifier]
//! strategy = "best_f1"          # or "topk"
//! k_top = 0.05
//! suite_name = "ML_Evaluation"
//! ```
//!
//! Command-line flags override whatever the file sets.

use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use tracing::debug;

use crate::metrics::NumericPolicy;
use crate::thresholds::StrategyKind;

pub const DEFAULT_CONFIG_FILE: &str = "turnover.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub turnover: TurnoverConfig,
    pub classifier: ClassifierConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TurnoverConfig {
    /// Months with `|z_desligamento|` at or above this are reported as anomalies.
    pub anomaly_z: f64,
    pub numeric_policy: NumericPolicy,
}

impl Default for TurnoverConfig {
    fn default() -> Self {
        Self {
            anomaly_z: 2.0,
            numeric_policy: NumericPolicy::Propagate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassifierConfig {
    pub strategy: StrategyKind,
    pub k_top: f64,
    pub suite_name: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::BestF1,
            k_top: 0.05,
            suite_name: "ML_Evaluation".to_string(),
        }
    }
}

/// Loads `path`, or `turnover.toml` from the working directory when no path is
/// given. A missing default file yields the defaults; an explicit path must exist.
pub fn load(path: Option<&Path>) -> anyhow::Result<Config> {
    let path = match path {
        Some(path) => path,
        None => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            if !default.exists() {
                debug!("no {} found, using defaults", DEFAULT_CONFIG_FILE);
                return Ok(Config::default());
            }
            default
        }
    };

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    parse(&content).with_context(|| format!("invalid config {}", path.display()))
}

pub fn parse(content: &str) -> anyhow::Result<Config> {
    Ok(toml::from_str(content)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.turnover.anomaly_z, 2.0);
        assert_eq!(config.classifier.k_top, 0.05);
    }

    #[test]
    fn parses_partial_sections() {
        let config = parse(
            r#"
            [turnover]
            numeric_policy = "strict"

            [classifier]
            strategy = "topk"
            k_top = 0.1
            "#,
        )
        .unwrap();
        assert_eq!(config.turnover.numeric_policy, NumericPolicy::Strict);
        assert_eq!(config.turnover.anomaly_z, 2.0);
        assert_eq!(config.classifier.strategy, StrategyKind::TopK);
        assert_eq!(config.classifier.k_top, 0.1);
        assert_eq!(config.classifier.suite_name, "ML_Evaluation");
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(parse("[turnover]\nwindow = 6\n").is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(Some(dir.path().join("nope.toml").as_path())).unwrap_err();
        assert!(err.to_string().contains("failed to read config"));
    }

    #[test]
    fn loads_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("turnover.toml");
        std::fs::write(&path, "[turnover]\nanomaly_z = 2.5\n").unwrap();
        let config = load(Some(path.as_path())).unwrap();
        assert_eq!(config.turnover.anomaly_z, 2.5);
    }
}
