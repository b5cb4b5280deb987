//! Application settings read from the Rocket figment.
//!
//! Every key can come from `Rocket.toml` or from `AGROFLUX_*` environment
//! variables, e.g. `AGROFLUX_INGEST_API_KEY` or `AGROFLUX_MODEL__PROGRAM`.

use agronomy::RangeSet;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Program that answers `predict`, `train` and `health`. Unset means the
    /// heuristic answers every prediction.
    pub program: Option<String>,
    /// Arguments placed before the action.
    pub args: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            program: None,
            args: Vec::new(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Shared secret for device-facing write endpoints. Ingest is refused
    /// while it is unset.
    pub ingest_api_key: Option<String>,
    pub model: ModelConfig,
    /// Default bands used for ingest alerts and for crops without their own.
    pub thresholds: RangeSet,
    pub prediction_jitter: bool,
    /// Allowed dashboard origins; empty allows any origin.
    pub cors_origins: Vec<String>,
    pub static_dir: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            ingest_api_key: None,
            model: ModelConfig::default(),
            thresholds: RangeSet::default(),
            prediction_jitter: true,
            cors_origins: Vec::new(),
            static_dir: "static".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rocket::figment::Figment;
    use rocket::figment::providers::Serialized;

    #[test]
    fn test_defaults_fill_missing_keys() {
        let config: AppConfig = Figment::new()
            .merge(Serialized::default("ingest_api_key", "k"))
            .merge(Serialized::default("model.timeout_secs", 5))
            .extract()
            .unwrap();
        assert_eq!(config.ingest_api_key.as_deref(), Some("k"));
        assert_eq!(config.model.timeout_secs, 5);
        assert!(config.model.program.is_none());
        assert!(config.prediction_jitter);
        assert_eq!(config.thresholds, RangeSet::default());
        assert_eq!(config.static_dir, "static");
    }

    #[test]
    fn test_threshold_override_is_validated() {
        let ok: Result<AppConfig, _> = Figment::new()
            .merge(Serialized::default("thresholds.temperature", serde_json::json!({"min": 16.0, "max": 26.0})))
            .extract();
        let ok = ok.unwrap();
        assert_eq!(ok.thresholds.temperature.max(), 26.0);
        assert_eq!(ok.thresholds.humidity, RangeSet::default().humidity);

        let bad: Result<AppConfig, _> = Figment::new()
            .merge(Serialized::default("thresholds.light", serde_json::json!({"min": 900.0, "max": 100.0})))
            .extract();
        assert!(bad.is_err());
    }
}
