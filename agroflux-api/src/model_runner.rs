//! Client for the external yield model.
//!
//! The model is an opaque program run as `<program> [args...] <action> [json]`.
//! It answers on stdout; the last non-empty line is read as JSON. An object
//! with an `error` key is a reported failure.

use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::process::Command;
use ts_rs::TS;

use crate::config::ModelConfig;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("no model program is configured")]
    NotConfigured,
    #[error("failed to start model: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("model did not answer within {0} s")]
    Timeout(u64),
    #[error("model exited unsuccessfully: {0}")]
    Failed(String),
    #[error("model output is not valid JSON: {0}")]
    InvalidOutput(String),
    #[error("{0}")]
    Reported(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelAction {
    Predict,
    Train,
    Health,
}

impl ModelAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelAction::Predict => "predict",
            ModelAction::Train => "train",
            ModelAction::Health => "health",
        }
    }
}

/// Payload sent with `predict`.
#[derive(Debug, Clone, Serialize)]
pub struct ModelRequest {
    pub crop_type: String,
    pub growth_stage: String,
    pub days_planting: i32,
    pub location: String,
    pub temperature: f64,
    pub humidity: f64,
    pub light: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelPrediction {
    pub predicted_yield: f64,
    pub confidence: f64,
    #[serde(default)]
    pub feature_importance: BTreeMap<String, f64>,
    #[serde(default = "default_model_version")]
    pub model_version: String,
}

fn default_model_version() -> String {
    "external".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum HealthState {
    Ready,
    NotTrained,
    Unavailable,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct ModelHealth {
    pub status: HealthState,
    pub message: String,
}

#[derive(Deserialize)]
struct HealthAnswer {
    status: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ModelRunner {
    config: ModelConfig,
}

impl ModelRunner {
    pub fn new(config: ModelConfig) -> Self {
        ModelRunner { config }
    }

    pub fn is_configured(&self) -> bool {
        self.config
            .program
            .as_deref()
            .is_some_and(|p| !p.trim().is_empty())
    }

    /// Runs one action and returns the parsed answer.
    pub async fn invoke(&self, action: ModelAction, payload: Option<&Value>) -> Result<Value, ModelError> {
        let program = match self.config.program.as_deref() {
            Some(p) if !p.trim().is_empty() => p,
            _ => return Err(ModelError::NotConfigured),
        };

        let mut cmd = Command::new(program);
        cmd.args(&self.config.args)
            .arg(action.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(payload) = payload {
            cmd.arg(payload.to_string());
        }

        let child = cmd.spawn()?;
        let limit = Duration::from_secs(self.config.timeout_secs);
        let output = match tokio::time::timeout(limit, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                warn!("[model] {} timed out after {} s", action.as_str(), self.config.timeout_secs);
                return Err(ModelError::Timeout(self.config.timeout_secs));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let detail = if stderr.is_empty() {
                output.status.to_string()
            } else {
                stderr
            };
            return Err(ModelError::Failed(detail));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_answer(&stdout)
    }

    pub async fn predict(&self, request: &ModelRequest) -> Result<ModelPrediction, ModelError> {
        let payload =
            serde_json::to_value(request).map_err(|e| ModelError::InvalidOutput(e.to_string()))?;
        let answer = self.invoke(ModelAction::Predict, Some(&payload)).await?;
        serde_json::from_value(answer).map_err(|e| ModelError::InvalidOutput(e.to_string()))
    }

    pub async fn train(&self) -> Result<Value, ModelError> {
        self.invoke(ModelAction::Train, None).await
    }

    /// Never fails: problems are reported through the returned status.
    pub async fn health(&self) -> ModelHealth {
        if !self.is_configured() {
            return ModelHealth {
                status: HealthState::Unavailable,
                message: "No model program is configured".to_string(),
            };
        }
        match self.invoke(ModelAction::Health, None).await {
            Ok(answer) => {
                let parsed: HealthAnswer = match serde_json::from_value(answer) {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        return ModelHealth {
                            status: HealthState::Error,
                            message: e.to_string(),
                        };
                    }
                };
                let status = match parsed.status.as_deref() {
                    Some("ready") | Some("ok") => HealthState::Ready,
                    Some("not_trained") => HealthState::NotTrained,
                    _ => HealthState::Error,
                };
                ModelHealth {
                    status,
                    message: parsed.message.unwrap_or_default(),
                }
            }
            Err(ModelError::Spawn(e)) => ModelHealth {
                status: HealthState::Unavailable,
                message: e.to_string(),
            },
            Err(e) => ModelHealth {
                status: HealthState::Error,
                message: e.to_string(),
            },
        }
    }
}

/// Reads the last non-empty line of `stdout` as a JSON answer.
fn parse_answer(stdout: &str) -> Result<Value, ModelError> {
    let Some(line) = stdout.lines().map(str::trim).filter(|l| !l.is_empty()).last() else {
        return Err(ModelError::InvalidOutput("empty output".to_string()));
    };
    let value: Value =
        serde_json::from_str(line).map_err(|e| ModelError::InvalidOutput(e.to_string()))?;
    if let Some(reported) = value.get("error") {
        let message = match reported {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        return Err(ModelError::Reported(message));
    }
    Ok(value)
}
