//! Yield predictions and the external model's lifecycle.

use std::collections::BTreeMap;

use agronomy::export::{CsvTable, cell};
use agronomy::listing::clamp_limit;
use agronomy::yield_model::estimate;
use agronomy::{Crop, GrowthStage, Jitter, YieldInputs};
use chrono::Utc;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{Route, State};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::DbConn;
use crate::api::{ApiError, api_error, db_error};
use crate::config::AppConfig;
use crate::download::{Download, dated_filename};
use crate::logged_json::LoggedJson;
use crate::model_runner::{ModelError, ModelHealth, ModelRequest, ModelRunner};
use crate::models::{NewPrediction, Prediction};
use crate::orm::prediction::{insert_prediction, list_predictions, set_actual_yield};
use crate::orm::reading::{latest_values, snapshot_reading_id};
use crate::session_guards::AuthenticatedUser;

const DEFAULT_TEMPERATURE: f64 = 24.5;
const DEFAULT_HUMIDITY: f64 = 65.0;
const DEFAULT_LIGHT: f64 = 750.0;

const HISTORY_DEFAULT: i64 = 50;
const HISTORY_MAX: i64 = 500;

#[derive(Deserialize, Serialize, Debug, Default, TS)]
#[ts(export)]
#[serde(default)]
pub struct PredictionRequest {
    pub crop_type: Option<String>,
    pub growth_stage: Option<String>,
    #[serde(alias = "days_planting")]
    pub days_since_planting: Option<i32>,
    #[serde(alias = "location")]
    pub location_zone: Option<String>,
}

#[derive(Serialize, Debug, TS)]
#[ts(export)]
pub struct PredictionResponse {
    pub id: i32,
    pub predicted_yield: f64,
    pub confidence: f64,
    pub feature_importance: BTreeMap<String, f64>,
    pub model_version: String,
    /// `model` or `heuristic`.
    pub source: String,
}

#[derive(Serialize, Debug)]
pub struct PredictionRow {
    #[serde(flatten)]
    pub prediction: Prediction,
    pub accuracy: Option<f64>,
}

#[derive(Serialize, Debug)]
pub struct PredictionHistory {
    pub rows: Vec<PredictionRow>,
}

#[derive(Deserialize, Serialize, Debug, TS)]
#[ts(export)]
pub struct ActualYieldRequest {
    pub actual_yield: f64,
}

#[derive(Serialize, Debug)]
pub struct TrainResponse {
    pub success: bool,
    pub result: Value,
}

fn non_blank(value: Option<String>, default: &str) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

struct Outcome {
    predicted_yield: f64,
    confidence: f64,
    feature_importance: BTreeMap<String, f64>,
    model_version: String,
    source: &'static str,
}

async fn run_prediction(config: &AppConfig, request: &ModelRequest) -> Outcome {
    let runner = ModelRunner::new(config.model.clone());
    if runner.is_configured() {
        match runner.predict(request).await {
            Ok(answer) => {
                return Outcome {
                    predicted_yield: answer.predicted_yield,
                    confidence: answer.confidence,
                    feature_importance: answer.feature_importance,
                    model_version: answer.model_version,
                    source: "model",
                };
            }
            Err(e) => warn!("[predict] Model failed, using heuristic: {}", e),
        }
    }

    let inputs = YieldInputs {
        crop: Crop::from_name(&request.crop_type),
        stage: GrowthStage::from_name(&request.growth_stage),
        temperature: request.temperature,
        humidity: request.humidity,
        light: request.light,
    };
    let jitter = if config.prediction_jitter {
        Jitter::sample()
    } else {
        Jitter::None
    };
    let est = estimate(&inputs, jitter);
    Outcome {
        predicted_yield: est.predicted_yield,
        confidence: est.confidence,
        feature_importance: est.feature_importance,
        model_version: est.model_version,
        source: "heuristic",
    }
}

/// - **URL:** `/api/1/predictions`
/// - **Method:** `POST`
///
/// Request: `{"crop_type": "tomato", "growth_stage": "vegetative",
/// "days_since_planting": 45, "location_zone": "lot-a"}`; every field is
/// optional.
/// The environment comes from the latest readings. The stored `reading_id`
/// is set only when the newest reading holds all three values. The external
/// model is asked first; if it is missing or fails the heuristic answers.
/// The result is stored either way.
#[post("/1/predictions", data = "<request>")]
pub async fn create_prediction(
    db: DbConn,
    config: &State<AppConfig>,
    request: LoggedJson<PredictionRequest>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let request = request.into_inner();
    let (latest, reading_id) = db
        .run(|conn| {
            let latest = latest_values(conn)?;
            let reading_id = snapshot_reading_id(conn, &latest)?;
            Ok::<_, diesel::result::Error>((latest, reading_id))
        })
        .await
        .map_err(|e| db_error("Reading latest values", e))?;

    let model_request = ModelRequest {
        crop_type: non_blank(request.crop_type, "tomato"),
        growth_stage: non_blank(request.growth_stage, "vegetative"),
        days_planting: request.days_since_planting.unwrap_or(45),
        location: non_blank(request.location_zone, "lot-a"),
        temperature: latest.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        humidity: latest.humidity.unwrap_or(DEFAULT_HUMIDITY),
        light: latest.light.unwrap_or(DEFAULT_LIGHT),
    };
    let outcome = run_prediction(config, &model_request).await;

    let record = NewPrediction {
        crop_type: model_request.crop_type,
        growth_stage: model_request.growth_stage,
        days_planting: model_request.days_planting,
        location: model_request.location,
        temperature: model_request.temperature,
        humidity: model_request.humidity,
        light: model_request.light,
        reading_id,
        predicted_yield: outcome.predicted_yield,
        confidence: outcome.confidence,
        model_version: outcome.model_version.clone(),
        source: outcome.source.to_string(),
        created_at: Utc::now().naive_utc(),
    };
    let stored = db
        .run(move |conn| insert_prediction(conn, record))
        .await
        .map_err(|e| db_error("Storing prediction", e))?;

    info!(
        "[predict] #{} {} {} kg/ha ({})",
        stored.id, stored.crop_type, stored.predicted_yield, outcome.source
    );
    Ok(Json(PredictionResponse {
        id: stored.id,
        predicted_yield: outcome.predicted_yield,
        confidence: outcome.confidence,
        feature_importance: outcome.feature_importance,
        model_version: outcome.model_version,
        source: outcome.source.to_string(),
    }))
}

/// - **URL:** `/api/1/predictions?limit=N`
/// - **Method:** `GET`
///
/// Newest first, with accuracy for rows whose actual yield is known.
#[get("/1/predictions?<limit>")]
pub async fn prediction_history(db: DbConn, limit: Option<i64>) -> Result<Json<PredictionHistory>, ApiError> {
    let limit = clamp_limit(limit, HISTORY_DEFAULT, HISTORY_MAX);
    let rows = db
        .run(move |conn| list_predictions(conn, limit))
        .await
        .map_err(|e| db_error("Listing predictions", e))?;
    Ok(Json(PredictionHistory {
        rows: rows
            .into_iter()
            .map(|prediction| PredictionRow {
                accuracy: prediction.accuracy(),
                prediction,
            })
            .collect(),
    }))
}

/// - **URL:** `/api/1/predictions/<id>/actual`
/// - **Method:** `PUT`
/// - **Authentication:** Session required
///
/// Request: `{"actual_yield": 41200}`. Must be positive.
#[put("/1/predictions/<prediction_id>/actual", data = "<request>")]
pub async fn record_actual(
    db: DbConn,
    auth_user: AuthenticatedUser,
    prediction_id: i32,
    request: LoggedJson<ActualYieldRequest>,
) -> Result<Json<PredictionRow>, ApiError> {
    let observed = request.actual_yield;
    if !observed.is_finite() || observed <= 0.0 {
        return Err(api_error(Status::BadRequest, "Actual yield must be positive"));
    }
    let updated = db
        .run(move |conn| set_actual_yield(conn, prediction_id, observed))
        .await
        .map_err(|e| db_error("Recording actual yield", e))?
        .ok_or_else(|| {
            api_error(Status::NotFound, format!("Prediction {} not found", prediction_id))
        })?;
    info!(
        "[predict] '{}' recorded {} kg/ha for #{}",
        auth_user.user.login_id, observed, prediction_id
    );
    Ok(Json(PredictionRow {
        accuracy: updated.accuracy(),
        prediction: updated,
    }))
}

/// - **URL:** `/api/1/predictions/export`
/// - **Method:** `GET`
#[get("/1/predictions/export?<limit>")]
pub async fn export_predictions(db: DbConn, limit: Option<i64>) -> Result<Download, ApiError> {
    let limit = clamp_limit(limit, HISTORY_DEFAULT, HISTORY_MAX);
    let rows = db
        .run(move |conn| list_predictions(conn, limit))
        .await
        .map_err(|e| db_error("Exporting predictions", e))?;

    let mut table = CsvTable::new([
        "Date",
        "Crop",
        "Predicted Yield (kg/ha)",
        "Actual Yield (kg/ha)",
        "Accuracy",
        "Confidence",
        "Status",
    ]);
    for p in &rows {
        table
            .push([
                p.created_at.format("%Y-%m-%d").to_string(),
                p.crop_type.clone(),
                p.predicted_yield.to_string(),
                cell(p.actual_yield),
                p.accuracy().map(|a| format!("{}%", a)).unwrap_or_default(),
                format!("{}%", p.confidence),
                if p.actual_yield.is_some() { "Recorded" } else { "Pending" }.to_string(),
            ])
            .map_err(|e| api_error(Status::InternalServerError, e.to_string()))?;
    }
    let today = Utc::now().date_naive();
    Ok(Download::csv(dated_filename("predictions", today, "csv"), &table))
}

/// - **URL:** `/api/1/model/health`
/// - **Method:** `GET`
#[get("/1/model/health")]
pub async fn model_health(config: &State<AppConfig>) -> Json<ModelHealth> {
    Json(ModelRunner::new(config.model.clone()).health().await)
}

/// - **URL:** `/api/1/model/train`
/// - **Method:** `POST`
/// - **Authentication:** Session required
///
/// Returns 503 when no model can be started and 502 when it fails.
#[post("/1/model/train")]
pub async fn train_model(
    config: &State<AppConfig>,
    auth_user: AuthenticatedUser,
) -> Result<Json<TrainResponse>, ApiError> {
    info!("[model] Training requested by '{}'", auth_user.user.login_id);
    match ModelRunner::new(config.model.clone()).train().await {
        Ok(result) => Ok(Json(TrainResponse {
            success: true,
            result,
        })),
        Err(e @ (ModelError::NotConfigured | ModelError::Spawn(_))) => {
            warn!("[model] Training unavailable: {}", e);
            Err(api_error(Status::ServiceUnavailable, e.to_string()))
        }
        Err(e) => {
            error!("[model] Training failed: {}", e);
            Err(api_error(Status::BadGateway, e.to_string()))
        }
    }
}

pub fn routes() -> Vec<Route> {
    routes![
        create_prediction,
        prediction_history,
        record_actual,
        export_predictions,
        model_health,
        train_model
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_blank_defaults() {
        assert_eq!(non_blank(None, "tomato"), "tomato");
        assert_eq!(non_blank(Some("  ".into()), "tomato"), "tomato");
        assert_eq!(non_blank(Some(" pepper ".into()), "tomato"), "pepper");
    }

    #[tokio::test]
    async fn test_unconfigured_model_uses_heuristic() {
        let config = AppConfig {
            prediction_jitter: false,
            ..AppConfig::default()
        };
        let request = ModelRequest {
            crop_type: "tomato".into(),
            growth_stage: "fruiting".into(),
            days_planting: 60,
            location: "lot-a".into(),
            temperature: 24.0,
            humidity: 65.0,
            light: 750.0,
        };
        let outcome = run_prediction(&config, &request).await;
        assert_eq!(outcome.source, "heuristic");
        assert_eq!(outcome.predicted_yield, 63756.0);
        assert_eq!(outcome.confidence, 85.0);
    }
}
