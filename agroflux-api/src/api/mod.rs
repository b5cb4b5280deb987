//! HTTP API, version 1. Every route lives under `/api/1/...`.

use agronomy::AgronomyError;
use rocket::Route;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use serde::Serialize;
use ts_rs::TS;

pub mod alert;
pub mod dashboard;
pub mod login;
pub mod prediction;
pub mod profile;
pub mod reading;
pub mod sensor;
pub mod status;

/// Error body returned by every failing handler.
#[derive(Serialize, Debug, TS)]
#[ts(export)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = Custom<Json<ErrorResponse>>;

pub fn api_error(code: Status, message: impl Into<String>) -> ApiError {
    Custom(
        code,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// A rejected input, reported with 400.
pub fn validation_error(e: AgronomyError) -> ApiError {
    api_error(Status::BadRequest, e.to_string())
}

/// Logs a database failure and hides its detail from the client.
pub fn db_error(context: &str, e: diesel::result::Error) -> ApiError {
    error!("[db] {}: {:?}", context, e);
    api_error(Status::InternalServerError, "Database error")
}

pub fn routes() -> Vec<Route> {
    let mut all = Vec::new();
    all.extend(status::routes());
    all.extend(login::routes());
    all.extend(profile::routes());
    all.extend(reading::routes());
    all.extend(dashboard::routes());
    all.extend(sensor::routes());
    all.extend(alert::routes());
    all.extend(prediction::routes());
    all
}
