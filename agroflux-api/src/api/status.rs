//! Liveness and build information.

use rocket::{Route, State, serde::json::Json};
use serde::Serialize;
use ts_rs::TS;

use crate::config::AppConfig;

pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

#[derive(Serialize, TS)]
#[ts(export)]
pub struct ServiceStatus {
    status: &'static str,
    version: &'static str,
    built: &'static str,
    git_commit: Option<&'static str>,
    /// Whether an external yield model is configured.
    model_configured: bool,
    ingest_enabled: bool,
}

/// - **URL:** `/api/1/status`
/// - **Method:** `GET`
/// - **Authentication:** None required
///
/// ```json
/// {
///   "status": "running",
///   "version": "0.1.0",
///   "built": "Mon, 02 Jun 2025 09:12:44 +0000",
///   "git_commit": "4f1c0a9e...",
///   "model_configured": false,
///   "ingest_enabled": true
/// }
/// ```
#[get("/1/status")]
pub fn service_status(config: &State<AppConfig>) -> Json<ServiceStatus> {
    Json(ServiceStatus {
        status: "running",
        version: env!("CARGO_PKG_VERSION"),
        built: built_info::BUILT_TIME_UTC,
        git_commit: built_info::GIT_COMMIT_HASH,
        model_configured: config
            .model
            .program
            .as_deref()
            .is_some_and(|p| !p.trim().is_empty()),
        ingest_enabled: config.ingest_api_key.as_deref().is_some_and(|k| !k.is_empty()),
    })
}

pub fn routes() -> Vec<Route> {
    routes![service_status]
}
