//! Sensor reading ingest and queries.

use agronomy::export::{CsvTable, cell};
use agronomy::listing::clamp_limit;
use agronomy::threshold::Snapshot;
use chrono::Utc;
use diesel::Connection;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{Route, State};
use serde::Serialize;
use ts_rs::TS;

use crate::DbConn;
use crate::api::{ApiError, api_error, db_error};
use crate::config::AppConfig;
use crate::download::{Download, dated_filename};
use crate::ingest_guard::IngestKey;
use crate::logged_json::LoggedJson;
use crate::models::{Reading, ReadingInput};
use crate::orm::alert::raise_alerts_for_reading;
use crate::orm::reading::{LatestValues, insert_reading, latest_values, recent_readings};

pub const DEFAULT_LIMIT: i64 = 200;
pub const MAX_LIMIT: i64 = 1000;

#[derive(Serialize, Debug, TS)]
#[ts(export)]
pub struct IngestResponse {
    pub success: bool,
    pub id: i32,
    /// Alerts raised because a value was out of range.
    pub alerts_raised: usize,
}

#[derive(Serialize, Debug, TS)]
#[ts(export)]
pub struct ReadingsResponse {
    pub rows: Vec<Reading>,
}

/// - **URL:** `/api/1/readings`
/// - **Method:** `POST`
/// - **Authentication:** Ingest key
///
/// Request: `{"temperature": 24.1, "humidity": 63.0, "light": 810}`; any
/// value may be omitted or null. Devices measuring illuminance add
/// `"light_unit": "lux"` and the value is stored as PPFD. The reading is
/// stamped with the server time and an open alert is raised for every value outside its band.
#[post("/1/readings", data = "<reading>")]
pub async fn ingest_reading(
    db: DbConn,
    _key: IngestKey,
    config: &State<AppConfig>,
    reading: LoggedJson<ReadingInput>,
) -> Result<Json<IngestResponse>, ApiError> {
    let input = reading.into_inner().normalized();
    let ranges = config.thresholds;
    let now = Utc::now().naive_utc();

    let (stored, raised) = db
        .run(move |conn| {
            conn.transaction(|c| {
                let stored = insert_reading(c, input, now)?;
                let raised = raise_alerts_for_reading(c, &Snapshot::from(input), &ranges, now)?;
                Ok::<_, diesel::result::Error>((stored, raised))
            })
        })
        .await
        .map_err(|e| db_error("Storing reading", e))?;

    if !raised.is_empty() {
        warn!("[ingest] Reading {} raised {} alert(s)", stored.id, raised.len());
    }
    Ok(Json(IngestResponse {
        success: true,
        id: stored.id,
        alerts_raised: raised.len(),
    }))
}

/// - **URL:** `/api/1/readings/latest`
/// - **Method:** `GET`
///
/// The newest non-null value of each sensor; `null` where a sensor has never
/// reported.
#[get("/1/readings/latest")]
pub async fn get_latest(db: DbConn) -> Result<Json<LatestValues>, ApiError> {
    db.run(latest_values)
        .await
        .map(Json)
        .map_err(|e| db_error("Reading latest values", e))
}

/// - **URL:** `/api/1/readings?limit=N`
/// - **Method:** `GET`
///
/// The newest `N` readings (default 200, at most 1000), oldest first.
#[get("/1/readings?<limit>")]
pub async fn list_readings(db: DbConn, limit: Option<i64>) -> Result<Json<ReadingsResponse>, ApiError> {
    let limit = clamp_limit(limit, DEFAULT_LIMIT, MAX_LIMIT);
    let rows = db
        .run(move |conn| recent_readings(conn, limit))
        .await
        .map_err(|e| db_error("Listing readings", e))?;
    Ok(Json(ReadingsResponse { rows }))
}

/// - **URL:** `/api/1/readings/export?limit=N`
/// - **Method:** `GET`
///
/// The same rows as the listing, as `readings_<date>.csv`.
#[get("/1/readings/export?<limit>")]
pub async fn export_readings(db: DbConn, limit: Option<i64>) -> Result<Download, ApiError> {
    let limit = clamp_limit(limit, DEFAULT_LIMIT, MAX_LIMIT);
    let rows = db
        .run(move |conn| recent_readings(conn, limit))
        .await
        .map_err(|e| db_error("Exporting readings", e))?;

    let mut table = CsvTable::new(["id", "recorded_at", "temperature", "humidity", "light"]);
    for r in &rows {
        table
            .push([
                r.id.to_string(),
                r.recorded_at.format("%Y-%m-%d %H:%M:%S").to_string(),
                cell(r.temperature),
                cell(r.humidity),
                cell(r.light),
            ])
            .map_err(|e| api_error(Status::InternalServerError, e.to_string()))?;
    }
    let today = Utc::now().date_naive();
    Ok(Download::csv(dated_filename("readings", today, "csv"), &table))
}

pub fn routes() -> Vec<Route> {
    routes![ingest_reading, get_latest, list_readings, export_readings]
}
