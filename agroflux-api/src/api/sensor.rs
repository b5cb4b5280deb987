//! Sensor registry: listing, registration, configuration, device reports,
//! history and export.

use agronomy::export::CsvTable;
use agronomy::listing::clamp_limit;
use agronomy::sensor::{
    HistoryStats, NewSensorSpec, SensorFilter, SensorSummary, history_stats, summarize, time_ago,
    validate_config,
};
use agronomy::SensorKind;
use chrono::{NaiveDateTime, Utc};
use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::Route;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::DbConn;
use crate::api::{ApiError, api_error, db_error, validation_error};
use crate::download::{Download, dated_filename};
use crate::ingest_guard::IngestKey;
use crate::logged_json::LoggedJson;
use crate::models::Sensor;
use crate::orm::reading::sensor_series;
use crate::orm::sensor::{get_sensor, insert_sensor, list_sensors, record_sensor_value, update_sensor_config};
use crate::session_guards::AuthenticatedUser;

const HISTORY_DEFAULT: i64 = 50;
const HISTORY_MAX: i64 = 1000;

#[derive(FromForm, Debug, Default)]
pub struct SensorQuery {
    pub q: Option<String>,
    pub status: Option<String>,
    #[field(name = "type")]
    pub sensor_type: Option<String>,
    pub zone: Option<String>,
}

impl From<SensorQuery> for SensorFilter {
    fn from(query: SensorQuery) -> Self {
        SensorFilter {
            q: query.q,
            status: query.status,
            sensor_type: query.sensor_type,
            zone: query.zone,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct SensorView {
    #[serde(flatten)]
    pub sensor: Sensor,
    /// e.g. "5 min ago"; `None` if the sensor never reported.
    pub last_seen: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct SensorListResponse {
    /// Counts over the whole registry, not just the filtered rows.
    pub summary: SensorSummary,
    pub sensors: Vec<SensorView>,
}

#[derive(Deserialize, Serialize, Debug, TS)]
#[ts(export)]
pub struct CreateSensorRequest {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub sensor_type: String,
    #[serde(default)]
    pub zone: String,
}

#[derive(Deserialize, Serialize, Debug, TS)]
#[ts(export)]
pub struct SensorConfigRequest {
    #[serde(default)]
    pub name: String,
    pub zone: Option<String>,
    pub min: f64,
    pub max: f64,
}

#[derive(Deserialize, Serialize, Debug, TS)]
#[ts(export)]
pub struct SensorReport {
    pub value: f64,
    pub battery: Option<i32>,
}

#[derive(Serialize, Debug)]
pub struct HistoryPoint {
    pub recorded_at: NaiveDateTime,
    pub value: f64,
}

#[derive(Serialize, Debug)]
pub struct SensorHistory {
    pub sensor_id: String,
    pub average: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub count: usize,
    pub points: Vec<HistoryPoint>,
}

fn not_found(sensor_id: &str) -> ApiError {
    api_error(Status::NotFound, format!("Sensor '{}' not found", sensor_id))
}

async fn filtered_sensors(
    db: &DbConn,
    query: SensorQuery,
) -> Result<(SensorSummary, Vec<Sensor>), ApiError> {
    let all = db
        .run(list_sensors)
        .await
        .map_err(|e| db_error("Listing sensors", e))?;
    let summary = summarize(&all);
    let filter = SensorFilter::from(query);
    let kept = all.into_iter().filter(|s| filter.matches(s)).collect();
    Ok((summary, kept))
}

/// - **URL:** `/api/1/sensors?q=&status=&type=&zone=`
/// - **Method:** `GET`
///
/// `q` matches name, id or zone case-insensitively. The other filters are
/// exact; `all` or empty disables them.
#[get("/1/sensors?<query..>")]
pub async fn list(db: DbConn, query: SensorQuery) -> Result<Json<SensorListResponse>, ApiError> {
    let (summary, sensors) = filtered_sensors(&db, query).await?;
    let now = Utc::now().naive_utc();
    let sensors = sensors
        .into_iter()
        .map(|sensor| SensorView {
            last_seen: sensor.last_reading.map(|t| time_ago(t, now)),
            sensor,
        })
        .collect();
    Ok(Json(SensorListResponse { summary, sensors }))
}

/// - **URL:** `/api/1/sensors`
/// - **Method:** `POST`
/// - **Authentication:** Session required
///
/// Request: `{"id": "TEMP-003", "name": "...", "type": "temperature",
/// "zone": "lot-b"}`. The sensor starts offline with the type's default
/// band. 409 if the id is taken.
#[post("/1/sensors", data = "<request>")]
pub async fn create(
    db: DbConn,
    auth_user: AuthenticatedUser,
    request: LoggedJson<CreateSensorRequest>,
) -> Result<status::Custom<Json<Sensor>>, ApiError> {
    let spec = NewSensorSpec::parse(&request.id, &request.name, &request.sensor_type, &request.zone)
        .map_err(validation_error)?;

    let sensor_id = spec.id.clone();
    let created = db
        .run(move |conn| {
            if get_sensor(conn, &spec.id)?.is_some() {
                return Ok(None);
            }
            insert_sensor(conn, &spec).map(Some)
        })
        .await
        .map_err(|e| db_error("Creating sensor", e))?;

    match created {
        Some(sensor) => {
            info!("[sensors] '{}' registered {}", auth_user.user.login_id, sensor.id);
            Ok(status::Custom(Status::Created, Json(sensor)))
        }
        None => Err(api_error(
            Status::Conflict,
            format!("Sensor '{}' already exists", sensor_id),
        )),
    }
}

/// - **URL:** `/api/1/sensors/<id>/config`
/// - **Method:** `PUT`
/// - **Authentication:** Session required
///
/// Request: `{"name": "...", "zone": "lot-a", "min": 18, "max": 28}`.
/// `min` must be below `max`.
#[put("/1/sensors/<sensor_id>/config", data = "<request>")]
pub async fn configure(
    db: DbConn,
    _auth_user: AuthenticatedUser,
    sensor_id: String,
    request: LoggedJson<SensorConfigRequest>,
) -> Result<Json<Sensor>, ApiError> {
    let request = request.into_inner();
    let range = validate_config(&request.name, request.min, request.max).map_err(validation_error)?;

    let lookup = sensor_id.clone();
    let updated = db
        .run(move |conn| {
            let zone = request.zone.as_deref().map(str::trim).filter(|z| !z.is_empty());
            update_sensor_config(conn, &lookup, &request.name, zone, range)
        })
        .await
        .map_err(|e| db_error("Configuring sensor", e))?;
    updated.map(Json).ok_or_else(|| not_found(&sensor_id))
}

/// - **URL:** `/api/1/sensors/<id>/reading`
/// - **Method:** `POST`
/// - **Authentication:** Ingest key
///
/// Request: `{"value": 23.4, "battery": 80}`. A value of 0 marks the sensor
/// offline, a value outside its band marks it as warning.
#[post("/1/sensors/<sensor_id>/reading", data = "<report>")]
pub async fn report(
    db: DbConn,
    _key: IngestKey,
    sensor_id: String,
    report: LoggedJson<SensorReport>,
) -> Result<Json<Sensor>, ApiError> {
    let report = report.into_inner();
    let now = Utc::now().naive_utc();
    let lookup = sensor_id.clone();
    let updated = db
        .run(move |conn| record_sensor_value(conn, &lookup, report.value, report.battery, now))
        .await
        .map_err(|e| db_error("Recording sensor value", e))?;
    updated.map(Json).ok_or_else(|| not_found(&sensor_id))
}

/// - **URL:** `/api/1/sensors/<id>/history?limit=N`
/// - **Method:** `GET`
///
/// The last `N` values (default 50) of the readings column matching the
/// sensor's type, oldest first, with their average, minimum and maximum.
#[get("/1/sensors/<sensor_id>/history?<limit>")]
pub async fn history(
    db: DbConn,
    sensor_id: String,
    limit: Option<i64>,
) -> Result<Json<SensorHistory>, ApiError> {
    let limit = clamp_limit(limit, HISTORY_DEFAULT, HISTORY_MAX);
    let lookup = sensor_id.clone();
    let found = db
        .run(move |conn| {
            let Some(sensor) = get_sensor(conn, &lookup)? else {
                return Ok(None);
            };
            let kind = sensor.kind().unwrap_or(SensorKind::Temperature);
            sensor_series(conn, kind, limit).map(Some)
        })
        .await
        .map_err(|e| db_error("Reading sensor history", e))?;
    let series = found.ok_or_else(|| not_found(&sensor_id))?;

    let values: Vec<f64> = series.iter().map(|(_, v)| *v).collect();
    let stats: Option<HistoryStats> = history_stats(&values);
    Ok(Json(SensorHistory {
        sensor_id,
        average: stats.map(|s| s.average),
        min: stats.map(|s| s.min),
        max: stats.map(|s| s.max),
        count: series.len(),
        points: series
            .into_iter()
            .map(|(recorded_at, value)| HistoryPoint { recorded_at, value })
            .collect(),
    }))
}

/// - **URL:** `/api/1/sensors/export?q=&status=&type=&zone=`
/// - **Method:** `GET`
///
/// The filtered registry as `sensors_<date>.csv`.
#[get("/1/sensors/export?<query..>")]
pub async fn export(db: DbConn, query: SensorQuery) -> Result<Download, ApiError> {
    let (_, sensors) = filtered_sensors(&db, query).await?;

    let mut table = CsvTable::new([
        "ID", "Name", "Type", "Location", "Value", "Unit", "Status", "Battery", "Last Reading",
    ]);
    for s in &sensors {
        table
            .push([
                s.id.clone(),
                s.name.clone(),
                s.sensor_type.clone(),
                s.zone.clone(),
                s.current_value.to_string(),
                s.unit.clone(),
                s.status.clone(),
                format!("{}%", s.battery),
                s.last_reading
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_default(),
            ])
            .map_err(|e| api_error(Status::InternalServerError, e.to_string()))?;
    }
    let today = Utc::now().date_naive();
    Ok(Download::csv(dated_filename("sensors", today, "csv"), &table))
}

pub fn routes() -> Vec<Route> {
    routes![list, create, configure, report, history, export]
}
