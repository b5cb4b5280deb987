//! Environmental overview: latest values judged against the bands in effect.

use agronomy::export::CsvTable;
use agronomy::threshold::{Evaluation, Snapshot, evaluate};
use agronomy::{Crop, RangeSet};
use chrono::{NaiveDateTime, Utc};
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{Route, State};
use serde::Serialize;

use crate::DbConn;
use crate::api::{ApiError, api_error, db_error};
use crate::config::AppConfig;
use crate::download::{Download, dated_filename};
use crate::orm::reading::{LatestValues, latest_values};

#[derive(Serialize, Debug)]
pub struct Dashboard {
    /// The crop whose bands are in effect, `None` for the defaults.
    pub crop: Option<Crop>,
    pub latest: LatestValues,
    pub ranges: RangeSet,
    pub evaluation: Evaluation,
    pub status_label: &'static str,
    pub status_summary: &'static str,
    pub last_update: Option<NaiveDateTime>,
}

/// Crop-specific bands when the crop has them, else the configured defaults.
fn bands_for(crop: Option<&str>, defaults: RangeSet) -> (Option<Crop>, RangeSet) {
    let Some(name) = crop.map(str::trim).filter(|c| !c.is_empty()) else {
        return (None, defaults);
    };
    let crop = Crop::from_name(name);
    match RangeSet::for_crop(crop) {
        Some(ranges) => (Some(crop), ranges),
        None => (None, defaults),
    }
}

async fn build_dashboard(db: &DbConn, config: &AppConfig, crop: Option<&str>) -> Result<Dashboard, ApiError> {
    let latest = db
        .run(latest_values)
        .await
        .map_err(|e| db_error("Reading latest values", e))?;
    let (crop, ranges) = bands_for(crop, config.thresholds);
    let evaluation = evaluate(&Snapshot::from(latest), &ranges);
    Ok(Dashboard {
        crop,
        latest,
        ranges,
        status_label: evaluation.overall.label(),
        status_summary: evaluation.overall.summary(),
        evaluation,
        last_update: latest.recorded_at,
    })
}

/// - **URL:** `/api/1/dashboard?crop=<crop>`
/// - **Method:** `GET`
///
/// Returns the latest values, the bands in effect, the per-sensor status,
/// the overall status and the alert lines the dashboard shows.
#[get("/1/dashboard?<crop>")]
pub async fn get_dashboard(
    db: DbConn,
    config: &State<AppConfig>,
    crop: Option<&str>,
) -> Result<Json<Dashboard>, ApiError> {
    build_dashboard(&db, config, crop).await.map(Json)
}

/// - **URL:** `/api/1/dashboard/export?crop=<crop>`
/// - **Method:** `GET`
///
/// One CSV row per sensor: `Sensor,Value,Unit,Status,Optimal Range`.
#[get("/1/dashboard/export?<crop>")]
pub async fn export_dashboard(
    db: DbConn,
    config: &State<AppConfig>,
    crop: Option<&str>,
) -> Result<Download, ApiError> {
    let dashboard = build_dashboard(&db, config, crop).await?;

    let mut table = CsvTable::new(["Sensor", "Value", "Unit", "Status", "Optimal Range"]);
    for s in &dashboard.evaluation.sensors {
        table
            .push([
                s.kind.label().to_string(),
                s.value.map(|v| v.to_string()).unwrap_or_default(),
                s.kind.unit().to_string(),
                s.status.map_or("no data", |st| st.as_str()).to_string(),
                s.range.to_string(),
            ])
            .map_err(|e| api_error(Status::InternalServerError, e.to_string()))?;
    }
    let today = Utc::now().date_naive();
    Ok(Download::csv(dated_filename("dashboard", today, "csv"), &table))
}

pub fn routes() -> Vec<Route> {
    routes![get_dashboard, export_dashboard]
}
