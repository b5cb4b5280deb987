//! Alert listing, detail, status changes and export.

use agronomy::AgronomyError;
use agronomy::alerts::{
    AlertFilter, AlertKpis, AlertSortKey, AlertStatus, AlertType, Severity, kpis, select,
};
use agronomy::export::{CsvTable, cell};
use agronomy::listing::{SortDir, page_size, paginate};
use chrono::{NaiveDate, Utc};
use rocket::Route;
use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::DbConn;
use crate::api::{ApiError, api_error, db_error, validation_error};
use crate::download::{Download, dated_filename};
use crate::logged_json::LoggedJson;
use crate::models::{Alert, NewAlert};
use crate::orm::alert::{get_alert, insert_alert, list_alerts, set_alert_status, set_status_bulk};
use crate::session_guards::AuthenticatedUser;

#[derive(FromForm, Debug, Default)]
pub struct AlertQuery {
    pub q: Option<String>,
    #[field(name = "type")]
    pub alert_type: Option<String>,
    pub severity: Option<String>,
    pub status: Option<String>,
    pub zone: Option<String>,
    /// `YYYY-MM-DD`, inclusive.
    pub from: Option<String>,
    /// `YYYY-MM-DD`, inclusive.
    pub until: Option<String>,
    pub sort: Option<String>,
    pub dir: Option<String>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

fn parse_day(raw: Option<&str>) -> Result<Option<NaiveDate>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").map(Some).map_err(|_| {
            api_error(
                Status::BadRequest,
                format!("Invalid date '{}', expected YYYY-MM-DD", s),
            )
        }),
    }
}

impl AlertQuery {
    fn filter(&self) -> Result<AlertFilter, ApiError> {
        Ok(AlertFilter {
            q: self.q.clone(),
            alert_type: self.alert_type.clone(),
            severity: self.severity.clone(),
            status: self.status.clone(),
            zone: self.zone.clone(),
            from: parse_day(self.from.as_deref())?,
            until: parse_day(self.until.as_deref())?,
        })
    }

    fn ordering(&self) -> Result<(AlertSortKey, SortDir), ApiError> {
        let key = match self.sort.as_deref() {
            Some(s) if !s.trim().is_empty() => s.parse().map_err(validation_error)?,
            _ => AlertSortKey::default(),
        };
        let dir = match self.dir.as_deref() {
            Some(d) if !d.trim().is_empty() => d.parse().map_err(validation_error)?,
            _ => SortDir::default(),
        };
        Ok((key, dir))
    }
}

#[derive(Serialize, Debug)]
pub struct AlertListResponse {
    pub page: usize,
    pub pages: usize,
    pub page_size: usize,
    pub total: usize,
    pub items: Vec<Alert>,
    /// Counted over every alert that passed the filters, not just this page.
    pub kpis: AlertKpis,
}

#[derive(Serialize, Debug)]
pub struct AlertDetail {
    #[serde(flatten)]
    pub alert: Alert,
    pub recommendations: Vec<&'static str>,
}

#[derive(Deserialize, Serialize, Debug, TS)]
#[ts(export)]
pub struct RaiseAlertRequest {
    #[serde(rename = "type")]
    pub alert_type: String,
    pub severity: String,
    #[serde(default)]
    pub zone: String,
    #[serde(default)]
    pub sensor_id: String,
    #[serde(default)]
    pub message: String,
    pub value: Option<f64>,
}

#[derive(Deserialize, Serialize, Debug, TS)]
#[ts(export)]
pub struct BulkStatusRequest {
    pub ids: Vec<i32>,
    pub status: String,
}

#[derive(Serialize, Debug, TS)]
#[ts(export)]
pub struct BulkStatusResponse {
    pub updated: usize,
}

async fn selected_alerts(db: &DbConn, query: &AlertQuery) -> Result<Vec<Alert>, ApiError> {
    let filter = query.filter()?;
    let (key, dir) = query.ordering()?;
    let all = db
        .run(list_alerts)
        .await
        .map_err(|e| db_error("Listing alerts", e))?;
    Ok(select(all, &filter, key, dir))
}

/// - **URL:** `/api/1/alerts`
/// - **Method:** `GET`
///
/// Query: `q`, `type`, `severity`, `status`, `zone`, `from`, `until`,
/// `sort` (date|type|severity|zone|status|sensor_id), `dir` (asc|desc),
/// `page`, `page_size`. Default order is newest first.
#[get("/1/alerts?<query..>")]
pub async fn list(db: DbConn, query: AlertQuery) -> Result<Json<AlertListResponse>, ApiError> {
    let selected = selected_alerts(&db, &query).await?;
    let kpis = kpis(&selected);
    let page = paginate(selected, query.page, page_size(query.page_size));
    Ok(Json(AlertListResponse {
        page: page.page,
        pages: page.pages,
        page_size: page.page_size,
        total: page.total,
        items: page.items,
        kpis,
    }))
}

/// - **URL:** `/api/1/alerts/<id>`
/// - **Method:** `GET`
///
/// The alert plus the recommended actions for its type.
#[get("/1/alerts/<alert_id>")]
pub async fn detail(db: DbConn, alert_id: i32) -> Result<Json<AlertDetail>, ApiError> {
    let alert = db
        .run(move |conn| get_alert(conn, alert_id))
        .await
        .map_err(|e| db_error("Reading alert", e))?
        .ok_or_else(|| api_error(Status::NotFound, format!("Alert {} not found", alert_id)))?;
    let recommendations = alert
        .alert_type
        .parse::<AlertType>()
        .map(|t| t.recommendations().to_vec())
        .unwrap_or_default();
    Ok(Json(AlertDetail {
        alert,
        recommendations,
    }))
}

/// - **URL:** `/api/1/alerts`
/// - **Method:** `POST`
/// - **Authentication:** Session required
///
/// Raises an open alert by hand. `type` and `severity` must be known values.
#[post("/1/alerts", data = "<request>")]
pub async fn raise(
    db: DbConn,
    auth_user: AuthenticatedUser,
    request: LoggedJson<RaiseAlertRequest>,
) -> Result<status::Custom<Json<Alert>>, ApiError> {
    let request = request.into_inner();
    let alert_type: AlertType = request.alert_type.parse().map_err(validation_error)?;
    let severity: Severity = request.severity.parse().map_err(validation_error)?;
    let message = request.message.trim().to_string();
    if message.is_empty() {
        return Err(validation_error(AgronomyError::MissingField("Message".to_string())));
    }
    let zone = match request.zone.trim() {
        "" => "lot-a".to_string(),
        z => z.to_string(),
    };

    let record = NewAlert {
        raised_at: Utc::now().naive_utc(),
        alert_type: alert_type.as_str().to_string(),
        zone,
        severity: severity.as_str().to_string(),
        message,
        sensor_id: request.sensor_id.trim().to_string(),
        value: request.value,
        status: AlertStatus::Open.as_str().to_string(),
    };
    let alert = db
        .run(move |conn| insert_alert(conn, record))
        .await
        .map_err(|e| db_error("Raising alert", e))?;
    info!(
        "[alerts] '{}' raised alert {} ({} {})",
        auth_user.user.login_id, alert.id, alert.severity, alert.alert_type
    );
    Ok(status::Custom(Status::Created, Json(alert)))
}

async fn change_status(
    db: DbConn,
    auth_user: AuthenticatedUser,
    alert_id: i32,
    status: AlertStatus,
) -> Result<Json<Alert>, ApiError> {
    let updated = db
        .run(move |conn| set_alert_status(conn, alert_id, status))
        .await
        .map_err(|e| db_error("Updating alert", e))?
        .ok_or_else(|| api_error(Status::NotFound, format!("Alert {} not found", alert_id)))?;
    info!("[alerts] '{}' marked alert {} {}", auth_user.user.login_id, alert_id, status);
    Ok(Json(updated))
}

/// - **URL:** `/api/1/alerts/<id>/resolve`
/// - **Method:** `POST`
/// - **Authentication:** Session required
#[post("/1/alerts/<alert_id>/resolve")]
pub async fn resolve(db: DbConn, auth_user: AuthenticatedUser, alert_id: i32) -> Result<Json<Alert>, ApiError> {
    change_status(db, auth_user, alert_id, AlertStatus::Resolved).await
}

/// - **URL:** `/api/1/alerts/<id>/silence`
/// - **Method:** `POST`
/// - **Authentication:** Session required
#[post("/1/alerts/<alert_id>/silence")]
pub async fn silence(db: DbConn, auth_user: AuthenticatedUser, alert_id: i32) -> Result<Json<Alert>, ApiError> {
    change_status(db, auth_user, alert_id, AlertStatus::Silenced).await
}

/// - **URL:** `/api/1/alerts/bulk`
/// - **Method:** `POST`
/// - **Authentication:** Session required
///
/// Request: `{"ids": [1, 2], "status": "resolved"}`. Unknown ids are
/// skipped; `updated` counts the alerts that exist.
#[post("/1/alerts/bulk", data = "<request>")]
pub async fn bulk(
    db: DbConn,
    auth_user: AuthenticatedUser,
    request: LoggedJson<BulkStatusRequest>,
) -> Result<Json<BulkStatusResponse>, ApiError> {
    let request = request.into_inner();
    let status: AlertStatus = request.status.parse().map_err(validation_error)?;
    let ids = request.ids;
    let updated = db
        .run(move |conn| set_status_bulk(conn, &ids, status))
        .await
        .map_err(|e| db_error("Updating alerts", e))?;
    info!("[alerts] '{}' marked {} alert(s) {}", auth_user.user.login_id, updated, status);
    Ok(Json(BulkStatusResponse { updated }))
}

/// - **URL:** `/api/1/alerts/export`
/// - **Method:** `GET`
///
/// Every alert matching the listing filters (not just one page) as
/// `alerts_<date>.csv`.
#[get("/1/alerts/export?<query..>")]
pub async fn export(db: DbConn, query: AlertQuery) -> Result<Download, ApiError> {
    let selected = selected_alerts(&db, &query).await?;

    let mut table = CsvTable::new([
        "id", "date", "type", "severity", "zone", "sensorId", "message", "status", "value",
    ]);
    for a in &selected {
        table
            .push([
                a.id.to_string(),
                a.raised_at.format("%Y-%m-%d %H:%M").to_string(),
                a.alert_type.clone(),
                a.severity.clone(),
                a.zone.clone(),
                a.sensor_id.clone(),
                a.message.clone(),
                a.status.clone(),
                cell(a.value),
            ])
            .map_err(|e| api_error(Status::InternalServerError, e.to_string()))?;
    }
    let today = Utc::now().date_naive();
    Ok(Download::csv(dated_filename("alerts", today, "csv"), &table))
}

pub fn routes() -> Vec<Route> {
    routes![list, detail, raise, resolve, silence, bulk, export]
}
