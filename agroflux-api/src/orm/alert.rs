//! Alert storage. Alerts are never deleted; only their status changes.

use agronomy::alerts::{AlertStatus, AlertType, Severity};
use agronomy::threshold::{RangeSet, Snapshot, evaluate};
use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::models::{Alert, NewAlert};
use crate::orm::db::last_insert_rowid;

pub fn insert_alert(conn: &mut SqliteConnection, alert: NewAlert) -> Result<Alert, diesel::result::Error> {
    use crate::schema::alerts::dsl::*;

    diesel::insert_into(alerts).values(&alert).execute(conn)?;
    let last_id = last_insert_rowid(conn)?;
    alerts
        .filter(id.eq(last_id))
        .select(Alert::as_select())
        .first(conn)
}

pub fn get_alert(
    conn: &mut SqliteConnection,
    alert_id: i32,
) -> Result<Option<Alert>, diesel::result::Error> {
    use crate::schema::alerts::dsl::*;
    alerts
        .filter(id.eq(alert_id))
        .select(Alert::as_select())
        .first(conn)
        .optional()
}

/// Every alert, newest first. Listing filters run in memory on top of this.
pub fn list_alerts(conn: &mut SqliteConnection) -> Result<Vec<Alert>, diesel::result::Error> {
    use crate::schema::alerts::dsl::*;
    alerts
        .order((raised_at.desc(), id.desc()))
        .select(Alert::as_select())
        .load(conn)
}

/// Sets an alert's status. Setting the current status again changes nothing.
pub fn set_alert_status(
    conn: &mut SqliteConnection,
    alert_id: i32,
    new_status: AlertStatus,
) -> Result<Option<Alert>, diesel::result::Error> {
    use crate::schema::alerts::dsl::*;

    let touched = diesel::update(alerts.filter(id.eq(alert_id)))
        .set(status.eq(new_status.as_str()))
        .execute(conn)?;
    if touched == 0 {
        return Ok(None);
    }
    get_alert(conn, alert_id)
}

/// Sets `new_status` on every listed alert. Returns how many of `ids` exist.
pub fn set_status_bulk(
    conn: &mut SqliteConnection,
    ids: &[i32],
    new_status: AlertStatus,
) -> Result<usize, diesel::result::Error> {
    use crate::schema::alerts::dsl::*;

    if ids.is_empty() {
        return Ok(0);
    }
    diesel::update(alerts.filter(id.eq_any(ids)))
        .set(status.eq(new_status.as_str()))
        .execute(conn)
}

/// Raises one open alert per out-of-range value in `snapshot`.
///
/// The alert is attributed to the first registered sensor of the matching
/// type; without one, the sensor id is the type name and the zone is
/// `lot-a`.
pub fn raise_alerts_for_reading(
    conn: &mut SqliteConnection,
    snapshot: &Snapshot,
    ranges: &RangeSet,
    at: NaiveDateTime,
) -> Result<Vec<Alert>, diesel::result::Error> {
    use crate::schema::sensors;

    let evaluation = evaluate(snapshot, ranges);
    let mut raised = Vec::new();
    for assessment in evaluation.sensors {
        let (Some(reading_value), Some(sensor_status)) = (assessment.value, assessment.status) else {
            continue;
        };
        let Some(level) = Severity::for_status(sensor_status) else {
            continue;
        };

        let owner: Option<(String, String)> = sensors::table
            .filter(sensors::sensor_type.eq(assessment.kind.as_str()))
            .order(sensors::id.asc())
            .select((sensors::id, sensors::zone))
            .first(conn)
            .optional()?;
        let (owner_id, owner_zone) =
            owner.unwrap_or_else(|| (assessment.kind.as_str().to_string(), "lot-a".to_string()));

        let alert = NewAlert {
            raised_at: at,
            alert_type: AlertType::from(assessment.kind).as_str().to_string(),
            zone: owner_zone,
            severity: level.as_str().to_string(),
            message: format!(
                "{} out of range: {} (optimal {})",
                assessment.kind.label(),
                assessment.kind.format_value(reading_value),
                assessment.range
            ),
            sensor_id: owner_id,
            value: Some(reading_value),
            status: AlertStatus::Open.as_str().to_string(),
        };
        raised.push(insert_alert(conn, alert)?);
    }
    Ok(raised)
}
