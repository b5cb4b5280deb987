//! Sensor reading storage. Readings are append-only.

use agronomy::SensorKind;
use agronomy::threshold::Snapshot;
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::Serialize;
use ts_rs::TS;

use crate::models::{NewReading, Reading, ReadingInput};
use crate::orm::db::last_insert_rowid;

/// The most recent non-null value of each sensor.
#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, TS)]
#[ts(export)]
pub struct LatestValues {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub light: Option<f64>,
    /// Time of the newest reading row, whatever it contained.
    #[ts(type = "string | null")]
    pub recorded_at: Option<NaiveDateTime>,
    pub reading_id: Option<i32>,
}

impl From<LatestValues> for Snapshot {
    fn from(latest: LatestValues) -> Self {
        Snapshot {
            temperature: latest.temperature,
            humidity: latest.humidity,
            light: latest.light,
        }
    }
}

/// Stores a reading stamped with `at` and returns the stored row.
pub fn insert_reading(
    conn: &mut SqliteConnection,
    input: ReadingInput,
    at: NaiveDateTime,
) -> Result<Reading, diesel::result::Error> {
    use crate::schema::readings::dsl::*;

    let row = NewReading {
        recorded_at: at,
        temperature: input.temperature,
        humidity: input.humidity,
        light: input.light,
    };
    diesel::insert_into(readings).values(&row).execute(conn)?;
    let last_id = last_insert_rowid(conn)?;
    readings
        .filter(id.eq(last_id))
        .select(Reading::as_select())
        .first(conn)
}

pub fn get_reading(
    conn: &mut SqliteConnection,
    reading_id: i32,
) -> Result<Option<Reading>, diesel::result::Error> {
    use crate::schema::readings::dsl::*;
    readings
        .filter(id.eq(reading_id))
        .select(Reading::as_select())
        .first(conn)
        .optional()
}

/// The newest reading id, but only when that row alone carries every value in
/// `latest`. A partial newest row means the values were assembled from
/// several readings and no single row stands for them.
pub fn snapshot_reading_id(
    conn: &mut SqliteConnection,
    latest: &LatestValues,
) -> Result<Option<i32>, diesel::result::Error> {
    let Some(newest) = latest.reading_id else {
        return Ok(None);
    };
    let row = get_reading(conn, newest)?;
    Ok(row
        .filter(|r| {
            r.temperature == latest.temperature
                && r.humidity == latest.humidity
                && r.light == latest.light
        })
        .map(|r| r.id))
}

pub fn latest_values(conn: &mut SqliteConnection) -> Result<LatestValues, diesel::result::Error> {
    use crate::schema::readings::dsl::*;

    let newest: Option<(i32, NaiveDateTime)> = readings
        .select((id, recorded_at))
        .order((recorded_at.desc(), id.desc()))
        .first(conn)
        .optional()?;

    let temperature_value = readings
        .filter(temperature.is_not_null())
        .order((recorded_at.desc(), id.desc()))
        .select(temperature)
        .first::<Option<f64>>(conn)
        .optional()?
        .flatten();
    let humidity_value = readings
        .filter(humidity.is_not_null())
        .order((recorded_at.desc(), id.desc()))
        .select(humidity)
        .first::<Option<f64>>(conn)
        .optional()?
        .flatten();
    let light_value = readings
        .filter(light.is_not_null())
        .order((recorded_at.desc(), id.desc()))
        .select(light)
        .first::<Option<f64>>(conn)
        .optional()?
        .flatten();

    Ok(LatestValues {
        temperature: temperature_value,
        humidity: humidity_value,
        light: light_value,
        recorded_at: newest.map(|(_, at)| at),
        reading_id: newest.map(|(row_id, _)| row_id),
    })
}

/// The newest `limit` readings, returned oldest first.
pub fn recent_readings(
    conn: &mut SqliteConnection,
    limit: i64,
) -> Result<Vec<Reading>, diesel::result::Error> {
    use crate::schema::readings::dsl::*;

    let mut rows = readings
        .order((recorded_at.desc(), id.desc()))
        .limit(limit)
        .select(Reading::as_select())
        .load(conn)?;
    rows.reverse();
    Ok(rows)
}

/// Non-null values of one sensor column, newest `limit` of them, oldest first.
pub fn sensor_series(
    conn: &mut SqliteConnection,
    kind: SensorKind,
    limit: i64,
) -> Result<Vec<(NaiveDateTime, f64)>, diesel::result::Error> {
    use crate::schema::readings::dsl::*;

    let order = (recorded_at.desc(), id.desc());
    let rows: Vec<(NaiveDateTime, Option<f64>)> = match kind {
        SensorKind::Temperature => readings
            .filter(temperature.is_not_null())
            .order(order)
            .limit(limit)
            .select((recorded_at, temperature))
            .load(conn)?,
        SensorKind::Humidity => readings
            .filter(humidity.is_not_null())
            .order(order)
            .limit(limit)
            .select((recorded_at, humidity))
            .load(conn)?,
        SensorKind::Light => readings
            .filter(light.is_not_null())
            .order(order)
            .limit(limit)
            .select((recorded_at, light))
            .load(conn)?,
    };
    let mut series: Vec<(NaiveDateTime, f64)> = rows
        .into_iter()
        .filter_map(|(at, v)| v.map(|v| (at, v)))
        .collect();
    series.reverse();
    Ok(series)
}
