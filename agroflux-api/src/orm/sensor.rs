use agronomy::Range;
use agronomy::sensor::{Connection, NewSensorSpec};
use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::models::{NewSensor, Sensor};

/// Registers a sensor. New sensors start offline with no value and no battery.
pub fn insert_sensor(
    conn: &mut SqliteConnection,
    spec: &NewSensorSpec,
) -> Result<Sensor, diesel::result::Error> {
    use crate::schema::sensors::dsl::*;

    let row = NewSensor {
        id: spec.id.clone(),
        name: spec.name.clone(),
        sensor_type: spec.kind.as_str().to_string(),
        zone: spec.zone.clone(),
        unit: spec.kind.unit().to_string(),
        status: Connection::Offline.as_str().to_string(),
        current_value: 0.0,
        battery: 0,
        range_min: spec.range.min(),
        range_max: spec.range.max(),
    };
    diesel::insert_into(sensors).values(&row).execute(conn)?;
    sensors
        .filter(id.eq(&spec.id))
        .select(Sensor::as_select())
        .first(conn)
}

pub fn get_sensor(
    conn: &mut SqliteConnection,
    sensor_id: &str,
) -> Result<Option<Sensor>, diesel::result::Error> {
    use crate::schema::sensors::dsl::*;
    sensors
        .filter(id.eq(sensor_id))
        .select(Sensor::as_select())
        .first(conn)
        .optional()
}

/// All sensors ordered by id.
pub fn list_sensors(conn: &mut SqliteConnection) -> Result<Vec<Sensor>, diesel::result::Error> {
    use crate::schema::sensors::dsl::*;
    sensors.order(id.asc()).select(Sensor::as_select()).load(conn)
}

/// Applies an edited configuration. Returns `None` for an unknown sensor.
pub fn update_sensor_config(
    conn: &mut SqliteConnection,
    sensor_id: &str,
    new_name: &str,
    new_zone: Option<&str>,
    range: Range,
) -> Result<Option<Sensor>, diesel::result::Error> {
    use crate::schema::sensors::dsl::*;

    let touched = diesel::update(sensors.filter(id.eq(sensor_id)))
        .set((
            name.eq(new_name.trim()),
            range_min.eq(range.min()),
            range_max.eq(range.max()),
        ))
        .execute(conn)?;
    if touched == 0 {
        return Ok(None);
    }
    if let Some(z) = new_zone {
        diesel::update(sensors.filter(id.eq(sensor_id)))
            .set(zone.eq(z))
            .execute(conn)?;
    }
    get_sensor(conn, sensor_id)
}

/// Records a value reported by a sensor and derives its connection status
/// from its own band.
pub fn record_sensor_value(
    conn: &mut SqliteConnection,
    sensor_id: &str,
    value: f64,
    new_battery: Option<i32>,
    at: NaiveDateTime,
) -> Result<Option<Sensor>, diesel::result::Error> {
    use crate::schema::sensors::dsl::*;

    let Some(sensor) = get_sensor(conn, sensor_id)? else {
        return Ok(None);
    };
    let band = sensor.band();
    let new_status = Connection::from_reading(value, &band);

    diesel::update(sensors.filter(id.eq(sensor_id)))
        .set((
            current_value.eq(value),
            status.eq(new_status.as_str()),
            last_reading.eq(Some(at)),
            battery.eq(new_battery.unwrap_or(sensor.battery).clamp(0, 100)),
        ))
        .execute(conn)?;
    get_sensor(conn, sensor_id)
}

pub fn delete_sensor(
    conn: &mut SqliteConnection,
    sensor_id: &str,
) -> Result<usize, diesel::result::Error> {
    use crate::schema::sensors::dsl::*;
    diesel::delete(sensors.filter(id.eq(sensor_id))).execute(conn)
}
