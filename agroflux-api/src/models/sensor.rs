use agronomy::sensor::{SensorFields, default_range};
use agronomy::{Range, SensorKind};
use chrono::NaiveDateTime;
use diesel::{Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::schema::sensors;

#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
#[diesel(table_name = sensors)]
#[ts(export)]
pub struct Sensor {
    pub id: String,
    pub name: String,
    pub sensor_type: String,
    pub zone: String,
    pub unit: String,
    pub status: String,
    pub current_value: f64,
    pub battery: i32,
    #[ts(type = "string | null")]
    pub last_reading: Option<NaiveDateTime>,
    pub range_min: f64,
    pub range_max: f64,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = sensors)]
pub struct NewSensor {
    pub id: String,
    pub name: String,
    pub sensor_type: String,
    pub zone: String,
    pub unit: String,
    pub status: String,
    pub current_value: f64,
    pub battery: i32,
    pub range_min: f64,
    pub range_max: f64,
}

impl Sensor {
    pub fn kind(&self) -> Option<SensorKind> {
        self.sensor_type.parse().ok()
    }

    /// The stored band. The table's CHECK constraint keeps `min < max`; a
    /// row that somehow violates it falls back to the type's default.
    pub fn band(&self) -> Range {
        Range::new(self.range_min, self.range_max).unwrap_or_else(|_| {
            default_range(self.kind().unwrap_or(SensorKind::Temperature))
        })
    }
}

impl SensorFields for Sensor {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn sensor_type(&self) -> &str {
        &self.sensor_type
    }

    fn zone(&self) -> &str {
        &self.zone
    }

    fn status(&self) -> &str {
        &self.status
    }
}
