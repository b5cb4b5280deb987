use agronomy::threshold::{LightUnit, Snapshot};
use chrono::NaiveDateTime;
use diesel::{Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::schema::readings;

#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
#[diesel(table_name = readings)]
#[ts(export)]
pub struct Reading {
    pub id: i32,
    #[ts(type = "string")]
    pub recorded_at: NaiveDateTime,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub light: Option<f64>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = readings)]
pub struct NewReading {
    pub recorded_at: NaiveDateTime,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub light: Option<f64>,
}

/// Body accepted by the ingest endpoint. Every sensor is optional. Light is
/// PPFD unless `light_unit` says `lux`.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, TS)]
#[ts(export)]
pub struct ReadingInput {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub light: Option<f64>,
    #[serde(default)]
    #[ts(type = "\"ppfd\" | \"lux\"")]
    pub light_unit: LightUnit,
}

impl ReadingInput {
    /// The same reading with light converted to PPFD.
    pub fn normalized(self) -> ReadingInput {
        ReadingInput {
            light: self.light.map(|l| self.light_unit.to_ppfd(l)),
            light_unit: LightUnit::Ppfd,
            ..self
        }
    }
}

impl From<ReadingInput> for Snapshot {
    fn from(input: ReadingInput) -> Self {
        Snapshot {
            temperature: input.temperature,
            humidity: input.humidity,
            light: input.light,
        }
    }
}
