use chrono::NaiveDateTime;
use diesel::{Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::schema::predictions;

#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
#[diesel(table_name = predictions)]
#[ts(export)]
pub struct Prediction {
    pub id: i32,
    pub crop_type: String,
    pub growth_stage: String,
    pub days_planting: i32,
    pub location: String,
    pub temperature: f64,
    pub humidity: f64,
    pub light: f64,
    pub reading_id: Option<i32>,
    pub predicted_yield: f64,
    pub confidence: f64,
    pub model_version: String,
    pub source: String,
    pub actual_yield: Option<f64>,
    #[ts(type = "string")]
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = predictions)]
pub struct NewPrediction {
    pub crop_type: String,
    pub growth_stage: String,
    pub days_planting: i32,
    pub location: String,
    pub temperature: f64,
    pub humidity: f64,
    pub light: f64,
    pub reading_id: Option<i32>,
    pub predicted_yield: f64,
    pub confidence: f64,
    pub model_version: String,
    pub source: String,
    pub created_at: NaiveDateTime,
}

impl Prediction {
    /// How close the prediction came to the observed yield, in percent.
    pub fn accuracy(&self) -> Option<f64> {
        let actual = self.actual_yield?;
        if actual <= 0.0 {
            return None;
        }
        let error = (self.predicted_yield - actual).abs() / actual * 100.0;
        Some(((100.0 - error).max(0.0) * 10.0).round() / 10.0)
    }
}
