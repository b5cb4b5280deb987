use agronomy::alerts::AlertFields;
use chrono::NaiveDateTime;
use diesel::{Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::schema::alerts;

#[derive(Queryable, Selectable, Identifiable, Serialize, Deserialize, Debug, Clone, PartialEq, TS)]
#[diesel(table_name = alerts)]
#[ts(export)]
pub struct Alert {
    pub id: i32,
    #[ts(type = "string")]
    pub raised_at: NaiveDateTime,
    pub alert_type: String,
    pub zone: String,
    pub severity: String,
    pub message: String,
    pub sensor_id: String,
    pub value: Option<f64>,
    pub status: String,
}

#[derive(Insertable, Deserialize, Debug, Clone)]
#[diesel(table_name = alerts)]
pub struct NewAlert {
    pub raised_at: NaiveDateTime,
    pub alert_type: String,
    pub zone: String,
    pub severity: String,
    pub message: String,
    pub sensor_id: String,
    pub value: Option<f64>,
    pub status: String,
}

impl AlertFields for Alert {
    fn id(&self) -> i32 {
        self.id
    }

    fn raised_at(&self) -> NaiveDateTime {
        self.raised_at
    }

    fn alert_type(&self) -> &str {
        &self.alert_type
    }

    fn severity(&self) -> &str {
        &self.severity
    }

    fn zone(&self) -> &str {
        &self.zone
    }

    fn status(&self) -> &str {
        &self.status
    }

    fn sensor_id(&self) -> &str {
        &self.sensor_id
    }

    fn message(&self) -> &str {
        &self.message
    }
}
