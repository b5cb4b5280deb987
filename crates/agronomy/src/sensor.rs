//! Sensor registry rules: connection status, default bands, listing filters
//! and history statistics.

use std::str::FromStr;

use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::error::AgronomyError;
use crate::listing::{matches_choice, matches_text};
use crate::threshold::{Range, RangeSet, SensorKind};

pub const ZONES: [&str; 4] = ["lot-a", "lot-b", "lot-c", "greenhouse"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connection {
    Online,
    Offline,
    Warning,
}

impl Connection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Connection::Online => "online",
            Connection::Offline => "offline",
            Connection::Warning => "warning",
        }
    }

    /// A zero reading means the sensor is not reporting.
    pub fn from_reading(value: f64, range: &Range) -> Connection {
        if value == 0.0 {
            Connection::Offline
        } else if !range.contains(value) {
            Connection::Warning
        } else {
            Connection::Online
        }
    }
}

impl FromStr for Connection {
    type Err = AgronomyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "online" => Ok(Connection::Online),
            "offline" => Ok(Connection::Offline),
            "warning" => Ok(Connection::Warning),
            _ => Err(AgronomyError::unknown("sensor status", s)),
        }
    }
}

pub fn default_range(kind: SensorKind) -> Range {
    *RangeSet::default().get(kind)
}

pub fn zone_label(zone: &str) -> String {
    match zone {
        "lot-a" => "Lot A".to_string(),
        "lot-b" => "Lot B".to_string(),
        "lot-c" => "Lot C".to_string(),
        "greenhouse" => "Greenhouse".to_string(),
        other => other.to_string(),
    }
}

/// Validated input for registering a sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSensorSpec {
    pub id: String,
    pub name: String,
    pub kind: SensorKind,
    pub zone: String,
    pub range: Range,
}

impl NewSensorSpec {
    pub fn parse(id: &str, name: &str, kind: &str, zone: &str) -> Result<Self, AgronomyError> {
        let id = id.trim();
        let name = name.trim();
        if id.is_empty() || name.is_empty() {
            return Err(AgronomyError::MissingIdOrName);
        }
        let kind: SensorKind = kind.parse()?;
        let zone = if zone.trim().is_empty() { ZONES[0] } else { zone.trim() };
        Ok(NewSensorSpec {
            id: id.to_string(),
            name: name.to_string(),
            kind,
            zone: zone.to_string(),
            range: default_range(kind),
        })
    }
}

/// Validates an edited sensor configuration.
pub fn validate_config(name: &str, min: f64, max: f64) -> Result<Range, AgronomyError> {
    let range = Range::new(min, max)?;
    if name.trim().is_empty() {
        return Err(AgronomyError::MissingField("Sensor name".to_string()));
    }
    Ok(range)
}

pub trait SensorFields {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn sensor_type(&self) -> &str;
    fn zone(&self) -> &str;
    fn status(&self) -> &str;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorFilter {
    pub q: Option<String>,
    pub status: Option<String>,
    pub sensor_type: Option<String>,
    pub zone: Option<String>,
}

impl SensorFilter {
    pub fn matches<S: SensorFields>(&self, s: &S) -> bool {
        if let Some(q) = &self.q {
            if !matches_text(&[s.name(), s.id(), s.zone()], q) {
                return false;
            }
        }
        matches_choice(s.status(), self.status.as_deref())
            && matches_choice(s.sensor_type(), self.sensor_type.as_deref())
            && matches_choice(s.zone(), self.zone.as_deref())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorSummary {
    pub online: usize,
    pub offline: usize,
    pub warning: usize,
    pub total: usize,
}

pub fn summarize<S: SensorFields>(sensors: &[S]) -> SensorSummary {
    sensors.iter().fold(SensorSummary::default(), |mut acc, s| {
        match s.status().parse::<Connection>() {
            Ok(Connection::Online) => acc.online += 1,
            Ok(Connection::Offline) => acc.offline += 1,
            Ok(Connection::Warning) => acc.warning += 1,
            Err(_) => {}
        }
        acc.total += 1;
        acc
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryStats {
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

/// Statistics over a series of values, `None` for an empty series.
pub fn history_stats(values: &[f64]) -> Option<HistoryStats> {
    if values.is_empty() {
        return None;
    }
    let sum: f64 = values.iter().sum();
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Some(HistoryStats {
        average: ((sum / values.len() as f64) * 10.0).round() / 10.0,
        min,
        max,
        count: values.len(),
    })
}

/// Human-readable age of a reading relative to `now`.
pub fn time_ago(then: NaiveDateTime, now: NaiveDateTime) -> String {
    let elapsed = now.signed_duration_since(then);
    if elapsed < TimeDelta::minutes(1) {
        "Just now".to_string()
    } else if elapsed < TimeDelta::hours(1) {
        format!("{} min ago", elapsed.num_minutes())
    } else if elapsed < TimeDelta::days(1) {
        format!("{} h ago", elapsed.num_hours())
    } else {
        format!("{} d ago", elapsed.num_days())
    }
}
