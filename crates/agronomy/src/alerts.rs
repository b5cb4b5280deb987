//! Alert vocabulary and the alert listing query.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{Days, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::AgronomyError;
use crate::listing::{SortDir, matches_choice, matches_text};
use crate::threshold::{SensorKind, Status};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertType {
    Temperature,
    Humidity,
    Light,
    Sensor,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::Temperature => "temperature",
            AlertType::Humidity => "humidity",
            AlertType::Light => "light",
            AlertType::Sensor => "sensor",
        }
    }

    pub fn recommendations(&self) -> &'static [&'static str] {
        match self {
            AlertType::Temperature => &[
                "Review ventilation and heating",
                "Monitor evolution every 2 hours",
            ],
            AlertType::Humidity => &["Adjust automatic irrigation", "Monitor evolution every 2 hours"],
            AlertType::Light => &["Review lighting system"],
            AlertType::Sensor => &["Check sensor connection", "Recharge or replace battery"],
        }
    }
}

impl From<SensorKind> for AlertType {
    fn from(kind: SensorKind) -> Self {
        match kind {
            SensorKind::Temperature => AlertType::Temperature,
            SensorKind::Humidity => AlertType::Humidity,
            SensorKind::Light => AlertType::Light,
        }
    }
}

impl FromStr for AlertType {
    type Err = AgronomyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "temperature" => Ok(AlertType::Temperature),
            "humidity" => Ok(AlertType::Humidity),
            "light" => Ok(AlertType::Light),
            "sensor" => Ok(AlertType::Sensor),
            _ => Err(AgronomyError::unknown("alert type", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }

    /// Severity of an automatically raised alert, if the status calls for one.
    pub fn for_status(status: Status) -> Option<Severity> {
        match status {
            Status::Ok => None,
            Status::Warn => Some(Severity::Medium),
            Status::Danger => Some(Severity::High),
        }
    }

    fn rank(s: &str) -> u8 {
        match s.parse::<Severity>() {
            Ok(Severity::Low) => 1,
            Ok(Severity::Medium) => 2,
            Ok(Severity::High) => 3,
            Err(_) => 0,
        }
    }
}

impl FromStr for Severity {
    type Err = AgronomyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            _ => Err(AgronomyError::unknown("severity", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Open,
    Silenced,
    Resolved,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Open => "open",
            AlertStatus::Silenced => "silenced",
            AlertStatus::Resolved => "resolved",
        }
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertStatus {
    type Err = AgronomyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(AlertStatus::Open),
            "silenced" => Ok(AlertStatus::Silenced),
            "resolved" => Ok(AlertStatus::Resolved),
            _ => Err(AgronomyError::unknown("alert status", s)),
        }
    }
}

/// Read access to the fields an alert listing filters and sorts on.
pub trait AlertFields {
    fn id(&self) -> i32;
    fn raised_at(&self) -> NaiveDateTime;
    fn alert_type(&self) -> &str;
    fn severity(&self) -> &str;
    fn zone(&self) -> &str;
    fn status(&self) -> &str;
    fn sensor_id(&self) -> &str;
    fn message(&self) -> &str;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertFilter {
    pub q: Option<String>,
    pub alert_type: Option<String>,
    pub severity: Option<String>,
    pub status: Option<String>,
    pub zone: Option<String>,
    pub from: Option<NaiveDate>,
    /// Inclusive: the whole `until` day matches.
    pub until: Option<NaiveDate>,
}

impl AlertFilter {
    pub fn matches<A: AlertFields>(&self, alert: &A) -> bool {
        if let Some(q) = &self.q {
            if !matches_text(&[alert.message(), alert.sensor_id(), alert.zone()], q) {
                return false;
            }
        }
        if !matches_choice(alert.alert_type(), self.alert_type.as_deref())
            || !matches_choice(alert.severity(), self.severity.as_deref())
            || !matches_choice(alert.status(), self.status.as_deref())
            || !matches_choice(alert.zone(), self.zone.as_deref())
        {
            return false;
        }
        let at = alert.raised_at();
        if let Some(from) = self.from {
            if at < from.and_time(chrono::NaiveTime::MIN) {
                return false;
            }
        }
        if let Some(until) = self.until {
            if let Some(next_day) = until.checked_add_days(Days::new(1)) {
                if at >= next_day.and_time(chrono::NaiveTime::MIN) {
                    return false;
                }
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlertSortKey {
    #[default]
    Date,
    Type,
    Severity,
    Zone,
    Status,
    SensorId,
}

impl FromStr for AlertSortKey {
    type Err = AgronomyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "date" => Ok(AlertSortKey::Date),
            "type" => Ok(AlertSortKey::Type),
            "severity" => Ok(AlertSortKey::Severity),
            "zone" => Ok(AlertSortKey::Zone),
            "status" => Ok(AlertSortKey::Status),
            "sensor_id" | "sensorid" => Ok(AlertSortKey::SensorId),
            _ => Err(AgronomyError::unknown("sort key", s)),
        }
    }
}

fn compare<A: AlertFields>(a: &A, b: &A, key: AlertSortKey) -> Ordering {
    let primary = match key {
        AlertSortKey::Date => a.raised_at().cmp(&b.raised_at()),
        AlertSortKey::Type => a.alert_type().cmp(b.alert_type()),
        AlertSortKey::Severity => Severity::rank(a.severity()).cmp(&Severity::rank(b.severity())),
        AlertSortKey::Zone => a.zone().cmp(b.zone()),
        AlertSortKey::Status => a.status().cmp(b.status()),
        AlertSortKey::SensorId => a.sensor_id().cmp(b.sensor_id()),
    };
    primary.then_with(|| a.id().cmp(&b.id()))
}

pub fn sort_alerts<A: AlertFields>(alerts: &mut [A], key: AlertSortKey, dir: SortDir) {
    alerts.sort_by(|a, b| dir.apply(compare(a, b, key)));
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertKpis {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub open: usize,
}

pub fn kpis<A: AlertFields>(alerts: &[A]) -> AlertKpis {
    alerts.iter().fold(AlertKpis::default(), |mut k, a| {
        match a.severity().parse::<Severity>() {
            Ok(Severity::High) => k.high += 1,
            Ok(Severity::Medium) => k.medium += 1,
            Ok(Severity::Low) => k.low += 1,
            Err(_) => {}
        }
        if a.status() == AlertStatus::Open.as_str() {
            k.open += 1;
        }
        k
    })
}

/// Filters and sorts in one pass; pagination is left to the caller so KPIs
/// can be computed over the full filtered set.
pub fn select<A: AlertFields>(
    alerts: Vec<A>,
    filter: &AlertFilter,
    key: AlertSortKey,
    dir: SortDir,
) -> Vec<A> {
    let mut kept: Vec<A> = alerts.into_iter().filter(|a| filter.matches(a)).collect();
    sort_alerts(&mut kept, key, dir);
    kept
}
