//! Optimal-band classification of sensor values.
//!
//! A value inside its band is `Ok`. Outside the band but within a margin of
//! 10% of the band width it is `Warn`, and beyond that margin it is `Danger`.
//! Widening a band can only lower the severity of a given value.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AgronomyError;
use crate::yield_model::Crop;

/// Fraction of the band width tolerated before a value becomes dangerous.
pub const WARN_MARGIN: f64 = 0.10;

const LUX_TO_PPFD: f64 = 0.0185;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    Temperature,
    Humidity,
    Light,
}

impl SensorKind {
    pub const ALL: [SensorKind; 3] = [
        SensorKind::Temperature,
        SensorKind::Humidity,
        SensorKind::Light,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SensorKind::Temperature => "temperature",
            SensorKind::Humidity => "humidity",
            SensorKind::Light => "light",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SensorKind::Temperature => "Temperature",
            SensorKind::Humidity => "Humidity",
            SensorKind::Light => "Light",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            SensorKind::Temperature => "°C",
            SensorKind::Humidity => "%",
            SensorKind::Light => "μmol/m²/s",
        }
    }

    /// Renders a value with its unit the way alerts and issues print it.
    pub fn format_value(&self, value: f64) -> String {
        match self {
            SensorKind::Light => format!("{:.0} {}", value, self.unit()),
            _ => format!("{:.1}{}", value, self.unit()),
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorKind {
    type Err = AgronomyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "temperature" => Ok(SensorKind::Temperature),
            "humidity" => Ok(SensorKind::Humidity),
            "light" => Ok(SensorKind::Light),
            _ => Err(AgronomyError::unknown("sensor type", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Warn,
    Danger,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Ok => "ok",
            Status::Warn => "warn",
            Status::Danger => "danger",
        }
    }
}

/// A closed `[min, max]` band. `min < max` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RangeBounds")]
pub struct Range {
    min: f64,
    max: f64,
}

#[derive(Deserialize)]
struct RangeBounds {
    min: f64,
    max: f64,
}

impl TryFrom<RangeBounds> for Range {
    type Error = AgronomyError;

    fn try_from(bounds: RangeBounds) -> Result<Self, Self::Error> {
        Range::new(bounds.min, bounds.max)
    }
}

impl Range {
    pub fn new(min: f64, max: f64) -> Result<Self, AgronomyError> {
        if !(min < max) {
            return Err(AgronomyError::InvalidRange);
        }
        Ok(Range { min, max })
    }

    const fn fixed(min: f64, max: f64) -> Self {
        Range { min, max }
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn margin(&self) -> f64 {
        (self.max - self.min) * WARN_MARGIN
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

/// Classifies one value against its band.
pub fn classify(value: f64, range: &Range) -> Status {
    if range.contains(value) {
        return Status::Ok;
    }
    let margin = range.margin();
    if value >= range.min - margin && value <= range.max + margin {
        Status::Warn
    } else {
        Status::Danger
    }
}

/// Bands for the three environmental sensors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeSet {
    pub temperature: Range,
    pub humidity: Range,
    pub light: Range,
}

impl Default for RangeSet {
    fn default() -> Self {
        RangeSet {
            temperature: Range::fixed(18.0, 30.0),
            humidity: Range::fixed(40.0, 80.0),
            light: Range::fixed(400.0, 1200.0),
        }
    }
}

impl RangeSet {
    /// Crop-specific bands, if the crop has its own settings.
    pub fn for_crop(crop: Crop) -> Option<RangeSet> {
        match crop {
            Crop::Tomato => Some(RangeSet {
                temperature: Range::fixed(20.0, 28.0),
                humidity: Range::fixed(50.0, 70.0),
                light: Range::fixed(600.0, 1000.0),
            }),
            Crop::Lettuce => Some(RangeSet {
                temperature: Range::fixed(15.0, 25.0),
                humidity: Range::fixed(40.0, 80.0),
                light: Range::fixed(200.0, 600.0),
            }),
            Crop::Pepper => Some(RangeSet {
                temperature: Range::fixed(18.0, 30.0),
                humidity: Range::fixed(45.0, 75.0),
                light: Range::fixed(400.0, 1200.0),
            }),
            _ => None,
        }
    }

    pub fn get(&self, kind: SensorKind) -> &Range {
        match kind {
            SensorKind::Temperature => &self.temperature,
            SensorKind::Humidity => &self.humidity,
            SensorKind::Light => &self.light,
        }
    }
}

/// The latest value of each sensor. Any of them may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub light: Option<f64>,
}

impl Snapshot {
    pub fn get(&self, kind: SensorKind) -> Option<f64> {
        match kind {
            SensorKind::Temperature => self.temperature,
            SensorKind::Humidity => self.humidity,
            SensorKind::Light => self.light,
        }
    }

    pub fn is_empty(&self) -> bool {
        SensorKind::ALL.iter().all(|k| self.get(*k).is_none())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Overall {
    Optimal,
    Warning,
    Critical,
    NoData,
}

impl Overall {
    pub fn label(&self) -> &'static str {
        match self {
            Overall::Optimal => "Optimal",
            Overall::Warning => "Warning",
            Overall::Critical => "Critical",
            Overall::NoData => "No data",
        }
    }

    pub fn summary(&self) -> &'static str {
        match self {
            Overall::Optimal => "No alerts",
            Overall::Warning => "Monitor",
            Overall::Critical => "Check sensors",
            Overall::NoData => "Waiting for data",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assessment {
    pub kind: SensorKind,
    pub value: Option<f64>,
    /// `None` when the sensor has not reported yet.
    pub status: Option<Status>,
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub overall: Overall,
    pub sensors: Vec<Assessment>,
    pub issues: Vec<String>,
    pub alerts: Vec<String>,
}

/// Evaluates a whole snapshot against a band set.
pub fn evaluate(snapshot: &Snapshot, ranges: &RangeSet) -> Evaluation {
    let sensors: Vec<Assessment> = SensorKind::ALL
        .iter()
        .map(|&kind| {
            let range = *ranges.get(kind);
            let value = snapshot.get(kind);
            Assessment {
                kind,
                value,
                status: value.map(|v| classify(v, &range)),
                range,
            }
        })
        .collect();

    if snapshot.is_empty() {
        return Evaluation {
            overall: Overall::NoData,
            sensors,
            issues: vec!["No data yet".to_string()],
            alerts: vec!["Waiting for first sensor reading".to_string()],
        };
    }

    let worst = sensors.iter().filter_map(|s| s.status).max();
    let overall = match worst {
        Some(Status::Danger) => Overall::Critical,
        Some(Status::Warn) => Overall::Warning,
        _ => Overall::Optimal,
    };

    let mut issues = Vec::new();
    let mut alerts = Vec::new();
    for s in &sensors {
        let (Some(value), Some(status)) = (s.value, s.status) else {
            continue;
        };
        let shown = s.kind.format_value(value);
        match status {
            Status::Ok => {}
            Status::Warn => {
                issues.push(format!("{} out of range ({})", s.kind.label(), shown));
                alerts.push(format!("{} ALERT: {}", s.kind.label(), shown));
            }
            Status::Danger => {
                issues.push(format!("{} out of range ({})", s.kind.label(), shown));
                alerts.push(format!("CRITICAL {}: {}", s.kind.label(), shown));
            }
        }
    }
    if alerts.is_empty() {
        alerts.push("Optimal environmental conditions".to_string());
    }

    Evaluation {
        overall,
        sensors,
        issues,
        alerts,
    }
}

/// Converts an illuminance in lux to an approximate PPFD.
pub fn lux_to_ppfd(lux: f64) -> f64 {
    (lux * LUX_TO_PPFD).round()
}

/// Unit a device reports light in. Stored values are always PPFD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightUnit {
    #[default]
    Ppfd,
    Lux,
}

impl LightUnit {
    pub fn to_ppfd(self, value: f64) -> f64 {
        match self {
            LightUnit::Ppfd => value,
            LightUnit::Lux => lux_to_ppfd(value),
        }
    }
}
