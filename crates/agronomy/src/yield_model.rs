//! Heuristic yield estimate used when no trained model answers.
//!
//! `predicted = base(crop) × temperature × humidity × light × stage × jitter`
//! where each environmental factor rewards its optimal band and penalises
//! extreme values. Confidence starts at 85% and drops for each extreme.

use std::collections::BTreeMap;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

pub const HEURISTIC_MODEL_VERSION: &str = "heuristic-v1.0";
pub const JITTER_MIN: f64 = 0.9;
pub const JITTER_MAX: f64 = 1.1;

const BASE_CONFIDENCE: f64 = 0.85;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Crop {
    Tomato,
    Lettuce,
    Strawberry,
    Pepper,
    Other,
}

impl Crop {
    /// Never fails: unrecognised names map to `Crop::Other`.
    pub fn from_name(name: &str) -> Crop {
        match name.trim().to_ascii_lowercase().as_str() {
            "tomato" => Crop::Tomato,
            "lettuce" => Crop::Lettuce,
            "strawberry" => Crop::Strawberry,
            "pepper" => Crop::Pepper,
            _ => Crop::Other,
        }
    }

    /// Expected yield in kg/ha under neutral conditions.
    pub fn base_yield(&self) -> f64 {
        match self {
            Crop::Tomato => 45_000.0,
            Crop::Lettuce => 28_000.0,
            Crop::Strawberry => 22_000.0,
            Crop::Pepper => 38_000.0,
            Crop::Other => 30_000.0,
        }
    }
}

impl fmt::Display for Crop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Crop::Tomato => "tomato",
            Crop::Lettuce => "lettuce",
            Crop::Strawberry => "strawberry",
            Crop::Pepper => "pepper",
            Crop::Other => "other",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrowthStage {
    Early,
    Vegetative,
    Flowering,
    Fruiting,
    Other,
}

impl GrowthStage {
    pub fn from_name(name: &str) -> GrowthStage {
        match name.trim().to_ascii_lowercase().as_str() {
            "early" => GrowthStage::Early,
            "vegetative" => GrowthStage::Vegetative,
            "flowering" => GrowthStage::Flowering,
            "fruiting" => GrowthStage::Fruiting,
            _ => GrowthStage::Other,
        }
    }

    pub fn multiplier(&self) -> f64 {
        match self {
            GrowthStage::Early => 0.3,
            GrowthStage::Vegetative => 0.7,
            GrowthStage::Flowering => 0.9,
            GrowthStage::Fruiting | GrowthStage::Other => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YieldInputs {
    pub crop: Crop,
    pub stage: GrowthStage,
    pub temperature: f64,
    pub humidity: f64,
    pub light: f64,
}

/// Random variation applied to the heuristic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Jitter {
    None,
    Factor(f64),
}

impl Jitter {
    pub fn sample() -> Jitter {
        Jitter::Factor(rand::rng().random_range(JITTER_MIN..=JITTER_MAX))
    }

    pub fn factor(&self) -> f64 {
        match self {
            Jitter::None => 1.0,
            Jitter::Factor(f) => f.clamp(JITTER_MIN, JITTER_MAX),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldEstimate {
    /// kg/ha
    pub predicted_yield: f64,
    /// Percentage in `[0, 100]`.
    pub confidence: f64,
    pub feature_importance: BTreeMap<String, f64>,
    pub model_version: String,
}

pub fn feature_importance() -> BTreeMap<String, f64> {
    [
        ("temperature", 25.0),
        ("humidity", 20.0),
        ("light", 18.0),
        ("crop_type", 15.0),
        ("growth_stage", 12.0),
        ("days_planting", 10.0),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

pub fn estimate(inputs: &YieldInputs, jitter: Jitter) -> YieldEstimate {
    let mut multiplier = 1.0;
    let mut confidence = BASE_CONFIDENCE;

    let t = inputs.temperature;
    if (22.0..=26.0).contains(&t) {
        multiplier *= 1.15;
    } else if t < 18.0 || t > 30.0 {
        multiplier *= 0.8;
        confidence -= 0.1;
    }

    let h = inputs.humidity;
    if (60.0..=70.0).contains(&h) {
        multiplier *= 1.1;
    } else if h < 40.0 || h > 80.0 {
        multiplier *= 0.9;
        confidence -= 0.05;
    }

    let l = inputs.light;
    if (600.0..=900.0).contains(&l) {
        multiplier *= 1.12;
    } else if l < 400.0 {
        multiplier *= 0.85;
        confidence -= 0.08;
    }

    multiplier *= inputs.stage.multiplier();
    multiplier *= jitter.factor();

    YieldEstimate {
        predicted_yield: (inputs.crop.base_yield() * multiplier).round(),
        confidence: (confidence * 100.0).round(),
        feature_importance: feature_importance(),
        model_version: HEURISTIC_MODEL_VERSION.to_string(),
    }
}
