use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The five ADKAR readiness dimensions, in survey column order.
pub const ADKAR_DIMENSIONS: [&str; 5] = [
    "awareness",
    "desire",
    "knowledge",
    "ability",
    "reinforcement",
];

#[derive(Debug, Clone, Deserialize)]
pub struct MaintenanceRecord {
    pub machine_id: String,
    pub date: NaiveDate,
    pub run_hours: f64,
    pub temperature_c: f64,
    pub vibration_level: f64,
    pub failure: u8,
}

impl MaintenanceRecord {
    pub fn features(&self) -> [f64; 3] {
        [self.run_hours, self.temperature_c, self.vibration_level]
    }
}

/// One survey response. Dimension cells that are not numeric come through as
/// `None` and are excluded from averages; a CSV missing one of the five
/// dimension columns entirely fails to deserialize.
#[derive(Debug, Clone, Deserialize)]
pub struct SurveyRecord {
    pub department: String,
    #[serde(deserialize_with = "crate::data::coerce_score")]
    pub awareness: Option<f64>,
    #[serde(deserialize_with = "crate::data::coerce_score")]
    pub desire: Option<f64>,
    #[serde(deserialize_with = "crate::data::coerce_score")]
    pub knowledge: Option<f64>,
    #[serde(deserialize_with = "crate::data::coerce_score")]
    pub ability: Option<f64>,
    #[serde(deserialize_with = "crate::data::coerce_score")]
    pub reinforcement: Option<f64>,
}

impl SurveyRecord {
    pub fn scores(&self) -> [Option<f64>; 5] {
        [
            self.awareness,
            self.desire,
            self.knowledge,
            self.ability,
            self.reinforcement,
        ]
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Milestone {
    pub milestone: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: String,
}

/// Predicted failure probability for one machine, evaluated at that
/// machine's mean feature vector.
#[derive(Debug, Clone, Serialize)]
pub struct MachineRisk {
    pub machine_id: String,
    pub risk: f64,
}

/// Per-department means of the five ADKAR dimensions, `None` where a
/// department had no numeric responses for a dimension.
#[derive(Debug, Clone)]
pub struct DepartmentReadiness {
    pub department: String,
    pub scores: [Option<f64>; 5],
}

impl DepartmentReadiness {
    pub fn is_complete(&self) -> bool {
        self.scores.iter().all(|score| score.is_some())
    }
}
