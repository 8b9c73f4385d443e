use std::collections::HashSet;

use crate::backend::models::EnvironmentalRecord;

/// NDVI below this marks a water-stressed area.
pub const WATER_STRESS_NDVI: f64 = 0.3;

/// Classifies measured regions by severity.
pub trait RiskClassifier: Send + Sync {
    fn is_degraded(&self, record: &EnvironmentalRecord) -> bool;
    fn is_high_erosion(&self, record: &EnvironmentalRecord) -> bool;

    fn is_water_stressed(&self, record: &EnvironmentalRecord) -> bool {
        record.ndvi_value.unwrap_or(0.0) < WATER_STRESS_NDVI
    }
}

/// Classifier built from a set of level names considered severe.
pub struct SevereLevels {
    levels: HashSet<String>,
}

impl SevereLevels {
    pub fn new(levels: Vec<String>) -> Self {
        Self {
            levels: levels.into_iter().map(|l| l.to_ascii_lowercase()).collect(),
        }
    }

    fn contains(&self, level: Option<&str>) -> bool {
        level.is_some_and(|l| self.levels.contains(&l.to_ascii_lowercase()))
    }
}

impl Default for SevereLevels {
    /// `high` and `severe`, the levels the dashboard flags.
    fn default() -> Self {
        Self::new(vec!["high".to_string(), "severe".to_string()])
    }
}

impl RiskClassifier for SevereLevels {
    fn is_degraded(&self, record: &EnvironmentalRecord) -> bool {
        self.contains(record.degradation_level.as_deref())
    }

    fn is_high_erosion(&self, record: &EnvironmentalRecord) -> bool {
        self.contains(record.erosion_risk_level.as_deref())
    }
}
