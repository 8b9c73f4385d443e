//! Restoration-planning wizard: step transitions and the figures derived from a draft.

use chrono::{DateTime, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

use crate::backend::models::{EnvironmentalRecord, NewRestorationProject};
use crate::backend::tables::status;

pub const DEFAULT_BUDGET: f64 = 500_000.0;
pub const DEFAULT_DURATION_MONTHS: u32 = 24;
pub const SUPPORTED_DURATIONS: [u32; 4] = [12, 18, 24, 36];
pub const PLANNED_AREA_HECTARES: f64 = 450.0;
const PRIORITY_AREA_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlannerStep {
    #[default]
    Select,
    Analyze,
    Recommend,
    Plan,
    Review,
}

impl PlannerStep {
    pub const ALL: [PlannerStep; 5] = [
        Self::Select,
        Self::Analyze,
        Self::Recommend,
        Self::Plan,
        Self::Review,
    ];

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|s| *s == self).unwrap_or(0)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Select => "Select Area",
            Self::Analyze => "Analyze",
            Self::Recommend => "AI Recommendations",
            Self::Plan => "Resource Planning",
            Self::Review => "Review & Save",
        }
    }

    fn next(self) -> Option<Self> {
        Self::ALL.get(self.index() + 1).copied()
    }

    fn prev(self) -> Option<Self> {
        self.index().checked_sub(1).map(|i| Self::ALL[i])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlannerAction {
    Next,
    Back,
    Reset,
    Goto { step: PlannerStep },
}

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum PlannerError {
    #[error("select an area before continuing")]
    NoAreaSelected,
    #[error("budget must be a positive amount")]
    InvalidBudget,
    #[error("duration must be one of 12, 18, 24 or 36 months")]
    InvalidDuration,
    #[error("the review step is final; save the plan instead")]
    AlreadyAtReview,
    #[error("already at the first step")]
    AtFirstStep,
    #[error("cannot jump ahead to {0:?}")]
    StepNotReached(PlannerStep),
}

/// Metrics of the selected area as captured at selection time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AreaSnapshot {
    #[serde(default)]
    pub ndvi_value: Option<f64>,
    #[serde(default)]
    pub soil_health_score: Option<f64>,
    #[serde(default)]
    pub erosion_risk_level: Option<String>,
    #[serde(default)]
    pub degradation_level: Option<String>,
}

impl From<&EnvironmentalRecord> for AreaSnapshot {
    fn from(r: &EnvironmentalRecord) -> Self {
        Self {
            ndvi_value: r.ndvi_value,
            soil_health_score: r.soil_health_score,
            erosion_risk_level: r.erosion_risk_level.clone(),
            degradation_level: r.degradation_level.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlanDraft {
    pub selected_area: Option<String>,
    pub region_id: Option<String>,
    pub area_data: Option<AreaSnapshot>,
    pub project_name: Option<String>,
    pub budget: Option<f64>,
    pub duration_months: Option<u32>,
    pub notes: Option<String>,
}

impl PlanDraft {
    fn area_name(&self) -> Option<&str> {
        self.selected_area.as_deref().filter(|s| !s.trim().is_empty())
    }

    pub fn budget(&self) -> f64 {
        self.budget.unwrap_or(DEFAULT_BUDGET)
    }

    pub fn duration_months(&self) -> u32 {
        self.duration_months.unwrap_or(DEFAULT_DURATION_MONTHS)
    }

    fn check_area(&self) -> Result<&str, PlannerError> {
        self.area_name().ok_or(PlannerError::NoAreaSelected)
    }

    fn check_resources(&self) -> Result<(), PlannerError> {
        if !(self.budget().is_finite() && self.budget() > 0.0) {
            return Err(PlannerError::InvalidBudget);
        }
        if !SUPPORTED_DURATIONS.contains(&self.duration_months()) {
            return Err(PlannerError::InvalidDuration);
        }
        Ok(())
    }

    /// Everything a save needs.
    pub fn validate(&self) -> Result<(), PlannerError> {
        self.check_area()?;
        self.check_resources()
    }

    /// `round(NDVI × 100 + 20)` for measured areas, 82 otherwise.
    pub fn success_estimate(&self) -> i64 {
        match &self.area_data {
            Some(area) => {
                let ndvi = area.ndvi_value.filter(|v| *v != 0.0).unwrap_or(0.3);
                (ndvi * 100.0 + 20.0).round() as i64
            }
            None => 82,
        }
    }

    pub fn project_name(&self) -> String {
        match self.project_name.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(name) => name.to_string(),
            None => format!("{} Restoration", self.area_name().unwrap_or_default()),
        }
    }

    pub fn to_project(
        &self,
        created_by: &str,
        now: DateTime<Utc>,
    ) -> Result<NewRestorationProject, PlannerError> {
        self.validate()?;
        let start_date = now.date_naive();
        Ok(NewRestorationProject {
            project_name: self.project_name(),
            region_id: self
                .region_id
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| format!("region-{}", now.timestamp_millis())),
            region_name: self.check_area()?.to_string(),
            area_hectares: PLANNED_AREA_HECTARES,
            budget_allocated: self.budget(),
            budget_spent: 0.0,
            start_date,
            estimated_completion_date: completion_date(start_date, self.duration_months()),
            status: status::PLANNED.to_string(),
            success_rate_estimate: self.success_estimate(),
            created_by: created_by.to_string(),
        })
    }
}

/// Wizard position plus the data gathered so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlannerState {
    #[serde(default)]
    pub step: PlannerStep,
    #[serde(default)]
    pub draft: PlanDraft,
}

impl PlannerState {
    pub fn apply(self, action: PlannerAction) -> Result<Self, PlannerError> {
        let step = match action {
            PlannerAction::Reset => return Ok(Self::default()),
            PlannerAction::Back => self.step.prev().ok_or(PlannerError::AtFirstStep)?,
            PlannerAction::Goto { step } if step.index() <= self.step.index() => step,
            PlannerAction::Goto { step } => return Err(PlannerError::StepNotReached(step)),
            PlannerAction::Next => {
                match self.step {
                    PlannerStep::Select => {
                        self.draft.check_area()?;
                    }
                    PlannerStep::Plan => self.draft.check_resources()?,
                    _ => {}
                }
                self.step.next().ok_or(PlannerError::AlreadyAtReview)?
            }
        };
        Ok(Self { step, ..self })
    }
}

pub fn completion_date(start: NaiveDate, months: u32) -> NaiveDate {
    start
        .checked_add_months(Months::new(months))
        .unwrap_or(start)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BudgetLine {
    pub category: &'static str,
    pub percentage: u32,
    pub amount: f64,
}

const BUDGET_SPLIT: [(&str, u32); 5] = [
    ("Plant Materials & Seeds", 30),
    ("Labor & Implementation", 35),
    ("Equipment & Tools", 15),
    ("Monitoring & Maintenance", 15),
    ("Contingency", 5),
];

pub fn budget_breakdown(budget: f64) -> Vec<BudgetLine> {
    BUDGET_SPLIT
        .iter()
        .map(|(category, percentage)| BudgetLine {
            category,
            percentage: *percentage,
            amount: (budget * f64::from(*percentage) / 100.0 * 100.0).round() / 100.0,
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Phase {
    pub name: &'static str,
    pub start_month: u32,
    pub end_month: u32,
    pub duration: String,
}

/// Phase bounds for a 24-month plan; other durations scale proportionally.
const PHASES: [(&str, u32, u32); 4] = [
    ("Phase 1: Site Preparation", 1, 3),
    ("Phase 2: Initial Planting", 4, 8),
    ("Phase 3: Soil Conservation", 6, 12),
    ("Phase 4: Monitoring & Maintenance", 12, 24),
];

pub fn implementation_phases(duration_months: u32) -> Vec<Phase> {
    let d = duration_months.max(1);
    PHASES
        .iter()
        .map(|(name, start, end)| {
            let start_month = (start * d / 24).max(1);
            let end_month = ((end * d).div_ceil(24)).max(start_month);
            Phase {
                name,
                start_month,
                end_month,
                duration: format!("Months {start_month}-{end_month}"),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AreaAnalysis {
    pub ndvi: f64,
    pub soil_health: f64,
    pub erosion_risk: String,
}

impl AreaAnalysis {
    fn of(draft: &PlanDraft) -> Self {
        let area = draft.area_data.clone().unwrap_or_default();
        Self {
            ndvi: area.ndvi_value.filter(|v| *v != 0.0).unwrap_or(0.28),
            soil_health: area.soil_health_score.filter(|v| *v != 0.0).unwrap_or(42.0),
            erosion_risk: area
                .erosion_risk_level
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "High".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlanPreview {
    pub project_name: String,
    pub target_area: Option<String>,
    pub analysis: AreaAnalysis,
    pub success_estimate: i64,
    pub budget: f64,
    pub duration_months: u32,
    pub budget_breakdown: Vec<BudgetLine>,
    pub phases: Vec<Phase>,
    pub start_date: NaiveDate,
    pub estimated_completion_date: NaiveDate,
}

pub fn preview(draft: &PlanDraft, today: NaiveDate) -> PlanPreview {
    let duration_months = draft.duration_months();
    PlanPreview {
        project_name: draft.project_name(),
        target_area: draft.area_name().map(str::to_string),
        analysis: AreaAnalysis::of(draft),
        success_estimate: draft.success_estimate(),
        budget: draft.budget(),
        duration_months,
        budget_breakdown: budget_breakdown(draft.budget()),
        phases: implementation_phases(duration_months),
        start_date: today,
        estimated_completion_date: completion_date(today, duration_months),
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PriorityArea {
    pub name: String,
    pub region_id: String,
    pub area: &'static str,
    pub ndvi: f64,
    pub risk: &'static str,
    pub priority: usize,
    pub data: Option<AreaSnapshot>,
}

/// Worst three degraded records (expected NDVI-ascending), or built-in sectors when none exist.
pub fn priority_areas(degraded: &[EnvironmentalRecord]) -> Vec<PriorityArea> {
    if degraded.is_empty() {
        return vec![
            sample_area("Northern Plains - Sector 12", "sector-12-north", "450 km²", 0.28, "Critical", 1),
            sample_area("Southern Hills - Sector 5", "sector-5-south", "320 km²", 0.32, "High", 2),
            sample_area("Eastern Valley - Sector 8", "sector-8-east", "280 km²", 0.35, "High", 3),
        ];
    }
    degraded
        .iter()
        .take(PRIORITY_AREA_COUNT)
        .enumerate()
        .map(|(i, r)| PriorityArea {
            name: r.region_name.clone(),
            region_id: r.region_id.clone(),
            area: "450 km²",
            ndvi: r.ndvi_value.filter(|v| *v != 0.0).unwrap_or(0.28),
            risk: if r.degradation_level.as_deref() == Some("severe") {
                "Critical"
            } else {
                "High"
            },
            priority: i + 1,
            data: Some(AreaSnapshot::from(r)),
        })
        .collect()
}

fn sample_area(
    name: &str,
    region_id: &str,
    area: &'static str,
    ndvi: f64,
    risk: &'static str,
    priority: usize,
) -> PriorityArea {
    PriorityArea {
        name: name.to_string(),
        region_id: region_id.to_string(),
        area,
        ndvi,
        risk,
        priority,
        data: None,
    }
}
