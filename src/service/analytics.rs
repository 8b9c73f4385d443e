//! Aggregates behind the overview and analytics pages.

use chrono::{DateTime, Months, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::backend::models::{EnvironmentalRecord, RestorationProject};
use crate::backend::tables::status;
use crate::service::classifier::RiskClassifier;
use crate::service::export::write_csv;

/// Shown while nothing has been measured yet.
const EMPTY_TOTAL_AREA_KM2: f64 = 12450.0;
const EMPTY_OVERVIEW_NDVI: f64 = 0.65;
const EMPTY_ANALYTICS_NDVI: f64 = 0.48;
const EMPTY_WATER_STRESS_PCT: f64 = 38.0;
const EMPTY_SUCCESS_RATE: f64 = 76.0;

/// Area assumed for a measurement without `area_hectares`.
const DEFAULT_RECORD_HECTARES: f64 = 10.0;
/// Completed projects above this estimate count as successful.
const SUCCESS_THRESHOLD: f64 = 70.0;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OverviewStats {
    pub total_area_monitored_km2: f64,
    pub region_count: usize,
    pub degraded_areas: usize,
    pub active_projects: usize,
    pub planned_projects: usize,
    pub average_ndvi: f64,
}

pub fn overview(
    records: &[EnvironmentalRecord],
    projects: &[RestorationProject],
    classifier: &dyn RiskClassifier,
) -> OverviewStats {
    let total_area_monitored_km2 = if records.is_empty() {
        EMPTY_TOTAL_AREA_KM2
    } else {
        records
            .iter()
            .map(|r| r.area_hectares.unwrap_or(DEFAULT_RECORD_HECTARES))
            .sum::<f64>()
            / 100.0
    };

    OverviewStats {
        total_area_monitored_km2,
        region_count: records.len(),
        degraded_areas: records.iter().filter(|r| classifier.is_degraded(r)).count(),
        active_projects: count_status(projects, status::ACTIVE),
        planned_projects: count_status(projects, status::PLANNED),
        average_ndvi: average_ndvi(records.iter()).unwrap_or(EMPTY_OVERVIEW_NDVI),
    }
}

/// Most recent degraded records, for the "top degraded areas" list.
pub fn top_degraded<'a>(
    records: &'a [EnvironmentalRecord],
    classifier: &dyn RiskClassifier,
    n: usize,
) -> Vec<&'a EnvironmentalRecord> {
    records
        .iter()
        .filter(|r| classifier.is_degraded(r))
        .take(n)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Period {
    OneMonth,
    ThreeMonths,
    SixMonths,
    #[default]
    TwelveMonths,
}

impl Period {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "1m" => Some(Self::OneMonth),
            "3m" => Some(Self::ThreeMonths),
            "6m" => Some(Self::SixMonths),
            "12m" => Some(Self::TwelveMonths),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneMonth => "1m",
            Self::ThreeMonths => "3m",
            Self::SixMonths => "6m",
            Self::TwelveMonths => "12m",
        }
    }

    fn months(self) -> u32 {
        match self {
            Self::OneMonth => 1,
            Self::ThreeMonths => 3,
            Self::SixMonths => 6,
            Self::TwelveMonths => 12,
        }
    }

    pub fn cutoff(self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_months(Months::new(self.months()))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnalyticsFilter {
    /// `None` selects every region.
    pub region: Option<String>,
    pub period: Period,
}

impl AnalyticsFilter {
    pub fn new(region: Option<&str>, period: Period) -> Self {
        Self {
            region: region
                .filter(|r| !r.is_empty() && *r != "all")
                .map(str::to_string),
            period,
        }
    }

    /// Records in the region measured on or after the period cutoff; undated rows never match.
    pub fn apply<'a>(
        &self,
        records: &'a [EnvironmentalRecord],
        now: DateTime<Utc>,
    ) -> Vec<&'a EnvironmentalRecord> {
        let cutoff = self.period.cutoff(now);
        records
            .iter()
            .filter(|r| self.region.as_ref().is_none_or(|name| &r.region_name == name))
            .filter(|r| r.measurement_date.is_some_and(|d| d >= cutoff))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub measurements: usize,
    pub average_ndvi: f64,
    pub high_risk_areas: usize,
    pub water_stress_pct: f64,
    pub successful_projects: usize,
    pub total_projects: usize,
    pub success_rate: f64,
}

pub fn summarize(
    filtered: &[&EnvironmentalRecord],
    projects: &[RestorationProject],
    classifier: &dyn RiskClassifier,
) -> AnalyticsSummary {
    let water_stressed = filtered
        .iter()
        .filter(|r| classifier.is_water_stressed(r))
        .count();
    let water_stress_pct = if filtered.is_empty() {
        EMPTY_WATER_STRESS_PCT
    } else {
        (water_stressed as f64 / filtered.len() as f64 * 100.0).round()
    };

    let successful_projects = projects
        .iter()
        .filter(|p| {
            p.status.as_deref() == Some(status::COMPLETED)
                && p.success_rate_estimate.unwrap_or(0.0) > SUCCESS_THRESHOLD
        })
        .count();
    let success_rate = if projects.is_empty() {
        EMPTY_SUCCESS_RATE
    } else {
        successful_projects as f64 / projects.len() as f64 * 100.0
    };

    AnalyticsSummary {
        measurements: filtered.len(),
        average_ndvi: average_ndvi(filtered.iter().copied()).unwrap_or(EMPTY_ANALYTICS_NDVI),
        high_risk_areas: filtered
            .iter()
            .filter(|r| classifier.is_high_erosion(r))
            .count(),
        water_stress_pct,
        successful_projects,
        total_projects: projects.len(),
        success_rate,
    }
}

pub fn analytics_csv(filtered: &[&EnvironmentalRecord]) -> String {
    let headers = [
        "Region",
        "NDVI",
        "Soil Health",
        "Erosion Risk",
        "Degradation Level",
        "Date",
    ]
    .map(String::from);
    let rows = filtered.iter().map(|r| {
        vec![
            Value::from(r.region_name.clone()),
            Value::from(r.ndvi_value),
            Value::from(r.soil_health_score),
            Value::from(r.erosion_risk_level.clone()),
            Value::from(r.degradation_level.clone()),
            Value::from(r.measurement_date.map(|d| d.to_rfc3339())),
        ]
    });
    write_csv(&headers, rows)
}

pub fn analytics_filename(filter: &AnalyticsFilter, now: DateTime<Utc>) -> String {
    format!(
        "analytics-export-{}-{}-{}.csv",
        filter.region.as_deref().unwrap_or("all"),
        filter.period.as_str(),
        now.format("%Y-%m-%d")
    )
}

/// Missing NDVI counts as zero; `None` for no records.
fn average_ndvi<'a>(records: impl Iterator<Item = &'a EnvironmentalRecord>) -> Option<f64> {
    let (sum, n) = records.fold((0.0, 0usize), |(sum, n), r| {
        (sum + r.ndvi_value.unwrap_or(0.0), n + 1)
    });
    (n > 0).then(|| sum / n as f64)
}

fn count_status(projects: &[RestorationProject], wanted: &str) -> usize {
    projects
        .iter()
        .filter(|p| p.status.as_deref() == Some(wanted))
        .count()
}
