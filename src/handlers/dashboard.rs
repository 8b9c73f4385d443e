use std::collections::BTreeSet;

use axum::{
    Json,
    extract::{Query as QueryParams, State},
    response::Response,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::LandwatchError;
use crate::backend::models::{EnvironmentalRecord, Notification, RestorationProject};
use crate::backend::tables::{ENVIRONMENTAL_DATA, NOTIFICATIONS, RESTORATION_PROJECTS};
use crate::backend::{Query, fetch_as};
use crate::handlers::export::attachment;
use crate::middleware::auth::RequireUser;
use crate::router::AppState;
use crate::service::analytics::{
    AnalyticsFilter, Period, analytics_csv, analytics_filename, overview as overview_stats,
    summarize, top_degraded,
};

const OVERVIEW_RECORDS: usize = 100;
const OVERVIEW_NOTIFICATIONS: usize = 5;
const OVERVIEW_DEGRADED: usize = 5;
const ANALYTICS_RECORDS: usize = 100;

/// GET /api/dashboard/overview
pub async fn overview(
    State(state): State<AppState>,
    user: RequireUser,
) -> Result<Json<Value>, LandwatchError> {
    let auth = user.auth();
    let backend = state.backend.as_ref();
    let records_q = Query::table(ENVIRONMENTAL_DATA)
        .order("measurement_date", false)
        .limit(OVERVIEW_RECORDS);
    let projects_q = Query::table(RESTORATION_PROJECTS).order("created_at", false);
    let notifications_q = Query::table(NOTIFICATIONS)
        .eq("user_id", &user.user.id)
        .eq("is_read", false)
        .order("created_at", false)
        .limit(OVERVIEW_NOTIFICATIONS);

    let (records, projects, notifications) = futures::try_join!(
        fetch_as::<EnvironmentalRecord>(backend, &auth, &records_q),
        fetch_as::<RestorationProject>(backend, &auth, &projects_q),
        fetch_as::<Notification>(backend, &auth, &notifications_q),
    )?;

    let classifier = state.classifier.as_ref();
    Ok(Json(json!({
        "user": { "id": user.user.id, "name": user.user.display_name() },
        "stats": overview_stats(&records, &projects, classifier),
        "degradedRegions": top_degraded(&records, classifier, OVERVIEW_DEGRADED),
        "notifications": notifications,
    })))
}

#[derive(Debug, Deserialize)]
pub struct AnalyticsParams {
    pub region: Option<String>,
    pub period: Option<String>,
}

impl AnalyticsParams {
    fn filter(&self) -> Result<AnalyticsFilter, LandwatchError> {
        let period = match self.period.as_deref().filter(|p| !p.is_empty()) {
            None => Period::default(),
            Some(raw) => Period::parse(raw).ok_or_else(|| {
                LandwatchError::bad_request("period must be one of 1m, 3m, 6m, 12m")
            })?,
        };
        Ok(AnalyticsFilter::new(self.region.as_deref(), period))
    }
}

async fn analytics_inputs(
    state: &AppState,
    user: &RequireUser,
) -> Result<(Vec<EnvironmentalRecord>, Vec<RestorationProject>), LandwatchError> {
    let auth = user.auth();
    let backend = state.backend.as_ref();
    let records_q = Query::table(ENVIRONMENTAL_DATA)
        .order("measurement_date", false)
        .limit(ANALYTICS_RECORDS);
    let projects_q = Query::table(RESTORATION_PROJECTS);
    Ok(futures::try_join!(
        fetch_as::<EnvironmentalRecord>(backend, &auth, &records_q),
        fetch_as::<RestorationProject>(backend, &auth, &projects_q),
    )?)
}

/// GET /api/dashboard/analytics
pub async fn analytics(
    State(state): State<AppState>,
    user: RequireUser,
    QueryParams(params): QueryParams<AnalyticsParams>,
) -> Result<Json<Value>, LandwatchError> {
    let filter = params.filter()?;
    let (records, projects) = analytics_inputs(&state, &user).await?;

    let regions: BTreeSet<&str> = records
        .iter()
        .map(|r| r.region_name.as_str())
        .filter(|name| !name.is_empty())
        .collect();
    let filtered = filter.apply(&records, Utc::now());
    let summary = summarize(&filtered, &projects, state.classifier.as_ref());

    Ok(Json(json!({
        "filter": {
            "region": filter.region.as_deref().unwrap_or("all"),
            "period": filter.period.as_str(),
        },
        "regions": regions,
        "summary": summary,
        "records": filtered,
    })))
}

/// GET /api/dashboard/analytics/export
pub async fn analytics_export(
    State(state): State<AppState>,
    user: RequireUser,
    QueryParams(params): QueryParams<AnalyticsParams>,
) -> Result<Response, LandwatchError> {
    let filter = params.filter()?;
    let (records, _) = analytics_inputs(&state, &user).await?;
    let now = Utc::now();
    let filtered = filter.apply(&records, now);
    Ok(attachment(
        "text/csv",
        &analytics_filename(&filter, now),
        analytics_csv(&filtered),
    ))
}
