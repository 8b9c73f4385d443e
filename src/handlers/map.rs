use axum::{
    Json,
    extract::{Query as QueryParams, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::LandwatchError;
use crate::backend::models::{EnvironmentalRecord, NewRestorationProject};
use crate::backend::tables::{ENVIRONMENTAL_DATA, RESTORATION_PROJECTS, status};
use crate::backend::{Query, fetch_as};
use crate::middleware::auth::RequireUser;
use crate::middleware::json::ApiJson;
use crate::router::AppState;
use crate::service::map::{
    area_from_record, area_hectares_for_land_use, map_areas, map_success_estimate,
    region_id_from_coordinates, search as find_region,
};
use crate::service::planner::{DEFAULT_BUDGET, DEFAULT_DURATION_MONTHS, SUPPORTED_DURATIONS, completion_date};
use crate::service::provisioning::ensure_profile;

const MAP_RECORDS: usize = 50;

async fn recent_records(
    state: &AppState,
    user: &RequireUser,
) -> Result<Vec<EnvironmentalRecord>, LandwatchError> {
    let query = Query::table(ENVIRONMENTAL_DATA)
        .order("measurement_date", false)
        .limit(MAP_RECORDS);
    Ok(fetch_as(state.backend.as_ref(), &user.auth(), &query).await?)
}

/// GET /api/map/areas
pub async fn areas(
    State(state): State<AppState>,
    user: RequireUser,
) -> Result<Json<Value>, LandwatchError> {
    let records = recent_records(&state, &user).await?;
    Ok(Json(json!({
        "areas": map_areas(&records, state.classifier.as_ref()),
    })))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

/// GET /api/map/search
pub async fn search(
    State(state): State<AppState>,
    user: RequireUser,
    QueryParams(params): QueryParams<SearchParams>,
) -> Result<Json<Value>, LandwatchError> {
    let q = params.q.unwrap_or_default();
    if q.trim().is_empty() {
        return Err(LandwatchError::bad_request("Search query is required"));
    }
    let records = recent_records(&state, &user).await?;
    let found = find_region(&records, &q).ok_or_else(|| {
        LandwatchError::NotFound("Try searching by region name or coordinates".to_string())
    })?;
    Ok(Json(json!({
        "area": area_from_record(found, 0, state.classifier.as_ref()),
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapPlanRequest {
    pub name: String,
    pub coordinates: String,
    #[serde(default)]
    pub ndvi: f64,
    #[serde(default)]
    pub land_use: String,
    pub project_name: String,
    #[serde(default)]
    pub budget: Option<f64>,
    #[serde(default)]
    pub duration_months: Option<u32>,
}

impl MapPlanRequest {
    pub fn to_project(
        &self,
        created_by: &str,
        today: chrono::NaiveDate,
    ) -> Result<NewRestorationProject, LandwatchError> {
        if self.name.trim().is_empty() || self.project_name.trim().is_empty() {
            return Err(LandwatchError::missing_fields());
        }
        let budget = self.budget.unwrap_or(DEFAULT_BUDGET);
        if !(budget.is_finite() && budget > 0.0) {
            return Err(LandwatchError::bad_request("budget must be a positive amount"));
        }
        let duration = self.duration_months.unwrap_or(DEFAULT_DURATION_MONTHS);
        if !SUPPORTED_DURATIONS.contains(&duration) {
            return Err(LandwatchError::bad_request(
                "duration must be one of 12, 18, 24 or 36 months",
            ));
        }
        Ok(NewRestorationProject {
            project_name: self.project_name.clone(),
            region_id: region_id_from_coordinates(&self.coordinates),
            region_name: self.name.clone(),
            area_hectares: area_hectares_for_land_use(&self.land_use),
            budget_allocated: budget,
            budget_spent: 0.0,
            start_date: today,
            estimated_completion_date: completion_date(today, duration),
            status: status::PLANNED.to_string(),
            success_rate_estimate: map_success_estimate(self.ndvi),
            created_by: created_by.to_string(),
        })
    }
}

/// POST /api/map/plans
pub async fn create_plan(
    State(state): State<AppState>,
    user: RequireUser,
    ApiJson(body): ApiJson<MapPlanRequest>,
) -> Result<(StatusCode, Json<Value>), LandwatchError> {
    let project = body.to_project(&user.user.id, Utc::now().date_naive())?;
    let auth = user.auth();
    ensure_profile(state.backend.as_ref(), &auth, &user.user).await?;
    let data = state
        .backend
        .insert(&auth, RESTORATION_PROJECTS, serde_json::to_value(&project)?)
        .await?;
    info!(user_id = %user.user.id, region = %project.region_name, "plan created from map");
    Ok((StatusCode::CREATED, Json(json!({ "data": data }))))
}
