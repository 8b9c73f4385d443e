use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::LandwatchError;
use crate::backend::models::EnvironmentalRecord;
use crate::backend::tables::{ENVIRONMENTAL_DATA, RESTORATION_PROJECTS};
use crate::backend::{Query, fetch_as};
use crate::middleware::auth::RequireUser;
use crate::middleware::json::ApiJson;
use crate::router::AppState;
use crate::service::planner::{
    PlanDraft, PlannerAction, PlannerState, PlannerStep, preview as plan_preview,
    priority_areas,
};
use crate::service::provisioning::ensure_profile;

const DEGRADED_CANDIDATES: usize = 10;

/// GET /api/planner/areas
pub async fn areas(
    State(state): State<AppState>,
    user: RequireUser,
) -> Result<Json<Value>, LandwatchError> {
    let query = Query::table(ENVIRONMENTAL_DATA)
        .is_in("degradation_level", ["high", "severe"])
        .order("ndvi_value", true)
        .limit(DEGRADED_CANDIDATES);
    let degraded: Vec<EnvironmentalRecord> =
        fetch_as(state.backend.as_ref(), &user.auth(), &query).await?;
    Ok(Json(json!({ "areas": priority_areas(&degraded) })))
}

#[derive(Debug, Deserialize)]
pub struct StepRequest {
    #[serde(default)]
    pub state: PlannerState,
    #[serde(flatten)]
    pub action: PlannerAction,
}

fn step_list(current: PlannerStep) -> Vec<Value> {
    PlannerStep::ALL
        .iter()
        .map(|s| {
            json!({
                "step": s,
                "label": s.label(),
                "completed": s.index() < current.index(),
                "current": *s == current,
            })
        })
        .collect()
}

/// POST /api/planner/step
pub async fn step(
    _user: RequireUser,
    ApiJson(req): ApiJson<StepRequest>,
) -> Result<Json<Value>, LandwatchError> {
    let next = req.state.apply(req.action)?;
    Ok(Json(json!({
        "steps": step_list(next.step),
        "state": next,
    })))
}

/// POST /api/planner/preview
pub async fn preview(
    _user: RequireUser,
    ApiJson(draft): ApiJson<PlanDraft>,
) -> Result<Json<Value>, LandwatchError> {
    Ok(Json(json!({
        "data": plan_preview(&draft, Utc::now().date_naive()),
    })))
}

/// POST /api/planner/save
pub async fn save(
    State(state): State<AppState>,
    user: RequireUser,
    ApiJson(draft): ApiJson<PlanDraft>,
) -> Result<(StatusCode, Json<Value>), LandwatchError> {
    let project = draft.to_project(&user.user.id, Utc::now())?;
    let auth = user.auth();
    ensure_profile(state.backend.as_ref(), &auth, &user.user).await?;
    let data = state
        .backend
        .insert(&auth, RESTORATION_PROJECTS, serde_json::to_value(&project)?)
        .await?;
    info!(
        user_id = %user.user.id,
        project = %project.project_name,
        budget = project.budget_allocated,
        "restoration plan saved"
    );
    Ok((StatusCode::CREATED, Json(json!({ "data": data }))))
}
