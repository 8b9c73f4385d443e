use axum::{
    Json,
    extract::{Query as QueryParams, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::LandwatchError;
use crate::backend::tables::{PROJECT_SELECT, RESTORATION_PROJECTS};
use crate::backend::{Auth, Query};
use crate::middleware::auth::RequireUser;
use crate::middleware::json::{ApiJson, str_field};
use crate::router::AppState;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
}

/// GET /api/restoration-projects
pub async fn list(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<ListParams>,
) -> Result<Json<Value>, LandwatchError> {
    let mut query = Query::table(RESTORATION_PROJECTS)
        .select(PROJECT_SELECT)
        .order("created_at", false);
    if let Some(status) = params.status.filter(|s| !s.is_empty()) {
        query = query.eq("status", status);
    }
    let data = state.backend.select(&Auth::Anon, &query).await?;
    Ok(Json(json!({ "data": data })))
}

/// POST /api/restoration-projects
pub async fn create(
    State(state): State<AppState>,
    user: RequireUser,
    ApiJson(mut body): ApiJson<Value>,
) -> Result<(StatusCode, Json<Value>), LandwatchError> {
    if str_field(&body, "project_name").is_none() || str_field(&body, "region_name").is_none() {
        return Err(LandwatchError::missing_fields());
    }
    let Some(fields) = body.as_object_mut() else {
        return Err(LandwatchError::bad_request("Expected a JSON object"));
    };
    fields.insert("created_by".to_string(), Value::String(user.user.id.clone()));

    let data = state
        .backend
        .insert(&user.auth(), RESTORATION_PROJECTS, body)
        .await?;
    info!(user_id = %user.user.id, "restoration project created");
    Ok((StatusCode::CREATED, Json(json!({ "data": data }))))
}
