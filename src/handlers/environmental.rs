use axum::{
    Json,
    extract::{Query as QueryParams, State},
    http::StatusCode,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::LandwatchError;
use crate::backend::tables::ENVIRONMENTAL_DATA;
use crate::backend::{Auth, Query};
use crate::middleware::auth::RequireUser;
use crate::middleware::json::{ApiJson, str_field};
use crate::router::AppState;

const LIST_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(rename = "regionId")]
    pub region_id: Option<String>,
}

/// GET /api/environmental-data
pub async fn list(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<ListParams>,
) -> Result<Json<Value>, LandwatchError> {
    let mut query = Query::table(ENVIRONMENTAL_DATA)
        .order("measurement_date", false)
        .limit(LIST_LIMIT);
    if let Some(region_id) = params.region_id.filter(|s| !s.is_empty()) {
        query = query.eq("region_id", region_id);
    }
    let data = state.backend.select(&Auth::Anon, &query).await?;
    Ok(Json(json!({ "data": data })))
}

fn check_range(body: &Value, key: &str, min: f64, max: f64) -> Result<(), LandwatchError> {
    match body.get(key) {
        None | Some(Value::Null) => Ok(()),
        Some(v) => match v.as_f64() {
            Some(n) if (min..=max).contains(&n) => Ok(()),
            _ => Err(LandwatchError::bad_request(format!(
                "{key} must be a number between {min} and {max}"
            ))),
        },
    }
}

pub fn validate_measurement(body: &Value) -> Result<(), LandwatchError> {
    if !body.is_object() {
        return Err(LandwatchError::bad_request("Expected a JSON object"));
    }
    if str_field(body, "region_id").is_none() || str_field(body, "region_name").is_none() {
        return Err(LandwatchError::missing_fields());
    }
    check_range(body, "ndvi_value", -1.0, 1.0)?;
    check_range(body, "soil_health_score", 0.0, 100.0)
}

/// POST /api/environmental-data
pub async fn create(
    State(state): State<AppState>,
    user: RequireUser,
    ApiJson(body): ApiJson<Value>,
) -> Result<(StatusCode, Json<Value>), LandwatchError> {
    validate_measurement(&body)?;
    let data = state
        .backend
        .insert(&user.auth(), ENVIRONMENTAL_DATA, body)
        .await?;
    info!(user_id = %user.user.id, "environmental measurement recorded");
    Ok((StatusCode::CREATED, Json(json!({ "data": data }))))
}
