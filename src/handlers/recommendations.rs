use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::LandwatchError;
use crate::middleware::recommendation_request::RecommendationInput;
use crate::router::AppState;
use crate::service::recommendations::recommend as generate;

/// POST /api/ai/recommendations
pub async fn recommend(
    State(state): State<AppState>,
    RecommendationInput(region): RecommendationInput,
) -> Result<Json<Value>, LandwatchError> {
    let data = generate(
        state.ai.as_ref(),
        &region,
        state.config.ai.temperature,
    )
    .await;
    Ok(Json(json!({ "data": data })))
}
