use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde_json::{Value, json};
use tracing::info;

use crate::LandwatchError;
use crate::backend::models::NewEnvironmentalRecord;
use crate::backend::tables::ENVIRONMENTAL_DATA;
use crate::middleware::auth::RequireUser;
use crate::middleware::json::{ApiJson, number_field, str_field};
use crate::router::AppState;

/// Measurement synthesized for an uploaded survey file.
pub fn synthesize_record<R: Rng>(
    rng: &mut R,
    region_name: &str,
    latitude: f64,
    longitude: f64,
    now: DateTime<Utc>,
) -> NewEnvironmentalRecord {
    NewEnvironmentalRecord {
        region_id: format!("region-{}", now.timestamp_millis()),
        region_name: region_name.to_string(),
        latitude,
        longitude,
        ndvi_value: rng.gen_range(0.2..0.7),
        soil_health_score: rng.gen_range(30.0..80.0),
        erosion_risk_level: if rng.gen_bool(0.5) { "high" } else { "moderate" }.to_string(),
        land_use_type: "Agricultural".to_string(),
        degradation_level: if rng.gen_bool(0.4) { "high" } else { "moderate" }.to_string(),
        data_source: "manual".to_string(),
        measurement_date: now,
    }
}

/// POST /api/process-upload
pub async fn process_upload(
    State(state): State<AppState>,
    user: RequireUser,
    ApiJson(body): ApiJson<Value>,
) -> Result<(StatusCode, Json<Value>), LandwatchError> {
    let file_id_present = match body.get("fileId") {
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(_)) => true,
        _ => false,
    };
    let (true, Some(region_name), Some(latitude), Some(longitude)) = (
        file_id_present,
        str_field(&body, "regionName"),
        number_field(&body, "latitude"),
        number_field(&body, "longitude"),
    ) else {
        return Err(LandwatchError::missing_fields());
    };

    let record = synthesize_record(&mut rand::thread_rng(), region_name, latitude, longitude, Utc::now());
    let data = state
        .backend
        .insert(&user.auth(), ENVIRONMENTAL_DATA, serde_json::to_value(&record)?)
        .await?;
    info!(user_id = %user.user.id, region = %record.region_id, "upload processed into measurement");
    Ok((StatusCode::CREATED, Json(json!({ "data": data }))))
}
