use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::LandwatchError;
use crate::backend::Auth;
use crate::backend::tables::PROFILES;
use crate::router::AppState;
use crate::service::webhook::{
    SIGNATURE_HEADERS, extract_user, is_user_created, profile_row, verify_signature,
};

fn signature(headers: &HeaderMap) -> Option<&str> {
    SIGNATURE_HEADERS
        .iter()
        .find_map(|name| headers.get(*name))
        .and_then(|v| v.to_str().ok())
}

/// POST /api/webhooks/supabase-auth
///
/// Creates or merges a `profiles` row when the auth service reports a new user.
pub async fn supabase_auth(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, &'static str), LandwatchError> {
    if let Some(secret) = state
        .config
        .backend
        .webhook_secret
        .as_deref()
        .filter(|s| !s.is_empty())
    {
        let Some(provided) = signature(&headers) else {
            warn!("auth webhook without signature");
            return Err(LandwatchError::Unauthorized);
        };
        if !verify_signature(secret, &body, provided) {
            warn!("auth webhook signature mismatch");
            return Err(LandwatchError::Unauthorized);
        }
    }

    let payload: Value = serde_json::from_slice(&body)
        .map_err(|e| LandwatchError::bad_request(format!("Invalid JSON payload: {e}")))?;

    if !is_user_created(&payload) {
        return Ok((StatusCode::OK, "Event ignored"));
    }

    let row = profile_row(extract_user(&payload))
        .ok_or_else(|| LandwatchError::bad_request("No user id"))?;

    let auth = if state.backend.has_admin() {
        Auth::Service
    } else if state.backend.is_configured() {
        Auth::Anon
    } else {
        error!("backend not configured; cannot upsert profile");
        return Err(LandwatchError::NotConfigured("hosted backend".to_string()));
    };

    state
        .backend
        .upsert(&auth, PROFILES, serde_json::to_value(&row)?, "id")
        .await
        .map_err(|e| LandwatchError::Internal(format!("profile upsert failed: {e}")))?;
    info!(user_id = %row.id, "profile upserted from auth webhook");
    Ok((StatusCode::OK, "OK"))
}
