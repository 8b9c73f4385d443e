use axum::{
    Json,
    extract::{Query as QueryParams, State},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::LandwatchError;
use crate::backend::Query;
use crate::backend::tables::NOTIFICATIONS;
use crate::middleware::auth::RequireUser;
use crate::middleware::json::ApiJson;
use crate::router::AppState;

const LIST_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(rename = "unreadOnly")]
    pub unread_only: Option<String>,
}

/// GET /api/notifications
pub async fn list(
    State(state): State<AppState>,
    user: RequireUser,
    QueryParams(params): QueryParams<ListParams>,
) -> Result<Json<Value>, LandwatchError> {
    let mut query = Query::table(NOTIFICATIONS)
        .eq("user_id", &user.user.id)
        .order("created_at", false)
        .limit(LIST_LIMIT);
    if params.unread_only.as_deref() == Some("true") {
        query = query.eq("is_read", false);
    }
    let data = state.backend.select(&user.auth(), &query).await?;
    Ok(Json(json!({ "data": data })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkRead {
    pub notification_id: Option<Value>,
    pub is_read: Option<bool>,
}

/// PATCH /api/notifications
pub async fn mark_read(
    State(state): State<AppState>,
    user: RequireUser,
    ApiJson(body): ApiJson<MarkRead>,
) -> Result<Json<Value>, LandwatchError> {
    let (Some(id), Some(is_read)) = (
        body.notification_id
            .as_ref()
            .and_then(crate::backend::query::value_text),
        body.is_read,
    ) else {
        return Err(LandwatchError::missing_fields());
    };

    let query = Query::table(NOTIFICATIONS)
        .eq("id", &id)
        .eq("user_id", &user.user.id);
    let updated = state
        .backend
        .update(&user.auth(), &query, json!({ "is_read": is_read }))
        .await?;
    let data = updated
        .into_iter()
        .next()
        .ok_or_else(|| LandwatchError::NotFound("Notification not found".to_string()))?;
    Ok(Json(json!({ "data": data })))
}
