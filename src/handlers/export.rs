use axum::{
    extract::{Query as QueryParams, State},
    http::header,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use crate::LandwatchError;
use crate::backend::Query;
use crate::backend::tables::{ENVIRONMENTAL_DATA, NOTIFICATIONS, RESTORATION_PROJECTS};
use crate::middleware::auth::RequireUser;
use crate::router::AppState;
use crate::service::export::{ExportFormat, ExportKind, export_filename, rows_to_csv};

const ENVIRONMENTAL_EXPORT_LIMIT: usize = 1000;

#[derive(Debug, Deserialize)]
pub struct ExportParams {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub format: Option<String>,
}

/// `Content-Type` plus an attachment `Content-Disposition`.
pub fn attachment(content_type: &str, filename: &str, body: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}

/// GET /api/export
pub async fn export(
    State(state): State<AppState>,
    user: RequireUser,
    QueryParams(params): QueryParams<ExportParams>,
) -> Result<Response, LandwatchError> {
    let kind = match params.kind.as_deref().filter(|s| !s.is_empty()) {
        None => ExportKind::Environmental,
        Some(raw) => ExportKind::parse(raw).ok_or_else(|| LandwatchError::bad_request("Invalid type"))?,
    };
    let format = ExportFormat::parse(params.format.as_deref().unwrap_or("csv"));

    let query = match kind {
        ExportKind::Environmental => Query::table(ENVIRONMENTAL_DATA)
            .order("measurement_date", false)
            .limit(ENVIRONMENTAL_EXPORT_LIMIT),
        ExportKind::Projects => Query::table(RESTORATION_PROJECTS).order("created_at", false),
        ExportKind::Notifications => Query::table(NOTIFICATIONS)
            .eq("user_id", &user.user.id)
            .order("created_at", false),
    };
    let rows = state.backend.select(&user.auth(), &query).await?;

    let body = match format {
        ExportFormat::Csv => rows_to_csv(&rows),
        ExportFormat::Json => serde_json::to_string_pretty(&rows)?,
    };
    let filename = export_filename(kind, format, Utc::now().date_naive());
    info!(user_id = %user.user.id, file = %filename, rows = rows.len(), "export generated");
    Ok(attachment(format.content_type(), &filename, body))
}
