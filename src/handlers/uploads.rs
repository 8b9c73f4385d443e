use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartError},
};
use serde_json::{Value, json};
use tracing::info;
use uuid::Uuid;

use crate::LandwatchError;
use crate::backend::Query;
use crate::backend::models::NewUploadedFile;
use crate::backend::tables::UPLOADED_FILES;
use crate::middleware::auth::RequireUser;
use crate::router::AppState;

const DEFAULT_CATEGORY: &str = "general";
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

struct UploadForm {
    file_name: String,
    content_type: String,
    bytes: Vec<u8>,
    category: String,
    description: Option<String>,
}

fn multipart_error(e: MultipartError) -> LandwatchError {
    LandwatchError::Rejected {
        status: e.status(),
        message: e.body_text(),
    }
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, LandwatchError> {
    let mut file = None;
    let mut category = None;
    let mut description = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or(FALLBACK_CONTENT_TYPE)
                    .to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                file = Some((file_name, content_type, bytes.to_vec()));
            }
            "category" => category = Some(field.text().await.map_err(multipart_error)?),
            "description" => description = Some(field.text().await.map_err(multipart_error)?),
            _ => {}
        }
    }

    let Some((file_name, content_type, bytes)) = file else {
        return Err(LandwatchError::bad_request("No file provided"));
    };
    Ok(UploadForm {
        file_name,
        content_type,
        bytes,
        category: category
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        description: description.filter(|d| !d.is_empty()),
    })
}

/// `{user}/{stem}-{suffix}.{ext}`; path separators in the client's name are flattened.
pub fn storage_path(user_id: &str, file_name: &str, suffix: &str) -> String {
    let flat = file_name.replace(['/', '\\'], "_");
    match flat.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{user_id}/{stem}-{suffix}.{ext}"),
        _ => format!("{user_id}/{flat}-{suffix}"),
    }
}

/// POST /api/upload
pub async fn upload_file(
    State(state): State<AppState>,
    user: RequireUser,
    multipart: Multipart,
) -> Result<Json<Value>, LandwatchError> {
    let form = read_form(multipart).await?;
    let path = storage_path(&user.user.id, &form.file_name, &Uuid::new_v4().simple().to_string());
    let file_size = form.bytes.len();

    let url = state
        .backend
        .upload_object(
            &user.auth(),
            &state.config.backend.storage_bucket,
            &path,
            &form.content_type,
            form.bytes,
        )
        .await?;

    let row = NewUploadedFile {
        user_id: user.user.id.clone(),
        file_name: form.file_name,
        file_url: url.clone(),
        file_size,
        file_type: form.content_type,
        category: form.category,
        description: form.description,
    };
    let file = state
        .backend
        .insert(&user.auth(), UPLOADED_FILES, serde_json::to_value(row)?)
        .await?;

    info!(user_id = %user.user.id, path = %path, size = file_size, "file uploaded");
    Ok(Json(json!({ "success": true, "file": file, "url": url })))
}

/// GET /api/upload
pub async fn list_files(
    State(state): State<AppState>,
    user: RequireUser,
) -> Result<Json<Value>, LandwatchError> {
    let query = Query::table(UPLOADED_FILES)
        .eq("user_id", &user.user.id)
        .order("created_at", false);
    let files = state.backend.select(&user.auth(), &query).await?;
    Ok(Json(json!({ "files": files })))
}
