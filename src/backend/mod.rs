//! Hosted backend access: auth, row storage and object storage.
//!
//! Layout:
//! - `tables.rs`: table, column and bucket names used across the service
//! - `models.rs`: Rust structs mirroring rows and auth payloads
//! - `query.rs`: PostgREST-style query builder
//! - `supabase.rs`: `reqwest` implementation of [`HostedBackend`]

pub mod models;
pub mod query;
pub mod supabase;
pub mod tables;

use async_trait::async_trait;
use axum::http::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error as ThisError;

pub use models::{AuthUser, NewUser, Session};
pub use query::{Filter, Order, Query};
pub use supabase::SupabaseBackend;

/// Credentials a request is issued with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    /// Public anon key only.
    Anon,
    /// A signed-in user's access token; row-level security applies.
    User(String),
    /// Service-role key; bypasses row-level security.
    Service,
}

#[derive(Debug, ThisError)]
pub enum BackendError {
    #[error("hosted backend not configured")]
    NotConfigured,

    #[error("admin API not available")]
    AdminUnavailable,

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid backend URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("unexpected payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{message} (status {status})")]
    Api {
        status: StatusCode,
        code: Option<String>,
        message: String,
    },

    #[error("backend returned no rows")]
    EmptyResult,
}

impl BackendError {
    /// Human-readable message, as the hosted service phrased it when available.
    pub fn message(&self) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn is_already_registered(&self) -> bool {
        match self {
            Self::Api { code, message, .. } => {
                matches!(code.as_deref(), Some("email_exists" | "user_already_exists"))
                    || message.contains("already been registered")
            }
            _ => false,
        }
    }

    pub fn is_auth_rejection(&self) -> bool {
        matches!(
            self,
            Self::Api { status, .. }
                if *status == StatusCode::UNAUTHORIZED || *status == StatusCode::FORBIDDEN
        )
    }
}

/// Everything the service needs from the hosted auth/database/storage provider.
#[async_trait]
pub trait HostedBackend: Send + Sync {
    /// URL and anon key are present.
    fn is_configured(&self) -> bool;

    /// URL and service-role key are present.
    fn has_admin(&self) -> bool;

    /// Resolve an access token; `Ok(None)` when the token is rejected.
    async fn get_user(&self, access_token: &str) -> Result<Option<AuthUser>, BackendError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, BackendError>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: Value,
    ) -> Result<AuthUser, BackendError>;

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, BackendError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError>;

    async fn admin_create_user(&self, user: NewUser) -> Result<AuthUser, BackendError>;

    async fn admin_list_users(&self) -> Result<Vec<AuthUser>, BackendError>;

    async fn admin_confirm_email(&self, user_id: &str) -> Result<(), BackendError>;

    async fn select(&self, auth: &Auth, query: &Query) -> Result<Vec<Value>, BackendError>;

    /// Insert one row and return it as stored.
    async fn insert(&self, auth: &Auth, table: &str, row: Value) -> Result<Value, BackendError>;

    /// Insert or merge on `on_conflict` and return the stored row.
    async fn upsert(
        &self,
        auth: &Auth,
        table: &str,
        row: Value,
        on_conflict: &str,
    ) -> Result<Value, BackendError>;

    /// Patch every row matching `query`'s filters and return the updated rows.
    async fn update(
        &self,
        auth: &Auth,
        query: &Query,
        patch: Value,
    ) -> Result<Vec<Value>, BackendError>;

    /// Store an object and return its public URL.
    async fn upload_object(
        &self,
        auth: &Auth,
        bucket: &str,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, BackendError>;
}

/// Select rows and decode them into `T`.
pub async fn fetch_as<T: DeserializeOwned>(
    backend: &dyn HostedBackend,
    auth: &Auth,
    query: &Query,
) -> Result<Vec<T>, BackendError> {
    backend
        .select(auth, query)
        .await?
        .into_iter()
        .map(|row| serde_json::from_value(row).map_err(BackendError::from))
        .collect()
}

/// First matching row, if any.
pub async fn fetch_first<T: DeserializeOwned>(
    backend: &dyn HostedBackend,
    auth: &Auth,
    query: &Query,
) -> Result<Option<T>, BackendError> {
    let limited = query.clone().limit(1);
    Ok(fetch_as(backend, auth, &limited).await?.into_iter().next())
}
