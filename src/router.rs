use std::sync::Arc;

use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef},
    middleware,
    routing::{get, post},
};
use axum_extra::extract::cookie::Key;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::api::TextGenerator;
use crate::backend::HostedBackend;
use crate::config::Config;
use crate::handlers::{
    auth, dashboard, environmental, export, health, map, notifications, planner,
    process_upload, projects, recommendations, uploads, webhooks,
};
use crate::middleware::session;
use crate::service::classifier::{RiskClassifier, SevereLevels};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub backend: Arc<dyn HostedBackend>,
    pub ai: Arc<dyn TextGenerator>,
    pub classifier: Arc<dyn RiskClassifier>,
    pub key: Key,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        backend: Arc<dyn HostedBackend>,
        ai: Arc<dyn TextGenerator>,
        key: Key,
    ) -> Self {
        Self {
            config,
            backend,
            ai,
            classifier: Arc::new(SevereLevels::default()),
            key,
        }
    }
}

/// Key derivation needs at least this much master secret.
pub const MIN_COOKIE_SECRET_LEN: usize = 32;

/// Private-cookie key from the configured secret, or a per-process key when unset.
pub fn cookie_key(cfg: &Config) -> Key {
    let secret = cfg.basic.cookie_secret.as_bytes();
    if secret.len() >= MIN_COOKIE_SECRET_LEN {
        return Key::derive_from(secret);
    }
    if !secret.is_empty() {
        warn!(min_len = MIN_COOKIE_SECRET_LEN, "cookie secret too short; ignoring it");
    }
    warn!("using a random cookie key; sessions will not survive a restart");
    Key::generate()
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.key.clone()
    }
}

pub fn landwatch_router(state: AppState) -> Router {
    let json_limit = state.config.basic.json_body_limit;
    let upload_limit = state.config.basic.upload_body_limit;

    let upload = Router::new()
        .route(
            "/api/upload",
            post(uploads::upload_file).get(uploads::list_files),
        )
        .layer(DefaultBodyLimit::max(upload_limit));

    Router::new()
        .route("/", get(health::index))
        .route("/api/health", get(health::health))
        .route(
            "/api/environmental-data",
            get(environmental::list).post(environmental::create),
        )
        .route(
            "/api/restoration-projects",
            get(projects::list).post(projects::create),
        )
        .route(
            "/api/notifications",
            get(notifications::list).patch(notifications::mark_read),
        )
        .route("/api/process-upload", post(process_upload::process_upload))
        .route("/api/export", get(export::export))
        .route("/api/ai/recommendations", post(recommendations::recommend))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/demo", post(auth::demo_sign_in))
        .route("/api/auth/create-demo", post(auth::create_demo))
        .route("/api/auth/confirm-user", post(auth::confirm_user))
        .route("/api/webhooks/supabase-auth", post(webhooks::supabase_auth))
        .route("/api/dashboard/overview", get(dashboard::overview))
        .route("/api/dashboard/analytics", get(dashboard::analytics))
        .route(
            "/api/dashboard/analytics/export",
            get(dashboard::analytics_export),
        )
        .route("/api/map/areas", get(map::areas))
        .route("/api/map/search", get(map::search))
        .route("/api/map/plans", post(map::create_plan))
        .route("/api/planner/areas", get(planner::areas))
        .route("/api/planner/step", post(planner::step))
        .route("/api/planner/preview", post(planner::preview))
        .route("/api/planner/save", post(planner::save))
        .layer(DefaultBodyLimit::max(json_limit))
        .merge(upload)
        .fallback(health::not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            session::refresh_session,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
