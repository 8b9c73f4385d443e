use axum::{Json, body::Bytes, extract::State};
use axum_extra::extract::cookie::PrivateCookieJar;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{error, info, warn};

use crate::LandwatchError;
use crate::backend::BackendError;
use crate::middleware::json::ApiJson;
use crate::middleware::session::{self, clear_session, store_session};
use crate::router::AppState;
use crate::service::provisioning::{
    DemoAccount, DemoAccountRequest, Provisioned, confirm_by_email, provision_demo,
};

/// Bodies of the demo/admin endpoints are optional; anything unparsable reads as empty.
fn lenient<T: DeserializeOwned + Default>(bytes: &Bytes) -> T {
    serde_json::from_slice(bytes).unwrap_or_default()
}

/// Password rejections carry the auth service's wording back to the caller.
fn sign_in_error(e: BackendError) -> LandwatchError {
    match e {
        BackendError::Api { .. } => LandwatchError::BadRequest(e.message()),
        other => other.into(),
    }
}

#[derive(Debug, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    ApiJson(body): ApiJson<Credentials>,
) -> Result<(PrivateCookieJar, Json<Value>), LandwatchError> {
    if body.email.is_empty() || body.password.is_empty() {
        return Err(LandwatchError::bad_request("Email and password are required"));
    }
    let session = state
        .backend
        .sign_in_with_password(&body.email, &body.password)
        .await
        .map_err(sign_in_error)?;
    let jar = store_session(jar, &session, !state.config.basic.insecure_cookie);
    Ok((jar, Json(json!({ "user": session.user }))))
}

#[derive(Debug, Deserialize)]
pub struct SignUp {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
}

/// POST /api/auth/signup
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<SignUp>,
) -> Result<Json<Value>, LandwatchError> {
    if body.email.is_empty() || body.password.is_empty() {
        return Err(LandwatchError::bad_request("Email and password are required"));
    }
    let user = state
        .backend
        .sign_up(
            &body.email,
            &body.password,
            json!({ "full_name": body.full_name, "organization": body.organization }),
        )
        .await
        .map_err(sign_in_error)?;
    info!(user_id = %user.id, "user signed up; confirmation pending");
    Ok(Json(json!({ "user": user })))
}

/// POST /api/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
) -> (PrivateCookieJar, Json<Value>) {
    if let Some(token) = session::access_token(&jar)
        && let Err(e) = state.backend.sign_out(&token).await
    {
        warn!(error = %e, "sign-out failed; clearing cookies anyway");
    }
    (clear_session(jar), Json(json!({ "ok": true })))
}

/// POST /api/auth/demo
pub async fn demo_sign_in(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
) -> Result<(PrivateCookieJar, Json<Value>), LandwatchError> {
    if !state.config.allow_demo() {
        return Err(LandwatchError::Forbidden("Demo not allowed".to_string()));
    }
    if !state.backend.has_admin() {
        error!("backend URL or service-role key missing; cannot perform demo sign-in");
        return Err(LandwatchError::NotConfigured("admin backend".to_string()));
    }
    let Some((email, password)) = state.config.demo_credentials() else {
        error!("demo credentials not configured");
        return Err(LandwatchError::NotConfigured("demo credentials".to_string()));
    };

    let session = state
        .backend
        .sign_in_with_password(&email, &password)
        .await
        .map_err(sign_in_error)?;
    info!("demo sign-in succeeded");
    let jar = store_session(jar, &session, !state.config.basic.insecure_cookie);
    Ok((jar, Json(json!({ "ok": true, "user": session.user }))))
}

/// POST /api/auth/create-demo
pub async fn create_demo(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, LandwatchError> {
    if !state.config.allow_demo() {
        return Err(LandwatchError::Forbidden("Demo creation not allowed".to_string()));
    }
    if !state.backend.has_admin() {
        error!("backend URL or service-role key missing; cannot create demo user");
        return Err(LandwatchError::NotConfigured("admin backend".to_string()));
    }

    let request: DemoAccountRequest = lenient(&body);
    let account = DemoAccount::resolve(request, state.config.demo_credentials())
        .ok_or_else(|| LandwatchError::bad_request("Missing demo email or password"))?;

    match provision_demo(
        state.backend.as_ref(),
        &account,
        state.config.allow_auto_confirm(),
    )
    .await?
    {
        Provisioned::AlreadyExists => Ok(Json(
            json!({ "ok": true, "message": "Demo account already exists" }),
        )),
        Provisioned::Created { .. } => Ok(Json(json!({ "ok": true }))),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ConfirmRequest {
    #[serde(default)]
    pub email: Option<String>,
}

/// POST /api/auth/confirm-user
pub async fn confirm_user(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, LandwatchError> {
    let request: ConfirmRequest = lenient(&body);
    let Some(email) = request.email.filter(|e| !e.is_empty()) else {
        return Err(LandwatchError::bad_request("Missing email"));
    };
    if !state.backend.has_admin() {
        warn!("backend URL or service-role key missing; cannot confirm user");
        return Err(LandwatchError::NotConfigured("admin backend".to_string()));
    }
    if !state.config.allow_demo() {
        return Err(LandwatchError::Forbidden("Not allowed".to_string()));
    }

    confirm_by_email(state.backend.as_ref(), &email).await?;
    Ok(Json(json!({ "ok": true })))
}
