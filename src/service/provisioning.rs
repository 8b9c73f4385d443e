//! Account provisioning: demo users, admin email confirmation and profile rows.

use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::LandwatchError;
use crate::backend::models::{AuthUser, Profile};
use crate::backend::tables::{PROFILES, roles};
use crate::backend::{Auth, BackendError, HostedBackend, NewUser, Query, fetch_first};

pub const DEMO_FULL_NAME: &str = "Demo User";
pub const DEMO_ORGANIZATION: &str = "Demo Organization";

/// Body of a demo provisioning request; every field optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DemoAccountRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub full_name: Option<String>,
    pub organization: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DemoAccount {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub organization: String,
}

impl DemoAccount {
    /// Body values first, then configured demo credentials.
    pub fn resolve(
        request: DemoAccountRequest,
        configured: Option<(String, String)>,
    ) -> Option<Self> {
        let (cfg_email, cfg_password) = configured.unzip();
        let email = request.email.filter(|s| !s.is_empty()).or(cfg_email)?;
        let password = request.password.filter(|s| !s.is_empty()).or(cfg_password)?;
        Some(Self {
            email,
            password,
            full_name: request
                .full_name
                .unwrap_or_else(|| DEMO_FULL_NAME.to_string()),
            organization: request
                .organization
                .unwrap_or_else(|| DEMO_ORGANIZATION.to_string()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provisioned {
    AlreadyExists,
    Created { user_id: String },
}

pub async fn profile_by_email(
    backend: &dyn HostedBackend,
    email: &str,
) -> Result<Option<Profile>, BackendError> {
    fetch_first(
        backend,
        &Auth::Service,
        &Query::table(PROFILES).select("id,email").eq("email", email),
    )
    .await
}

/// Admin-path failures are server errors whatever status the auth service answered with.
fn admin_failure(action: &str, e: BackendError) -> LandwatchError {
    LandwatchError::Internal(format!("{action} failed: {e}"))
}

/// Idempotent: an existing profile short-circuits, an existing auth user is reused.
pub async fn provision_demo(
    backend: &dyn HostedBackend,
    account: &DemoAccount,
    auto_confirm: bool,
) -> Result<Provisioned, LandwatchError> {
    match profile_by_email(backend, &account.email).await {
        Ok(Some(_)) => return Ok(Provisioned::AlreadyExists),
        Ok(None) => {}
        Err(e) => warn!(error = %e, "profile lookup failed; continuing with creation"),
    }

    let user_id = match backend
        .admin_create_user(NewUser {
            email: account.email.clone(),
            password: account.password.clone(),
            user_metadata: json!({
                "full_name": account.full_name,
                "organization": account.organization,
            }),
            email_confirm: false,
        })
        .await
    {
        Ok(user) => user.id,
        Err(e) if e.is_already_registered() => existing_user_id(backend, &account.email).await?,
        Err(e) => return Err(admin_failure("create user", e)),
    };

    let profile = json!({
        "id": user_id,
        "email": account.email,
        "full_name": account.full_name,
        "organization": account.organization,
        "role": roles::VIEWER,
    });
    if let Err(e) = backend.insert(&Auth::Service, PROFILES, profile).await {
        warn!(error = %e, "profile insert failed (may already exist)");
    }

    if auto_confirm && let Err(e) = backend.admin_confirm_email(&user_id).await {
        warn!(error = %e, "auto-confirm failed");
    }

    info!(user_id = %user_id, "demo account provisioned");
    Ok(Provisioned::Created { user_id })
}

async fn existing_user_id(backend: &dyn HostedBackend, email: &str) -> Result<String, LandwatchError> {
    let users = backend
        .admin_list_users()
        .await
        .map_err(|e| admin_failure("list users", e))?;
    users
        .into_iter()
        .find(|u| u.email.as_deref() == Some(email))
        .map(|u| u.id)
        .ok_or_else(|| LandwatchError::Internal(format!("no auth user for {email}")))
}

/// Mark the user behind `email`'s profile as confirmed.
pub async fn confirm_by_email(backend: &dyn HostedBackend, email: &str) -> Result<(), LandwatchError> {
    let profile = match profile_by_email(backend, email).await {
        Ok(Some(profile)) => profile,
        Ok(None) => return Err(LandwatchError::NotFound("User not found".to_string())),
        Err(e) => {
            warn!(error = %e, "profile lookup failed");
            return Err(LandwatchError::NotFound("User not found".to_string()));
        }
    };
    backend
        .admin_confirm_email(&profile.id)
        .await
        .map_err(|e| admin_failure("confirm email", e))?;
    info!(user_id = %profile.id, "email confirmed");
    Ok(())
}

/// Create a `viewer` profile for `user` unless one exists.
pub async fn ensure_profile(
    backend: &dyn HostedBackend,
    auth: &Auth,
    user: &AuthUser,
) -> Result<(), BackendError> {
    let existing: Option<Profile> = fetch_first(
        backend,
        auth,
        &Query::table(PROFILES).select("id").eq("id", &user.id),
    )
    .await?;
    if existing.is_some() {
        return Ok(());
    }
    backend
        .insert(
            auth,
            PROFILES,
            json!({
                "id": user.id,
                "email": user.email,
                "full_name": user.display_name(),
                "role": roles::VIEWER,
            }),
        )
        .await?;
    Ok(())
}
