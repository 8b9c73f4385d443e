use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use axum_extra::extract::cookie::PrivateCookieJar;
use headers::{Authorization, authorization::Bearer};
use tracing::debug;

use crate::LandwatchError;
use crate::backend::{Auth, AuthUser, BackendError};
use crate::middleware::session;
use crate::router::AppState;

/// The signed-in user behind the request.
///
/// The access token is taken from `Authorization: Bearer <token>` first, then from
/// the `sb-access-token` session cookie, and resolved against the auth service.
#[derive(Debug, Clone)]
pub struct RequireUser {
    pub user: AuthUser,
    pub token: String,
}

impl RequireUser {
    /// Row access on behalf of this user.
    pub fn auth(&self) -> Auth {
        Auth::User(self.token.clone())
    }
}

async fn bearer_token<S: Send + Sync>(parts: &mut Parts, state: &S) -> Option<String> {
    TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
        .await
        .ok()
        .map(|TypedHeader(Authorization(bearer))| bearer.token().to_string())
        .filter(|t| !t.is_empty())
}

impl<S> FromRequestParts<S> for RequireUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = LandwatchError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app = AppState::from_ref(state);

        let token = match bearer_token(parts, state).await {
            Some(token) => token,
            None => {
                let jar = PrivateCookieJar::from_headers(&parts.headers, app.key.clone());
                session::access_token(&jar).ok_or(LandwatchError::Unauthorized)?
            }
        };

        match app.backend.get_user(&token).await {
            Ok(Some(user)) => Ok(Self { user, token }),
            Ok(None) => Err(LandwatchError::Unauthorized),
            Err(e) if e.is_auth_rejection() => {
                debug!(error = %e, "access token rejected");
                Err(LandwatchError::Unauthorized)
            }
            Err(BackendError::NotConfigured) => {
                Err(LandwatchError::NotConfigured("hosted backend".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
