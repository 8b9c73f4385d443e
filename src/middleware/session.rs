//! Session cookies and the page-route session refresh layer.

use std::time::Duration as StdDuration;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, PrivateCookieJar, SameSite};
use base64::Engine;
use serde::Deserialize;
use time::Duration;
use tracing::{debug, warn};

use crate::backend::{BackendError, HostedBackend, Session};
use crate::router::AppState;

pub const ACCESS_COOKIE: &str = "sb-access-token";
pub const REFRESH_COOKIE: &str = "sb-refresh-token";

/// Upper bound on the backend round trip made before serving a page.
pub const SESSION_TIMEOUT: StdDuration = StdDuration::from_secs(5);

const DEFAULT_ACCESS_TTL_SECS: i64 = 3600;
const REFRESH_TTL_DAYS: i64 = 30;
const ASSET_EXTENSIONS: [&str; 6] = ["svg", "png", "jpg", "jpeg", "gif", "webp"];

/// Page routes only: API calls, framework assets, the favicon and images are skipped.
pub fn should_refresh(path: &str) -> bool {
    if path.starts_with("/api") || path.starts_with("/_next") || path == "/favicon.ico" {
        return false;
    }
    let last = path.rsplit('/').next().unwrap_or_default();
    !last.rsplit_once('.').is_some_and(|(_, ext)| {
        ASSET_EXTENSIONS
            .iter()
            .any(|known| ext.eq_ignore_ascii_case(known))
    })
}

#[derive(Deserialize)]
struct JwtClaims {
    exp: Option<i64>,
}

/// True when the token's `exp` claim is at or before `now`; undecodable tokens count as expired.
pub fn jwt_expired(token: &str, now: i64) -> bool {
    let Some(payload) = token.split('.').nth(1) else {
        return true;
    };
    let Ok(decoded) = base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))
    else {
        return true;
    };
    match serde_json::from_slice::<JwtClaims>(&decoded) {
        Ok(JwtClaims { exp: Some(exp) }) => exp <= now,
        _ => true,
    }
}

fn build_cookie(name: &str, value: String, secure: bool, max_age: Duration) -> Cookie<'static> {
    Cookie::build(Cookie::new(name.to_string(), value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(max_age)
        .build()
}

fn clear_cookie(name: &str) -> Cookie<'static> {
    Cookie::build(Cookie::new(name.to_string(), ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

pub fn store_session(jar: PrivateCookieJar, session: &Session, secure: bool) -> PrivateCookieJar {
    let access_ttl = session.expires_in.unwrap_or(DEFAULT_ACCESS_TTL_SECS);
    jar.add(build_cookie(
        ACCESS_COOKIE,
        session.access_token.clone(),
        secure,
        Duration::seconds(access_ttl),
    ))
    .add(build_cookie(
        REFRESH_COOKIE,
        session.refresh_token.clone(),
        secure,
        Duration::days(REFRESH_TTL_DAYS),
    ))
}

pub fn clear_session(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.remove(clear_cookie(ACCESS_COOKIE))
        .remove(clear_cookie(REFRESH_COOKIE))
}

pub fn access_token(jar: &PrivateCookieJar) -> Option<String> {
    jar.get(ACCESS_COOKIE)
        .map(|c| c.value().to_owned())
        .filter(|v| !v.is_empty())
}

/// `Some(session)` when new tokens were issued, `None` when the current ones still hold.
pub async fn revalidate(
    backend: &dyn HostedBackend,
    access: Option<&str>,
    refresh: &str,
    now: i64,
) -> Result<Option<Session>, BackendError> {
    if let Some(token) = access.filter(|t| !jwt_expired(t, now))
        && backend.get_user(token).await?.is_some()
    {
        return Ok(None);
    }
    backend.refresh_session(refresh).await.map(Some)
}

/// Keeps page visitors signed in; never fails the request.
pub async fn refresh_session(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    req: Request,
    next: Next,
) -> Response {
    if !should_refresh(req.uri().path()) || !state.backend.is_configured() {
        return next.run(req).await;
    }
    let Some(refresh) = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_owned())
        .filter(|v| !v.is_empty())
    else {
        return next.run(req).await;
    };
    let access = access_token(&jar);
    let now = chrono::Utc::now().timestamp();

    let renewed = match tokio::time::timeout(
        SESSION_TIMEOUT,
        revalidate(state.backend.as_ref(), access.as_deref(), &refresh, now),
    )
    .await
    {
        Ok(Ok(renewed)) => renewed,
        Ok(Err(e)) => {
            warn!(error = %e, "session refresh failed");
            None
        }
        Err(_) => {
            warn!(timeout_secs = SESSION_TIMEOUT.as_secs(), "session refresh timed out");
            None
        }
    };

    let response = next.run(req).await;
    match renewed {
        Some(session) => {
            debug!("session cookies renewed");
            let jar = store_session(jar, &session, !state.config.basic.insecure_cookie);
            (jar, response).into_response()
        }
        None => response,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with(claims: &str) -> String {
        let engine = base64::engine::general_purpose::URL_SAFE_NO_PAD;
        format!(
            "{}.{}.sig",
            engine.encode(r#"{"alg":"HS256"}"#),
            engine.encode(claims)
        )
    }

    #[test]
    fn page_paths_only() {
        assert!(should_refresh("/"));
        assert!(should_refresh("/dashboard/analytics"));
        assert!(should_refresh("/reports/v1.2"));
        assert!(!should_refresh("/api/health"));
        assert!(!should_refresh("/_next/static/chunk.js"));
        assert!(!should_refresh("/favicon.ico"));
        assert!(!should_refresh("/images/map.PNG"));
        assert!(!should_refresh("/logo.svg"));
    }

    #[test]
    fn expiry_from_claims() {
        assert!(!jwt_expired(&token_with(r#"{"exp":2000}"#), 1000));
        assert!(jwt_expired(&token_with(r#"{"exp":1000}"#), 1000));
        assert!(jwt_expired(&token_with(r#"{"sub":"u"}"#), 1000));
        assert!(jwt_expired("not-a-jwt", 1000));
    }
}
