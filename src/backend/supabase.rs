use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::models::{AuthUser, NewUser, Session};
use super::query::Query;
use super::{Auth, BackendError, HostedBackend};
use crate::config::Config;

/// `reqwest` client for a Supabase-style project: `/auth/v1`, `/rest/v1`, `/storage/v1`.
#[derive(Clone)]
pub struct SupabaseBackend {
    client: reqwest::Client,
    base: Option<Url>,
    anon_key: Option<String>,
    service_key: Option<String>,
}

impl SupabaseBackend {
    pub fn new(cfg: &Config) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("landwatch/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(cfg.backend.timeout_secs.max(1)));
        if let Some(proxy_url) = cfg.proxy.as_ref() {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?);
        }
        Ok(Self {
            client: builder.build()?,
            base: cfg.backend.url.clone(),
            anon_key: cfg.backend.anon_key.clone().filter(|k| !k.is_empty()),
            service_key: cfg.backend.service_role_key.clone().filter(|k| !k.is_empty()),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        let base = self.base.as_ref().ok_or(BackendError::NotConfigured)?;
        Ok(Url::parse(&format!(
            "{}/{}",
            base.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        ))?)
    }

    /// Attach `apikey` and bearer headers for the given credentials.
    fn request(&self, method: Method, url: Url, auth: &Auth) -> Result<RequestBuilder, BackendError> {
        let (apikey, bearer) = match auth {
            Auth::Anon => {
                let key = self.anon_key.as_deref().ok_or(BackendError::NotConfigured)?;
                (key, key)
            }
            Auth::User(token) => {
                let key = self.anon_key.as_deref().ok_or(BackendError::NotConfigured)?;
                (key, token.as_str())
            }
            Auth::Service => {
                let key = self
                    .service_key
                    .as_deref()
                    .ok_or(BackendError::AdminUnavailable)?;
                (key, key)
            }
        };
        Ok(self
            .client
            .request(method, url)
            .header("apikey", apikey)
            .bearer_auth(bearer))
    }

    /// Credentials for password grants: the anon key, or the service key on admin-only setups.
    fn sign_in_auth(&self) -> Auth {
        if self.anon_key.is_none() && self.service_key.is_some() {
            Auth::Service
        } else {
            Auth::Anon
        }
    }

    fn rest_url(&self, table: &str) -> Result<Url, BackendError> {
        self.endpoint(&format!("rest/v1/{table}"))
    }

    fn admin_guard(&self) -> Result<(), BackendError> {
        if self.has_admin() {
            Ok(())
        } else {
            Err(BackendError::AdminUnavailable)
        }
    }

    fn public_url(&self, bucket: &str, path: &str) -> Result<String, BackendError> {
        Ok(self
            .endpoint(&format!("storage/v1/object/public/{bucket}/{path}"))?
            .to_string())
    }
}

#[async_trait]
impl HostedBackend for SupabaseBackend {
    fn is_configured(&self) -> bool {
        self.base.is_some() && self.anon_key.is_some()
    }

    fn has_admin(&self) -> bool {
        self.base.is_some() && self.service_key.is_some()
    }

    async fn get_user(&self, access_token: &str) -> Result<Option<AuthUser>, BackendError> {
        let url = self.endpoint("auth/v1/user")?;
        let resp = self
            .request(Method::GET, url, &Auth::User(access_token.to_string()))?
            .send()
            .await?;
        match read_json::<AuthUser>(resp).await {
            Ok(user) => Ok(Some(user)),
            Err(e) if e.is_auth_rejection() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, BackendError> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");
        let resp = self
            .request(Method::POST, url, &self.sign_in_auth())?
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        read_json(resp).await
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: Value,
    ) -> Result<AuthUser, BackendError> {
        let url = self.endpoint("auth/v1/signup")?;
        let resp = self
            .request(Method::POST, url, &Auth::Anon)?
            .json(&json!({ "email": email, "password": password, "data": metadata }))
            .send()
            .await?;
        // With auto-confirm on the service answers with a session wrapping the user.
        let mut body: Value = read_json(resp).await?;
        let user = if body.get("user").is_some_and(Value::is_object) {
            body["user"].take()
        } else {
            body
        };
        Ok(serde_json::from_value(user)?)
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, BackendError> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut()
            .append_pair("grant_type", "refresh_token");
        let resp = self
            .request(Method::POST, url, &Auth::Anon)?
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;
        read_json(resp).await
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let url = self.endpoint("auth/v1/logout")?;
        let resp = self
            .request(Method::POST, url, &Auth::User(access_token.to_string()))?
            .send()
            .await?;
        expect_success(resp).await
    }

    async fn admin_create_user(&self, user: NewUser) -> Result<AuthUser, BackendError> {
        self.admin_guard()?;
        let url = self.endpoint("auth/v1/admin/users")?;
        let resp = self
            .request(Method::POST, url, &Auth::Service)?
            .json(&user)
            .send()
            .await?;
        read_json(resp).await
    }

    async fn admin_list_users(&self) -> Result<Vec<AuthUser>, BackendError> {
        #[derive(Deserialize)]
        struct UserPage {
            #[serde(default)]
            users: Vec<AuthUser>,
        }

        self.admin_guard()?;
        let mut url = self.endpoint("auth/v1/admin/users")?;
        url.query_pairs_mut()
            .append_pair("page", "1")
            .append_pair("per_page", "1000");
        let resp = self
            .request(Method::GET, url, &Auth::Service)?
            .send()
            .await?;
        let page: UserPage = read_json(resp).await?;
        Ok(page.users)
    }

    async fn admin_confirm_email(&self, user_id: &str) -> Result<(), BackendError> {
        self.admin_guard()?;
        let url = self.endpoint(&format!("auth/v1/admin/users/{user_id}"))?;
        let resp = self
            .request(Method::PUT, url, &Auth::Service)?
            .json(&json!({ "email_confirm": true }))
            .send()
            .await?;
        expect_success(resp).await
    }

    async fn select(&self, auth: &Auth, query: &Query) -> Result<Vec<Value>, BackendError> {
        let url = self.rest_url(query.table_name())?;
        debug!(table = query.table_name(), params = ?query.to_params(), "select");
        let resp = self
            .request(Method::GET, url, auth)?
            .query(&query.to_params())
            .send()
            .await?;
        read_json(resp).await
    }

    async fn insert(&self, auth: &Auth, table: &str, row: Value) -> Result<Value, BackendError> {
        let url = self.rest_url(table)?;
        let resp = self
            .request(Method::POST, url, auth)?
            .header("Prefer", "return=representation")
            .json(&json!([row]))
            .send()
            .await?;
        first_row(read_json(resp).await?)
    }

    async fn upsert(
        &self,
        auth: &Auth,
        table: &str,
        row: Value,
        on_conflict: &str,
    ) -> Result<Value, BackendError> {
        let url = self.rest_url(table)?;
        let resp = self
            .request(Method::POST, url, auth)?
            .query(&[("on_conflict", on_conflict)])
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .json(&json!([row]))
            .send()
            .await?;
        first_row(read_json(resp).await?)
    }

    async fn update(
        &self,
        auth: &Auth,
        query: &Query,
        patch: Value,
    ) -> Result<Vec<Value>, BackendError> {
        let url = self.rest_url(query.table_name())?;
        let resp = self
            .request(Method::PATCH, url, auth)?
            .query(&query.filter_params())
            .header("Prefer", "return=representation")
            .json(&patch)
            .send()
            .await?;
        read_json(resp).await
    }

    async fn upload_object(
        &self,
        auth: &Auth,
        bucket: &str,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, BackendError> {
        let url = self.endpoint(&format!("storage/v1/object/{bucket}/{path}"))?;
        let resp = self
            .request(Method::POST, url, auth)?
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;
        expect_success(resp).await?;
        self.public_url(bucket, path)
    }
}

fn first_row(rows: Vec<Value>) -> Result<Value, BackendError> {
    rows.into_iter().next().ok_or(BackendError::EmptyResult)
}

async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, BackendError> {
    let status = resp.status();
    let body = resp.bytes().await?;
    if !status.is_success() {
        return Err(api_error(status, &body));
    }
    Ok(serde_json::from_slice(&body)?)
}

async fn expect_success(resp: Response) -> Result<(), BackendError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }
    let body = resp.bytes().await?;
    Err(api_error(status, &body))
}

/// Error bodies differ between the auth, rest and storage services; take whichever fields exist.
fn api_error(status: reqwest::StatusCode, body: &[u8]) -> BackendError {
    let parsed: Value = serde_json::from_slice(body).unwrap_or(Value::Null);
    let pick = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| parsed.get(*k).and_then(Value::as_str))
            .map(str::to_string)
    };
    let message = pick(&["msg", "error_description", "message", "error"])
        .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string());
    let code = pick(&["error_code", "code"]);
    BackendError::Api {
        status,
        code,
        message: if message.is_empty() {
            status.to_string()
        } else {
            message
        },
    }
}
