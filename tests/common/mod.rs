#![allow(dead_code)]

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Request, StatusCode, header},
};
use axum_extra::extract::cookie::Key;
use serde_json::{Value, json};
use tower::ServiceExt;

use landwatch::LandwatchError;
use landwatch::api::TextGenerator;
use landwatch::backend::query::value_text;
use landwatch::backend::{
    Auth, AuthUser, BackendError, Filter, HostedBackend, NewUser, Query, Session,
};
use landwatch::config::Config;
use landwatch::router::{AppState, landwatch_router};

#[derive(Clone)]
struct FakeUser {
    user: AuthUser,
    password: String,
    token: String,
}

/// In-memory stand-in for the hosted auth/rows/storage service.
pub struct FakeBackend {
    configured: bool,
    admin: bool,
    fail_confirm: bool,
    fail_upsert: bool,
    fail_admin_create: bool,
    users: Mutex<Vec<FakeUser>>,
    tables: Mutex<HashMap<String, Vec<Value>>>,
    objects: Mutex<Vec<String>>,
    confirmed: Mutex<Vec<String>>,
    refreshes: AtomicUsize,
    next_id: AtomicUsize,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            configured: true,
            admin: true,
            fail_confirm: false,
            fail_upsert: false,
            fail_admin_create: false,
            users: Mutex::new(Vec::new()),
            tables: Mutex::new(HashMap::new()),
            objects: Mutex::new(Vec::new()),
            confirmed: Mutex::new(Vec::new()),
            refreshes: AtomicUsize::new(0),
            next_id: AtomicUsize::new(1),
        }
    }

    pub fn without_admin(mut self) -> Self {
        self.admin = false;
        self
    }

    /// Email confirmation answers 403, as a service key without admin rights would.
    pub fn failing_confirm(mut self) -> Self {
        self.fail_confirm = true;
        self
    }

    /// Row upserts answer 401, as an expired service key would.
    pub fn failing_upsert(mut self) -> Self {
        self.fail_upsert = true;
        self
    }

    /// Admin user creation answers 401 with a non-duplicate error.
    pub fn failing_admin_create(mut self) -> Self {
        self.fail_admin_create = true;
        self
    }

    pub fn with_user(self, id: &str, email: &str, password: &str, token: &str) -> Self {
        self.users.lock().unwrap().push(FakeUser {
            user: AuthUser {
                id: id.to_string(),
                email: Some(email.to_string()),
                user_metadata: json!({}),
                email_confirmed_at: None,
            },
            password: password.to_string(),
            token: token.to_string(),
        });
        self
    }

    pub fn with_rows(self, table: &str, rows: Vec<Value>) -> Self {
        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .extend(rows);
        self
    }

    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn objects(&self) -> Vec<String> {
        self.objects.lock().unwrap().clone()
    }

    pub fn confirmed(&self) -> Vec<String> {
        self.confirmed.lock().unwrap().clone()
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes.load(AtomicOrdering::SeqCst)
    }

    fn fresh_id(&self, prefix: &str) -> String {
        format!("{prefix}-{}", self.next_id.fetch_add(1, AtomicOrdering::SeqCst))
    }

    fn session_for(&self, u: &FakeUser) -> Session {
        Session {
            access_token: u.token.clone(),
            refresh_token: format!("refresh-{}", u.user.id),
            expires_in: Some(3600),
            token_type: Some("bearer".to_string()),
            user: Some(u.user.clone()),
        }
    }

    fn guard(&self) -> Result<(), BackendError> {
        if self.configured {
            Ok(())
        } else {
            Err(BackendError::NotConfigured)
        }
    }

    fn admin_guard(&self) -> Result<(), BackendError> {
        self.guard()?;
        if self.admin {
            Ok(())
        } else {
            Err(BackendError::AdminUnavailable)
        }
    }
}

fn api_error(status: StatusCode, code: &str, message: &str) -> BackendError {
    BackendError::Api {
        status,
        code: Some(code.to_string()),
        message: message.to_string(),
    }
}

/// Row filtering the way PostgREST compares: by the text form of scalar values.
pub fn filter_matches(filter: &Filter, row: &Value) -> bool {
    let Some(actual) = row.get(filter.column()).and_then(value_text) else {
        return false;
    };
    match filter {
        Filter::Eq(_, expected) => &actual == expected,
        Filter::In(_, options) => options.iter().any(|o| o == &actual),
    }
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Null) | None, Some(Value::Null) | None) => Ordering::Equal,
        (Some(Value::Null) | None, _) => Ordering::Greater,
        (_, Some(Value::Null) | None) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

fn merge(target: &mut Value, patch: &Value) {
    if let (Some(t), Some(p)) = (target.as_object_mut(), patch.as_object()) {
        for (k, v) in p {
            t.insert(k.clone(), v.clone());
        }
    }
}

#[async_trait]
impl HostedBackend for FakeBackend {
    fn is_configured(&self) -> bool {
        self.configured
    }

    fn has_admin(&self) -> bool {
        self.configured && self.admin
    }

    async fn get_user(&self, access_token: &str) -> Result<Option<AuthUser>, BackendError> {
        self.guard()?;
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.token == access_token)
            .map(|u| u.user.clone()))
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, BackendError> {
        self.guard()?;
        let users = self.users.lock().unwrap();
        users
            .iter()
            .find(|u| u.user.email.as_deref() == Some(email) && u.password == password)
            .map(|u| self.session_for(u))
            .ok_or_else(|| {
                api_error(
                    StatusCode::BAD_REQUEST,
                    "invalid_credentials",
                    "Invalid login credentials",
                )
            })
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: Value,
    ) -> Result<AuthUser, BackendError> {
        self.guard()?;
        let id = self.fresh_id("user");
        let user = AuthUser {
            id: id.clone(),
            email: Some(email.to_string()),
            user_metadata: metadata,
            email_confirmed_at: None,
        };
        self.users.lock().unwrap().push(FakeUser {
            user: user.clone(),
            password: password.to_string(),
            token: format!("token-{id}"),
        });
        Ok(user)
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, BackendError> {
        self.guard()?;
        self.refreshes.fetch_add(1, AtomicOrdering::SeqCst);
        let users = self.users.lock().unwrap();
        users
            .iter()
            .find(|u| format!("refresh-{}", u.user.id) == refresh_token)
            .map(|u| self.session_for(u))
            .ok_or_else(|| {
                api_error(StatusCode::UNAUTHORIZED, "refresh_token_not_found", "Invalid Refresh Token")
            })
    }

    async fn sign_out(&self, _access_token: &str) -> Result<(), BackendError> {
        self.guard()
    }

    async fn admin_create_user(&self, new_user: NewUser) -> Result<AuthUser, BackendError> {
        self.admin_guard()?;
        if self.fail_admin_create {
            return Err(api_error(
                StatusCode::UNAUTHORIZED,
                "bad_jwt",
                "invalid JWT: signature is invalid",
            ));
        }
        let mut users = self.users.lock().unwrap();
        if users
            .iter()
            .any(|u| u.user.email.as_deref() == Some(new_user.email.as_str()))
        {
            return Err(api_error(
                StatusCode::UNPROCESSABLE_ENTITY,
                "email_exists",
                "A user with this email address has already been registered",
            ));
        }
        let id = self.fresh_id("user");
        let user = AuthUser {
            id: id.clone(),
            email: Some(new_user.email),
            user_metadata: new_user.user_metadata,
            email_confirmed_at: None,
        };
        users.push(FakeUser {
            user: user.clone(),
            password: new_user.password,
            token: format!("token-{id}"),
        });
        Ok(user)
    }

    async fn admin_list_users(&self) -> Result<Vec<AuthUser>, BackendError> {
        self.admin_guard()?;
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .map(|u| u.user.clone())
            .collect())
    }

    async fn admin_confirm_email(&self, user_id: &str) -> Result<(), BackendError> {
        self.admin_guard()?;
        if self.fail_confirm {
            return Err(api_error(
                StatusCode::FORBIDDEN,
                "not_admin",
                "User not allowed",
            ));
        }
        self.confirmed.lock().unwrap().push(user_id.to_string());
        Ok(())
    }

    async fn select(&self, _auth: &Auth, query: &Query) -> Result<Vec<Value>, BackendError> {
        self.guard()?;
        let mut rows: Vec<Value> = self
            .rows(query.table_name())
            .into_iter()
            .filter(|row| query.filters().iter().all(|f| filter_matches(f, row)))
            .collect();
        for order in query.ordering().iter().rev() {
            rows.sort_by(|a, b| {
                let ord = compare(a.get(&order.column), b.get(&order.column));
                if order.ascending { ord } else { ord.reverse() }
            });
        }
        if let Some(limit) = query.row_limit() {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn insert(&self, _auth: &Auth, table: &str, mut row: Value) -> Result<Value, BackendError> {
        self.guard()?;
        if let Some(obj) = row.as_object_mut() {
            if !obj.contains_key("id") {
                obj.insert("id".to_string(), Value::String(self.fresh_id("row")));
            }
        }
        self.tables
            .lock()
            .unwrap()
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        Ok(row)
    }

    async fn upsert(
        &self,
        _auth: &Auth,
        table: &str,
        row: Value,
        on_conflict: &str,
    ) -> Result<Value, BackendError> {
        self.guard()?;
        if self.fail_upsert {
            return Err(api_error(
                StatusCode::UNAUTHORIZED,
                "PGRST301",
                "JWT expired",
            ));
        }
        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(table.to_string()).or_default();
        let key = row.get(on_conflict).cloned();
        if let Some(existing) = rows
            .iter_mut()
            .find(|r| key.is_some() && r.get(on_conflict) == key.as_ref())
        {
            merge(existing, &row);
            return Ok(existing.clone());
        }
        rows.push(row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        _auth: &Auth,
        query: &Query,
        patch: Value,
    ) -> Result<Vec<Value>, BackendError> {
        self.guard()?;
        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(query.table_name().to_string()).or_default();
        let mut updated = Vec::new();
        for row in rows
            .iter_mut()
            .filter(|row| query.filters().iter().all(|f| filter_matches(f, row)))
        {
            merge(row, &patch);
            updated.push(row.clone());
        }
        Ok(updated)
    }

    async fn upload_object(
        &self,
        _auth: &Auth,
        bucket: &str,
        path: &str,
        _content_type: &str,
        _bytes: Vec<u8>,
    ) -> Result<String, BackendError> {
        self.guard()?;
        self.objects.lock().unwrap().push(path.to_string());
        Ok(format!("https://storage.test/{bucket}/{path}"))
    }
}

/// Replies with a fixed text, or fails like an unreachable upstream.
pub struct ScriptedGenerator {
    reply: Option<String>,
    calls: AtomicUsize,
}

impl ScriptedGenerator {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Some(text.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(AtomicOrdering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, _prompt: &str, _temperature: f32) -> Result<String, LandwatchError> {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
        self.reply
            .clone()
            .ok_or(LandwatchError::UpstreamStatus(StatusCode::BAD_GATEWAY))
    }
}

pub const USER_ID: &str = "user-alice";
pub const USER_EMAIL: &str = "alice@example.org";
pub const USER_PASSWORD: &str = "correct horse";
pub const USER_TOKEN: &str = "token-alice";

/// Production settings with plain-HTTP cookies.
pub fn test_config() -> Config {
    let mut cfg = Config::default();
    cfg.basic.insecure_cookie = true;
    cfg
}

pub fn backend_with_user() -> FakeBackend {
    FakeBackend::new().with_user(USER_ID, USER_EMAIL, USER_PASSWORD, USER_TOKEN)
}

pub fn app_with(
    cfg: Config,
    backend: Arc<FakeBackend>,
    ai: Arc<dyn TextGenerator>,
) -> Router {
    let state = AppState::new(Arc::new(cfg), backend, ai, Key::generate());
    landwatch_router(state)
}

pub fn app(backend: Arc<FakeBackend>) -> Router {
    app_with(test_config(), backend, Arc::new(ScriptedGenerator::failing()))
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("failed to build request")
}

pub fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).expect("failed to build request")
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body was not JSON")
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).expect("response body was not utf-8")
    }

    /// `name=value` pairs from every `Set-Cookie`, ready for a `Cookie` header.
    pub fn cookie_header(&self) -> String {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.split(';').next())
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn set_cookie_names(&self) -> Vec<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.split('=').next())
            .map(str::to_string)
            .collect()
    }
}

pub async fn send(app: &Router, req: Request<Body>) -> TestResponse {
    let resp = app.clone().oneshot(req).await.expect("request failed");
    let status = resp.status();
    let headers = resp.headers().clone();
    let body = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body")
        .to_vec();
    TestResponse {
        status,
        headers,
        body,
    }
}
