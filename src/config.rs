use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use url::Url;

/// Process-wide configuration loaded once from `config.toml` and `LANDWATCH_*` env vars.
pub static CONFIG: LazyLock<Config> =
    LazyLock::new(|| Config::load().expect("FATAL: failed to load landwatch configuration"));

pub const CONFIG_FILE: &str = "config.toml";
pub const ENV_PREFIX: &str = "LANDWATCH_";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub basic: BasicConfig,
    pub backend: BackendConfig,
    pub demo: DemoConfig,
    pub ai: AiConfig,
    pub proxy: Option<Url>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicConfig {
    pub listen_addr: String,
    pub loglevel: String,
    pub environment: Environment,
    /// Master secret for private session cookies; at least 32 bytes.
    pub cookie_secret: String,
    /// Drop the `Secure` attribute so cookies work over plain HTTP during local dev.
    pub insecure_cookie: bool,
    pub json_body_limit: usize,
    pub upload_body_limit: usize,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            loglevel: "info".to_string(),
            environment: Environment::Production,
            cookie_secret: String::new(),
            insecure_cookie: false,
            json_body_limit: 1024 * 1024,
            upload_body_limit: 25 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub url: Option<Url>,
    pub anon_key: Option<String>,
    pub service_role_key: Option<String>,
    pub storage_bucket: String,
    pub webhook_secret: Option<String>,
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: None,
            anon_key: None,
            service_role_key: None,
            storage_bucket: "uploads".to_string(),
            webhook_secret: None,
            timeout_secs: 15,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub allow_demo: bool,
    pub allow_auto_confirm: bool,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub base_url: Url,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub requests_per_minute: u32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse("https://api.openai.com/v1/")
                .expect("default AI base url is valid"),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            timeout_secs: 60,
            requests_per_minute: 30,
        }
    }
}

impl Config {
    /// Defaults, then `config.toml` if present, then `LANDWATCH_SECTION__KEY` env vars.
    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    pub fn is_development(&self) -> bool {
        self.basic.environment == Environment::Development
    }

    /// Demo sign-in, demo provisioning and manual confirmation are gated on this.
    pub fn allow_demo(&self) -> bool {
        self.demo.allow_demo || self.is_development()
    }

    pub fn allow_auto_confirm(&self) -> bool {
        self.demo.allow_auto_confirm || self.is_development()
    }

    pub fn backend_configured(&self) -> bool {
        self.backend.url.is_some() && non_empty(&self.backend.anon_key)
    }

    pub fn admin_configured(&self) -> bool {
        self.backend.url.is_some() && non_empty(&self.backend.service_role_key)
    }

    pub fn demo_credentials(&self) -> Option<(String, String)> {
        match (&self.demo.email, &self.demo.password) {
            (Some(email), Some(password)) if !email.is_empty() && !password.is_empty() => {
                Some((email.clone(), password.clone()))
            }
            _ => None,
        }
    }
}

fn non_empty(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}
