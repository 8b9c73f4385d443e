use async_trait::async_trait;
use backon::ExponentialBuilder;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::completions_api::CompletionsApi;
use crate::config::{AiConfig, Config};
use crate::error::LandwatchError;
use crate::types::completions::{ChatMessage, ChatRequest, ChatResponse};

/// Produces free text for a prompt.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String, LandwatchError>;
}

fn default_retry_policy() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(500))
        .with_max_delay(Duration::from_secs(3))
        .with_max_times(2)
        .with_jitter()
}

/// Chat-completions client for an OpenAI-compatible endpoint.
#[derive(Clone)]
pub struct CompletionsClient {
    client: reqwest::Client,
    endpoint: Url,
    api_key: Option<String>,
    model: String,
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl CompletionsClient {
    pub fn new(cfg: &Config) -> Result<Self, LandwatchError> {
        let ai: &AiConfig = &cfg.ai;
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("landwatch/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(ai.timeout_secs.max(1)));
        if let Some(proxy_url) = cfg.proxy.as_ref() {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url.as_str())?);
        }
        let per_minute = NonZeroU32::new(ai.requests_per_minute).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            client: builder.build()?,
            endpoint: ai.base_url.join("chat/completions")?,
            api_key: ai.api_key.clone().filter(|k| !k.is_empty()),
            model: ai.model.clone(),
            limiter: Arc::new(RateLimiter::direct(Quota::per_minute(per_minute))),
        })
    }
}

#[async_trait]
impl TextGenerator for CompletionsClient {
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String, LandwatchError> {
        let token = self
            .api_key
            .as_deref()
            .ok_or_else(|| LandwatchError::NotConfigured("AI API key".to_string()))?;

        if self.limiter.check().is_err() {
            warn!("Completion rate limit reached; skipping upstream call");
            return Err(LandwatchError::RateLimited(
                "completion quota exhausted".to_string(),
            ));
        }

        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::user(prompt)],
            temperature,
        };
        let resp = CompletionsApi::try_post_chat(
            self.client.clone(),
            self.endpoint.clone(),
            token,
            default_retry_policy(),
            &body,
        )
        .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(LandwatchError::UpstreamStatus(status));
        }
        let parsed: ChatResponse = resp.json().await?;
        debug!(model = %self.model, "completion received");
        parsed
            .into_text()
            .ok_or_else(|| LandwatchError::Internal("completion had no text".to_string()))
    }
}
