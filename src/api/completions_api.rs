use backon::{ExponentialBuilder, Retryable};
use tracing::warn;
use url::Url;

pub struct CompletionsApi;

impl CompletionsApi {
    /// POST a chat-completion body. Upstream 5xx, timeouts and connect failures are retried;
    /// client errors come back on the first attempt.
    pub async fn try_post_chat<T>(
        client: reqwest::Client,
        url: Url,
        token: impl AsRef<str>,
        retry_policy: ExponentialBuilder,
        body: &T,
    ) -> Result<reqwest::Response, reqwest::Error>
    where
        T: serde::Serialize,
    {
        (|| async {
            let resp = client
                .post(url.clone())
                .bearer_auth(token.as_ref())
                .json(body)
                .send()
                .await?;
            if resp.status().is_server_error() {
                return resp.error_for_status();
            }
            Ok(resp)
        })
        .retry(retry_policy)
        .when(|e: &reqwest::Error| {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        })
        .notify(|e: &reqwest::Error, after| {
            warn!(error = %e, retry_in = ?after, "completion request failed; retrying");
        })
        .await
    }
}
