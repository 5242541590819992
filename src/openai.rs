//! OpenAI-compatible client construction.
//!
//! Every remote model (embeddings, generation, formatting) speaks the OpenAI
//! wire format; only the base URL, key and timeout differ. Clients never
//! retry: a rate-limited or failed call surfaces on the first response.

use crate::error::{DocqueryError, Result};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for model API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Shorthand for the configured client type.
pub type ApiClient = Client<OpenAIConfig>;

/// Create a client for an endpoint with the default timeout.
pub fn create_client(api_base: &str, api_key: &str) -> Result<ApiClient> {
    create_client_with_timeout(api_base, api_key, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
}

/// Create a client for an endpoint with a custom timeout.
pub fn create_client_with_timeout(
    api_base: &str,
    api_key: &str,
    timeout: Duration,
) -> Result<ApiClient> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| DocqueryError::Config(format!("Failed to create HTTP client: {}", e)))?;

    let config = OpenAIConfig::new()
        .with_api_base(api_base.trim_end_matches('/'))
        .with_api_key(api_key);

    Ok(Client::with_config(config)
        .with_http_client(http_client)
        .with_backoff(no_retry()))
}

/// Backoff that gives up after the first failed attempt.
fn no_retry() -> backoff::ExponentialBackoff {
    backoff::ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build()
}
