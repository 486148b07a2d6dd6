use crate::core::{AppError, Result};
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use std::time::Duration;

/// Per-call timeout for every provider-facing request
const PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

/// Retry budget for transient provider failures (5xx, connect, timeout).
/// Validation-class failures are never retried.
const MAX_TRANSIENT_RETRIES: u32 = 2;

/// Build the shared provider-facing HTTP client.
///
/// One client is constructed at startup and handed to every adapter:
/// bounded timeout plus a small fixed transient-only retry budget.
pub fn provider_client() -> Result<ClientWithMiddleware> {
    let client = Client::builder()
        .timeout(PROVIDER_TIMEOUT)
        .build()
        .map_err(|e| AppError::Configuration(format!("HTTP client construction failed: {}", e)))?;

    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(MAX_TRANSIENT_RETRIES);

    Ok(ClientBuilder::new(client)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build())
}

/// Map a request-send failure onto the error taxonomy. Anything that kept
/// us from reaching the provider is transient.
pub(crate) fn send_error(gateway: &str, e: reqwest_middleware::Error) -> AppError {
    AppError::GatewayUnavailable(format!("{} request failed: {}", gateway, e))
}

/// Map a non-success provider response: 5xx is transient, anything else
/// means the provider rejected our request.
pub(crate) fn status_error(gateway: &str, status: reqwest::StatusCode, body: &str) -> AppError {
    if status.is_server_error() {
        AppError::GatewayUnavailable(format!("{} returned HTTP {}: {}", gateway, status, body))
    } else {
        AppError::Validation(format!("{} rejected request (HTTP {}): {}", gateway, status, body))
    }
}

/// Map a response-body read/parse failure.
pub(crate) fn body_error(gateway: &str, e: impl std::fmt::Display) -> AppError {
    AppError::GatewayUnavailable(format!("{} response could not be read: {}", gateway, e))
}
