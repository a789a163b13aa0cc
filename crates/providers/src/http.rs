//! Shared HTTP plumbing: client construction and status-code mapping.

use orus_core::ProviderError;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::warn;

pub(crate) fn client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .expect("Failed to create HTTP client")
}

pub(crate) fn network(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Network(format!("request timed out: {e}"))
    } else {
        ProviderError::Network(e.to_string())
    }
}

/// Map non-success statuses onto the provider error taxonomy.
pub(crate) async fn check_status(
    provider: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status().as_u16();

    if status == 429 {
        return Err(ProviderError::RateLimited {
            retry_after_secs: 5,
        });
    }

    if status == 401 || status == 403 {
        return Err(ProviderError::AuthenticationFailed(
            "Invalid API key or insufficient permissions".into(),
        ));
    }

    if !response.status().is_success() {
        let error_body = response.text().await.unwrap_or_default();
        warn!(provider, status, body = %error_body, "Provider returned error");
        return Err(ProviderError::Api {
            status_code: status,
            message: error_body,
        });
    }

    Ok(response)
}

pub(crate) async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ProviderError> {
    response
        .json()
        .await
        .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {e}")))
}
