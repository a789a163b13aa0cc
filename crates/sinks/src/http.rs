//! Shared HTTP plumbing for sinks.

use orus_core::SinkError;
use std::time::Duration;
use tracing::warn;

pub(crate) fn client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .expect("Failed to create HTTP client")
}

pub(crate) fn network(e: reqwest::Error) -> SinkError {
    SinkError::Network(e.to_string())
}

pub(crate) async fn check_status(sink: &str, response: reqwest::Response) -> Result<(), SinkError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let body = response.text().await.unwrap_or_default();
    warn!(sink, status = status.as_u16(), body = %body, "Sink returned error");

    if status.is_client_error() {
        return Err(SinkError::Rejected(format!("HTTP {}: {body}", status.as_u16())));
    }
    Err(SinkError::Api {
        status_code: status.as_u16(),
        message: body,
    })
}

/// Reachable means the server answered at all without a 5xx.
pub(crate) async fn probe(client: &reqwest::Client, url: &str) -> Result<bool, SinkError> {
    let response = client.get(url).send().await.map_err(network)?;
    Ok(!response.status().is_server_error())
}
