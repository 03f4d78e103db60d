// # HTTP Ad Transport
//
// reqwest-backed implementation of `oxm_core::traits::AdTransport`.
//
// ## Behavior
//
// - One GET per `fetch`, to the exact URL the core built
// - Any HTTP response is returned as-is, including non-2xx; the core
//   decides what a status means
// - Failures before a response map onto `TransportError`:
//   timeouts → `Timeout`, connect failures → `Unreachable`, the rest → `Other`
//
// No retries. The refresh scheduler is the only recovery mechanism.

use std::time::Duration;

use oxm_core::AdRequestSpec;
use oxm_core::error::TransportError;
use oxm_core::traits::{AdResponse, AdTransport, TransportResult};
use tracing::debug;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP transport for ad requests
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with the default timeout
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a transport whose requests give up after `timeout`
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(timeout)
                .user_agent(concat!("oxm-sdk/", env!("CARGO_PKG_VERSION")))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Use a preconfigured client (proxies, custom TLS roots, ...)
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn map_error(err: &reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(err.to_string())
    } else if err.is_connect() {
        TransportError::Unreachable(err.to_string())
    } else {
        TransportError::Other(err.to_string())
    }
}

#[async_trait::async_trait]
impl AdTransport for HttpTransport {
    async fn fetch(&self, request: &AdRequestSpec) -> TransportResult {
        debug!("GET {}", request.url());

        let response = self
            .client
            .get(request.url().as_str())
            .send()
            .await
            .map_err(|e| map_error(&e))?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| map_error(&e))?;

        debug!("{} answered {} ({} bytes)", request.ad_unit_id(), status, body.len());
        Ok(AdResponse { status, body })
    }

    fn transport_name(&self) -> &'static str {
        "http"
    }
}
