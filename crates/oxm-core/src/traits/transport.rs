// # Ad Transport Trait
//
// Defines the interface for issuing ad requests to the ad server.
//
// ## Implementations
//
// - reqwest-based: `oxm-transport-http` crate
// - Tests: scripted in-memory transports
//
// ## Usage
//
// ```rust,ignore
// use oxm_core::traits::AdTransport;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let transport = /* AdTransport implementation */;
//     let response = transport.fetch(&request).await?;
//     println!("status {}", response.status);
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::error::TransportError;
use crate::request::AdRequestSpec;

/// Result of a single transport round trip
pub type TransportResult = Result<AdResponse, TransportError>;

/// Raw response as received from the ad server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body, decoded as UTF-8
    pub body: String,
}

impl AdResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// 200 response with the given body
    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }
}

/// Trait for ad transport implementations
///
/// # Trust Level: Untrusted
///
/// Transports are single-shot. They execute exactly one request per call
/// and report what happened.
///
/// ## Allowed Capabilities
/// - ✅ Perform one HTTP/HTTPS call to the URL in the request
/// - ✅ Map low-level failures onto [`TransportError`]
///
/// ## Forbidden Capabilities
/// - ❌ Retry or back off (recovery belongs to the refresh scheduler)
/// - ❌ Interpret the body (classification belongs to the core)
/// - ❌ Spawn tasks (the controller owns the in-flight future and may drop it)
///
/// Dropping the returned future must be safe at any await point; that is
/// how `stop_loading()` cancels a pending request.
#[async_trait]
pub trait AdTransport: Send + Sync {
    /// Issue the request and return the raw response
    ///
    /// # Returns
    ///
    /// - `Ok(AdResponse)`: any HTTP response, including non-2xx
    /// - `Err(TransportError)`: no HTTP response was obtained
    async fn fetch(&self, request: &AdRequestSpec) -> TransportResult;

    /// Get the transport name (for logging/debugging)
    fn transport_name(&self) -> &'static str;
}
