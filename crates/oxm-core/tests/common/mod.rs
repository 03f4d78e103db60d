//! Test doubles and common utilities for lifecycle contract tests
//!
//! The transport here never touches the network. Replies are scripted per
//! call and may be delayed with `tokio::time::sleep`, so tests using a
//! paused clock control exactly when a request completes.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use oxm_core::error::TransportError;
use oxm_core::traits::{AdResponse, AdTransport, TransportResult};
use oxm_core::{AdConfig, AdDelegate, AdEvent, AdRequestSpec};

/// One scripted transport reply
#[derive(Debug, Clone)]
pub enum Reply {
    /// Complete on first poll
    Now(TransportResult),
    /// Complete after the given (virtual) delay
    After(Duration, TransportResult),
    /// Never complete
    Hang,
}

impl Reply {
    pub fn ad(ad_unit_id: &str) -> Self {
        Reply::Now(Ok(AdResponse::ok(ad_body(ad_unit_id))))
    }

    pub fn ad_after(delay: Duration, ad_unit_id: &str) -> Self {
        Reply::After(delay, Ok(AdResponse::ok(ad_body(ad_unit_id))))
    }

    pub fn status(status: u16) -> Self {
        Reply::Now(Ok(AdResponse::new(status, "")))
    }

    pub fn no_ads() -> Self {
        Reply::Now(Ok(AdResponse::ok(empty_body())))
    }

    pub fn unreachable() -> Self {
        Reply::Now(Err(TransportError::Unreachable("connection refused".into())))
    }
}

/// Decrements the in-flight gauge even when the fetch future is dropped
struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A transport that replays a script and records every request
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Reply>>,
    /// Used once the script is exhausted
    fallback: Reply,
    /// Call counter for fetch()
    fetch_call_count: Arc<AtomicUsize>,
    /// Requests currently being fetched
    in_flight: Arc<AtomicUsize>,
    /// Highest value `in_flight` ever reached
    max_in_flight: Arc<AtomicUsize>,
    /// Requested ids, in call order
    requested: Arc<Mutex<Vec<String>>>,
    /// Full requests, in call order
    requests: Arc<Mutex<Vec<AdRequestSpec>>>,
}

impl ScriptedTransport {
    /// Every call returns one HTML ad echoing the requested id
    pub fn new() -> Arc<Self> {
        Self::with_fallback(Reply::Now(Ok(AdResponse::ok(ad_body("default")))))
    }

    pub fn with_fallback(fallback: Reply) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            fallback,
            fetch_call_count: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
            requested: Arc::new(Mutex::new(Vec::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Queue a reply for the next unscripted call
    pub fn push(&self, reply: Reply) -> &Self {
        self.script.lock().unwrap().push_back(reply);
        self
    }

    /// Get the number of times fetch() was called
    pub fn fetch_call_count(&self) -> usize {
        self.fetch_call_count.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Ids of every fetched request
    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Option<AdRequestSpec> {
        self.requests.lock().unwrap().last().cloned()
    }

    fn next_reply(&self) -> Reply {
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}

#[async_trait::async_trait]
impl AdTransport for ScriptedTransport {
    async fn fetch(&self, request: &AdRequestSpec) -> TransportResult {
        self.fetch_call_count.fetch_add(1, Ordering::SeqCst);
        self.requested
            .lock()
            .unwrap()
            .push(request.ad_unit_id().to_string());
        self.requests.lock().unwrap().push(request.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlightGuard(Arc::clone(&self.in_flight));

        match self.next_reply() {
            Reply::Now(result) => result,
            Reply::After(delay, result) => {
                tokio::time::sleep(delay).await;
                result
            }
            Reply::Hang => std::future::pending().await,
        }
    }

    fn transport_name(&self) -> &'static str {
        "scripted"
    }
}

/// Shared log of delivered events
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<AdEvent>>>);

impl EventLog {
    pub fn events(&self) -> Vec<AdEvent> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, event: &AdEvent) -> usize {
        self.0.lock().unwrap().iter().filter(|e| *e == event).count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().unwrap().is_empty()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

/// A delegate that records every event
pub fn recording_delegate() -> (AdDelegate, EventLog) {
    let log = EventLog::default();
    let sink = log.clone();
    let delegate = AdDelegate::new().on_event(move |e| sink.0.lock().unwrap().push(e.clone()));
    (delegate, log)
}

/// Response body with one HTML ad
pub fn ad_body(ad_unit_id: &str) -> String {
    serde_json::json!({
        "ads": {
            "count": 1,
            "ad": [{
                "adunitid": ad_unit_id,
                "type": "html",
                "html": format!("<div id=\"{}\"></div>", ad_unit_id),
                "creative": [{
                    "width": "320",
                    "height": "50",
                    "tracking": {
                        "impression": "https://ads.example.com/ri",
                        "click": "https://ads.example.com/rc"
                    }
                }]
            }]
        }
    })
    .to_string()
}

/// Response body reporting zero ads
pub fn empty_body() -> String {
    r#"{"ads":{"count":0,"ad":[]}}"#.to_string()
}

/// Minimal config for testing
pub fn test_config(portrait: &str, landscape: &str) -> AdConfig {
    AdConfig::with_ad_units("ads.example.com", portrait, landscape)
}
