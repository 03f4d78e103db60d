//! Ad response classification
//!
//! Every transport result is mapped onto exactly one outcome: a
//! [`Creative`] or one [`AdError`] kind.
//!
//! | Input | Outcome |
//! |---|---|
//! | transport unreachable / timeout | `NoConnection` |
//! | other transport failure | `Unknown` |
//! | non-2xx status | `Server` |
//! | 2xx, body not the JSON envelope | `Response` |
//! | 2xx, zero ads | `NoAdsLoaded` |
//! | 2xx, first ad has no content | `Response` |
//! | 2xx, first ad has content | `Creative` |

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::AdError;
use crate::traits::{AdResponse, TransportResult};

/// A single creative, ready to hand to the rendering layer
#[derive(Debug, Clone, PartialEq)]
pub struct Creative {
    /// Ad unit id echoed by the server, if any
    pub ad_unit_id: Option<String>,
    /// Creative type as reported by the server (`html`, `image`, ...)
    pub kind: String,
    /// Markup to render
    pub html: Option<String>,
    /// Media URL for non-HTML creatives
    pub media_url: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub impression_url: Option<String>,
    pub click_url: Option<String>,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    ads: AdList,
}

#[derive(Debug, Deserialize)]
struct AdList {
    #[serde(default)]
    count: Option<u32>,
    #[serde(default)]
    ad: Vec<RawAd>,
}

#[derive(Debug, Deserialize)]
struct RawAd {
    #[serde(default)]
    adunitid: Option<Value>,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    html: Option<String>,
    #[serde(default)]
    creative: Vec<RawCreative>,
}

#[derive(Debug, Deserialize)]
struct RawCreative {
    #[serde(default)]
    width: Option<Value>,
    #[serde(default)]
    height: Option<Value>,
    #[serde(default)]
    media: Option<String>,
    #[serde(default)]
    tracking: Option<RawTracking>,
}

#[derive(Debug, Deserialize)]
struct RawTracking {
    #[serde(default)]
    impression: Option<String>,
    #[serde(default)]
    click: Option<String>,
}

/// Classify a transport result
pub fn classify(result: TransportResult) -> Result<Creative, AdError> {
    match result {
        Ok(response) => classify_response(&response),
        Err(err) => Err(err.into()),
    }
}

/// Classify an HTTP response
pub fn classify_response(response: &AdResponse) -> Result<Creative, AdError> {
    if !(200..300).contains(&response.status) {
        return Err(AdError::Server(format!("HTTP status {}", response.status)));
    }

    let envelope: Envelope = serde_json::from_str(&response.body)
        .map_err(|e| AdError::Response(format!("unparseable body: {}", e)))?;

    if envelope.ads.count == Some(0) {
        return Err(AdError::NoAdsLoaded);
    }

    let Some(ad) = envelope.ads.ad.into_iter().next() else {
        return Err(AdError::NoAdsLoaded);
    };

    let first = ad.creative.into_iter().next();
    let media_url = first.as_ref().and_then(|c| c.media.clone());
    let html = ad.html.filter(|h| !h.trim().is_empty());

    if html.is_none() && media_url.is_none() {
        return Err(AdError::Response("ad has neither html nor media".to_string()));
    }

    let tracking = first.as_ref().and_then(|c| c.tracking.as_ref());

    Ok(Creative {
        ad_unit_id: ad.adunitid.as_ref().and_then(scalar_to_string),
        kind: ad.kind.unwrap_or_else(|| "html".to_string()),
        html,
        media_url,
        width: first.as_ref().and_then(|c| dimension(c.width.as_ref())),
        height: first.as_ref().and_then(|c| dimension(c.height.as_ref())),
        impression_url: tracking.and_then(|t| t.impression.clone()),
        click_url: tracking.and_then(|t| t.click.clone()),
        received_at: Utc::now(),
    })
}

/// The server sends ids and sizes either as strings or numbers
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn dimension(value: Option<&Value>) -> Option<u32> {
    match value? {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
