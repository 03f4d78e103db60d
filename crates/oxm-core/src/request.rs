//! Ad request construction
//!
//! [`RequestBuilder`] turns a [`TargetingProfile`] and an
//! orientation-resolved id into an [`AdRequestSpec`]: method, URL and the
//! ordered query parameters. It is pure: no I/O, no controller state.
//!
//! ## Parameter order
//!
//! 1. Ad unit (`auid`) or ad group (`pgid`) id
//! 2. Fixed targeting keys, in declaration order below
//! 3. Extension parameters added with `add_param`, by name
//! 4. Custom parameters as `c.<name>`, by name

use url::Url;

use crate::error::{Error, Result};
use crate::orientation::IdMode;
use crate::targeting::TargetingProfile;
use crate::traits::LocationReading;

/// Path of the JSON ad request endpoint on the delivery server
pub const AD_REQUEST_PATH: &str = "/ma/1.0/arj";

/// Prefix applied to every custom parameter name
pub const CUSTOM_PARAM_PREFIX: &str = "c.";

/// URL scheme for ad requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl Scheme {
    /// `https` iff SSL is enabled
    pub fn for_ssl(ssl: bool) -> Self {
        if ssl { Scheme::Https } else { Scheme::Http }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

/// HTTP method of an ad request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
}

/// A fully built ad request, ready for a transport
#[derive(Debug, Clone, PartialEq)]
pub struct AdRequestSpec {
    method: Method,
    url: Url,
    ad_unit_id: String,
    params: Vec<(String, String)>,
}

impl AdRequestSpec {
    pub fn method(&self) -> Method {
        self.method
    }

    /// Full URL including the encoded query string
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The orientation-resolved id this request targets
    pub fn ad_unit_id(&self) -> &str {
        &self.ad_unit_id
    }

    /// Query parameters in wire order
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// First value for `key`, if present
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Builds [`AdRequestSpec`]s for one delivery domain
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    domain: String,
    scheme: Scheme,
    mode: IdMode,
}

impl RequestBuilder {
    pub fn new(domain: impl Into<String>, scheme: Scheme, mode: IdMode) -> Self {
        Self {
            domain: domain.into(),
            scheme,
            mode,
        }
    }

    /// Build a request for `ad_unit_id`
    ///
    /// # Parameters
    ///
    /// - `ad_unit_id`: id already resolved for the current orientation
    /// - `targeting`: developer-provided targeting
    /// - `location`: auto-detected reading; ignored unless
    ///   `targeting.autodetect_location` is set
    ///
    /// # Returns
    ///
    /// - `Ok(AdRequestSpec)`: the request
    /// - `Err(Error::Config)`: the domain does not form a usable URL
    pub fn build(
        &self,
        ad_unit_id: &str,
        targeting: &TargetingProfile,
        location: Option<&LocationReading>,
    ) -> Result<AdRequestSpec> {
        let domain = self.domain.trim();
        if domain.is_empty() {
            return Err(Error::config("Delivery domain cannot be empty"));
        }

        let mut url = Url::parse(&format!(
            "{}://{}{}",
            self.scheme.as_str(),
            domain,
            AD_REQUEST_PATH
        ))
        .map_err(|e| Error::config(format!("Invalid delivery domain '{}': {}", domain, e)))?;

        let detected = if targeting.autodetect_location {
            location
        } else {
            None
        };

        let mut params = Vec::new();
        set_param(&mut params, self.mode.param_key(), ad_unit_id);
        push_targeting(&mut params, targeting, detected);

        for (name, value) in targeting.params() {
            set_param(&mut params, name, value);
        }

        // Extension params never replace the resolved id
        set_param(&mut params, self.mode.param_key(), ad_unit_id);

        for (name, value) in targeting.custom_params() {
            params.push((format!("{}{}", CUSTOM_PARAM_PREFIX, name), value.clone()));
        }

        url.query_pairs_mut()
            .extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        Ok(AdRequestSpec {
            method: Method::Get,
            url,
            ad_unit_id: ad_unit_id.to_string(),
            params,
        })
    }
}

/// Insert or replace `key`, keeping its original position
fn set_param(params: &mut Vec<(String, String)>, key: &str, value: &str) {
    match params.iter_mut().find(|(k, _)| k == key) {
        Some(entry) => entry.1 = value.to_string(),
        None => params.push((key.to_string(), value.to_string())),
    }
}

fn push_targeting(
    params: &mut Vec<(String, String)>,
    t: &TargetingProfile,
    detected: Option<&LocationReading>,
) {
    let mut push = |key: &str, value: Option<String>| {
        if let Some(value) = value {
            params.push((key.to_string(), value));
        }
    };

    push("age", t.age.map(|v| v.to_string()));
    push("gen", t.gender.map(|v| v.wire_value().to_string()));
    push("mar", t.marital_status.map(|v| v.wire_value().to_string()));
    push("eth", t.ethnicity.map(|v| v.wire_value().to_string()));
    push("inc", t.annual_income_usd.map(|v| v.to_string()));
    push("xid", t.user_id.clone());
    push("url", t.app_store_url.clone());
    push("dma", t.dma.clone());
    push("ip", t.ip.clone());

    // Explicit geo values win over detected ones
    let coordinates = t
        .coordinates
        .or_else(|| detected.and_then(|d| d.coordinates));
    push("lat", coordinates.map(|c| c.latitude.to_string()));
    push("lon", coordinates.map(|c| c.longitude.to_string()));

    push("crr", t.carrier.clone());
    push(
        "cnt",
        t.country
            .clone()
            .or_else(|| detected.and_then(|d| d.country.clone())),
    );
    push(
        "cty",
        t.city.clone().or_else(|| detected.and_then(|d| d.city.clone())),
    );
    push(
        "stt",
        t.state
            .clone()
            .or_else(|| detected.and_then(|d| d.state.clone())),
    );
    push(
        "zip",
        t.zip_code
            .clone()
            .or_else(|| detected.and_then(|d| d.zip_code.clone())),
    );
    push("net", t.network_type.map(|v| v.wire_value().to_string()));
}
