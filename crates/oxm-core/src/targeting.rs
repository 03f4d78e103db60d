//! Targeting data sent with every ad request
//!
//! A [`TargetingProfile`] is owned by its controller and mutated through
//! `request_mut()`. Nothing here performs I/O; the request builder turns it
//! into query parameters.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// End-user gender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub(crate) fn wire_value(self) -> &'static str {
        match self {
            Gender::Male => "m",
            Gender::Female => "f",
            Gender::Other => "o",
        }
    }
}

/// End-user marital status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaritalStatus {
    Single,
    Married,
    Divorced,
}

impl MaritalStatus {
    pub(crate) fn wire_value(self) -> &'static str {
        match self {
            MaritalStatus::Single => "s",
            MaritalStatus::Married => "m",
            MaritalStatus::Divorced => "d",
        }
    }
}

/// End-user ethnicity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ethnicity {
    AfricanAmerican,
    Asian,
    Hispanic,
    White,
    Other,
}

impl Ethnicity {
    pub(crate) fn wire_value(self) -> &'static str {
        match self {
            Ethnicity::AfricanAmerican => "0",
            Ethnicity::Asian => "1",
            Ethnicity::Hispanic => "2",
            Ethnicity::White => "3",
            Ethnicity::Other => "4",
        }
    }
}

/// Network connection type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    Offline,
    Wifi,
    Cell,
}

impl NetworkType {
    pub(crate) fn wire_value(self) -> &'static str {
        match self {
            NetworkType::Offline => "offline",
            NetworkType::Wifi => "wifi",
            NetworkType::Cell => "cell",
        }
    }
}

/// GPS coordinates in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Developer-provided targeting parameters
///
/// Every field is optional. Location auto-detection is on by default and
/// only ever fills fields the developer left unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetingProfile {
    #[serde(default = "default_autodetect_location")]
    pub autodetect_location: bool,

    pub age: Option<u32>,
    pub gender: Option<Gender>,
    pub marital_status: Option<MaritalStatus>,
    pub ethnicity: Option<Ethnicity>,
    /// Annual household income in US dollars
    pub annual_income_usd: Option<u64>,
    pub user_id: Option<String>,

    pub app_store_url: Option<String>,

    pub dma: Option<String>,
    pub ip: Option<String>,
    pub coordinates: Option<Coordinates>,
    /// `<MCC>-<MNC>`, e.g. `310-410`
    pub carrier: Option<String>,
    /// ISO 3166-1 alpha-2, upper case
    pub country: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub network_type: Option<NetworkType>,

    #[serde(default)]
    params: BTreeMap<String, String>,

    #[serde(default)]
    custom_params: BTreeMap<String, String>,
}

fn default_autodetect_location() -> bool {
    true
}

impl Default for TargetingProfile {
    fn default() -> Self {
        Self {
            autodetect_location: default_autodetect_location(),
            age: None,
            gender: None,
            marital_status: None,
            ethnicity: None,
            annual_income_usd: None,
            user_id: None,
            app_store_url: None,
            dma: None,
            ip: None,
            coordinates: None,
            carrier: None,
            country: None,
            city: None,
            state: None,
            zip_code: None,
            network_type: None,
            params: BTreeMap::new(),
            custom_params: BTreeMap::new(),
        }
    }
}

impl TargetingProfile {
    /// Create an empty profile with location auto-detection enabled
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_autodetect_location(&mut self, enabled: bool) {
        self.autodetect_location = enabled;
    }

    pub fn set_user_age(&mut self, age: u32) {
        self.age = Some(age);
    }

    pub fn set_user_gender(&mut self, gender: Gender) {
        self.gender = Some(gender);
    }

    pub fn set_user_marital_status(&mut self, status: MaritalStatus) {
        self.marital_status = Some(status);
    }

    pub fn set_user_ethnicity(&mut self, ethnicity: Ethnicity) {
        self.ethnicity = Some(ethnicity);
    }

    /// Annual household income in US dollars, no separators
    pub fn set_user_annual_income_usd(&mut self, income: u64) {
        self.annual_income_usd = Some(income);
    }

    /// Customer-provided user id, if different from the device id
    pub fn set_user_id(&mut self, user_id: impl Into<String>) {
        self.user_id = Some(user_id.into());
    }

    pub fn set_app_store_url(&mut self, url: impl Into<String>) {
        self.app_store_url = Some(url.into());
    }

    /// US Designated Market Area, e.g. `803`
    pub fn set_dma(&mut self, dma: impl Into<String>) {
        self.dma = Some(dma.into());
    }

    /// IP address of the carrier gateway
    pub fn set_ip(&mut self, ip: impl Into<String>) {
        self.ip = Some(ip.into());
    }

    pub fn set_coordinates(&mut self, coordinates: Coordinates) {
        self.coordinates = Some(coordinates);
    }

    pub fn set_carrier(&mut self, carrier: impl Into<String>) {
        self.carrier = Some(carrier.into());
    }

    pub fn set_country(&mut self, country: impl Into<String>) {
        self.country = Some(country.into());
    }

    pub fn set_city(&mut self, city: impl Into<String>) {
        self.city = Some(city.into());
    }

    pub fn set_state(&mut self, state: impl Into<String>) {
        self.state = Some(state.into());
    }

    pub fn set_zip_code(&mut self, zip: impl Into<String>) {
        self.zip_code = Some(zip.into());
    }

    pub fn set_network_type(&mut self, network_type: NetworkType) {
        self.network_type = Some(network_type);
    }

    /// Add a named ad-call parameter the SDK has no dedicated setter for
    ///
    /// The name is sent as-is. Setting the same name twice keeps the last value.
    pub fn add_param(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.params.insert(name.into(), value.into());
    }

    /// Replace all custom parameters
    ///
    /// Names are plain (`xxx`); the `c.` prefix is added when the request is built.
    pub fn set_custom_params(&mut self, params: impl IntoIterator<Item = (String, String)>) {
        self.custom_params = params.into_iter().collect();
    }

    /// Add a single custom parameter by its plain name
    pub fn add_custom_param(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.custom_params.insert(name.into(), value.into());
    }

    /// Named extension parameters, ordered by name
    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// Custom parameters keyed by plain name, ordered by name
    pub fn custom_params(&self) -> &BTreeMap<String, String> {
        &self.custom_params
    }
}
