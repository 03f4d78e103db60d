//! Configuration types for the OXM SDK
//!
//! Controllers are built from an [`AdConfig`]. It can be assembled in code
//! or deserialized from JSON:
//!
//! ```json
//! {
//!   "domain": "ads.example.com",
//!   "ad_units": { "mode": "ad_unit", "portrait": "538176", "landscape": "538177" },
//!   "ssl": true,
//!   "refresh": { "interval_secs": 45.0 }
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::orientation::AdUnitPair;

/// Main controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdConfig {
    /// Hostname of the ad delivery server
    pub domain: String,

    /// Portrait/landscape identifiers
    pub ad_units: AdUnitConfig,

    /// Use `https` for ad requests
    #[serde(default)]
    pub ssl: bool,

    /// Banner auto-refresh settings (ignored by interstitials)
    #[serde(default)]
    pub refresh: RefreshConfig,

    /// Interstitial presentation settings (ignored by banners)
    #[serde(default)]
    pub presentation: PresentationOptions,
}

impl AdConfig {
    /// Configuration using ad unit ids
    ///
    /// Leave one id empty for apps that support a single orientation, or
    /// pass the same id twice to serve one unit in both.
    pub fn with_ad_units(
        domain: impl Into<String>,
        portrait: impl Into<String>,
        landscape: impl Into<String>,
    ) -> Self {
        Self::new(
            domain,
            AdUnitConfig::AdUnit {
                portrait: portrait.into(),
                landscape: landscape.into(),
            },
        )
    }

    /// Configuration using ad unit group ids
    pub fn with_ad_groups(
        domain: impl Into<String>,
        portrait: impl Into<String>,
        landscape: impl Into<String>,
    ) -> Self {
        Self::new(
            domain,
            AdUnitConfig::AdGroup {
                portrait: portrait.into(),
                landscape: landscape.into(),
            },
        )
    }

    fn new(domain: impl Into<String>, ad_units: AdUnitConfig) -> Self {
        Self {
            domain: domain.into(),
            ad_units,
            ssl: false,
            refresh: RefreshConfig::default(),
            presentation: PresentationOptions::default(),
        }
    }

    /// Enable or disable SSL
    pub fn ssl(mut self, ssl: bool) -> Self {
        self.ssl = ssl;
        self
    }

    /// Set the refresh interval in seconds
    pub fn refresh_interval(mut self, secs: f64) -> Self {
        self.refresh.interval_secs = secs;
        self
    }

    /// Enable or disable auto-refresh
    pub fn auto_refresh(mut self, enabled: bool) -> Self {
        self.refresh.enabled = enabled;
        self
    }

    /// Set interstitial presentation options
    pub fn presentation(mut self, presentation: PresentationOptions) -> Self {
        self.presentation = presentation;
        self
    }

    /// Validate the configuration
    ///
    /// Empty ad unit ids are not rejected here: they are reported when
    /// loading starts, once the orientation is known.
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.domain.trim().is_empty() {
            return Err(crate::Error::config("Delivery domain cannot be empty"));
        }
        if self.domain.contains("://") {
            return Err(crate::Error::config(
                "Delivery domain must be a hostname without scheme; use ssl to select https",
            ));
        }

        self.refresh.validate()?;
        self.presentation.validate()?;

        Ok(())
    }

    /// Parse a JSON configuration document and validate it
    pub fn from_json(json: &str) -> Result<Self, crate::Error> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

/// Identifier configuration; the mode is fixed per controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AdUnitConfig {
    /// Ad unit ids (`auid`)
    AdUnit {
        #[serde(default)]
        portrait: String,
        #[serde(default)]
        landscape: String,
    },

    /// Ad unit group ids (`pgid`)
    AdGroup {
        #[serde(default)]
        portrait: String,
        #[serde(default)]
        landscape: String,
    },
}

impl AdUnitConfig {
    pub fn to_pair(&self) -> AdUnitPair {
        match self {
            AdUnitConfig::AdUnit {
                portrait,
                landscape,
            } => AdUnitPair::ad_units(portrait.clone(), landscape.clone()),
            AdUnitConfig::AdGroup {
                portrait,
                landscape,
            } => AdUnitPair::ad_groups(portrait.clone(), landscape.clone()),
        }
    }
}

/// Banner auto-refresh settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Seconds between reloads; 0 disables auto-refresh
    #[serde(default = "default_interval_secs")]
    pub interval_secs: f64,

    /// Whether `start_loading` arms the refresh timer
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl RefreshConfig {
    pub fn validate(&self) -> Result<(), crate::Error> {
        if !self.interval_secs.is_finite() || self.interval_secs < 0.0 {
            return Err(crate::Error::config(format!(
                "Refresh interval must be a finite number of seconds >= 0, got {}",
                self.interval_secs
            )));
        }
        Ok(())
    }

    /// Whether refreshing will actually happen
    pub fn is_active(&self) -> bool {
        self.enabled && self.interval_secs > 0.0
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            enabled: default_enabled(),
        }
    }
}

fn default_interval_secs() -> f64 {
    30.0
}

fn default_enabled() -> bool {
    true
}

/// Position of the interstitial close widget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosePosition {
    /// Top right corner of the screen
    #[default]
    ScreenTopRight,
    /// Top left corner of the screen
    ScreenTopLeft,
    /// Top right corner of the ad, like a lightbox
    AdTopRight,
    /// Top left corner of the ad, like a lightbox
    AdTopLeft,
}

impl ClosePosition {
    /// Whether the widget is pinned to the creative rather than the screen
    pub fn is_ad_anchored(self) -> bool {
        matches!(self, ClosePosition::AdTopRight | ClosePosition::AdTopLeft)
    }
}

/// How an interstitial is put on screen
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PresentationOptions {
    #[serde(default)]
    pub close_position: ClosePosition,

    /// Opacity of the translucent background, 0.0 to 1.0
    #[serde(default = "default_background_opacity")]
    pub background_opacity: f64,

    /// Inject views into the host's current view instead of presenting a
    /// new modal container
    #[serde(default)]
    pub use_overlay: bool,
}

impl PresentationOptions {
    pub fn validate(&self) -> Result<(), crate::Error> {
        if !(0.0..=1.0).contains(&self.background_opacity) {
            return Err(crate::Error::config(format!(
                "Background opacity must be between 0.0 and 1.0, got {}",
                self.background_opacity
            )));
        }
        Ok(())
    }
}

impl Default for PresentationOptions {
    fn default() -> Self {
        Self {
            close_position: ClosePosition::default(),
            background_opacity: default_background_opacity(),
            use_overlay: false,
        }
    }
}

fn default_background_opacity() -> f64 {
    0.7
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orientation::IdMode;

    #[test]
    fn test_defaults() {
        let config = AdConfig::with_ad_units("ads.example.com", "A1", "A2");
        assert!(!config.ssl);
        assert_eq!(config.refresh.interval_secs, 30.0);
        assert!(config.refresh.enabled);
        assert_eq!(config.presentation.close_position, ClosePosition::ScreenTopRight);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "domain": "ads.example.com",
            "ad_units": { "mode": "ad_group", "landscape": "G2" },
            "ssl": true,
            "refresh": { "interval_secs": 45.0 }
        }"#;
        let config: AdConfig = serde_json::from_str(json).unwrap();

        assert!(config.ssl);
        assert_eq!(config.refresh.interval_secs, 45.0);
        assert!(config.refresh.enabled);

        let pair = config.ad_units.to_pair();
        assert_eq!(pair.mode(), IdMode::AdGroup);
        assert_eq!(pair.portrait(), "");
        assert_eq!(pair.landscape(), "G2");
    }

    #[test]
    fn test_from_json_reports_parse_and_validation_errors() {
        let err = AdConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, crate::Error::Json(_)));

        let err = AdConfig::from_json(
            r#"{ "domain": "", "ad_units": { "mode": "ad_unit", "portrait": "A1" } }"#,
        )
        .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_validation() {
        assert!(AdConfig::with_ad_units("", "A1", "").validate().is_err());
        assert!(
            AdConfig::with_ad_units("https://ads.example.com", "A1", "")
                .validate()
                .is_err()
        );
        assert!(
            AdConfig::with_ad_units("ads.example.com", "A1", "")
                .refresh_interval(-1.0)
                .validate()
                .is_err()
        );

        let mut config = AdConfig::with_ad_units("ads.example.com", "A1", "");
        config.presentation.background_opacity = 1.5;
        assert!(config.validate().is_err());

        // Empty ids are a load-time error, not a construction error
        assert!(AdConfig::with_ad_units("ads.example.com", "", "").validate().is_ok());
    }

    #[test]
    fn test_refresh_activity() {
        assert!(RefreshConfig::default().is_active());
        let zero = RefreshConfig {
            interval_secs: 0.0,
            enabled: true,
        };
        assert!(!zero.is_active());
    }
}
