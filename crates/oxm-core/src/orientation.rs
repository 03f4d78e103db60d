//! Orientation-aware ad unit selection
//!
//! Every controller is configured with a portrait and a landscape
//! identifier. Apps that support a single orientation may leave the other
//! one empty; the resolver then falls back to whichever id is set.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Device interface orientation as reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Portrait,
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
}

impl Orientation {
    /// Whether this is one of the two portrait orientations
    pub fn is_portrait(self) -> bool {
        matches!(self, Orientation::Portrait | Orientation::PortraitUpsideDown)
    }
}

/// Which server-side identifier the pair carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdMode {
    /// Ad unit ids, sent as `auid`
    AdUnit,
    /// Ad unit group ids, sent as `pgid`
    AdGroup,
}

impl IdMode {
    /// Query parameter key for this mode
    pub fn param_key(self) -> &'static str {
        match self {
            IdMode::AdUnit => "auid",
            IdMode::AdGroup => "pgid",
        }
    }
}

/// Portrait/landscape identifier pair
///
/// The mode is fixed when the pair is created and never changes for the
/// lifetime of a controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdUnitPair {
    mode: IdMode,
    portrait: String,
    landscape: String,
}

impl AdUnitPair {
    /// Pair of ad unit ids
    pub fn ad_units(portrait: impl Into<String>, landscape: impl Into<String>) -> Self {
        Self {
            mode: IdMode::AdUnit,
            portrait: portrait.into(),
            landscape: landscape.into(),
        }
    }

    /// Pair of ad group ids
    pub fn ad_groups(portrait: impl Into<String>, landscape: impl Into<String>) -> Self {
        Self {
            mode: IdMode::AdGroup,
            portrait: portrait.into(),
            landscape: landscape.into(),
        }
    }

    pub fn mode(&self) -> IdMode {
        self.mode
    }

    pub fn portrait(&self) -> &str {
        &self.portrait
    }

    pub fn landscape(&self) -> &str {
        &self.landscape
    }

    /// Resolve the id to request for `orientation`
    ///
    /// # Returns
    ///
    /// - `Ok(id)`: the id for the orientation, or the other one if that is empty
    /// - `Err(Error::Config)`: both ids are empty
    pub fn resolve(&self, orientation: Orientation) -> Result<&str> {
        let (preferred, fallback) = if orientation.is_portrait() {
            (&self.portrait, &self.landscape)
        } else {
            (&self.landscape, &self.portrait)
        };

        if !preferred.is_empty() {
            Ok(preferred)
        } else if !fallback.is_empty() {
            Ok(fallback)
        } else {
            Err(Error::config(
                "Both portrait and landscape ids are empty; set at least one",
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_by_orientation() {
        let pair = AdUnitPair::ad_units("P1", "L1");
        assert_eq!(pair.resolve(Orientation::Portrait).unwrap(), "P1");
        assert_eq!(pair.resolve(Orientation::PortraitUpsideDown).unwrap(), "P1");
        assert_eq!(pair.resolve(Orientation::LandscapeLeft).unwrap(), "L1");
        assert_eq!(pair.resolve(Orientation::LandscapeRight).unwrap(), "L1");
    }

    #[test]
    fn test_falls_back_to_other_orientation() {
        let pair = AdUnitPair::ad_units("", "L1");
        assert_eq!(pair.resolve(Orientation::Portrait).unwrap(), "L1");

        let pair = AdUnitPair::ad_groups("G1", "");
        assert_eq!(pair.resolve(Orientation::LandscapeLeft).unwrap(), "G1");
    }

    #[test]
    fn test_both_empty_is_config_error() {
        let pair = AdUnitPair::ad_units("", "");
        let err = pair.resolve(Orientation::Portrait).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_mode_param_key() {
        assert_eq!(AdUnitPair::ad_units("a", "b").mode().param_key(), "auid");
        assert_eq!(AdUnitPair::ad_groups("a", "b").mode().param_key(), "pgid");
    }
}
