// # Location Source Trait
//
// Supplies the last known device location for request targeting.
// Sensing itself (GPS, reverse geocoding) is platform code outside this
// crate; the core only reads the most recent reading.

use crate::targeting::Coordinates;

/// A location reading, optionally reverse-geocoded
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LocationReading {
    pub coordinates: Option<Coordinates>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
}

impl LocationReading {
    /// Reading with coordinates only
    pub fn at(latitude: f64, longitude: f64) -> Self {
        Self {
            coordinates: Some(Coordinates::new(latitude, longitude)),
            ..Self::default()
        }
    }
}

/// Trait for location providers
///
/// Must return immediately; the request builder is synchronous.
pub trait LocationSource: Send + Sync {
    /// Most recent reading, if any
    fn last_known(&self) -> Option<LocationReading>;
}

/// Location source that never has a reading
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocation;

impl LocationSource for NoLocation {
    fn last_known(&self) -> Option<LocationReading> {
        None
    }
}
