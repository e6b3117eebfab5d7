use serde::{Deserialize, Serialize};

/// Highest zoom level a surface is asked to display.
pub const MAX_ZOOM: u8 = 22;

/// Geographic coordinate in WGS84 degrees.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeoError {
    NonFinite,
    LatitudeOutOfRange(f64),
    LongitudeOutOfRange(f64),
}

impl std::fmt::Display for GeoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeoError::NonFinite => write!(f, "coordinate is not finite"),
            GeoError::LatitudeOutOfRange(v) => write!(f, "latitude out of range [-90, 90]: {v}"),
            GeoError::LongitudeOutOfRange(v) => {
                write!(f, "longitude out of range [-180, 180]: {v}")
            }
        }
    }
}

impl std::error::Error for GeoError {}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Builds a coordinate, rejecting non-finite or out-of-range values.
    pub fn try_new(lat: f64, lng: f64) -> Result<Self, GeoError> {
        let p = Self { lat, lng };
        p.validate()?;
        Ok(p)
    }

    pub fn validate(&self) -> Result<(), GeoError> {
        if !self.lat.is_finite() || !self.lng.is_finite() {
            return Err(GeoError::NonFinite);
        }
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(GeoError::LatitudeOutOfRange(self.lat));
        }
        if !(-180.0..=180.0).contains(&self.lng) {
            return Err(GeoError::LongitudeOutOfRange(self.lng));
        }
        Ok(())
    }
}

impl From<[f64; 2]> for LatLng {
    fn from([lat, lng]: [f64; 2]) -> Self {
        Self { lat, lng }
    }
}

impl std::fmt::Display for LatLng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lng)
    }
}

/// Slippy-map zoom level.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Zoom(pub u8);

impl Zoom {
    /// Clamps to `0..=MAX_ZOOM`.
    pub fn clamped(level: u8) -> Self {
        Self(level.min(MAX_ZOOM))
    }

    pub fn level(self) -> u8 {
        self.0
    }
}

impl Default for Zoom {
    fn default() -> Self {
        Self(13)
    }
}

/// Center and zoom of a surface viewport.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapView {
    pub center: LatLng,
    pub zoom: Zoom,
}

impl MapView {
    pub fn new(center: LatLng, zoom: Zoom) -> Self {
        Self { center, zoom }
    }
}
