use serde::{Deserialize, Serialize};
use surface::{OverlayDef, TileLayerDef};

pub const DEFAULT_TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const DEFAULT_ATTRIBUTION: &str = "&copy; OpenStreetMap contributors";

/// Base raster layer drawn under everything else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileSource {
    #[serde(default = "default_url_template")]
    pub url_template: String,
    #[serde(default = "default_attribution")]
    pub attribution: String,
}

fn default_url_template() -> String {
    DEFAULT_TILE_URL.to_string()
}

fn default_attribution() -> String {
    DEFAULT_ATTRIBUTION.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileSourceError {
    MissingPlaceholder(&'static str),
}

impl std::fmt::Display for TileSourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TileSourceError::MissingPlaceholder(p) => {
                write!(f, "tile url template is missing the {p} placeholder")
            }
        }
    }
}

impl std::error::Error for TileSourceError {}

impl TileSource {
    pub fn new(url_template: impl Into<String>) -> Self {
        Self {
            url_template: url_template.into(),
            attribution: default_attribution(),
        }
    }

    pub fn with_attribution(mut self, attribution: impl Into<String>) -> Self {
        self.attribution = attribution.into();
        self
    }

    /// Every slippy-map template needs `{z}`, `{x}` and `{y}`; `{s}` is optional.
    pub fn validate(&self) -> Result<(), TileSourceError> {
        for p in ["{z}", "{x}", "{y}"] {
            if !self.url_template.contains(p) {
                return Err(TileSourceError::MissingPlaceholder(p));
            }
        }
        Ok(())
    }

    pub fn overlay(&self) -> OverlayDef {
        OverlayDef::TileLayer(TileLayerDef {
            url_template: self.url_template.clone(),
            attribution: self.attribution.clone(),
        })
    }
}

impl Default for TileSource {
    fn default() -> Self {
        Self {
            url_template: default_url_template(),
            attribution: default_attribution(),
        }
    }
}
