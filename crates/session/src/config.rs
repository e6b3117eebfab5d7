use foundation::{GeoError, LatLng, MAX_ZOOM, MapView, Zoom};
use layers::{TileSource, TileSourceError};
use serde::{Deserialize, Serialize};

/// Manila.
pub const DEFAULT_CENTER: LatLng = LatLng::new(14.5995, 120.9842);

/// Construction-time settings of a session. Missing fields take their
/// documented defaults; nothing mutates it after the session is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    #[serde(default = "default_center")]
    pub center: LatLng,
    #[serde(default)]
    pub zoom: Zoom,
    #[serde(default)]
    pub tile_source: TileSource,
}

fn default_center() -> LatLng {
    DEFAULT_CENTER
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center: DEFAULT_CENTER,
            zoom: Zoom::default(),
            tile_source: TileSource::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Center(GeoError),
    ZoomOutOfRange(u8),
    TileSource(TileSourceError),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Center(e) => write!(f, "invalid center: {e}"),
            ConfigError::ZoomOutOfRange(z) => {
                write!(f, "zoom {z} out of range (max {MAX_ZOOM})")
            }
            ConfigError::TileSource(e) => write!(f, "invalid tile source: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl MapConfig {
    pub fn builder() -> MapConfigBuilder {
        MapConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.center.validate().map_err(ConfigError::Center)?;
        if self.zoom.level() > MAX_ZOOM {
            return Err(ConfigError::ZoomOutOfRange(self.zoom.level()));
        }
        self.tile_source.validate().map_err(ConfigError::TileSource)?;
        Ok(())
    }

    pub fn validated(self) -> Result<Self, ConfigError> {
        self.validate()?;
        Ok(self)
    }

    pub fn initial_view(&self) -> MapView {
        MapView::new(self.center, self.zoom)
    }
}

/// Field-by-field overrides on top of the defaults.
#[derive(Debug, Default, Clone)]
pub struct MapConfigBuilder {
    center: Option<LatLng>,
    zoom: Option<Zoom>,
    tile_source: Option<TileSource>,
}

impl MapConfigBuilder {
    pub fn center(mut self, center: LatLng) -> Self {
        self.center = Some(center);
        self
    }

    pub fn zoom(mut self, zoom: u8) -> Self {
        self.zoom = Some(Zoom(zoom));
        self
    }

    pub fn tile_source(mut self, tile_source: TileSource) -> Self {
        self.tile_source = Some(tile_source);
        self
    }

    pub fn build(self) -> Result<MapConfig, ConfigError> {
        MapConfig {
            center: self.center.unwrap_or(DEFAULT_CENTER),
            zoom: self.zoom.unwrap_or_default(),
            tile_source: self.tile_source.unwrap_or_default(),
        }
        .validated()
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, DEFAULT_CENTER, MapConfig};
    use foundation::{GeoError, LatLng, Zoom};
    use layers::{DEFAULT_TILE_URL, TileSource, TileSourceError};
    use pretty_assertions::assert_eq;

    #[test]
    fn builder_defaults_every_field() {
        let cfg = MapConfig::builder().build().unwrap();
        assert_eq!(cfg, MapConfig::default());
        assert_eq!(cfg.center, DEFAULT_CENTER);
        assert_eq!(cfg.zoom, Zoom(13));
        assert_eq!(cfg.tile_source.url_template, DEFAULT_TILE_URL);
    }

    #[test]
    fn builder_overrides_only_given_fields() {
        let cfg = MapConfig::builder().zoom(16).build().unwrap();
        assert_eq!(cfg.zoom, Zoom(16));
        assert_eq!(cfg.center, DEFAULT_CENTER);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert_eq!(
            MapConfig::builder().zoom(30).build(),
            Err(ConfigError::ZoomOutOfRange(30))
        );
        assert_eq!(
            MapConfig::builder()
                .center(LatLng::new(120.0, 0.0))
                .build(),
            Err(ConfigError::Center(GeoError::LatitudeOutOfRange(120.0)))
        );
        assert_eq!(
            MapConfig::builder()
                .tile_source(TileSource::new("https://t/{x}/{y}.png"))
                .build(),
            Err(ConfigError::TileSource(TileSourceError::MissingPlaceholder(
                "{z}"
            )))
        );
    }

    #[test]
    fn partial_json_uses_defaults() {
        let cfg: MapConfig = serde_json::from_str(r#"{"zoom": 9}"#).unwrap();
        assert_eq!(cfg.zoom, Zoom(9));
        assert_eq!(cfg.center, DEFAULT_CENTER);
        assert_eq!(cfg.tile_source, TileSource::default());
    }
}
