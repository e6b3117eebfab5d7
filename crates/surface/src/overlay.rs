use foundation::LatLng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerIcon {
    pub url: String,
    #[serde(default)]
    pub size: Option<[u32; 2]>,
    /// Pixel offset of the icon tip from its top-left corner.
    #[serde(default)]
    pub anchor: Option<[i32; 2]>,
}

impl MarkerIcon {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            size: None,
            anchor: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerDef {
    pub position: LatLng,
    pub icon: Option<MarkerIcon>,
    pub popup: Option<String>,
}

/// How a route overlay presents itself and which edits it allows.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RouteDisplay {
    pub route_while_dragging: bool,
    pub draggable_waypoints: bool,
    pub add_waypoints: bool,
    /// Itinerary/summary panel.
    pub show_summary: bool,
}

impl RouteDisplay {
    /// Read-only route: no dragging, no waypoint edits, no summary panel.
    pub const fn locked() -> Self {
        Self {
            route_while_dragging: false,
            draggable_waypoints: false,
            add_waypoints: false,
            show_summary: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteRequest {
    pub waypoints: Vec<LatLng>,
    pub display: RouteDisplay,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TileLayerDef {
    pub url_template: String,
    pub attribution: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OverlayDef {
    TileLayer(TileLayerDef),
    Marker(MarkerDef),
    Route(RouteRequest),
}

impl OverlayDef {
    pub fn kind(&self) -> &'static str {
        match self {
            OverlayDef::TileLayer(_) => "tile_layer",
            OverlayDef::Marker(_) => "marker",
            OverlayDef::Route(_) => "route",
        }
    }

    pub fn as_marker(&self) -> Option<&MarkerDef> {
        match self {
            OverlayDef::Marker(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_route(&self) -> Option<&RouteRequest> {
        match self {
            OverlayDef::Route(r) => Some(r),
            _ => None,
        }
    }
}
