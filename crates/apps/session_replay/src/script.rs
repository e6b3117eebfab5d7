//! Replay script format.
//!
//! ```json
//! {
//!   "id": "shuttle-map",
//!   "config": { "zoom": 15 },
//!   "steps": [
//!     { "op": "add_marker", "position": { "lat": 14.6, "lng": 121.0 }, "group": "stops" },
//!     { "op": "enable_location", "center_once": true },
//!     { "op": "position", "coordinate": { "lat": 14.61, "lng": 121.01 }, "accuracy_m": 8.0 },
//!     { "op": "pump" }
//!   ]
//! }
//! ```

use foundation::LatLng;
use layers::MarkerSpec;
use serde::Deserialize;
use session::MapConfig;
use surface::{PositionError, PositionFix};

#[derive(Debug, Clone, Deserialize)]
pub struct Script {
    #[serde(default = "default_id")]
    pub id: String,
    #[serde(default)]
    pub config: MapConfig,
    pub steps: Vec<Step>,
}

fn default_id() -> String {
    "map".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    AddMarker(MarkerSpec),
    ClearMarkers {
        #[serde(default)]
        group: Option<String>,
    },
    DrawRoute {
        waypoints: Vec<LatLng>,
    },
    EnableLocation {
        #[serde(default = "default_true")]
        center_once: bool,
    },
    DisableLocation,
    /// Fix delivered by the device; queued until the next pump.
    Position(PositionFix),
    PositionError(PositionError),
    /// The routing engine gives up on the current route.
    RouteFailed {
        message: String,
    },
    CenterToUser,
    Pump,
    Destroy,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::AddMarker(_) => "add_marker",
            Step::ClearMarkers { .. } => "clear_markers",
            Step::DrawRoute { .. } => "draw_route",
            Step::EnableLocation { .. } => "enable_location",
            Step::DisableLocation => "disable_location",
            Step::Position(_) => "position",
            Step::PositionError(_) => "position_error",
            Step::RouteFailed { .. } => "route_failed",
            Step::CenterToUser => "center_to_user",
            Step::Pump => "pump",
            Step::Destroy => "destroy",
        }
    }
}
