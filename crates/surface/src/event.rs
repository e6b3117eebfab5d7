use foundation::{LatLng, OverlayHandle, WatchId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct WatchOptions {
    pub enable_high_accuracy: bool,
    /// Keep delivering fixes until the watch is cleared.
    pub continuous: bool,
}

impl WatchOptions {
    pub const fn tracking() -> Self {
        Self {
            enable_high_accuracy: true,
            continuous: true,
        }
    }
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self::tracking()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    pub coordinate: LatLng,
    /// Radius of the 95% confidence circle, meters.
    pub accuracy_m: f64,
    #[serde(default)]
    pub timestamp_ms: u64,
}

impl PositionFix {
    pub fn new(coordinate: LatLng, accuracy_m: f64) -> Self {
        Self {
            coordinate,
            accuracy_m,
            timestamp_ms: 0,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionErrorCode {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionError {
    pub code: PositionErrorCode,
    pub message: String,
}

impl PositionError {
    pub fn new(code: PositionErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for PositionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = match self.code {
            PositionErrorCode::PermissionDenied => "permission denied",
            PositionErrorCode::PositionUnavailable => "position unavailable",
            PositionErrorCode::Timeout => "timeout",
        };
        write!(f, "{code}: {}", self.message)
    }
}

impl std::error::Error for PositionError {}

#[derive(Debug, Clone, PartialEq)]
pub enum PositionEvent {
    Fix(PositionFix),
    Error(PositionError),
}

/// Notification delivered by a surface to its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    Position { watch: WatchId, event: PositionEvent },
    /// Route computation for an attached overlay failed after attach.
    RouteFailed { overlay: OverlayHandle, message: String },
}
