use foundation::{OverlayHandle, WatchId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    TornDown,
    UnknownOverlay(OverlayHandle),
    NotAMarker(OverlayHandle),
    UnknownWatch(WatchId),
    /// The routing engine rejected the request.
    Routing(String),
    Backend(String),
}

impl std::fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SurfaceError::TornDown => write!(f, "surface has been torn down"),
            SurfaceError::UnknownOverlay(h) => write!(f, "unknown overlay {h}"),
            SurfaceError::NotAMarker(h) => write!(f, "{h} is not a marker"),
            SurfaceError::UnknownWatch(w) => write!(f, "unknown position watch {}", w.0),
            SurfaceError::Routing(msg) => write!(f, "routing failed: {msg}"),
            SurfaceError::Backend(msg) => write!(f, "surface backend error: {msg}"),
        }
    }
}

impl std::error::Error for SurfaceError {}
