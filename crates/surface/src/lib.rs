//! Contract between a map session and the renderer that draws it.
//!
//! The renderer is an opaque collaborator: it owns tiles, projection and
//! painting. Sessions only see handles, a view, and an ordered event queue.

pub mod error;
pub mod event;
pub mod headless;
pub mod overlay;

pub use error::*;
pub use event::*;
pub use headless::*;
pub use overlay::*;

use foundation::{LatLng, MapView, MarkerHandle, OverlayHandle, WatchId, Zoom};

/// Everything needed to bring a surface up.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceRequest {
    /// Host container the surface renders into (a DOM id, a window name, ...).
    pub container: String,
    pub view: MapView,
}

pub trait Surface {
    fn add_overlay(&mut self, def: OverlayDef) -> Result<OverlayHandle, SurfaceError>;
    fn remove_overlay(&mut self, handle: OverlayHandle) -> Result<(), SurfaceError>;
    fn move_marker(&mut self, handle: MarkerHandle, position: LatLng) -> Result<(), SurfaceError>;

    /// Starts a position watch. Results arrive through [`Surface::poll_events`].
    fn watch_position(&mut self, options: WatchOptions) -> Result<WatchId, SurfaceError>;
    fn clear_watch(&mut self, watch: WatchId) -> Result<(), SurfaceError>;

    /// Pending notifications in delivery order.
    fn poll_events(&mut self) -> Vec<SurfaceEvent>;

    fn set_view(&mut self, view: MapView) -> Result<(), SurfaceError>;
    fn view(&self) -> MapView;

    fn zoom(&self) -> Zoom {
        self.view().zoom
    }

    /// Releases the surface and everything still attached to it.
    fn teardown(self)
    where
        Self: Sized;
}

/// Creates surfaces. Sessions receive one explicitly instead of reaching for a
/// process-wide default map.
pub trait SurfaceBackend {
    type Surface: Surface;

    fn create_surface(&mut self, request: &SurfaceRequest) -> Result<Self::Surface, SurfaceError>;
}
