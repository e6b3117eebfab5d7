use foundation::{LatLng, OverlayHandle};
use surface::{OverlayDef, RouteDisplay, RouteRequest, Surface, SurfaceError};

/// Fewest waypoints the routing engine can route between.
pub const MIN_WAYPOINTS: usize = 2;

/// The single active route of a session.
///
/// Drawing always supersedes the previous route; there is no history.
#[derive(Debug, Default)]
pub struct RouteOverlay {
    handle: Option<OverlayHandle>,
    waypoints: Vec<LatLng>,
}

impl RouteOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Detaches the current route, then attaches one through `waypoints` if
    /// there are at least [`MIN_WAYPOINTS`].
    ///
    /// Returns the new overlay handle, or `None` when the surface is left
    /// without a route. A failure to detach the old overlay does not stop the
    /// new one from being attached; that error is returned afterwards.
    pub fn draw<S: Surface>(
        &mut self,
        surface: &mut S,
        waypoints: &[LatLng],
    ) -> Result<Option<OverlayHandle>, SurfaceError> {
        let detached = self.clear(surface);
        if let Err(err) = &detached {
            tracing::warn!("detaching previous route failed: {err}");
        }

        if waypoints.len() < MIN_WAYPOINTS {
            tracing::debug!(count = waypoints.len(), "route cleared: too few waypoints");
            detached?;
            return Ok(None);
        }

        let request = RouteRequest {
            waypoints: waypoints.to_vec(),
            display: RouteDisplay::locked(),
        };
        let handle = surface.add_overlay(OverlayDef::Route(request))?;
        self.handle = Some(handle);
        self.waypoints = waypoints.to_vec();
        tracing::debug!(%handle, count = waypoints.len(), "route attached");
        detached?;
        Ok(Some(handle))
    }

    /// Detaches the current route, if any.
    ///
    /// Local state is reset even if the surface fails to remove the overlay.
    pub fn clear<S: Surface>(&mut self, surface: &mut S) -> Result<bool, SurfaceError> {
        self.waypoints.clear();
        let Some(handle) = self.handle.take() else {
            return Ok(false);
        };
        surface.remove_overlay(handle)?;
        Ok(true)
    }

    pub fn handle(&self) -> Option<OverlayHandle> {
        self.handle
    }

    pub fn waypoints(&self) -> &[LatLng] {
        &self.waypoints
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }

    pub fn owns(&self, overlay: OverlayHandle) -> bool {
        self.handle == Some(overlay)
    }
}

#[cfg(test)]
mod tests {
    use super::RouteOverlay;
    use foundation::{LatLng, MapView, Zoom};
    use pretty_assertions::assert_eq;
    use surface::{
        HeadlessBackend, HeadlessSurface, RouteDisplay, SurfaceBackend, SurfaceError,
        SurfaceRequest,
    };

    fn surface() -> HeadlessSurface {
        HeadlessBackend::new()
            .create_surface(&SurfaceRequest {
                container: "map".into(),
                view: MapView::new(LatLng::new(0.0, 0.0), Zoom(13)),
            })
            .unwrap()
    }

    fn w(n: usize) -> Vec<LatLng> {
        (0..n).map(|i| LatLng::new(i as f64, i as f64)).collect()
    }

    #[test]
    fn draw_uses_locked_display_and_keeps_order() {
        let mut s = surface();
        let mut route = RouteOverlay::new();
        let h = route.draw(&mut s, &w(3)).unwrap();
        assert!(h.is_some());

        let routes = s.routes();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].waypoints, w(3));
        assert_eq!(routes[0].display, RouteDisplay::locked());
        assert_eq!(route.waypoints(), w(3).as_slice());
    }

    #[test]
    fn redraw_replaces_previous_route() {
        let mut s = surface();
        let mut route = RouteOverlay::new();
        let first = route.draw(&mut s, &w(2)).unwrap().unwrap();
        let second = route.draw(&mut s, &w(4)).unwrap().unwrap();

        assert!(s.overlay(first).is_none());
        assert_eq!(route.handle(), Some(second));
        assert_eq!(s.routes().len(), 1);
        assert_eq!(s.routes()[0].waypoints.len(), 4);
    }

    #[test]
    fn degenerate_waypoints_remove_existing_route() {
        for n in [0, 1] {
            let mut s = surface();
            let mut route = RouteOverlay::new();
            route.draw(&mut s, &w(3)).unwrap();
            assert_eq!(route.draw(&mut s, &w(n)).unwrap(), None);
            assert!(s.routes().is_empty());
            assert!(!route.is_active());
            assert!(route.waypoints().is_empty());
        }
    }

    #[test]
    fn routing_rejection_leaves_no_route() {
        let mut s = surface();
        let mut route = RouteOverlay::new();
        route.draw(&mut s, &w(2)).unwrap();
        s.reject_routes(Some("no path".into()));

        assert_eq!(
            route.draw(&mut s, &w(2)),
            Err(SurfaceError::Routing("no path".into()))
        );
        assert!(s.routes().is_empty());
        assert!(!route.is_active());
    }

    #[test]
    fn clear_without_route_is_noop() {
        let mut s = surface();
        let mut route = RouteOverlay::new();
        assert_eq!(route.clear(&mut s), Ok(false));
    }

    #[test]
    fn redraw_attaches_even_when_old_overlay_is_gone() {
        let mut s = surface();
        let mut route = RouteOverlay::new();
        let first = route.draw(&mut s, &w(2)).unwrap().unwrap();
        use surface::Surface;
        s.remove_overlay(first).unwrap();

        assert_eq!(
            route.draw(&mut s, &w(3)),
            Err(SurfaceError::UnknownOverlay(first))
        );
        assert!(route.is_active());
        assert_eq!(route.waypoints(), w(3).as_slice());
        let routes = s.routes();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].waypoints, w(3));
    }
}
