use foundation::{LatLng, MapView, MarkerHandle, OverlayHandle, SessionId, WatchId};
use layers::{MarkerGroupRegistry, MarkerSpec, RouteOverlay};
use runtime::EventBus;
use surface::{PositionEvent, Surface, SurfaceBackend, SurfaceEvent, SurfaceRequest};

use crate::config::MapConfig;
use crate::error::SessionError;
use crate::event_kinds;
use crate::location::{PositionCallback, PositionListener, TrackingOptions, UserLocationTracker};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Live,
    Destroyed,
}

/// One map on one surface.
///
/// Lifecycle: `Created -> Live` on [`init`](Self::init), `-> Destroyed` on
/// [`destroy`](Self::destroy). Operations other than `destroy` fail with
/// [`SessionError::NotInitialized`] or [`SessionError::Destroyed`] outside
/// `Live` and leave the session untouched.
pub struct MapSession<B: SurfaceBackend> {
    id: SessionId,
    config: MapConfig,
    backend: B,
    state: SessionState,
    surface: Option<B::Surface>,
    base_layer: Option<OverlayHandle>,
    markers: MarkerGroupRegistry,
    route: RouteOverlay,
    tracker: UserLocationTracker,
    events: EventBus,
}

fn live_surface<S>(state: SessionState, surface: &mut Option<S>) -> Result<&mut S, SessionError> {
    match state {
        SessionState::Created => Err(SessionError::NotInitialized),
        SessionState::Destroyed => Err(SessionError::Destroyed),
        SessionState::Live => surface.as_mut().ok_or(SessionError::NotInitialized),
    }
}

impl<B: SurfaceBackend> MapSession<B> {
    pub fn new(id: impl Into<SessionId>, config: MapConfig, backend: B) -> Self {
        Self {
            id: id.into(),
            config,
            backend,
            state: SessionState::Created,
            surface: None,
            base_layer: None,
            markers: MarkerGroupRegistry::new(),
            route: RouteOverlay::new(),
            tracker: UserLocationTracker::new(),
            events: EventBus::new(),
        }
    }

    /// Creates the surface at the configured view and attaches the base layer.
    pub fn init(&mut self) -> Result<&mut Self, SessionError> {
        match self.state {
            SessionState::Live => return Err(SessionError::AlreadyInitialized),
            SessionState::Destroyed => return Err(SessionError::Destroyed),
            SessionState::Created => {}
        }
        self.config.validate()?;

        let request = SurfaceRequest {
            container: self.id.as_str().to_string(),
            view: self.config.initial_view(),
        };
        let mut surface = self.backend.create_surface(&request)?;
        let base_layer = match surface.add_overlay(self.config.tile_source.overlay()) {
            Ok(handle) => handle,
            Err(err) => {
                surface.teardown();
                return Err(err.into());
            }
        };

        self.surface = Some(surface);
        self.base_layer = Some(base_layer);
        self.state = SessionState::Live;
        self.events.emit(
            event_kinds::INIT,
            format!("{} at {} z{}", self.id, self.config.center, self.config.zoom.level()),
        );
        tracing::debug!(session = %self.id, "map session initialized");
        Ok(self)
    }

    /// Releases markers, the route, the location watch and finally the
    /// surface. Safe to call in any state; later calls do nothing.
    pub fn destroy(&mut self) {
        if self.state == SessionState::Destroyed {
            return;
        }
        self.state = SessionState::Destroyed;

        let Some(mut surface) = self.surface.take() else {
            self.events.emit(event_kinds::DESTROY, self.id.to_string());
            return;
        };

        if let Err(err) = self.markers.clear(&mut surface, None) {
            self.report_teardown_failure("markers", &err);
        }
        if let Err(err) = self.route.clear(&mut surface) {
            self.report_teardown_failure("route", &err);
        }
        if let Err(err) = self.tracker.disable(&mut surface) {
            self.report_teardown_failure("location", &err);
        }
        surface.teardown();

        self.markers.forget_all();
        self.base_layer = None;
        self.events.emit(event_kinds::DESTROY, self.id.to_string());
        tracing::debug!(session = %self.id, "map session destroyed");
    }

    fn report_teardown_failure(&mut self, what: &str, err: &dyn std::fmt::Display) {
        tracing::warn!(session = %self.id, "releasing {what} failed: {err}");
        self.events
            .emit(event_kinds::TEARDOWN_FAILURE, format!("{what}: {err}"));
    }

    pub fn add_marker(&mut self, spec: MarkerSpec) -> Result<MarkerHandle, SessionError> {
        let surface = live_surface(self.state, &mut self.surface)?;
        Ok(self.markers.add(surface, &spec)?)
    }

    /// Clears one group, or all groups with `None`. Returns how many markers
    /// were removed.
    pub fn clear_markers(&mut self, group: Option<&str>) -> Result<usize, SessionError> {
        let surface = live_surface(self.state, &mut self.surface)?;
        Ok(self.markers.clear(surface, group)?)
    }

    pub fn draw_route(
        &mut self,
        waypoints: &[LatLng],
    ) -> Result<Option<OverlayHandle>, SessionError> {
        let surface = live_surface(self.state, &mut self.surface)?;
        Ok(self.route.draw(surface, waypoints)?)
    }

    pub fn enable_user_location(
        &mut self,
        callback: Option<PositionCallback>,
        options: TrackingOptions,
    ) -> Result<WatchId, SessionError> {
        let surface = live_surface(self.state, &mut self.surface)?;
        Ok(self.tracker.enable(surface, callback, options)?)
    }

    /// Returns `false` when location tracking was not enabled.
    pub fn disable_user_location(&mut self) -> Result<bool, SessionError> {
        let surface = live_surface(self.state, &mut self.surface)?;
        Ok(self.tracker.disable(surface)?)
    }

    /// Returns `false` (and leaves the view alone) before the first fix.
    pub fn center_to_user(&mut self) -> Result<bool, SessionError> {
        let surface = live_surface(self.state, &mut self.surface)?;
        Ok(self.tracker.center_to_user(surface)?)
    }

    /// Drains the surface's pending events and dispatches them in delivery
    /// order. A failing reaction is reported and does not stop the rest.
    pub fn pump_events(&mut self) -> Result<usize, SessionError> {
        let surface = live_surface(self.state, &mut self.surface)?;
        let events = surface.poll_events();
        let count = events.len();
        for event in events {
            if let Err(err) = self.dispatch(event) {
                tracing::warn!(session = %self.id, "event reaction failed: {err}");
                self.events
                    .emit(event_kinds::REACTION_FAILURE, err.to_string());
            }
        }
        Ok(count)
    }

    /// Routes one surface notification to the component that owns it.
    ///
    /// Events for a watch or overlay this session no longer owns are dropped.
    pub fn dispatch(&mut self, event: SurfaceEvent) -> Result<(), SessionError> {
        let surface = live_surface(self.state, &mut self.surface)?;
        match event {
            SurfaceEvent::Position { watch, event } => {
                if !self.tracker.accepts(watch) {
                    tracing::debug!(watch = watch.0, "dropping event from stale watch");
                    return Ok(());
                }
                match event {
                    PositionEvent::Fix(fix) => self.tracker.on_position_update(surface, fix)?,
                    PositionEvent::Error(err) => {
                        PositionListener::<B::Surface>::on_position_error(
                            &mut self.tracker,
                            &err,
                            &mut self.events,
                        );
                    }
                }
            }
            SurfaceEvent::RouteFailed { overlay, message } => {
                if !self.route.owns(overlay) {
                    tracing::debug!(%overlay, "dropping failure for superseded route");
                    return Ok(());
                }
                tracing::warn!(
                    session = %self.id,
                    %overlay,
                    "route computation failed: {message}"
                );
                self.events.emit(event_kinds::ROUTE_FAILED, message);
            }
        }
        Ok(())
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_live(&self) -> bool {
        self.state == SessionState::Live
    }

    pub fn surface(&self) -> Option<&B::Surface> {
        self.surface.as_ref()
    }

    pub fn base_layer(&self) -> Option<OverlayHandle> {
        self.base_layer
    }

    pub fn view(&self) -> Option<MapView> {
        self.surface.as_ref().map(|s| s.view())
    }

    pub fn markers(&self) -> &MarkerGroupRegistry {
        &self.markers
    }

    pub fn route(&self) -> &RouteOverlay {
        &self.route
    }

    pub fn tracker(&self) -> &UserLocationTracker {
        &self.tracker
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }
}

impl<B: SurfaceBackend> Drop for MapSession<B> {
    fn drop(&mut self) {
        self.destroy();
    }
}
