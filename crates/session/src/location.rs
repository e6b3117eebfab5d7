use foundation::{MapView, MarkerHandle, WatchId};
use runtime::EventBus;
use surface::{
    MarkerDef, MarkerIcon, OverlayDef, PositionError, PositionFix, Surface, SurfaceError,
    WatchOptions,
};

use crate::event_kinds;

/// Invoked after every successful fix with the fix and the user marker.
pub type PositionCallback = Box<dyn FnMut(&PositionFix, MarkerHandle)>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingOptions {
    /// Recenter the view on the first fix of each tracking session.
    pub center_once: bool,
    pub marker_icon: Option<MarkerIcon>,
}

impl Default for TrackingOptions {
    fn default() -> Self {
        Self {
            center_once: true,
            marker_icon: None,
        }
    }
}

impl TrackingOptions {
    pub fn center_once(center_once: bool) -> Self {
        Self {
            center_once,
            ..Self::default()
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TrackerState {
    Idle,
    Tracking,
}

/// Reactions to a position stream.
pub trait PositionListener<S: Surface> {
    fn on_position_update(&mut self, surface: &mut S, fix: PositionFix)
    -> Result<(), SurfaceError>;
    fn on_position_error(&mut self, error: &PositionError, log: &mut EventBus);
}

/// Follows the user's position with a single marker.
///
/// State machine: `Idle -> Tracking` on [`enable`](Self::enable), back to
/// `Idle` on [`disable`](Self::disable). While tracking, the marker is created
/// on the first fix and only moved afterwards.
#[derive(Default)]
pub struct UserLocationTracker {
    watch: Option<WatchId>,
    options: TrackingOptions,
    last_known: Option<PositionFix>,
    user_marker: Option<MarkerHandle>,
    has_centered_once: bool,
    callback: Option<PositionCallback>,
}

impl std::fmt::Debug for UserLocationTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserLocationTracker")
            .field("watch", &self.watch)
            .field("options", &self.options)
            .field("last_known", &self.last_known)
            .field("user_marker", &self.user_marker)
            .field("has_centered_once", &self.has_centered_once)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

impl UserLocationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts (or restarts) a tracking session.
    ///
    /// Restarting clears the previous watch, replaces callback and options and
    /// rearms the one-time centering. The user marker and last fix survive.
    /// A previous watch the surface no longer knows is logged and dropped.
    /// If the new watch cannot be started the tracker is left idle.
    pub fn enable<S: Surface>(
        &mut self,
        surface: &mut S,
        callback: Option<PositionCallback>,
        options: TrackingOptions,
    ) -> Result<WatchId, SurfaceError> {
        if let Some(old) = self.watch.take() {
            if let Err(err) = surface.clear_watch(old) {
                tracing::warn!(watch = old.0, "clearing previous watch failed: {err}");
            }
        }
        let watch = surface.watch_position(WatchOptions::tracking())?;
        self.watch = Some(watch);
        self.options = options;
        self.callback = callback;
        self.has_centered_once = false;
        tracing::debug!(
            watch = watch.0,
            center_once = self.options.center_once,
            "tracking enabled"
        );
        Ok(watch)
    }

    /// Stops the watch and drops the user marker and last fix.
    ///
    /// Marker and fix are released even without an active watch. Returns
    /// whether a watch was active. Local state is reset even if the surface
    /// reports an error; the first error is returned.
    pub fn disable<S: Surface>(&mut self, surface: &mut S) -> Result<bool, SurfaceError> {
        let watch = self.watch.take();
        let cleared = match watch {
            Some(watch) => surface.clear_watch(watch),
            None => Ok(()),
        };
        let removed = match self.user_marker.take() {
            Some(marker) => surface.remove_overlay(marker),
            None => Ok(()),
        };
        self.last_known = None;
        self.callback = None;
        self.has_centered_once = false;
        if let Some(watch) = watch {
            tracing::debug!(watch = watch.0, "tracking disabled");
        }
        cleared.and(removed).map(|()| watch.is_some())
    }

    /// Recenters on the last fix at the current zoom. No-op without a fix.
    pub fn center_to_user<S: Surface>(&self, surface: &mut S) -> Result<bool, SurfaceError> {
        let Some(fix) = self.last_known else {
            return Ok(false);
        };
        let zoom = surface.zoom();
        surface.set_view(MapView::new(fix.coordinate, zoom))?;
        Ok(true)
    }

    /// Whether an event from `watch` belongs to the current tracking session.
    pub fn accepts(&self, watch: WatchId) -> bool {
        self.watch == Some(watch)
    }

    pub fn state(&self) -> TrackerState {
        if self.watch.is_some() {
            TrackerState::Tracking
        } else {
            TrackerState::Idle
        }
    }

    pub fn watch(&self) -> Option<WatchId> {
        self.watch
    }

    pub fn last_known_position(&self) -> Option<PositionFix> {
        self.last_known
    }

    pub fn user_marker(&self) -> Option<MarkerHandle> {
        self.user_marker
    }

    pub fn has_centered_once(&self) -> bool {
        self.has_centered_once
    }

    pub fn options(&self) -> &TrackingOptions {
        &self.options
    }
}

impl<S: Surface> PositionListener<S> for UserLocationTracker {
    fn on_position_update(
        &mut self,
        surface: &mut S,
        fix: PositionFix,
    ) -> Result<(), SurfaceError> {
        self.last_known = Some(fix);

        let marker = match self.user_marker {
            Some(marker) => {
                surface.move_marker(marker, fix.coordinate)?;
                marker
            }
            None => {
                let marker = surface.add_overlay(OverlayDef::Marker(MarkerDef {
                    position: fix.coordinate,
                    icon: self.options.marker_icon.clone(),
                    popup: None,
                }))?;
                self.user_marker = Some(marker);
                marker
            }
        };

        if self.options.center_once && !self.has_centered_once {
            let zoom = surface.zoom();
            surface.set_view(MapView::new(fix.coordinate, zoom))?;
            self.has_centered_once = true;
            tracing::debug!(position = %fix.coordinate, "centered on first fix");
        }

        if let Some(cb) = self.callback.as_mut() {
            cb(&fix, marker);
        }
        Ok(())
    }

    fn on_position_error(&mut self, error: &PositionError, log: &mut EventBus) {
        tracing::warn!("location error: {error}");
        log.emit(event_kinds::LOCATION_ERROR, error.to_string());
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::{PositionListener, TrackerState, TrackingOptions, UserLocationTracker};
    use crate::event_kinds;
    use foundation::{LatLng, MapView, MarkerHandle, Zoom};
    use pretty_assertions::assert_eq;
    use runtime::EventBus;
    use surface::{
        HeadlessBackend, HeadlessSurface, PositionError, PositionErrorCode, PositionFix,
        SurfaceBackend, SurfaceError, SurfaceRequest, WatchOptions,
    };

    fn surface() -> HeadlessSurface {
        HeadlessBackend::new()
            .create_surface(&SurfaceRequest {
                container: "map".into(),
                view: MapView::new(LatLng::new(0.0, 0.0), Zoom(15)),
            })
            .unwrap()
    }

    fn fix(lat: f64, lng: f64) -> PositionFix {
        PositionFix::new(LatLng::new(lat, lng), 10.0)
    }

    #[test]
    fn enable_starts_high_accuracy_watch() {
        let mut s = surface();
        let mut t = UserLocationTracker::new();
        assert_eq!(t.state(), TrackerState::Idle);
        let w = t.enable(&mut s, None, TrackingOptions::default()).unwrap();
        assert_eq!(t.state(), TrackerState::Tracking);
        assert_eq!(s.active_watches(), vec![(w, WatchOptions::tracking())]);
        assert!(t.accepts(w));
    }

    #[test]
    fn first_fix_creates_marker_and_centers_once() {
        let mut s = surface();
        let mut t = UserLocationTracker::new();
        t.enable(&mut s, None, TrackingOptions::default()).unwrap();

        t.on_position_update(&mut s, fix(1.0, 1.0)).unwrap();
        let marker = t.user_marker().unwrap();
        t.on_position_update(&mut s, fix(2.0, 2.0)).unwrap();
        t.on_position_update(&mut s, fix(3.0, 3.0)).unwrap();

        assert_eq!(t.user_marker(), Some(marker));
        assert_eq!(s.count_kind("marker"), 1);
        assert_eq!(s.marker_position(marker), Some(LatLng::new(3.0, 3.0)));
        assert_eq!(
            s.view_history(),
            vec![MapView::new(LatLng::new(1.0, 1.0), Zoom(15))]
        );
        assert!(t.has_centered_once());
    }

    #[test]
    fn centering_keeps_current_zoom() {
        let mut s = surface();
        let mut t = UserLocationTracker::new();
        t.enable(&mut s, None, TrackingOptions::default()).unwrap();
        use surface::Surface;
        s.set_view(MapView::new(LatLng::new(0.0, 0.0), Zoom(8)))
            .unwrap();
        t.on_position_update(&mut s, fix(5.0, 5.0)).unwrap();
        assert_eq!(s.current_view(), MapView::new(LatLng::new(5.0, 5.0), Zoom(8)));
    }

    #[test]
    fn center_once_false_never_recenters_but_moves_marker() {
        let mut s = surface();
        let mut t = UserLocationTracker::new();
        t.enable(&mut s, None, TrackingOptions::center_once(false))
            .unwrap();
        for i in 0..5 {
            t.on_position_update(&mut s, fix(i as f64, 0.0)).unwrap();
        }
        assert!(s.view_history().is_empty());
        let marker = t.user_marker().unwrap();
        assert_eq!(s.marker_position(marker), Some(LatLng::new(4.0, 0.0)));
    }

    #[test]
    fn callback_sees_every_fix_with_marker() {
        let seen: Rc<RefCell<Vec<(LatLng, MarkerHandle)>>> = Rc::default();
        let sink = seen.clone();
        let mut s = surface();
        let mut t = UserLocationTracker::new();
        t.enable(
            &mut s,
            Some(Box::new(move |f: &PositionFix, m: MarkerHandle| {
                sink.borrow_mut().push((f.coordinate, m))
            })),
            TrackingOptions::default(),
        )
        .unwrap();

        t.on_position_update(&mut s, fix(1.0, 1.0)).unwrap();
        t.on_position_update(&mut s, fix(2.0, 2.0)).unwrap();

        let marker = t.user_marker().unwrap();
        assert_eq!(
            *seen.borrow(),
            vec![
                (LatLng::new(1.0, 1.0), marker),
                (LatLng::new(2.0, 2.0), marker)
            ]
        );
    }

    #[test]
    fn error_is_logged_without_touching_state() {
        let mut s = surface();
        let mut t = UserLocationTracker::new();
        let mut log = EventBus::new();
        t.enable(&mut s, None, TrackingOptions::default()).unwrap();
        t.on_position_update(&mut s, fix(1.0, 1.0)).unwrap();
        let marker = t.user_marker();

        let err = PositionError::new(PositionErrorCode::PermissionDenied, "denied");
        PositionListener::<HeadlessSurface>::on_position_error(&mut t, &err, &mut log);

        assert_eq!(t.last_known_position(), Some(fix(1.0, 1.0)));
        assert_eq!(t.user_marker(), marker);
        assert_eq!(t.state(), TrackerState::Tracking);
        assert_eq!(log.count(event_kinds::LOCATION_ERROR), 1);
        assert_eq!(log.events()[0].message, "permission denied: denied");
    }

    #[test]
    fn center_to_user_without_fix_is_noop() {
        let mut s = surface();
        let t = UserLocationTracker::new();
        assert_eq!(t.center_to_user(&mut s), Ok(false));
        assert!(s.view_history().is_empty());
    }

    #[test]
    fn center_to_user_ignores_center_once_flag() {
        let mut s = surface();
        let mut t = UserLocationTracker::new();
        t.enable(&mut s, None, TrackingOptions::center_once(false))
            .unwrap();
        t.on_position_update(&mut s, fix(7.0, 7.0)).unwrap();
        assert_eq!(t.center_to_user(&mut s), Ok(true));
        assert_eq!(t.center_to_user(&mut s), Ok(true));
        assert_eq!(s.view_history().len(), 2);
    }

    #[test]
    fn reenable_rearms_centering_and_keeps_marker() {
        let mut s = surface();
        let mut t = UserLocationTracker::new();
        let w1 = t.enable(&mut s, None, TrackingOptions::default()).unwrap();
        t.on_position_update(&mut s, fix(1.0, 1.0)).unwrap();
        let marker = t.user_marker();

        let w2 = t.enable(&mut s, None, TrackingOptions::default()).unwrap();
        assert_ne!(w1, w2);
        assert!(!t.accepts(w1));
        assert_eq!(s.active_watches().len(), 1);
        assert!(!t.has_centered_once());

        t.on_position_update(&mut s, fix(2.0, 2.0)).unwrap();
        assert_eq!(t.user_marker(), marker);
        assert_eq!(s.view_history().len(), 2);
    }

    #[test]
    fn disable_releases_watch_and_marker() {
        let mut s = surface();
        let mut t = UserLocationTracker::new();
        t.enable(&mut s, None, TrackingOptions::default()).unwrap();
        t.on_position_update(&mut s, fix(1.0, 1.0)).unwrap();

        assert_eq!(t.disable(&mut s), Ok(true));
        assert_eq!(t.state(), TrackerState::Idle);
        assert_eq!(t.last_known_position(), None);
        assert_eq!(t.user_marker(), None);
        assert!(s.active_watches().is_empty());
        assert_eq!(s.count_kind("marker"), 0);
        assert_eq!(t.disable(&mut s), Ok(false));
    }

    #[test]
    fn reenable_after_watch_vanished_starts_fresh_watch() {
        let mut s = surface();
        let mut t = UserLocationTracker::new();
        let w1 = t.enable(&mut s, None, TrackingOptions::default()).unwrap();
        use surface::Surface;
        s.clear_watch(w1).unwrap();

        let w2 = t.enable(&mut s, None, TrackingOptions::default()).unwrap();
        assert_eq!(t.watch(), Some(w2));
        assert_eq!(s.active_watches().len(), 1);
    }

    #[test]
    fn failed_reenable_leaves_idle_tracker_that_disable_still_releases() {
        let mut s = surface();
        let mut t = UserLocationTracker::new();
        t.enable(&mut s, None, TrackingOptions::default()).unwrap();
        t.on_position_update(&mut s, fix(1.0, 1.0)).unwrap();

        s.fail_next_watch(SurfaceError::Backend("denied".into()));
        assert!(t.enable(&mut s, None, TrackingOptions::default()).is_err());
        assert_eq!(t.state(), TrackerState::Idle);
        assert!(s.active_watches().is_empty());

        assert_eq!(t.disable(&mut s), Ok(false));
        assert_eq!(t.last_known_position(), None);
        assert_eq!(t.user_marker(), None);
        assert_eq!(s.count_kind("marker"), 0);
    }
}
