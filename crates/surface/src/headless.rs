use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use foundation::{Handle, LatLng, MapView, MarkerHandle, OverlayHandle, WatchId};

use crate::{
    OverlayDef, PositionError, PositionEvent, PositionFix, RouteRequest, Surface, SurfaceBackend,
    SurfaceError, SurfaceEvent, SurfaceRequest, WatchOptions,
};

#[derive(Debug)]
struct HeadlessState {
    container: String,
    view: MapView,
    /// Generation per slot; freed slots are reused with a bumped generation.
    generations: Vec<u32>,
    free_slots: Vec<u32>,
    overlays: BTreeMap<OverlayHandle, OverlayDef>,
    next_watch: u64,
    watches: BTreeMap<WatchId, WatchOptions>,
    pending: VecDeque<SurfaceEvent>,
    view_history: Vec<MapView>,
    torn_down: bool,
    fail_next_add: Option<SurfaceError>,
    fail_next_watch: Option<SurfaceError>,
    route_rejection: Option<String>,
}

impl HeadlessState {
    fn new(request: &SurfaceRequest) -> Self {
        Self {
            container: request.container.clone(),
            view: request.view,
            generations: Vec::new(),
            free_slots: Vec::new(),
            overlays: BTreeMap::new(),
            next_watch: 1,
            watches: BTreeMap::new(),
            pending: VecDeque::new(),
            view_history: Vec::new(),
            torn_down: false,
            fail_next_add: None,
            fail_next_watch: None,
            route_rejection: None,
        }
    }

    fn alloc_handle(&mut self) -> OverlayHandle {
        if let Some(index) = self.free_slots.pop() {
            let generation = self.generations[index as usize];
            return OverlayHandle(Handle::new(index, generation));
        }
        let index = self.generations.len() as u32;
        self.generations.push(0);
        OverlayHandle(Handle::new(index, 0))
    }

    fn release_handle(&mut self, handle: OverlayHandle) {
        let idx = handle.index() as usize;
        if let Some(g) = self.generations.get_mut(idx) {
            *g += 1;
            self.free_slots.push(handle.index());
        }
    }

    fn ensure_live(&self) -> Result<(), SurfaceError> {
        if self.torn_down {
            Err(SurfaceError::TornDown)
        } else {
            Ok(())
        }
    }

    fn push_position(&mut self, event: PositionEvent) -> usize {
        if self.torn_down {
            return 0;
        }
        let watches: Vec<WatchId> = self.watches.keys().copied().collect();
        for watch in &watches {
            self.pending.push_back(SurfaceEvent::Position {
                watch: *watch,
                event: event.clone(),
            });
        }
        watches.len()
    }
}

/// In-memory surface that records every call.
///
/// Clones share state, so a test can keep a probe while the session owns the
/// surface, then emit synthetic position events and inspect what is attached.
#[derive(Debug, Clone)]
pub struct HeadlessSurface {
    state: Rc<RefCell<HeadlessState>>,
}

impl HeadlessSurface {
    pub fn new(request: &SurfaceRequest) -> Self {
        Self {
            state: Rc::new(RefCell::new(HeadlessState::new(request))),
        }
    }

    pub fn container(&self) -> String {
        self.state.borrow().container.clone()
    }

    pub fn is_torn_down(&self) -> bool {
        self.state.borrow().torn_down
    }

    pub fn overlays(&self) -> Vec<(OverlayHandle, OverlayDef)> {
        self.state
            .borrow()
            .overlays
            .iter()
            .map(|(h, d)| (*h, d.clone()))
            .collect()
    }

    pub fn overlay(&self, handle: OverlayHandle) -> Option<OverlayDef> {
        self.state.borrow().overlays.get(&handle).cloned()
    }

    pub fn overlay_count(&self) -> usize {
        self.state.borrow().overlays.len()
    }

    pub fn count_kind(&self, kind: &str) -> usize {
        self.state
            .borrow()
            .overlays
            .values()
            .filter(|d| d.kind() == kind)
            .count()
    }

    pub fn marker_position(&self, handle: MarkerHandle) -> Option<LatLng> {
        self.state
            .borrow()
            .overlays
            .get(&handle)
            .and_then(|d| d.as_marker().map(|m| m.position))
    }

    pub fn routes(&self) -> Vec<RouteRequest> {
        self.state
            .borrow()
            .overlays
            .values()
            .filter_map(|d| d.as_route().cloned())
            .collect()
    }

    pub fn active_watches(&self) -> Vec<(WatchId, WatchOptions)> {
        self.state
            .borrow()
            .watches
            .iter()
            .map(|(w, o)| (*w, *o))
            .collect()
    }

    pub fn current_view(&self) -> MapView {
        self.state.borrow().view
    }

    /// Every `set_view` call, oldest first.
    pub fn view_history(&self) -> Vec<MapView> {
        self.state.borrow().view_history.clone()
    }

    pub fn pending_events(&self) -> usize {
        self.state.borrow().pending.len()
    }

    /// Queues a fix for every active watch. Returns how many watches got it.
    pub fn emit_fix(&self, fix: PositionFix) -> usize {
        self.state.borrow_mut().push_position(PositionEvent::Fix(fix))
    }

    pub fn emit_position_error(&self, error: PositionError) -> usize {
        self.state
            .borrow_mut()
            .push_position(PositionEvent::Error(error))
    }

    /// Queues a raw event, bypassing watch fan-out.
    pub fn emit(&self, event: SurfaceEvent) {
        self.state.borrow_mut().pending.push_back(event);
    }

    pub fn emit_route_failure(&self, overlay: OverlayHandle, message: impl Into<String>) {
        self.emit(SurfaceEvent::RouteFailed {
            overlay,
            message: message.into(),
        });
    }

    /// The next `add_overlay` fails with `error`.
    pub fn fail_next_add(&self, error: SurfaceError) {
        self.state.borrow_mut().fail_next_add = Some(error);
    }

    /// The next `watch_position` fails with `error`.
    pub fn fail_next_watch(&self, error: SurfaceError) {
        self.state.borrow_mut().fail_next_watch = Some(error);
    }

    /// Route overlays are rejected by the routing engine until cleared.
    pub fn reject_routes(&self, message: Option<String>) {
        self.state.borrow_mut().route_rejection = message;
    }
}

impl Surface for HeadlessSurface {
    fn add_overlay(&mut self, def: OverlayDef) -> Result<OverlayHandle, SurfaceError> {
        let mut s = self.state.borrow_mut();
        s.ensure_live()?;
        if let Some(err) = s.fail_next_add.take() {
            return Err(err);
        }
        if let (OverlayDef::Route(_), Some(msg)) = (&def, s.route_rejection.as_ref()) {
            return Err(SurfaceError::Routing(msg.clone()));
        }
        let handle = s.alloc_handle();
        s.overlays.insert(handle, def);
        Ok(handle)
    }

    fn remove_overlay(&mut self, handle: OverlayHandle) -> Result<(), SurfaceError> {
        let mut s = self.state.borrow_mut();
        s.ensure_live()?;
        if s.overlays.remove(&handle).is_none() {
            return Err(SurfaceError::UnknownOverlay(handle));
        }
        s.release_handle(handle);
        Ok(())
    }

    fn move_marker(&mut self, handle: MarkerHandle, position: LatLng) -> Result<(), SurfaceError> {
        let mut s = self.state.borrow_mut();
        s.ensure_live()?;
        match s.overlays.get_mut(&handle) {
            Some(OverlayDef::Marker(m)) => {
                m.position = position;
                Ok(())
            }
            Some(_) => Err(SurfaceError::NotAMarker(handle)),
            None => Err(SurfaceError::UnknownOverlay(handle)),
        }
    }

    fn watch_position(&mut self, options: WatchOptions) -> Result<WatchId, SurfaceError> {
        let mut s = self.state.borrow_mut();
        s.ensure_live()?;
        if let Some(err) = s.fail_next_watch.take() {
            return Err(err);
        }
        let id = WatchId(s.next_watch);
        s.next_watch += 1;
        s.watches.insert(id, options);
        Ok(id)
    }

    fn clear_watch(&mut self, watch: WatchId) -> Result<(), SurfaceError> {
        let mut s = self.state.borrow_mut();
        s.ensure_live()?;
        if s.watches.remove(&watch).is_none() {
            return Err(SurfaceError::UnknownWatch(watch));
        }
        Ok(())
    }

    fn poll_events(&mut self) -> Vec<SurfaceEvent> {
        self.state.borrow_mut().pending.drain(..).collect()
    }

    fn set_view(&mut self, view: MapView) -> Result<(), SurfaceError> {
        let mut s = self.state.borrow_mut();
        s.ensure_live()?;
        s.view = view;
        s.view_history.push(view);
        Ok(())
    }

    fn view(&self) -> MapView {
        self.state.borrow().view
    }

    fn teardown(self) {
        let mut s = self.state.borrow_mut();
        s.overlays.clear();
        s.watches.clear();
        s.pending.clear();
        s.torn_down = true;
    }
}

/// Hands out [`HeadlessSurface`]s and remembers them for inspection.
#[derive(Debug, Clone, Default)]
pub struct HeadlessBackend {
    created: Rc<RefCell<Vec<HeadlessSurface>>>,
    fail_next_create: Rc<RefCell<Option<SurfaceError>>>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn surfaces(&self) -> Vec<HeadlessSurface> {
        self.created.borrow().clone()
    }

    pub fn last_surface(&self) -> Option<HeadlessSurface> {
        self.created.borrow().last().cloned()
    }

    pub fn fail_next_create(&self, error: SurfaceError) {
        *self.fail_next_create.borrow_mut() = Some(error);
    }
}

impl SurfaceBackend for HeadlessBackend {
    type Surface = HeadlessSurface;

    fn create_surface(
        &mut self,
        request: &SurfaceRequest,
    ) -> Result<HeadlessSurface, SurfaceError> {
        if let Some(err) = self.fail_next_create.borrow_mut().take() {
            return Err(err);
        }
        let surface = HeadlessSurface::new(request);
        self.created.borrow_mut().push(surface.clone());
        Ok(surface)
    }
}
