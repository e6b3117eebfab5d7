use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;

use foundation::{LatLng, MapView, MarkerHandle};
use serde::Serialize;
use session::{
    MapConfig, MapSession, PositionCallback, SessionError, SessionState, TrackingOptions,
};
use surface::{HeadlessBackend, HeadlessSurface, PositionFix};
use tracing::{debug, info};

use crate::script::{Script, Step};

#[derive(Debug, Clone, Default)]
pub struct ReplayOptions {
    /// Pump surface events right after every `position`/`position_error` step.
    pub auto_pump: bool,
    /// Overrides `center_once` on every `enable_location` step.
    pub center_once: Option<bool>,
}

#[derive(Debug)]
pub struct StepError {
    pub index: usize,
    pub op: &'static str,
    pub source: SessionError,
}

impl std::fmt::Display for StepError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "step {} ({}): {}", self.index, self.op, self.source)
    }
}

impl std::error::Error for StepError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    pub seq: u64,
    pub kind: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub session: String,
    pub state: &'static str,
    pub view: Option<MapView>,
    pub groups: BTreeMap<String, usize>,
    pub route: Vec<LatLng>,
    pub tracking: bool,
    pub last_position: Option<PositionFix>,
    pub callback_invocations: u64,
    pub overlays_on_surface: usize,
    pub events: Vec<EventRecord>,
}

/// Runs `script` against a fresh headless surface.
pub fn run(
    script: &Script,
    config: MapConfig,
    options: &ReplayOptions,
) -> Result<Summary, StepError> {
    let backend = HeadlessBackend::new();
    let mut session = MapSession::new(script.id.as_str(), config, backend.clone());
    session.init().map_err(|source| StepError {
        index: 0,
        op: "init",
        source,
    })?;
    let Some(probe) = backend.last_surface() else {
        return Err(StepError {
            index: 0,
            op: "init",
            source: SessionError::NotInitialized,
        });
    };
    let callbacks = Rc::new(Cell::new(0u64));

    for (i, step) in script.steps.iter().enumerate() {
        let index = i + 1;
        debug!(index, op = step.name(), "replaying step");
        apply(&mut session, &probe, step, &callbacks, options).map_err(|source| StepError {
            index,
            op: step.name(),
            source,
        })?;
    }

    Ok(summarize(&session, &probe, callbacks.get()))
}

fn apply(
    session: &mut MapSession<HeadlessBackend>,
    probe: &HeadlessSurface,
    step: &Step,
    callbacks: &Rc<Cell<u64>>,
    options: &ReplayOptions,
) -> Result<(), SessionError> {
    match step {
        Step::AddMarker(spec) => {
            let handle = session.add_marker(spec.clone())?;
            debug!(%handle, group = %spec.group, "marker added");
        }
        Step::ClearMarkers { group } => {
            let removed = session.clear_markers(group.as_deref())?;
            debug!(removed, "markers cleared");
        }
        Step::DrawRoute { waypoints } => {
            session.draw_route(waypoints)?;
        }
        Step::EnableLocation { center_once } => {
            let counter = callbacks.clone();
            let callback: PositionCallback =
                Box::new(move |fix: &PositionFix, marker: MarkerHandle| {
                    counter.set(counter.get() + 1);
                    info!(
                        %marker,
                        position = %fix.coordinate,
                        accuracy_m = fix.accuracy_m,
                        "user position"
                    );
                });
            session.enable_user_location(
                Some(callback),
                TrackingOptions::center_once(options.center_once.unwrap_or(*center_once)),
            )?;
        }
        Step::DisableLocation => {
            session.disable_user_location()?;
        }
        Step::Position(fix) => {
            probe.emit_fix(*fix);
            if options.auto_pump {
                session.pump_events()?;
            }
        }
        Step::PositionError(err) => {
            probe.emit_position_error(err.clone());
            if options.auto_pump {
                session.pump_events()?;
            }
        }
        Step::RouteFailed { message } => {
            if let Some(overlay) = session.route().handle() {
                probe.emit_route_failure(overlay, message.clone());
            }
        }
        Step::CenterToUser => {
            session.center_to_user()?;
        }
        Step::Pump => {
            let n = session.pump_events()?;
            debug!(events = n, "pumped");
        }
        Step::Destroy => session.destroy(),
    }
    Ok(())
}

fn summarize(
    session: &MapSession<HeadlessBackend>,
    probe: &HeadlessSurface,
    callback_invocations: u64,
) -> Summary {
    let state = match session.state() {
        SessionState::Created => "created",
        SessionState::Live => "live",
        SessionState::Destroyed => "destroyed",
    };
    let groups = session
        .markers()
        .group_names()
        .map(|g| (g.to_string(), session.markers().group_len(g)))
        .collect();

    Summary {
        session: session.id().to_string(),
        state,
        view: session.view(),
        groups,
        route: session.route().waypoints().to_vec(),
        tracking: session.tracker().watch().is_some(),
        last_position: session.tracker().last_known_position(),
        callback_invocations,
        overlays_on_surface: probe.overlay_count(),
        events: session
            .events()
            .events()
            .iter()
            .map(|e| EventRecord {
                seq: e.seq,
                kind: e.kind,
                message: e.message.clone(),
            })
            .collect(),
    }
}
