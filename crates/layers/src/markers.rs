use std::collections::BTreeMap;

use foundation::{LatLng, MarkerHandle};
use serde::{Deserialize, Serialize};
use surface::{MarkerDef, MarkerIcon, OverlayDef, Surface, SurfaceError};

pub const DEFAULT_GROUP: &str = "default";

/// Request for one marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerSpec {
    pub position: LatLng,
    #[serde(default)]
    pub icon: Option<MarkerIcon>,
    #[serde(default)]
    pub popup: Option<String>,
    #[serde(default = "default_group")]
    pub group: String,
}

fn default_group() -> String {
    DEFAULT_GROUP.to_string()
}

impl MarkerSpec {
    pub fn at(position: LatLng) -> Self {
        Self {
            position,
            icon: None,
            popup: None,
            group: default_group(),
        }
    }

    pub fn icon(mut self, icon: MarkerIcon) -> Self {
        self.icon = Some(icon);
        self
    }

    pub fn popup(mut self, text: impl Into<String>) -> Self {
        self.popup = Some(text.into());
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = group.into();
        self
    }

    fn to_overlay(&self) -> OverlayDef {
        OverlayDef::Marker(MarkerDef {
            position: self.position,
            icon: self.icon.clone(),
            // An empty popup binds nothing.
            popup: self.popup.clone().filter(|p| !p.is_empty()),
        })
    }
}

/// Named marker collections sharing one surface.
///
/// Each handle lives in exactly one group. Group keys are kept in a `BTreeMap`
/// so iteration (and therefore removal order on a global clear) is stable.
/// A cleared group keeps its key with an empty list.
#[derive(Debug, Default)]
pub struct MarkerGroupRegistry {
    groups: BTreeMap<String, Vec<MarkerHandle>>,
}

impl MarkerGroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the marker on `surface` and files it under `spec.group`.
    pub fn add<S: Surface>(
        &mut self,
        surface: &mut S,
        spec: &MarkerSpec,
    ) -> Result<MarkerHandle, SurfaceError> {
        let handle = surface.add_overlay(spec.to_overlay())?;
        self.groups
            .entry(spec.group.clone())
            .or_default()
            .push(handle);
        tracing::trace!(group = %spec.group, %handle, "marker added");
        Ok(handle)
    }

    /// Removes the markers of `group`, or of every group when `None`.
    ///
    /// Unknown groups are empty, so clearing one is a no-op. Handles are
    /// dropped from the registry even when the surface refuses to remove them;
    /// the first such failure is returned after the sweep completes.
    pub fn clear<S: Surface>(
        &mut self,
        surface: &mut S,
        group: Option<&str>,
    ) -> Result<usize, SurfaceError> {
        let mut removed = 0;
        let mut first_err = None;

        let keys: Vec<String> = match group {
            Some(g) if self.groups.contains_key(g) => vec![g.to_string()],
            Some(_) => return Ok(0),
            None => self.groups.keys().cloned().collect(),
        };

        for key in keys {
            let Some(handles) = self.groups.get_mut(&key) else {
                continue;
            };
            for handle in handles.drain(..) {
                match surface.remove_overlay(handle) {
                    Ok(()) => removed += 1,
                    Err(err) => {
                        tracing::warn!(group = %key, %handle, "marker removal failed: {err}");
                        first_err.get_or_insert(err);
                    }
                }
            }
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(removed),
        }
    }

    /// Forgets every handle without touching a surface.
    ///
    /// Only valid when the surface is about to be torn down anyway.
    pub fn forget_all(&mut self) {
        self.groups.clear();
    }

    pub fn markers(&self, group: &str) -> &[MarkerHandle] {
        self.groups.get(group).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn group_len(&self, group: &str) -> usize {
        self.markers(group).len()
    }

    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn total_markers(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn group_of(&self, handle: MarkerHandle) -> Option<&str> {
        self.groups
            .iter()
            .find(|(_, hs)| hs.contains(&handle))
            .map(|(k, _)| k.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::{MarkerGroupRegistry, MarkerSpec};
    use foundation::{LatLng, MapView, Zoom};
    use pretty_assertions::assert_eq;
    use surface::{
        HeadlessBackend, HeadlessSurface, MarkerIcon, SurfaceBackend, SurfaceError,
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

    fn p(lat: f64, lng: f64) -> LatLng {
        LatLng::new(lat, lng)
    }

    #[test]
    fn groups_are_created_lazily_and_keep_order() {
        let mut s = surface();
        let mut reg = MarkerGroupRegistry::new();
        let a = reg.add(&mut s, &MarkerSpec::at(p(1.0, 1.0))).unwrap();
        let b = reg
            .add(&mut s, &MarkerSpec::at(p(2.0, 2.0)).group("stops"))
            .unwrap();
        let c = reg.add(&mut s, &MarkerSpec::at(p(1.0, 1.0))).unwrap();

        assert_eq!(reg.markers("default"), &[a, c]);
        assert_eq!(reg.markers("stops"), &[b]);
        assert_eq!(reg.group_names().collect::<Vec<_>>(), vec!["default", "stops"]);
        assert_eq!(reg.group_of(b), Some("stops"));
        assert_eq!(s.count_kind("marker"), 3);
    }

    #[test]
    fn icon_and_popup_are_forwarded_and_empty_popup_is_dropped() {
        let mut s = surface();
        let mut reg = MarkerGroupRegistry::new();
        let with = reg
            .add(
                &mut s,
                &MarkerSpec::at(p(1.0, 1.0))
                    .icon(MarkerIcon::new("bus.png"))
                    .popup("Stop 4"),
            )
            .unwrap();
        let empty = reg.add(&mut s, &MarkerSpec::at(p(1.0, 1.0)).popup("")).unwrap();

        let def = s.overlay(with).unwrap();
        let m = def.as_marker().unwrap();
        assert_eq!(m.popup.as_deref(), Some("Stop 4"));
        assert_eq!(m.icon.as_ref().map(|i| i.url.as_str()), Some("bus.png"));
        assert_eq!(s.overlay(empty).unwrap().as_marker().unwrap().popup, None);
    }

    #[test]
    fn clearing_one_group_leaves_others() {
        let mut s = surface();
        let mut reg = MarkerGroupRegistry::new();
        let shuttle = reg
            .add(&mut s, &MarkerSpec::at(p(1.0, 1.0)).group("shuttle"))
            .unwrap();
        reg.add(&mut s, &MarkerSpec::at(p(2.0, 2.0)).group("stop"))
            .unwrap();
        reg.add(&mut s, &MarkerSpec::at(p(3.0, 3.0)).group("stop"))
            .unwrap();

        assert_eq!(reg.clear(&mut s, Some("stop")), Ok(2));
        assert_eq!(reg.markers("shuttle"), &[shuttle]);
        assert_eq!(reg.group_len("stop"), 0);
        assert!(s.overlay(shuttle).is_some());
        assert_eq!(s.count_kind("marker"), 1);
        // The key survives as an empty group.
        assert!(reg.group_names().any(|g| g == "stop"));
    }

    #[test]
    fn clearing_unknown_group_is_noop() {
        let mut s = surface();
        let mut reg = MarkerGroupRegistry::new();
        reg.add(&mut s, &MarkerSpec::at(p(1.0, 1.0))).unwrap();
        assert_eq!(reg.clear(&mut s, Some("nope")), Ok(0));
        assert_eq!(reg.total_markers(), 1);
        assert_eq!(reg.group_len("nope"), 0);
        assert!(!reg.group_names().any(|g| g == "nope"));
    }

    #[test]
    fn global_clear_empties_every_group() {
        let mut s = surface();
        let mut reg = MarkerGroupRegistry::new();
        for g in ["a", "b", "c"] {
            reg.add(&mut s, &MarkerSpec::at(p(1.0, 1.0)).group(g))
                .unwrap();
        }
        assert_eq!(reg.clear(&mut s, None), Ok(3));
        assert_eq!(reg.total_markers(), 0);
        assert_eq!(s.count_kind("marker"), 0);
    }

    #[test]
    fn failed_add_leaves_registry_untouched() {
        let mut s = surface();
        let mut reg = MarkerGroupRegistry::new();
        s.fail_next_add(SurfaceError::Backend("busy".into()));
        assert!(reg.add(&mut s, &MarkerSpec::at(p(1.0, 1.0))).is_err());
        assert_eq!(reg.total_markers(), 0);
        assert_eq!(reg.group_names().count(), 0);
    }

    #[test]
    fn removal_failure_still_drops_handles() {
        let mut s = surface();
        let mut reg = MarkerGroupRegistry::new();
        let a = reg.add(&mut s, &MarkerSpec::at(p(1.0, 1.0))).unwrap();
        reg.add(&mut s, &MarkerSpec::at(p(2.0, 2.0))).unwrap();

        // Remove one behind the registry's back.
        use surface::Surface;
        s.remove_overlay(a).unwrap();

        assert_eq!(
            reg.clear(&mut s, None),
            Err(SurfaceError::UnknownOverlay(a))
        );
        assert_eq!(reg.total_markers(), 0);
        assert_eq!(s.count_kind("marker"), 0);
    }
}
