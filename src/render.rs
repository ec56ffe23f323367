//! Render reference cache
//!
//! Maps each POI instance to the bundle of renderer handles drawing it. The
//! renderer itself is an external collaborator behind `RenderBackend`; the
//! cache owns the bookkeeping and guarantees handles are destroyed before an
//! entry is dropped. A secondary index by body scope is kept in lockstep with
//! the primary map.

use std::cell::Cell;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use tracing::{debug, error};

use crate::body::{BodyRef, scope_name};
use crate::color::Color;
use crate::poi::{PoiAttribute, PoiEntity, PoiId, PoiType, SharedPoi, approx_eq};
use crate::propagation::{ChangePropagator, Mapping};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineHandle(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub struct LineStyle {
    pub visible: bool,
    pub color: Color,
    pub width: f32,
}

/// Everything the renderer needs to draw one POI
#[derive(Debug)]
pub struct RenderHandles {
    pub mesh: MeshHandle,
    pub line: LineHandle,
    pub label: String,
    /// Radius actually drawn (planet radius included when requested)
    pub radius: f64,
    pub resolution: u32,
    pub style: LineStyle,
    /// Geometry must be regenerated before the next draw
    pub geometry_stale: bool,
}

impl RenderHandles {
    fn new(mesh: MeshHandle, line: LineHandle, poi: &PoiEntity) -> Self {
        Self {
            mesh,
            line,
            label: poi.label().to_string(),
            radius: poi.radius_for_rendering(),
            resolution: poi.resolution(),
            style: LineStyle {
                visible: poi.enabled(),
                color: poi.color(),
                width: poi.line_width(),
            },
            geometry_stale: false,
        }
    }
}

/// Renderer-side resource management (mesh and line generation live there)
pub trait RenderBackend {
    fn create(&mut self, poi: &PoiEntity) -> (MeshHandle, LineHandle);

    /// Regenerate geometry after a radius or resolution change
    fn rebuild(&mut self, handles: &RenderHandles);

    fn destroy(&mut self, mesh: MeshHandle, line: LineHandle);
}

/// Full instance identity: two equal POI values in different scopes or
/// different instances never share an entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenderKey {
    pub poi_type: PoiType,
    pub body: Option<String>,
    pub id: PoiId,
}

impl RenderKey {
    pub fn of(poi: &SharedPoi) -> Self {
        Self {
            poi_type: poi.poi_type(),
            body: scope_name(poi.body().as_ref()),
            id: poi.id(),
        }
    }
}

pub struct RenderReferenceCache<B: RenderBackend> {
    backend: B,
    entries: HashMap<RenderKey, RenderHandles>,
    by_body: HashMap<Option<String>, HashSet<RenderKey>>,
    propagator: ChangePropagator<PoiAttribute, PoiEntity, RenderHandles>,
    redraw: Rc<Cell<bool>>,
}

impl<B: RenderBackend> RenderReferenceCache<B> {
    pub fn new(backend: B) -> Self {
        let redraw = Rc::new(Cell::new(false));
        let flag = redraw.clone();
        let propagator: ChangePropagator<PoiAttribute, PoiEntity, RenderHandles> =
            ChangePropagator::from_fn(move |attribute| {
                let flag = flag.clone();
                let request_redraw = move || flag.set(true);
                match attribute {
                    PoiAttribute::Label => Some(
                        Mapping::bind(
                            |p: &PoiEntity| p.label().to_string(),
                            |h: &mut RenderHandles, label| h.label = label,
                        )
                        .then(request_redraw),
                    ),
                    PoiAttribute::Enabled => Some(
                        Mapping::bind(
                            |p: &PoiEntity| p.enabled(),
                            |h: &mut RenderHandles, visible| h.style.visible = visible,
                        )
                        .then(request_redraw),
                    ),
                    PoiAttribute::Radius | PoiAttribute::AddPlanetRadius => Some(
                        Mapping::bind(
                            |p: &PoiEntity| p.radius_for_rendering(),
                            |h: &mut RenderHandles, radius| {
                                if !approx_eq(h.radius, radius) {
                                    h.radius = radius;
                                    h.geometry_stale = true;
                                }
                            },
                        )
                        .then(request_redraw),
                    ),
                    // Follows Radius, which already carries the update
                    PoiAttribute::Diameter => None,
                    PoiAttribute::Color => Some(
                        Mapping::bind(
                            |p: &PoiEntity| p.color(),
                            |h: &mut RenderHandles, color| h.style.color = color,
                        )
                        .then(request_redraw),
                    ),
                    PoiAttribute::LineWidth => Some(
                        Mapping::bind(
                            |p: &PoiEntity| p.line_width(),
                            |h: &mut RenderHandles, width| h.style.width = width,
                        )
                        .then(request_redraw),
                    ),
                    PoiAttribute::Resolution => Some(
                        Mapping::bind(
                            |p: &PoiEntity| p.resolution(),
                            |h: &mut RenderHandles, resolution| {
                                if h.resolution != resolution {
                                    h.resolution = resolution;
                                    h.geometry_stale = true;
                                }
                            },
                        )
                        .then(request_redraw),
                    ),
                }
            });

        Self {
            backend,
            entries: HashMap::new(),
            by_body: HashMap::new(),
            propagator,
            redraw,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, poi: &SharedPoi) -> bool {
        self.entries.contains_key(&RenderKey::of(poi))
    }

    pub fn get(&self, poi: &SharedPoi) -> Option<&RenderHandles> {
        self.entries.get(&RenderKey::of(poi))
    }

    pub fn get_or_create(&mut self, poi: &SharedPoi) -> &mut RenderHandles {
        let key = RenderKey::of(poi);
        match self.entries.entry(key.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let entity = poi.entity();
                let (mesh, line) = self.backend.create(&entity);
                debug!(id = %key.id, poi_type = %key.poi_type, body = ?key.body, "render handles created");
                self.by_body.entry(key.body.clone()).or_default().insert(key);
                self.redraw.set(true);
                entry.insert(RenderHandles::new(mesh, line, &entity))
            }
        }
    }

    /// Route an attribute change to the POI's bundle, if it has one
    pub fn on_poi_changed(&mut self, poi: &SharedPoi, attribute: PoiAttribute) -> bool {
        let Some(handles) = self.entries.get_mut(&RenderKey::of(poi)) else {
            return false;
        };
        poi.with(|entity| self.propagator.process(entity, handles, attribute))
    }

    pub fn remove(&mut self, poi: &SharedPoi) -> bool {
        self.remove_key(&RenderKey::of(poi))
    }

    pub fn remove_key(&mut self, key: &RenderKey) -> bool {
        let indexed = self
            .by_body
            .get_mut(&key.body)
            .is_some_and(|keys| keys.remove(key));
        if self.by_body.get(&key.body).is_some_and(|keys| keys.is_empty()) {
            self.by_body.remove(&key.body);
        }

        match self.entries.remove(key) {
            Some(handles) => {
                if !indexed {
                    error!(id = %key.id, body = ?key.body, "render entry missing from body index");
                }
                self.backend.destroy(handles.mesh, handles.line);
                self.redraw.set(true);
                true
            }
            None => {
                if indexed {
                    error!(id = %key.id, body = ?key.body, "body index pointed at a missing render entry");
                }
                false
            }
        }
    }

    /// Drop every bundle of one scope. Returns how many were destroyed.
    pub fn remove_all_for(&mut self, body: Option<&BodyRef>) -> usize {
        let scope = scope_name(body);
        let Some(keys) = self.by_body.remove(&scope) else {
            return 0;
        };
        let mut destroyed = 0;
        for key in keys {
            match self.entries.remove(&key) {
                Some(handles) => {
                    self.backend.destroy(handles.mesh, handles.line);
                    destroyed += 1;
                }
                None => error!(id = %key.id, body = ?scope, "body index pointed at a missing render entry"),
            }
        }
        if destroyed > 0 {
            self.redraw.set(true);
        }
        destroyed
    }

    /// Keys of every bundle in one scope
    pub fn keys_for(&self, body: Option<&BodyRef>) -> Vec<RenderKey> {
        self.by_body
            .get(&scope_name(body))
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Bundles of one scope; index entries without a bundle are reported and skipped
    pub fn entries_for(&self, body: Option<&BodyRef>) -> Vec<&RenderHandles> {
        let Some(keys) = self.by_body.get(&scope_name(body)) else {
            return Vec::new();
        };
        keys.iter()
            .filter_map(|key| {
                let handles = self.entries.get(key);
                if handles.is_none() {
                    error!(id = %key.id, body = ?key.body, "body index pointed at a missing render entry");
                }
                handles
            })
            .collect()
    }

    /// Regenerate geometry for every stale bundle. Returns how many were rebuilt.
    pub fn rebuild_stale(&mut self) -> usize {
        let mut rebuilt = 0;
        for handles in self.entries.values_mut().filter(|h| h.geometry_stale) {
            self.backend.rebuild(handles);
            handles.geometry_stale = false;
            rebuilt += 1;
        }
        rebuilt
    }

    /// Whether anything changed since the last call
    pub fn take_redraw_request(&self) -> bool {
        self.redraw.replace(false)
    }

    pub fn clear(&mut self) {
        for (_, handles) in self.entries.drain() {
            self.backend.destroy(handles.mesh, handles.line);
        }
        self.by_body.clear();
        self.redraw.set(true);
    }
}

impl<B: RenderBackend> Drop for RenderReferenceCache<B> {
    fn drop(&mut self) {
        for (_, handles) in self.entries.drain() {
            self.backend.destroy(handles.mesh, handles.line);
        }
    }
}

/// Backend that only hands out ids and counts calls
#[derive(Debug, Default)]
pub struct CountingBackend {
    next: u64,
    pub created: usize,
    pub rebuilt: usize,
    pub destroyed: Vec<MeshHandle>,
}

impl RenderBackend for CountingBackend {
    fn create(&mut self, _poi: &PoiEntity) -> (MeshHandle, LineHandle) {
        self.next += 1;
        self.created += 1;
        (MeshHandle(self.next), LineHandle(self.next))
    }

    fn rebuild(&mut self, _handles: &RenderHandles) {
        self.rebuilt += 1;
    }

    fn destroy(&mut self, mesh: MeshHandle, _line: LineHandle) {
        self.destroyed.push(mesh);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{Body, BodyRegistry, FlatTerrain};

    fn registry() -> BodyRegistry {
        BodyRegistry::new(
            vec![Body::new("Kerbin", 600_000.0), Body::new("Mun", 200_000.0)],
            FlatTerrain::default(),
        )
    }

    fn poi(registry: &BodyRegistry, ty: PoiType, body: &str) -> SharedPoi {
        let body = registry.resolve_by_name(Some(body));
        SharedPoi::plain(&PoiEntity::default_from(ty, body, registry))
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let registry = registry();
        let atmo = poi(&registry, PoiType::Atmosphere, "Kerbin");
        let mut cache = RenderReferenceCache::new(CountingBackend::default());

        let mesh = cache.get_or_create(&atmo).mesh;
        assert_eq!(cache.get_or_create(&atmo).mesh, mesh);
        assert_eq!(cache.backend().created, 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.take_redraw_request());
        assert!(!cache.take_redraw_request());
    }

    #[test]
    fn test_equal_values_in_different_scopes_do_not_collide() {
        let registry = registry();
        let kerbin = poi(&registry, PoiType::SphereOfInfluence, "Kerbin");
        let mun = poi(&registry, PoiType::SphereOfInfluence, "Mun");
        let kerbin_twin = poi(&registry, PoiType::SphereOfInfluence, "Kerbin");
        let mut cache = RenderReferenceCache::new(CountingBackend::default());

        cache.get_or_create(&kerbin);
        cache.get_or_create(&mun);
        cache.get_or_create(&kerbin_twin);
        assert_eq!(cache.len(), 3);

        let kerbin_ref = registry.resolve_by_name(Some("Kerbin"));
        assert_eq!(cache.entries_for(kerbin_ref.as_ref()).len(), 2);
        assert_eq!(cache.keys_for(None).len(), 0);
    }

    #[test]
    fn test_remove_destroys_handles() {
        let registry = registry();
        let atmo = poi(&registry, PoiType::Atmosphere, "Kerbin");
        let mut cache = RenderReferenceCache::new(CountingBackend::default());
        let mesh = cache.get_or_create(&atmo).mesh;

        assert!(cache.remove(&atmo));
        assert_eq!(cache.backend().destroyed, vec![mesh]);
        assert!(!cache.remove(&atmo));
        assert!(cache.is_empty());
        assert!(cache.keys_for(atmo.body().as_ref()).is_empty());
    }

    #[test]
    fn test_remove_all_for_body() {
        let registry = registry();
        let mut cache = RenderReferenceCache::new(CountingBackend::default());
        for ty in PoiType::STANDARD {
            cache.get_or_create(&poi(&registry, ty, "Kerbin"));
        }
        let mun = poi(&registry, PoiType::Atmosphere, "Mun");
        cache.get_or_create(&mun);

        let kerbin = registry.resolve_by_name(Some("Kerbin"));
        assert_eq!(cache.remove_all_for(kerbin.as_ref()), 5);
        assert_eq!(cache.backend().destroyed.len(), 5);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&mun));
        assert_eq!(cache.remove_all_for(kerbin.as_ref()), 0);
    }

    #[test]
    fn test_attribute_changes_flow_into_handles() {
        let registry = registry();
        let custom = poi(&registry, PoiType::Custom, "Kerbin");
        let mut cache = RenderReferenceCache::new(CountingBackend::default());
        cache.get_or_create(&custom);
        cache.take_redraw_request();

        custom.set_color(Color::rgb(1, 2, 3)).unwrap();
        assert!(cache.on_poi_changed(&custom, PoiAttribute::Color));
        assert_eq!(cache.get(&custom).unwrap().style.color, Color::rgb(1, 2, 3));
        assert!(cache.take_redraw_request());

        custom.set_radius(1_000.0).unwrap();
        custom.set_add_planet_radius(true).unwrap();
        assert!(cache.on_poi_changed(&custom, PoiAttribute::Radius));
        assert!(!cache.on_poi_changed(&custom, PoiAttribute::Diameter));
        assert!(cache.on_poi_changed(&custom, PoiAttribute::AddPlanetRadius));
        assert_eq!(cache.get(&custom).unwrap().radius, 601_000.0);
        assert!(cache.get(&custom).unwrap().geometry_stale);

        assert_eq!(cache.rebuild_stale(), 1);
        assert_eq!(cache.rebuild_stale(), 0);
        assert_eq!(cache.backend().rebuilt, 1);
    }

    #[test]
    fn test_changes_for_unknown_poi_are_ignored() {
        let registry = registry();
        let atmo = poi(&registry, PoiType::Atmosphere, "Kerbin");
        let mut cache = RenderReferenceCache::new(CountingBackend::default());
        assert!(!cache.on_poi_changed(&atmo, PoiAttribute::Enabled));
    }

    #[test]
    fn test_index_disagreement_degrades_to_not_found() {
        let registry = registry();
        let atmo = poi(&registry, PoiType::Atmosphere, "Kerbin");
        let soi = poi(&registry, PoiType::SphereOfInfluence, "Kerbin");
        let kerbin = registry.resolve_by_name(Some("Kerbin"));
        let mut cache = RenderReferenceCache::new(CountingBackend::default());
        cache.get_or_create(&atmo);
        let soi_mesh = cache.get_or_create(&soi).mesh;

        // Indexed key whose bundle is gone
        let orphan = RenderKey::of(&atmo);
        cache.entries.remove(&orphan);
        assert_eq!(cache.entries_for(kerbin.as_ref()).len(), 1);
        assert!(!cache.remove_key(&orphan));
        assert_eq!(cache.keys_for(kerbin.as_ref()), vec![RenderKey::of(&soi)]);

        // Bundle the index lost track of
        cache.by_body.clear();
        assert!(cache.entries_for(kerbin.as_ref()).is_empty());
        assert!(cache.remove(&soi));
        assert!(!cache.remove(&soi));
        assert_eq!(cache.backend().destroyed, vec![soi_mesh]);
        assert!(cache.is_empty());

        cache.by_body.entry(orphan.body.clone()).or_default().insert(orphan);
        assert_eq!(cache.remove_all_for(kerbin.as_ref()), 0);
        assert!(cache.keys_for(kerbin.as_ref()).is_empty());
        assert_eq!(cache.backend().destroyed.len(), 1);
    }

    #[test]
    fn test_clear_destroys_everything() {
        let registry = registry();
        let mut cache = RenderReferenceCache::new(CountingBackend::default());
        cache.get_or_create(&poi(&registry, PoiType::Atmosphere, "Kerbin"));
        cache.get_or_create(&poi(&registry, PoiType::Atmosphere, "Mun"));
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.backend().destroyed.len(), 2);
        assert!(cache.keys_for(registry.resolve_by_name(Some("Mun")).as_ref()).is_empty());
    }
}
