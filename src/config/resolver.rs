//! Three-tier POI configuration
//!
//! Tiers, lowest first:
//! 1. built-in per-type defaults (`PoiEntity::default_from`)
//! 2. per-body computed defaults, inheriting the template attributes of the
//!    global override of the same type when there is one
//! 3. user overrides (the override set)
//!
//! The resolver hands out `SharedPoi` handles. Defaults are sealed and cached
//! per slot; when one is dirtied its value is promoted into the override set
//! and the default snaps back to its baseline. An override that converges
//! back to its slot's default is demoted out of the set. Custom entries have
//! no default and are never demoted.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use tracing::{debug, error, info, warn};

use crate::body::{BodyRef, BodyRegistry, scope_name};
use crate::constants::defaults;
use crate::error::PoiError;
use crate::poi::{ListenerId, PoiAttribute, PoiEdit, PoiEntity, PoiEvent, PoiListener, PoiType, SharedPoi};
use crate::propagation::{ChangePropagator, Mapping};

/// Resolver-level switches that filter what is shown without touching POIs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverSettings {
    pub show_max_terrain_altitude_on_atmospheric_bodies: bool,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            show_max_terrain_altitude_on_atmospheric_bodies: defaults::SHOW_MAX_TERRAIN_ON_ATMOSPHERIC_BODIES,
        }
    }
}

/// Collection-changed notification for the override set
#[derive(Debug, Clone, Default)]
pub struct OverridesChanged {
    pub added: Vec<SharedPoi>,
    pub removed: Vec<SharedPoi>,
}

impl OverridesChanged {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

pub type OverridesListener = Rc<dyn Fn(&OverridesChanged)>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SlotKey {
    poi_type: PoiType,
    body: Option<String>,
}

impl SlotKey {
    fn new(poi_type: PoiType, body: Option<&BodyRef>) -> Self {
        Self {
            poi_type,
            body: scope_name(body),
        }
    }
}

/// A handle plus the resolver's subscription on it
struct Tracked {
    poi: SharedPoi,
    listener: ListenerId,
}

impl Tracked {
    fn release(self) -> SharedPoi {
        self.poi.unsubscribe(self.listener);
        self.poi
    }
}

/// Checks an attribute change on an override asks for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct OverrideReview {
    /// Compare against the slot default and drop the override when equal
    demote: bool,
    /// Drop other overrides now sharing the slot
    slot_collisions: bool,
    /// Body defaults inherit from this override and must be rebuilt
    template: bool,
}

impl OverrideReview {
    fn mark(&mut self, standard: bool, global: bool) {
        self.demote = standard;
        self.template = standard && global;
    }
}

fn override_scope(poi: &PoiEntity) -> (bool, bool) {
    (poi.poi_type().is_standard(), poi.body().is_none())
}

/// Per-attribute policy for changes on overrides
fn review_table() -> ChangePropagator<PoiAttribute, PoiEntity, OverrideReview> {
    ChangePropagator::from_fn(|attribute| match attribute {
        PoiAttribute::Radius => Some(Mapping::bind(
            override_scope,
            |review: &mut OverrideReview, (standard, global)| {
                review.mark(standard, global);
                review.slot_collisions = !standard;
            },
        )),
        // Follows Radius, which already carries the update
        PoiAttribute::Diameter => None,
        PoiAttribute::Label
        | PoiAttribute::Enabled
        | PoiAttribute::Color
        | PoiAttribute::AddPlanetRadius
        | PoiAttribute::LineWidth
        | PoiAttribute::Resolution => Some(Mapping::bind(
            override_scope,
            |review: &mut OverrideReview, (standard, global)| review.mark(standard, global),
        )),
    })
}

struct Inner {
    registry: Rc<BodyRegistry>,
    review: ChangePropagator<PoiAttribute, PoiEntity, OverrideReview>,
    overrides: RefCell<Vec<Tracked>>,
    defaults: RefCell<HashMap<SlotKey, Tracked>>,
    settings: Cell<ResolverSettings>,
    override_listeners: RefCell<Vec<OverridesListener>>,
    poi_listeners: RefCell<Vec<PoiListener>>,
}

#[derive(Clone)]
pub struct ConfigResolver {
    inner: Rc<Inner>,
}

impl ConfigResolver {
    pub fn new(registry: Rc<BodyRegistry>) -> Self {
        Self {
            inner: Rc::new(Inner {
                registry,
                review: review_table(),
                overrides: RefCell::new(Vec::new()),
                defaults: RefCell::new(HashMap::new()),
                settings: Cell::new(ResolverSettings::default()),
                override_listeners: RefCell::new(Vec::new()),
                poi_listeners: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn registry(&self) -> &Rc<BodyRegistry> {
        &self.inner.registry
    }

    pub fn settings(&self) -> ResolverSettings {
        self.inner.settings.get()
    }

    pub fn set_settings(&self, settings: ResolverSettings) {
        self.inner.settings.set(settings);
    }

    /// Listen for override-set changes
    pub fn subscribe_overrides(&self, listener: OverridesListener) {
        self.inner.override_listeners.borrow_mut().push(listener);
    }

    /// Listen for events of every POI currently tracked by the resolver
    pub fn subscribe_pois(&self, listener: PoiListener) {
        self.inner.poi_listeners.borrow_mut().push(listener);
    }

    // ==========================================================================
    // Queries
    // ==========================================================================

    /// Override for the slot if there is one, otherwise the sealed default
    pub fn resolve_poi_for(&self, body: Option<&BodyRef>, poi_type: PoiType) -> Result<SharedPoi, PoiError> {
        if !poi_type.is_standard() {
            return Err(PoiError::Unsupported { poi_type });
        }
        if let Some(poi) = self.inner.find_override(poi_type, body, 0.0) {
            return Ok(poi);
        }
        Ok(self.inner.cached_default(poi_type, body))
    }

    /// Whether the effective POI of the slot is enabled
    ///
    /// `None` is never enabled; `Custom` is enabled when any custom override of
    /// the scope is.
    pub fn get_global_enable_for(&self, body: Option<&BodyRef>, poi_type: PoiType) -> bool {
        match poi_type {
            PoiType::None => false,
            PoiType::Custom => self.get_custom_pois_for(body).iter().any(|p| p.enabled()),
            _ => self
                .resolve_poi_for(body, poi_type)
                .map(|p| p.enabled())
                .unwrap_or(false),
        }
    }

    /// Every override of the scope, any type
    pub fn get_configured_pois_for(&self, body: Option<&BodyRef>) -> Vec<SharedPoi> {
        self.inner
            .overrides
            .borrow()
            .iter()
            .filter(|t| t.poi.body().as_ref() == body)
            .map(|t| t.poi.clone())
            .collect()
    }

    /// One resolved POI per standard type
    pub fn get_standard_pois_for(&self, body: Option<&BodyRef>) -> Vec<SharedPoi> {
        PoiType::STANDARD
            .iter()
            .filter_map(|ty| self.resolve_poi_for(body, *ty).ok())
            .collect()
    }

    pub fn get_custom_pois_for(&self, body: Option<&BodyRef>) -> Vec<SharedPoi> {
        self.get_configured_pois_for(body)
            .into_iter()
            .filter(|p| p.poi_type() == PoiType::Custom)
            .collect()
    }

    /// Enabled POIs of the scope that should be drawn
    pub fn visible_pois_for(&self, body: Option<&BodyRef>) -> Vec<SharedPoi> {
        let settings = self.settings();
        let atmospheric = body.is_some_and(|b| b.has_atmosphere());
        let mut visible: Vec<SharedPoi> = self
            .get_standard_pois_for(body)
            .into_iter()
            .filter(|p| p.enabled())
            .filter(|p| {
                p.poi_type() != PoiType::MaxTerrainAltitude
                    || !atmospheric
                    || settings.show_max_terrain_altitude_on_atmospheric_bodies
            })
            .collect();
        visible.extend(self.get_custom_pois_for(body).into_iter().filter(|p| p.enabled()));
        visible
    }

    /// The whole override set
    pub fn overrides(&self) -> Vec<SharedPoi> {
        self.inner.overrides.borrow().iter().map(|t| t.poi.clone()).collect()
    }

    /// Computed default value for a standard slot (tiers 1 and 2)
    pub fn default_value_for(&self, body: Option<&BodyRef>, poi_type: PoiType) -> Result<PoiEntity, PoiError> {
        if !poi_type.is_standard() {
            return Err(PoiError::Unsupported { poi_type });
        }
        Ok(self.inner.default_value(poi_type, body))
    }

    // ==========================================================================
    // Mutation
    // ==========================================================================

    /// Replace the whole override set
    pub fn update_configured_pois(&self, pois: Vec<PoiEntity>) -> Vec<SharedPoi> {
        let mut unique: Vec<PoiEntity> = Vec::with_capacity(pois.len());
        for poi in pois {
            if poi.poi_type() == PoiType::None {
                warn!(body = ?poi.body_name(), "skipping override of type None");
                continue;
            }
            if let Some(pos) = unique.iter().position(|existing| existing.same_target(&poi)) {
                warn!(poi_type = %poi.poi_type(), body = ?poi.body_name(), "duplicate override, keeping the later one");
                unique.remove(pos);
            }
            unique.push(poi);
        }

        let removed: Vec<SharedPoi> = self
            .inner
            .overrides
            .borrow_mut()
            .drain(..)
            .map(Tracked::release)
            .collect();
        self.inner.invalidate_defaults(|_| true);

        let added: Vec<SharedPoi> = unique
            .iter()
            .map(|entity| {
                let poi = SharedPoi::plain(entity);
                let tracked = self.inner.watch_override(&poi);
                self.inner.overrides.borrow_mut().push(tracked);
                poi
            })
            .collect();

        info!(removed = removed.len(), added = added.len(), "override set replaced");
        self.inner.fire_overrides(OverridesChanged { added: added.clone(), removed });
        self.inner.demote_converged();
        added
    }

    /// Insert or replace the override occupying the same slot
    ///
    /// A standard value equal to its default is not stored; the default
    /// handle is returned instead.
    pub fn add_poi(&self, poi: PoiEntity) -> Result<SharedPoi, PoiError> {
        let poi_type = poi.poi_type();
        if poi_type == PoiType::None {
            return Err(PoiError::Unsupported { poi_type });
        }
        if poi_type.is_standard() && poi.value_eq(&self.inner.default_value(poi_type, poi.body())) {
            debug!(poi_type = %poi_type, body = ?poi.body_name(), "added POI equals its default, not stored");
            let existing = self.inner.find_override(poi_type, poi.body(), 0.0);
            if let Some(existing) = existing {
                self.remove_poi(&existing);
            }
            return self.resolve_poi_for(poi.body(), poi_type);
        }
        Ok(self.inner.insert_override(&poi))
    }

    /// Remove an override. Returns whether it was part of the set.
    pub fn remove_poi(&self, poi: &SharedPoi) -> bool {
        let Some(removed) = self.inner.take_override(poi) else {
            return false;
        };
        info!(poi_type = %removed.poi_type(), body = ?scope_name(removed.body().as_ref()), "override removed");
        let global_type = removed.body().is_none().then(|| removed.poi_type());
        self.inner.fire_overrides(OverridesChanged { added: Vec::new(), removed: vec![removed] });
        if let Some(poi_type) = global_type {
            self.inner.global_template_changed(poi_type);
        }
        true
    }

    /// Drop every override and every cached default
    pub fn reset(&self) {
        let removed: Vec<SharedPoi> = self
            .inner
            .overrides
            .borrow_mut()
            .drain(..)
            .map(Tracked::release)
            .collect();
        self.inner.invalidate_defaults(|_| true);
        info!(removed = removed.len(), "resolver reset");
        self.inner.fire_overrides(OverridesChanged { added: Vec::new(), removed });
    }

    /// Drop cached defaults; the next resolve rebuilds them
    pub fn invalidate_defaults(&self, poi_type: Option<PoiType>) {
        self.inner
            .invalidate_defaults(|key| poi_type.is_none_or(|ty| key.poi_type == ty));
    }

    /// Re-resolve every override's body by name after the body catalog changed
    pub fn rebind_bodies(&self) {
        let registry = self.inner.registry.clone();
        let rebound: Vec<PoiEntity> = self
            .overrides()
            .iter()
            .map(|poi| {
                let entity = poi.entity();
                let name = entity.body_name().map(str::to_string);
                match name {
                    None => entity,
                    Some(name) => match registry.resolve_by_name(Some(&name)) {
                        Some(body) => entity.clone_with(Some(body), &registry),
                        None => {
                            warn!(body = %name, "override body no longer in catalog, keeping as is");
                            entity
                        }
                    },
                }
            })
            .collect();
        self.update_configured_pois(rebound);
    }
}

impl Inner {
    fn find_override(&self, poi_type: PoiType, body: Option<&BodyRef>, radius: f64) -> Option<SharedPoi> {
        let overrides = self.overrides.borrow();
        let mut matches = overrides
            .iter()
            .filter(|t| t.poi.with(|p| p.targets(poi_type, body, radius)));
        let first = matches.next().map(|t| t.poi.clone());
        if first.is_some() && matches.next().is_some() {
            error!(poi_type = %poi_type, body = ?scope_name(body), "override set holds duplicate slots, using the first");
        }
        first
    }

    fn is_override(&self, poi: &SharedPoi) -> bool {
        self.overrides.borrow().iter().any(|t| t.poi.ptr_eq(poi))
    }

    fn is_cached_default(&self, poi: &SharedPoi) -> bool {
        self.defaults.borrow().values().any(|t| t.poi.ptr_eq(poi))
    }

    fn default_value(&self, poi_type: PoiType, body: Option<&BodyRef>) -> PoiEntity {
        let mut value = PoiEntity::default_from(poi_type, body.cloned(), &self.registry);
        if body.is_some() {
            if let Some(template) = self.find_override(poi_type, None, 0.0) {
                let template = template.entity();
                let edits = [
                    PoiEdit::Enabled(template.enabled()),
                    PoiEdit::Color(template.color()),
                    PoiEdit::LineWidth(template.line_width()),
                    PoiEdit::Resolution(template.resolution()),
                ];
                for edit in edits {
                    if let Err(e) = value.apply(edit) {
                        error!(error = ?e, "global template attribute rejected");
                    }
                }
            }
        }
        value
    }

    fn cached_default(self: &Rc<Self>, poi_type: PoiType, body: Option<&BodyRef>) -> SharedPoi {
        let key = SlotKey::new(poi_type, body);
        if let Some(tracked) = self.defaults.borrow().get(&key) {
            return tracked.poi.clone();
        }
        let poi = SharedPoi::sealed(&self.default_value(poi_type, body));
        let tracked = self.watch_default(&poi);
        debug!(poi_type = %poi_type, body = ?key.body, id = %poi.id(), "created sealed default");
        self.defaults.borrow_mut().insert(key, tracked);
        poi
    }

    fn invalidate_defaults(&self, mut predicate: impl FnMut(&SlotKey) -> bool) {
        let stale: Vec<SlotKey> = self
            .defaults
            .borrow()
            .keys()
            .filter(|key| predicate(key))
            .cloned()
            .collect();
        let mut defaults = self.defaults.borrow_mut();
        for key in stale {
            if let Some(tracked) = defaults.remove(&key) {
                tracked.release();
            }
        }
    }

    fn watch_default(self: &Rc<Self>, poi: &SharedPoi) -> Tracked {
        let weak: Weak<Inner> = Rc::downgrade(self);
        let listener = poi.subscribe(Rc::new(move |poi, event| {
            if let Some(inner) = weak.upgrade() {
                inner.on_default_event(poi, event);
            }
        }));
        Tracked { poi: poi.clone(), listener }
    }

    fn watch_override(self: &Rc<Self>, poi: &SharedPoi) -> Tracked {
        let weak: Weak<Inner> = Rc::downgrade(self);
        let listener = poi.subscribe(Rc::new(move |poi, event| {
            if let Some(inner) = weak.upgrade() {
                inner.on_override_event(poi, event);
            }
        }));
        Tracked { poi: poi.clone(), listener }
    }

    fn insert_override(self: &Rc<Self>, entity: &PoiEntity) -> SharedPoi {
        let replaced = self.find_override(entity.poi_type(), entity.body(), entity.radius());
        let removed: Vec<SharedPoi> = replaced
            .and_then(|existing| self.take_override(&existing))
            .into_iter()
            .collect();

        let poi = SharedPoi::plain(entity);
        let tracked = self.watch_override(&poi);
        self.overrides.borrow_mut().push(tracked);
        info!(poi_type = %entity.poi_type(), body = ?entity.body_name(), id = %poi.id(), "override added");

        self.fire_overrides(OverridesChanged { added: vec![poi.clone()], removed });
        if entity.body().is_none() && entity.poi_type().is_standard() {
            self.global_template_changed(entity.poi_type());
        }
        poi
    }

    fn take_override(&self, poi: &SharedPoi) -> Option<SharedPoi> {
        let mut overrides = self.overrides.borrow_mut();
        let pos = overrides.iter().position(|t| t.poi.ptr_eq(poi))?;
        Some(overrides.remove(pos).release())
    }

    fn on_default_event(self: &Rc<Self>, poi: &SharedPoi, event: PoiEvent) {
        self.forward(poi, event);
        if event != PoiEvent::Dirtied || !self.is_cached_default(poi) {
            return;
        }
        let value = poi.entity();
        info!(poi_type = %value.poi_type(), body = ?value.body_name(), "default diverged, promoting to override");
        self.insert_override(&value);
        if let Err(e) = poi.reset() {
            error!(error = ?e, id = %poi.id(), "failed to reset promoted default");
        }
    }

    fn on_override_event(self: &Rc<Self>, poi: &SharedPoi, event: PoiEvent) {
        self.forward(poi, event);
        let PoiEvent::Changed(attribute) = event else {
            return;
        };
        if !self.is_override(poi) {
            return;
        }
        let value = poi.entity();
        let mut review = OverrideReview::default();
        if !self.review.process(&value, &mut review, attribute) {
            return;
        }

        if review.slot_collisions {
            self.drop_slot_collisions(poi, &value);
        }
        let poi_type = value.poi_type();
        if review.demote && value.value_eq(&self.default_value(poi_type, value.body())) {
            if let Some(removed) = self.take_override(poi) {
                info!(poi_type = %poi_type, body = ?value.body_name(), "override matches default, demoting");
                self.fire_overrides(OverridesChanged { added: Vec::new(), removed: vec![removed] });
            }
        }
        if review.template {
            self.global_template_changed(poi_type);
        }
    }

    fn drop_slot_collisions(&self, poi: &SharedPoi, value: &PoiEntity) {
        let colliding: Vec<SharedPoi> = self
            .overrides
            .borrow()
            .iter()
            .filter(|t| !t.poi.ptr_eq(poi) && t.poi.with(|other| other.same_target(value)))
            .map(|t| t.poi.clone())
            .collect();
        let removed: Vec<SharedPoi> = colliding
            .iter()
            .filter_map(|other| self.take_override(other))
            .collect();
        if !removed.is_empty() {
            warn!(body = ?value.body_name(), radius = value.radius(), count = removed.len(), "custom POI now shares a slot, dropping the older entry");
            self.fire_overrides(OverridesChanged { added: Vec::new(), removed });
        }
    }

    /// Body defaults of `poi_type` inherit from the global override; rebuild
    /// them and demote body overrides that now match.
    fn global_template_changed(&self, poi_type: PoiType) {
        self.invalidate_defaults(|key| key.poi_type == poi_type && key.body.is_some());
        self.demote_converged();
    }

    fn demote_converged(&self) {
        let mut removed = Vec::new();
        // Globals first: body defaults depend on them
        for global_pass in [true, false] {
            let candidates: Vec<SharedPoi> = self
                .overrides
                .borrow()
                .iter()
                .map(|t| t.poi.clone())
                .filter(|p| p.poi_type().is_standard() && p.body().is_none() == global_pass)
                .collect();
            for poi in candidates {
                let value = poi.entity();
                if value.value_eq(&self.default_value(value.poi_type(), value.body())) {
                    if let Some(taken) = self.take_override(&poi) {
                        debug!(poi_type = %value.poi_type(), body = ?value.body_name(), "demoting converged override");
                        removed.push(taken);
                    }
                }
            }
            if global_pass && !removed.is_empty() {
                self.invalidate_defaults(|key| key.body.is_some());
            }
        }
        if !removed.is_empty() {
            self.fire_overrides(OverridesChanged { added: Vec::new(), removed });
        }
    }

    fn forward(&self, poi: &SharedPoi, event: PoiEvent) {
        let listeners: Vec<PoiListener> = self.poi_listeners.borrow().clone();
        for listener in listeners {
            listener(poi, event);
        }
    }

    fn fire_overrides(&self, change: OverridesChanged) {
        if change.is_empty() {
            return;
        }
        let listeners: Vec<OverridesListener> = self.override_listeners.borrow().clone();
        for listener in listeners {
            listener(&change);
        }
    }
}
