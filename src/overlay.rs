//! Overlay session
//!
//! `PoiOverlay` owns one body registry, one resolver and one render cache and
//! keeps them wired together: attribute changes on tracked POIs flow into the
//! matching render bundle, removed overrides release theirs, and each frame
//! reconciles the cache with the visible set of the focused body.

use std::cell::{Ref, RefCell};
use std::collections::HashSet;
use std::rc::Rc;
use tracing::{debug, info, warn};

use crate::body::{Body, BodyRef, BodyRegistry};
use crate::config::{ConfigNode, ConfigResolver, load_overrides, save_overrides};
use crate::poi::{PoiEvent, PoiId, SharedPoi};
use crate::render::{RenderBackend, RenderReferenceCache};

pub struct PoiOverlay<B: RenderBackend + 'static> {
    registry: Rc<BodyRegistry>,
    resolver: ConfigResolver,
    cache: Rc<RefCell<RenderReferenceCache<B>>>,
}

impl<B: RenderBackend + 'static> PoiOverlay<B> {
    pub fn new(registry: Rc<BodyRegistry>, backend: B) -> Self {
        let resolver = ConfigResolver::new(registry.clone());
        let cache = Rc::new(RefCell::new(RenderReferenceCache::new(backend)));

        let weak = Rc::downgrade(&cache);
        resolver.subscribe_pois(Rc::new(move |poi, event| {
            let PoiEvent::Changed(attribute) = event else {
                return;
            };
            let Some(cache) = weak.upgrade() else {
                return;
            };
            match cache.try_borrow_mut() {
                Ok(mut cache) => {
                    cache.on_poi_changed(poi, attribute);
                }
                Err(_) => warn!(id = %poi.id(), ?attribute, "render cache busy, change not applied"),
            }
        }));

        let weak = Rc::downgrade(&cache);
        resolver.subscribe_overrides(Rc::new(move |change| {
            let Some(cache) = weak.upgrade() else {
                return;
            };
            match cache.try_borrow_mut() {
                Ok(mut cache) => {
                    for poi in &change.removed {
                        cache.remove(poi);
                    }
                }
                Err(_) => warn!(removed = change.removed.len(), "render cache busy, removals deferred to next frame"),
            }
        }));

        Self { registry, resolver, cache }
    }

    pub fn registry(&self) -> &Rc<BodyRegistry> {
        &self.registry
    }

    pub fn resolver(&self) -> &ConfigResolver {
        &self.resolver
    }

    pub fn cache(&self) -> Ref<'_, RenderReferenceCache<B>> {
        self.cache.borrow()
    }

    /// Reconcile the render cache with what should be drawn around `body`.
    /// Returns the visible POIs.
    pub fn sync_frame(&self, body: Option<&BodyRef>) -> Vec<SharedPoi> {
        let visible = self.resolver.visible_pois_for(body);
        let ids: HashSet<PoiId> = visible.iter().map(SharedPoi::id).collect();

        let mut cache = self.cache.borrow_mut();
        let mut dropped = 0;
        for key in cache.keys_for(body) {
            if !ids.contains(&key.id) && cache.remove_key(&key) {
                dropped += 1;
            }
        }
        for poi in &visible {
            cache.get_or_create(poi);
        }
        let rebuilt = cache.rebuild_stale();

        debug!(body = ?body.map(BodyRef::name), visible = visible.len(), dropped, rebuilt, "frame synced");
        visible
    }

    /// Swap the body catalog, rebinding overrides and dropping every bundle
    pub fn set_bodies(&self, bodies: Vec<Body>) {
        let count = bodies.len();
        self.registry.replace_bodies(bodies);
        self.resolver.rebind_bodies();
        self.cache.borrow_mut().clear();
        info!(bodies = count, "body catalog replaced");
    }

    /// Load settings and the override set from a config tree
    pub fn load(&self, root: &ConfigNode) -> usize {
        load_overrides(&self.resolver, root)
    }

    pub fn save(&self) -> ConfigNode {
        save_overrides(&self.resolver)
    }
}
