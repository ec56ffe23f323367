//! Body registry: name lookup and memoized per-body derived attributes
//!
//! Both maps are built lazily and invalidated only as a whole unit via
//! `clear()`. Terrain sampling is the expensive part; one body failing to
//! sample never poisons the rest of the cache.

use anyhow::{Result, bail};
use std::cell::RefCell;
use std::collections::HashMap;
use tracing::{debug, warn};

use super::{Body, BodyRef};
use crate::constants::terrain::SAMPLE_STEP_DEGREES;

/// Source of terrain heights (external collaborator)
pub trait TerrainSampler {
    /// Whether the body has a terrain surface that can be sampled at all
    fn is_usable(&self, body: &Body) -> bool;

    /// Terrain height above `body.radius` at the given coordinates (degrees)
    fn height_at(&self, body: &Body, latitude: f64, longitude: f64) -> Result<f64>;
}

/// Sampler backed by a fixed peak height per body name
///
/// Bodies without an entry are reported as unusable, so the registry falls
/// back to their physical radius.
#[derive(Debug, Clone, Default)]
pub struct FlatTerrain {
    heights: HashMap<String, f64>,
}

impl FlatTerrain {
    pub fn new(heights: HashMap<String, f64>) -> Self {
        Self { heights }
    }
}

impl TerrainSampler for FlatTerrain {
    fn is_usable(&self, body: &Body) -> bool {
        self.heights.contains_key(&body.name)
    }

    fn height_at(&self, body: &Body, _latitude: f64, _longitude: f64) -> Result<f64> {
        match self.heights.get(&body.name) {
            Some(height) => Ok(*height),
            None => bail!("no terrain data for {}", body.name),
        }
    }
}

pub struct BodyRegistry {
    bodies: RefCell<Vec<BodyRef>>,
    sampler: Box<dyn TerrainSampler>,
    by_name: RefCell<Option<HashMap<String, BodyRef>>>,
    max_altitudes: RefCell<Option<HashMap<String, f64>>>,
}

impl BodyRegistry {
    pub fn new(bodies: Vec<Body>, sampler: impl TerrainSampler + 'static) -> Self {
        Self {
            bodies: RefCell::new(bodies.into_iter().map(BodyRef::new).collect()),
            sampler: Box::new(sampler),
            by_name: RefCell::new(None),
            max_altitudes: RefCell::new(None),
        }
    }

    /// Registry with no bodies and no terrain data
    pub fn empty() -> Self {
        Self::new(Vec::new(), FlatTerrain::default())
    }

    pub fn bodies(&self) -> Vec<BodyRef> {
        self.bodies.borrow().clone()
    }

    /// Swap the body catalog and invalidate every cache built from the old one
    pub fn replace_bodies(&self, bodies: Vec<Body>) {
        *self.bodies.borrow_mut() = bodies.into_iter().map(BodyRef::new).collect();
        self.clear();
    }

    /// Drop both caches; the next access rebuilds them
    pub fn clear(&self) {
        self.by_name.borrow_mut().take();
        self.max_altitudes.borrow_mut().take();
        debug!("body registry caches cleared");
    }

    /// Look a body up by name. Absent or unknown names yield `None`.
    pub fn resolve_by_name(&self, name: Option<&str>) -> Option<BodyRef> {
        let name = name?;
        if self.by_name.borrow().is_none() {
            let map = self
                .bodies
                .borrow()
                .iter()
                .map(|body| (body.name().to_string(), body.clone()))
                .collect::<HashMap<_, _>>();
            debug!(count = map.len(), "built body name index");
            *self.by_name.borrow_mut() = Some(map);
        }
        self.by_name
            .borrow()
            .as_ref()
            .and_then(|map| map.get(name).cloned())
    }

    /// Approximate highest terrain point measured from the body center
    ///
    /// Bodies unknown to the registry get their physical radius.
    pub fn max_altitude_for(&self, body: &Body) -> f64 {
        self.ensure_max_altitudes();
        let cached = self
            .max_altitudes
            .borrow()
            .as_ref()
            .and_then(|map| map.get(&body.name).copied());
        cached.unwrap_or_else(|| {
            debug!(body = %body.name, "body not in altitude cache, using radius");
            body.radius
        })
    }

    /// Full altitude map; every registered body has an entry
    pub fn max_altitudes(&self) -> HashMap<String, f64> {
        self.ensure_max_altitudes();
        self.max_altitudes.borrow().clone().unwrap_or_default()
    }

    fn ensure_max_altitudes(&self) {
        if self.max_altitudes.borrow().is_some() {
            return;
        }
        let bodies = self.bodies();
        let mut map = HashMap::with_capacity(bodies.len());
        for body in &bodies {
            let altitude = if !self.sampler.is_usable(body) {
                warn!(body = %body.name(), "terrain surface not usable, falling back to radius");
                body.radius
            } else {
                match self.sample_max_height(body) {
                    Ok(height) => body.radius + height.max(0.0),
                    Err(e) => {
                        warn!(body = %body.name(), error = ?e, "terrain sampling failed, falling back to radius");
                        body.radius
                    }
                }
            };
            map.insert(body.name().to_string(), altitude);
        }
        debug!(count = map.len(), "built max altitude cache");
        *self.max_altitudes.borrow_mut() = Some(map);
    }

    fn sample_max_height(&self, body: &Body) -> Result<f64> {
        let steps_lat = (180.0 / SAMPLE_STEP_DEGREES) as i32;
        let steps_lon = (360.0 / SAMPLE_STEP_DEGREES) as i32;
        let mut highest = f64::NEG_INFINITY;
        for i in 0..=steps_lat {
            let latitude = -90.0 + i as f64 * SAMPLE_STEP_DEGREES;
            for j in 0..steps_lon {
                let longitude = -180.0 + j as f64 * SAMPLE_STEP_DEGREES;
                let height = self.sampler.height_at(body, latitude, longitude)?;
                if !height.is_finite() {
                    bail!("non-finite height at lat={latitude} lon={longitude}");
                }
                highest = highest.max(height);
            }
        }
        Ok(highest)
    }
}
