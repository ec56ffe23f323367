//! Celestial bodies and the registry that resolves them by name
//!
//! Bodies are identified by name. `BodyRef` is the cheap shared handle POIs
//! carry; two handles compare equal when they name the same body.

pub mod registry;

pub use registry::{BodyRegistry, FlatTerrain, TerrainSampler};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::rc::Rc;

/// Physical attributes of a body (all distances in meters from the body center
/// unless noted)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub name: String,
    /// Mean sea-level radius
    pub radius: f64,
    /// Height of the atmosphere above `radius` (0 for airless bodies)
    #[serde(default)]
    pub atmosphere_depth: f64,
    #[serde(default)]
    pub hill_sphere: f64,
    #[serde(default)]
    pub sphere_of_influence: f64,
    /// Lowest safe orbit, measured from the center
    #[serde(default)]
    pub min_orbital_distance: f64,
}

impl Body {
    pub fn new(name: impl Into<String>, radius: f64) -> Self {
        Self {
            name: name.into(),
            radius,
            atmosphere_depth: 0.0,
            hill_sphere: 0.0,
            sphere_of_influence: 0.0,
            min_orbital_distance: radius,
        }
    }

    pub fn has_atmosphere(&self) -> bool {
        self.atmosphere_depth > 0.0
    }
}

/// Shared, name-identified reference to a body
#[derive(Debug, Clone)]
pub struct BodyRef(Rc<Body>);

impl BodyRef {
    pub fn new(body: Body) -> Self {
        Self(Rc::new(body))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }
}

impl Deref for BodyRef {
    type Target = Body;

    fn deref(&self) -> &Body {
        &self.0
    }
}

impl PartialEq for BodyRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0) || self.0.name == other.0.name
    }
}

impl Eq for BodyRef {}

impl Hash for BodyRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.name.hash(state);
    }
}

impl fmt::Display for BodyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<Body> for BodyRef {
    fn from(body: Body) -> Self {
        Self::new(body)
    }
}

/// Name of an optional body, used for logging and index keys
pub fn scope_name(body: Option<&BodyRef>) -> Option<String> {
    body.map(|b| b.name().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_ref_equality_is_by_name() {
        let a = BodyRef::new(Body::new("Kerbin", 600_000.0));
        let b = BodyRef::new(Body::new("Kerbin", 1.0));
        let c = BodyRef::new(Body::new("Mun", 200_000.0));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_has_atmosphere() {
        let mut body = Body::new("Duna", 320_000.0);
        assert!(!body.has_atmosphere());
        body.atmosphere_depth = 50_000.0;
        assert!(body.has_atmosphere());
    }
}
