//! Points-of-interest overlay core
//!
//! Per-body reference spheres (atmosphere, sphere of influence, custom rings)
//! resolved from built-in defaults, global templates and user overrides, and
//! mirrored into renderer handles.

#![forbid(unsafe_code)]

pub mod body;
pub mod color;
pub mod config;
pub mod constants;
pub mod error;
pub mod overlay;
pub mod poi;
pub mod propagation;
pub mod render;

pub use body::{Body, BodyRef, BodyRegistry, FlatTerrain, TerrainSampler};
pub use color::Color;
pub use config::{ConfigNode, ConfigResolver};
pub use error::PoiError;
pub use overlay::PoiOverlay;
pub use poi::{PoiAttribute, PoiEdit, PoiEntity, PoiEvent, PoiType, SharedPoi};
pub use render::{RenderBackend, RenderReferenceCache};
