//! POI attribute bag
//!
//! Identity is `(poi_type, body)` and is fixed at construction. Every other
//! attribute goes through `apply`, which enforces the entity invariants and
//! reports the attributes that actually changed.

use crate::body::{Body, BodyRef, BodyRegistry};
use crate::color::Color;
use crate::constants::defaults;
use crate::constants::tolerance::RELATIVE_EPSILON;
use crate::error::PoiError;

use super::kind::{PoiAttribute, PoiEdit, PoiType};

/// Relative-tolerance float equality
pub fn approx_eq(a: f64, b: f64) -> bool {
    if a == b {
        return true;
    }
    if !a.is_finite() || !b.is_finite() {
        return false;
    }
    (a - b).abs() <= RELATIVE_EPSILON * a.abs().max(b.abs())
}

/// Formula radius for a standard type
///
/// `None` is always 0 and so is any type without a body. Custom has no
/// formula and is rejected.
pub fn radius_for_type(
    body: Option<&Body>,
    poi_type: PoiType,
    registry: &BodyRegistry,
) -> Result<f64, PoiError> {
    if poi_type == PoiType::Custom {
        return Err(PoiError::Unsupported { poi_type });
    }
    let Some(body) = body else {
        return Ok(0.0);
    };
    Ok(match poi_type {
        PoiType::None | PoiType::Custom => 0.0,
        PoiType::HillSphere => body.hill_sphere,
        PoiType::SphereOfInfluence => body.sphere_of_influence,
        PoiType::Atmosphere => body.atmosphere_depth + body.radius,
        PoiType::MinimumOrbit => body.min_orbital_distance,
        PoiType::MaxTerrainAltitude => registry.max_altitude_for(body),
    })
}

pub fn default_enabled_for_type(poi_type: PoiType) -> bool {
    !matches!(poi_type, PoiType::None | PoiType::HillSphere)
}

pub fn default_resolution_for_type(poi_type: PoiType) -> u32 {
    match poi_type {
        PoiType::None => 0,
        PoiType::Atmosphere => defaults::RESOLUTION_ATMOSPHERE,
        PoiType::MaxTerrainAltitude => defaults::RESOLUTION_MAX_TERRAIN_ALTITUDE,
        _ => defaults::RESOLUTION_STANDARD,
    }
}

#[derive(Debug, Clone)]
pub struct PoiEntity {
    poi_type: PoiType,
    body: Option<BodyRef>,
    label: Option<String>,
    enabled: bool,
    radius: f64,
    color: Color,
    add_planet_radius: bool,
    line_width: f32,
    resolution: u32,
}

impl PoiEntity {
    /// Bare entity; standard types get their formula radius
    pub fn new(poi_type: PoiType, body: Option<BodyRef>, registry: &BodyRegistry) -> Self {
        let radius = if poi_type.is_standard() {
            radius_for_type(body.as_deref(), poi_type, registry).unwrap_or(0.0)
        } else {
            0.0
        };
        Self {
            poi_type,
            body,
            label: None,
            enabled: false,
            radius,
            color: Color::WHITE,
            add_planet_radius: false,
            line_width: defaults::LINE_WIDTH,
            resolution: 0,
        }
    }

    /// Entity carrying the built-in defaults for its type
    pub fn default_from(poi_type: PoiType, body: Option<BodyRef>, registry: &BodyRegistry) -> Self {
        let mut poi = Self::new(poi_type, body, registry);
        poi.enabled = default_enabled_for_type(poi_type);
        poi.color = poi_type.default_color();
        poi.resolution = default_resolution_for_type(poi_type);
        poi.line_width = defaults::LINE_WIDTH;
        poi
    }

    /// Copy with the body replaced. Standard types recompute their radius for
    /// the new body; Custom/None keep theirs.
    pub fn clone_with(&self, new_body: Option<BodyRef>, registry: &BodyRegistry) -> Self {
        let mut poi = self.clone();
        if self.poi_type.is_standard() {
            poi.radius = radius_for_type(new_body.as_deref(), self.poi_type, registry).unwrap_or(0.0);
        }
        poi.body = new_body;
        poi
    }

    pub fn poi_type(&self) -> PoiType {
        self.poi_type
    }

    pub fn body(&self) -> Option<&BodyRef> {
        self.body.as_ref()
    }

    pub fn body_name(&self) -> Option<&str> {
        self.body.as_ref().map(|b| b.name())
    }

    /// Explicit label, or the type name when none was set
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(self.poi_type.name())
    }

    pub fn has_custom_label(&self) -> bool {
        self.label.is_some()
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn diameter(&self) -> f64 {
        self.radius * 2.0
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn add_planet_radius(&self) -> bool {
        self.add_planet_radius
    }

    pub fn line_width(&self) -> f32 {
        self.line_width
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn radius_for_rendering(&self) -> f64 {
        match (&self.body, self.add_planet_radius) {
            (Some(body), true) => self.radius + body.radius,
            _ => self.radius,
        }
    }

    /// Apply one assignment. Returns the attributes whose value changed (empty
    /// when the new value equals the old one).
    pub fn apply(&mut self, edit: PoiEdit) -> Result<Vec<PoiAttribute>, PoiError> {
        let attribute = edit.attribute();
        let changed = match edit {
            PoiEdit::Label(label) => {
                let before = self.label().to_string();
                self.label = label;
                before != self.label()
            }
            PoiEdit::Enabled(enabled) => replace_if_ne(&mut self.enabled, enabled),
            PoiEdit::Radius(radius) => {
                if !radius.is_finite() {
                    return Err(PoiError::InvalidArgument(format!("radius must be finite, got {radius}")));
                }
                if approx_eq(self.radius, radius) {
                    false
                } else {
                    self.radius = radius;
                    true
                }
            }
            PoiEdit::Color(color) => replace_if_ne(&mut self.color, color),
            PoiEdit::AddPlanetRadius(add) => {
                if add && self.poi_type != PoiType::Custom {
                    return Err(PoiError::InvalidArgument(format!(
                        "AddPlanetRadius is only valid for Custom POIs, not {}",
                        self.poi_type
                    )));
                }
                replace_if_ne(&mut self.add_planet_radius, add)
            }
            PoiEdit::LineWidth(width) => {
                if !width.is_finite() {
                    return Err(PoiError::InvalidArgument(format!("line width must be finite, got {width}")));
                }
                if approx_eq(self.line_width as f64, width as f64) {
                    false
                } else {
                    self.line_width = width;
                    true
                }
            }
            PoiEdit::Resolution(resolution) => replace_if_ne(&mut self.resolution, resolution),
        };

        Ok(match (changed, attribute) {
            (false, _) => Vec::new(),
            (true, PoiAttribute::Radius) => vec![PoiAttribute::Radius, PoiAttribute::Diameter],
            (true, attribute) => vec![attribute],
        })
    }

    /// Assignments that reproduce every mutable attribute of `self`
    pub fn edits(&self) -> Vec<PoiEdit> {
        vec![
            PoiEdit::Label(self.label.clone()),
            PoiEdit::Enabled(self.enabled),
            PoiEdit::Radius(self.radius),
            PoiEdit::Color(self.color),
            PoiEdit::AddPlanetRadius(self.add_planet_radius),
            PoiEdit::LineWidth(self.line_width),
            PoiEdit::Resolution(self.resolution),
        ]
    }

    /// All attributes equal (floats within tolerance)
    pub fn value_eq(&self, other: &PoiEntity) -> bool {
        self.poi_type == other.poi_type
            && self.body == other.body
            && self.label() == other.label()
            && self.enabled == other.enabled
            && approx_eq(self.radius, other.radius)
            && self.color == other.color
            && self.add_planet_radius == other.add_planet_radius
            && approx_eq(self.line_width as f64, other.line_width as f64)
            && self.resolution == other.resolution
    }

    /// Same conceptual slot: type and body, plus radius for Custom/None
    pub fn same_target(&self, other: &PoiEntity) -> bool {
        self.targets(other.poi_type, other.body.as_ref(), other.radius)
    }

    /// Whether `self` occupies the slot described by the arguments
    pub fn targets(&self, poi_type: PoiType, body: Option<&BodyRef>, radius: f64) -> bool {
        if self.poi_type != poi_type || self.body.as_ref() != body {
            return false;
        }
        poi_type.is_standard() || approx_eq(self.radius, radius)
    }
}

fn replace_if_ne<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        false
    } else {
        *slot = value;
        true
    }
}
