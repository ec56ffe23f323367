//! POI types and the typed change vocabulary shared by every POI container

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::color::Color;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PoiType {
    None,
    HillSphere,
    SphereOfInfluence,
    Atmosphere,
    MinimumOrbit,
    MaxTerrainAltitude,
    Custom,
}

impl PoiType {
    pub const ALL: [PoiType; 7] = [
        PoiType::None,
        PoiType::HillSphere,
        PoiType::SphereOfInfluence,
        PoiType::Atmosphere,
        PoiType::MinimumOrbit,
        PoiType::MaxTerrainAltitude,
        PoiType::Custom,
    ];

    /// Types with a formula-derived radius, in display order
    pub const STANDARD: [PoiType; 5] = [
        PoiType::HillSphere,
        PoiType::SphereOfInfluence,
        PoiType::MinimumOrbit,
        PoiType::Atmosphere,
        PoiType::MaxTerrainAltitude,
    ];

    pub fn is_standard(self) -> bool {
        !matches!(self, PoiType::None | PoiType::Custom)
    }

    /// Canonical name used both as the default label and in the config tree
    pub fn name(self) -> &'static str {
        match self {
            PoiType::None => "None",
            PoiType::HillSphere => "HillSphere",
            PoiType::SphereOfInfluence => "SphereOfInfluence",
            PoiType::Atmosphere => "Atmosphere",
            PoiType::MinimumOrbit => "MinimumOrbit",
            PoiType::MaxTerrainAltitude => "MaxTerrainAltitude",
            PoiType::Custom => "Custom",
        }
    }

    pub fn default_color(self) -> Color {
        match self {
            PoiType::None => Color::WHITE,
            PoiType::HillSphere => Color::rgb(178, 178, 178),
            PoiType::SphereOfInfluence => Color::rgb(255, 0, 255),
            PoiType::Atmosphere => Color::rgb(0, 255, 255),
            PoiType::MinimumOrbit => Color::rgb(0, 255, 0),
            PoiType::MaxTerrainAltitude => Color::rgb(255, 128, 0),
            PoiType::Custom => Color::rgb(255, 255, 0),
        }
    }
}

impl fmt::Display for PoiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PoiType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PoiType::ALL
            .into_iter()
            .find(|ty| ty.name().eq_ignore_ascii_case(s.trim()))
            .ok_or(())
    }
}

/// Every attribute a change notification can name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoiAttribute {
    Label,
    Enabled,
    Radius,
    /// Derived from `Radius`; fired alongside it
    Diameter,
    Color,
    AddPlanetRadius,
    LineWidth,
    Resolution,
}

impl PoiAttribute {
    pub const ALL: [PoiAttribute; 8] = [
        PoiAttribute::Label,
        PoiAttribute::Enabled,
        PoiAttribute::Radius,
        PoiAttribute::Diameter,
        PoiAttribute::Color,
        PoiAttribute::AddPlanetRadius,
        PoiAttribute::LineWidth,
        PoiAttribute::Resolution,
    ];
}

/// Notification delivered to POI listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoiEvent {
    Changed(PoiAttribute),
    /// A sealed POI diverged from its snapshot
    Dirtied,
}

/// A single attribute assignment
#[derive(Debug, Clone, PartialEq)]
pub enum PoiEdit {
    Label(Option<String>),
    Enabled(bool),
    Radius(f64),
    Color(Color),
    AddPlanetRadius(bool),
    LineWidth(f32),
    Resolution(u32),
}

impl PoiEdit {
    pub fn attribute(&self) -> PoiAttribute {
        match self {
            PoiEdit::Label(_) => PoiAttribute::Label,
            PoiEdit::Enabled(_) => PoiAttribute::Enabled,
            PoiEdit::Radius(_) => PoiAttribute::Radius,
            PoiEdit::Color(_) => PoiAttribute::Color,
            PoiEdit::AddPlanetRadius(_) => PoiAttribute::AddPlanetRadius,
            PoiEdit::LineWidth(_) => PoiAttribute::LineWidth,
            PoiEdit::Resolution(_) => PoiAttribute::Resolution,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_types() {
        assert!(!PoiType::None.is_standard());
        assert!(!PoiType::Custom.is_standard());
        assert!(PoiType::STANDARD.iter().all(|ty| ty.is_standard()));
    }

    #[test]
    fn test_parse_canonical_names() {
        for ty in PoiType::ALL {
            assert_eq!(ty.name().parse::<PoiType>(), Ok(ty));
        }
        assert_eq!("atmosphere".parse::<PoiType>(), Ok(PoiType::Atmosphere));
        assert!("Ring".parse::<PoiType>().is_err());
    }
}
