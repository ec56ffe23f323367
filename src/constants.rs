//! Application-wide constants
//!
//! This module contains all magic numbers and string literals used throughout
//! the crate, providing a single source of truth for constant values.

/// Floating point comparison constants
pub mod tolerance {
    /// Relative tolerance used for every radius/width comparison
    pub const RELATIVE_EPSILON: f64 = 1e-6;
}

/// Built-in per-type defaults (first tier of the configuration merge)
pub mod defaults {
    /// Line width applied to every freshly built default POI
    pub const LINE_WIDTH: f32 = 1.0;

    /// Circle resolution for the atmosphere boundary
    pub const RESOLUTION_ATMOSPHERE: u32 = 40;

    /// Circle resolution for the max terrain altitude boundary
    pub const RESOLUTION_MAX_TERRAIN_ALTITUDE: u32 = 55;

    /// Circle resolution for every other type
    pub const RESOLUTION_STANDARD: u32 = 50;

    /// Whether MaxTerrainAltitude is drawn on bodies that have an atmosphere
    pub const SHOW_MAX_TERRAIN_ON_ATMOSPHERIC_BODIES: bool = false;
}

/// Terrain sampling grid used to approximate max terrain altitude
pub mod terrain {
    /// Latitude/longitude step between samples in degrees
    pub const SAMPLE_STEP_DEGREES: f64 = 5.0;
}

/// Config tree node tags and value keys
pub mod tree {
    /// Name of the root node produced by `save_overrides`
    pub const ROOT_NODE: &str = "POINTS_OF_INTEREST";

    /// Tag of each child node carrying one override
    pub const POI_NODE: &str = "POI";

    pub const KEY_TYPE: &str = "type";
    pub const KEY_BODY: &str = "body";
    pub const KEY_LABEL: &str = "label";
    pub const KEY_ENABLED: &str = "enabled";
    pub const KEY_RADIUS: &str = "radius";
    pub const KEY_COLOR: &str = "color";
    pub const KEY_ADD_PLANET_RADIUS: &str = "addPlanetRadius";
    pub const KEY_LINE_WIDTH: &str = "lineWidth";
    pub const KEY_RESOLUTION: &str = "resolution";

    /// Resolver-level setting stored on the root node
    pub const KEY_SHOW_MAX_TERRAIN_ON_ATMOSPHERIC: &str =
        "showPoiMaxTerrainAltitudeOnAtmosphericBodies";
}

/// On-disk locations used by the command line front end
pub mod config {
    /// Directory name under the platform config dir
    pub const APP_DIR: &str = "poi-overlay";

    /// Serialized override tree
    pub const OVERRIDES_FILENAME: &str = "overrides.json";

    /// Body catalog
    pub const BODIES_FILENAME: &str = "bodies.json";
}
