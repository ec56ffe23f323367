//! POI records and the override set in the config tree

use tracing::{info, warn};

use super::node::ConfigNode;
use super::resolver::{ConfigResolver, ResolverSettings};
use crate::body::BodyRegistry;
use crate::constants::tree::*;
use crate::error::PoiError;
use crate::poi::{PoiEdit, PoiEntity, PoiType};

/// One `POI` node carrying every attribute of `poi`
pub fn poi_to_node(poi: &PoiEntity) -> ConfigNode {
    let mut node = ConfigNode::new(POI_NODE);
    node.set_display(KEY_TYPE, poi.poi_type());
    if let Some(name) = poi.body_name() {
        node.set_value(KEY_BODY, name);
    }
    if poi.has_custom_label() {
        node.set_value(KEY_LABEL, poi.label());
    }
    node.set_bool(KEY_ENABLED, poi.enabled());
    node.set_display(KEY_RADIUS, poi.radius());
    node.set_display(KEY_COLOR, poi.color());
    node.set_bool(KEY_ADD_PLANET_RADIUS, poi.add_planet_radius());
    node.set_display(KEY_LINE_WIDTH, poi.line_width());
    node.set_display(KEY_RESOLUTION, poi.resolution());
    node
}

/// Rebuild a POI from a record. Missing values fall back to the type's
/// built-in defaults; only invariant violations are errors.
pub fn poi_from_node(node: &ConfigNode, registry: &BodyRegistry) -> Result<PoiEntity, PoiError> {
    let poi_type = node.parse_or(KEY_TYPE, PoiType::None);
    let body = node.body_ref(KEY_BODY, registry);
    if body.is_none() {
        if let Some(name) = node.get_value(KEY_BODY) {
            warn!(body = %name, "unknown body in POI record, treating as global");
        }
    }

    let mut poi = PoiEntity::default_from(poi_type, body, registry);
    let edits = [
        PoiEdit::Label(node.get_value(KEY_LABEL).map(str::to_string)),
        PoiEdit::Enabled(node.bool_or(KEY_ENABLED, poi.enabled())),
        PoiEdit::Radius(node.f64_or(KEY_RADIUS, poi.radius())),
        PoiEdit::Color(node.color_or(KEY_COLOR, poi.color())),
        PoiEdit::AddPlanetRadius(node.bool_or(KEY_ADD_PLANET_RADIUS, false)),
        PoiEdit::LineWidth(node.f32_or(KEY_LINE_WIDTH, poi.line_width())),
        PoiEdit::Resolution(node.parse_or(KEY_RESOLUTION, poi.resolution())),
    ];
    for edit in edits {
        poi.apply(edit)?;
    }
    Ok(poi)
}

/// Root node holding resolver settings and the whole override set
pub fn save_overrides(resolver: &ConfigResolver) -> ConfigNode {
    let mut root = ConfigNode::new(ROOT_NODE);
    root.set_bool(
        KEY_SHOW_MAX_TERRAIN_ON_ATMOSPHERIC,
        resolver.settings().show_max_terrain_altitude_on_atmospheric_bodies,
    );
    for poi in resolver.overrides() {
        root.add_node(poi_to_node(&poi.entity()));
    }
    root
}

/// Load settings and replace the override set. Records that break an
/// invariant or carry no type are skipped. Returns the number loaded.
pub fn load_overrides(resolver: &ConfigResolver, root: &ConfigNode) -> usize {
    let defaults = ResolverSettings::default();
    resolver.set_settings(ResolverSettings {
        show_max_terrain_altitude_on_atmospheric_bodies: root.bool_or(
            KEY_SHOW_MAX_TERRAIN_ON_ATMOSPHERIC,
            defaults.show_max_terrain_altitude_on_atmospheric_bodies,
        ),
    });

    let registry = resolver.registry().clone();
    let mut pois = Vec::new();
    for (index, node) in root.get_nodes(POI_NODE).enumerate() {
        match poi_from_node(node, &registry) {
            Ok(poi) if poi.poi_type() == PoiType::None => {
                warn!(index, "POI record without a usable type, skipping");
            }
            Ok(poi) => pois.push(poi),
            Err(e) => warn!(index, error = %e, "rejected POI record"),
        }
    }
    let loaded = resolver.update_configured_pois(pois).len();
    info!(loaded, "loaded POI overrides");
    loaded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{Body, FlatTerrain};
    use crate::color::Color;
    use std::rc::Rc;

    fn registry() -> Rc<BodyRegistry> {
        let mut kerbin = Body::new("Kerbin", 600_000.0);
        kerbin.atmosphere_depth = 70_000.0;
        Rc::new(BodyRegistry::new(vec![kerbin], FlatTerrain::default()))
    }

    fn sample_custom(registry: &BodyRegistry) -> PoiEntity {
        let body = registry.resolve_by_name(Some("Kerbin"));
        let mut poi = PoiEntity::default_from(PoiType::Custom, body, registry);
        for edit in [
            PoiEdit::Label(Some("Relay ring".to_string())),
            PoiEdit::Radius(2_863_334.061_8),
            PoiEdit::Color(Color::rgba(12, 34, 56, 78)),
            PoiEdit::AddPlanetRadius(true),
            PoiEdit::LineWidth(2.5),
            PoiEdit::Resolution(120),
            PoiEdit::Enabled(false),
        ] {
            poi.apply(edit).unwrap();
        }
        poi
    }

    #[test]
    fn test_record_round_trip_custom() {
        let registry = registry();
        let poi = sample_custom(&registry);
        let back = poi_from_node(&poi_to_node(&poi), &registry).unwrap();
        assert!(back.value_eq(&poi));
        assert_eq!(back.body_name(), Some("Kerbin"));
    }

    #[test]
    fn test_record_round_trip_global_standard() {
        let registry = registry();
        let mut poi = PoiEntity::default_from(PoiType::HillSphere, None, &registry);
        poi.apply(PoiEdit::Enabled(true)).unwrap();
        let node = poi_to_node(&poi);
        assert!(!node.has_value(KEY_BODY));
        assert!(!node.has_value(KEY_LABEL));
        assert_eq!(node.get_value(KEY_COLOR), Some("178,178,178"));

        let back = poi_from_node(&node, &registry).unwrap();
        assert!(back.value_eq(&poi));
        assert!(!back.has_custom_label());
    }

    #[test]
    fn test_record_missing_values_use_type_defaults() {
        let registry = registry();
        let mut node = ConfigNode::new(POI_NODE);
        node.add_value(KEY_TYPE, "Atmosphere");
        node.add_value(KEY_BODY, "Kerbin");
        node.add_value(KEY_COLOR, "garbage");

        let poi = poi_from_node(&node, &registry).unwrap();
        assert_eq!(poi.color(), PoiType::Atmosphere.default_color());
        assert_eq!(poi.radius(), 670_000.0);
        assert_eq!(poi.resolution(), 40);
        assert!(poi.enabled());
    }

    #[test]
    fn test_record_rejects_add_planet_radius_on_standard() {
        let registry = registry();
        let mut node = ConfigNode::new(POI_NODE);
        node.add_value(KEY_TYPE, "MinimumOrbit");
        node.add_value(KEY_ADD_PLANET_RADIUS, "True");
        assert!(matches!(
            poi_from_node(&node, &registry),
            Err(PoiError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_unknown_body_becomes_global() {
        let registry = registry();
        let mut node = ConfigNode::new(POI_NODE);
        node.add_value(KEY_TYPE, "Custom");
        node.add_value(KEY_BODY, "Laythe");
        let poi = poi_from_node(&node, &registry).unwrap();
        assert!(poi.body().is_none());
    }

    #[test]
    fn test_save_and_load_override_set() {
        let registry = registry();
        let resolver = ConfigResolver::new(registry.clone());
        let kerbin = registry.resolve_by_name(Some("Kerbin")).unwrap();
        resolver.add_poi(sample_custom(&registry)).unwrap();
        resolver
            .resolve_poi_for(Some(&kerbin), PoiType::Atmosphere)
            .unwrap()
            .set_enabled(false)
            .unwrap();
        resolver.set_settings(ResolverSettings { show_max_terrain_altitude_on_atmospheric_bodies: true });

        let root = save_overrides(&resolver);
        assert_eq!(root.get_nodes(POI_NODE).count(), 2);

        let fresh = ConfigResolver::new(registry.clone());
        let mut with_junk = root.clone();
        let mut junk = ConfigNode::new(POI_NODE);
        junk.add_value(KEY_TYPE, "Nonsense");
        with_junk.add_node(junk);

        assert_eq!(load_overrides(&fresh, &with_junk), 2);
        assert!(fresh.settings().show_max_terrain_altitude_on_atmospheric_bodies);
        assert!(!fresh.get_global_enable_for(Some(&kerbin), PoiType::Atmosphere));
        assert_eq!(fresh.get_custom_pois_for(Some(&kerbin)).len(), 1);
        assert_eq!(save_overrides(&fresh).get_nodes(POI_NODE).count(), 2);
    }
}
