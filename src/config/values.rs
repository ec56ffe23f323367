//! Typed value encodings on top of `ConfigNode`
//!
//! Readers never fail: a missing or unparsable value yields the caller's
//! default. Numbers use Rust's locale-independent decimal formatting.

use std::fmt::Display;
use std::str::FromStr;

use super::node::ConfigNode;
use crate::body::{BodyRef, BodyRegistry};
use crate::color::Color;

pub fn format_bool(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

pub fn parse_bool(text: &str) -> Option<bool> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

impl ConfigNode {
    /// Parse a value with `FromStr` (numbers, enums)
    pub fn parse_or<T: FromStr>(&self, key: &str, default: T) -> T {
        self.get_value(key)
            .and_then(|text| text.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Like `parse_or` but rejects NaN and infinities
    pub fn f64_or(&self, key: &str, default: f64) -> f64 {
        let value = self.parse_or(key, default);
        if value.is_finite() { value } else { default }
    }

    pub fn f32_or(&self, key: &str, default: f32) -> f32 {
        let value = self.parse_or(key, default);
        if value.is_finite() { value } else { default }
    }

    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        self.get_value(key).and_then(parse_bool).unwrap_or(default)
    }

    pub fn color_or(&self, key: &str, default: Color) -> Color {
        self.get_value(key)
            .map(|text| Color::parse_or(text, default))
            .unwrap_or(default)
    }

    /// Body reference by name; absent or unknown names yield `None`
    pub fn body_ref(&self, key: &str, registry: &BodyRegistry) -> Option<BodyRef> {
        registry.resolve_by_name(self.get_value(key).map(str::trim))
    }

    pub fn set_bool(&mut self, key: &str, value: bool) {
        self.set_value(key, format_bool(value));
    }

    pub fn set_display(&mut self, key: &str, value: impl Display) {
        self.set_value(key, value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Body;
    use crate::poi::PoiType;

    fn node_with(key: &str, value: &str) -> ConfigNode {
        let mut node = ConfigNode::new("TEST");
        node.add_value(key, value);
        node
    }

    #[test]
    fn test_bool_encoding() {
        assert_eq!(node_with("b", "True").bool_or("b", false), true);
        assert_eq!(node_with("b", "false").bool_or("b", true), false);
        assert_eq!(node_with("b", "yes").bool_or("b", true), true);
        assert_eq!(ConfigNode::new("EMPTY").bool_or("b", false), false);
    }

    #[test]
    fn test_numbers_fall_back_on_garbage() {
        assert_eq!(node_with("n", "42").parse_or("n", 0u32), 42);
        assert_eq!(node_with("n", "-1").parse_or("n", 7u32), 7);
        assert_eq!(node_with("f", "1.5e3").f64_or("f", 0.0), 1500.0);
        assert_eq!(node_with("f", "NaN").f64_or("f", 2.0), 2.0);
        assert_eq!(node_with("f", "abc").f32_or("f", 1.0), 1.0);
    }

    #[test]
    fn test_float_text_round_trips_exactly() {
        let mut node = ConfigNode::new("TEST");
        let value = 670_000.123_456_789_f64;
        node.set_display("f", value);
        assert_eq!(node.f64_or("f", 0.0), value);
    }

    #[test]
    fn test_enum_and_color() {
        assert_eq!(node_with("t", "Atmosphere").parse_or("t", PoiType::None), PoiType::Atmosphere);
        assert_eq!(node_with("t", "Nonsense").parse_or("t", PoiType::Custom), PoiType::Custom);
        assert_eq!(node_with("c", "1,2,3").color_or("c", Color::WHITE), Color::rgb(1, 2, 3));
        assert_eq!(node_with("c", "").color_or("c", Color::WHITE), Color::WHITE);
    }

    #[test]
    fn test_body_ref_resolution() {
        let registry = BodyRegistry::new(vec![Body::new("Kerbin", 1.0)], crate::body::FlatTerrain::default());
        assert_eq!(node_with("body", "Kerbin").body_ref("body", &registry).unwrap().name(), "Kerbin");
        assert!(node_with("body", "Laythe").body_ref("body", &registry).is_none());
        assert!(ConfigNode::new("EMPTY").body_ref("body", &registry).is_none());
    }
}
