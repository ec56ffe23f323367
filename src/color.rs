//! RGBA color used for POI lines and its config-tree encoding
//!
//! Encoded as `"R,G,B"` or `"R,G,B,A"` with each channel an integer 0-255.
//! The alpha channel is omitted when fully opaque.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn is_opaque(&self) -> bool {
        self.a == 255
    }

    /// Parse `"R,G,B"` / `"R,G,B,A"`, returning `None` on anything else
    pub fn parse(text: &str) -> Option<Self> {
        let channels = text
            .split(',')
            .map(|part| part.trim().parse::<u8>().ok())
            .collect::<Option<Vec<u8>>>()?;

        match channels.as_slice() {
            [r, g, b] => Some(Self::rgb(*r, *g, *b)),
            [r, g, b, a] => Some(Self::rgba(*r, *g, *b, *a)),
            _ => None,
        }
    }

    /// Parse with a fallback for empty or malformed input
    pub fn parse_or(text: &str, default: Color) -> Self {
        Self::parse(text).unwrap_or(default)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_opaque() {
            write!(f, "{},{},{}", self.r, self.g, self.b)
        } else {
            write!(f, "{},{},{},{}", self.r, self.g, self.b, self.a)
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rgb_is_opaque() {
        let color = Color::parse("10, 20,30").unwrap();
        assert_eq!(color, Color::rgba(10, 20, 30, 255));
    }

    #[test]
    fn test_parse_rgba() {
        assert_eq!(Color::parse("1,2,3,4"), Some(Color::rgba(1, 2, 3, 4)));
    }

    #[test]
    fn test_parse_invalid_falls_back() {
        let fallback = Color::rgb(9, 9, 9);
        assert_eq!(Color::parse_or("", fallback), fallback);
        assert_eq!(Color::parse_or("1,2", fallback), fallback);
        assert_eq!(Color::parse_or("1,2,3,4,5", fallback), fallback);
        assert_eq!(Color::parse_or("256,0,0", fallback), fallback);
        assert_eq!(Color::parse_or("red", fallback), fallback);
    }

    #[test]
    fn test_display_omits_opaque_alpha() {
        assert_eq!(Color::rgb(255, 0, 128).to_string(), "255,0,128");
        assert_eq!(Color::rgba(255, 0, 128, 64).to_string(), "255,0,128,64");
    }
}
