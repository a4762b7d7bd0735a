//! RGBA colour value parsed from hex notation.

use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Straight-alpha RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }

    /// Serde default for rule colours.
    pub(crate) fn default_black() -> Self {
        Self::opaque(0, 0, 0)
    }

    /// As the canvas pixel type.
    #[inline]
    pub fn to_pixel(self) -> image::Rgba<u8> {
        image::Rgba([self.r, self.g, self.b, self.a])
    }

    /// Returns this colour with its alpha scaled by `factor` (clamped).
    pub fn with_opacity(self, factor: f64) -> Self {
        let a = (self.a as f64 * factor.clamp(0.0, 1.0)).round() as u8;
        Self { a, ..self }
    }
}

/// Parse failure for a hex colour literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorParseError(String);

impl fmt::Display for ColorParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid colour literal '{}'", self.0)
    }
}

impl std::error::Error for ColorParseError {}

impl FromStr for Color {
    type Err = ColorParseError;

    /// Accepts `#rgb`, `#rrggbb` and `#rrggbbaa`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .strip_prefix('#')
            .ok_or_else(|| ColorParseError(s.to_string()))?;
        let err = || ColorParseError(s.to_string());

        match hex.len() {
            3 => {
                let mut nibbles = [0u8; 3];
                for (i, c) in hex.chars().enumerate() {
                    let n = c.to_digit(16).ok_or_else(err)? as u8;
                    nibbles[i] = n * 16 + n;
                }
                Ok(Color::opaque(nibbles[0], nibbles[1], nibbles[2]))
            }
            6 | 8 => {
                let mut bytes = [0u8; 4];
                bytes[3] = 255;
                for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
                    let pair = std::str::from_utf8(chunk).map_err(|_| err())?;
                    bytes[i] = u8::from_str_radix(pair, 16).map_err(|_| err())?;
                }
                Ok(Color::rgba(bytes[0], bytes[1], bytes[2], bytes[3]))
            }
            _ => Err(err()),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rrggbb() {
        assert_eq!("#ff8000".parse::<Color>().unwrap(), Color::opaque(255, 128, 0));
    }

    #[test]
    fn test_parse_rrggbbaa() {
        assert_eq!(
            "#0000ff7f".parse::<Color>().unwrap(),
            Color::rgba(0, 0, 255, 127)
        );
    }

    #[test]
    fn test_parse_short_form() {
        assert_eq!("#f0a".parse::<Color>().unwrap(), Color::opaque(255, 0, 170));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("red".parse::<Color>().is_err());
        assert!("#12345".parse::<Color>().is_err());
        assert!("#zzzzzz".parse::<Color>().is_err());
    }

    #[test]
    fn test_with_opacity() {
        let c = Color::opaque(10, 20, 30).with_opacity(0.5);
        assert_eq!(c.a, 128);
        assert_eq!((c.r, c.g, c.b), (10, 20, 30));
    }
}
