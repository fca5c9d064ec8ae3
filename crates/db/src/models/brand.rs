use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    #[error("Invalid color '{0}': expected 3 or 6 hex digits")]
    Invalid(String),
}

/// A color in canonical `#RRGGBB` form (uppercase).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(try_from = "String", into = "String")]
#[ts(type = "string")]
pub struct HexColor(String);

impl HexColor {
    /// Accepts `RGB`, `RRGGBB`, with or without one leading `#`, in any case.
    pub fn parse(input: &str) -> Result<Self, ColorError> {
        let digits = input.strip_prefix('#').unwrap_or(input);
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ColorError::Invalid(input.to_string()));
        }

        let expanded = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect::<String>(),
            6 => digits.to_string(),
            _ => return Err(ColorError::Invalid(input.to_string())),
        };

        Ok(Self(format!("#{}", expanded.to_ascii_uppercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for HexColor {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for HexColor {
    type Error = ColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<HexColor> for String {
    fn from(color: HexColor) -> Self {
        color.0
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalizes user-typed color input to `#RRGGBB`.
pub fn normalize_hex_color(input: &str) -> Result<String, ColorError> {
    HexColor::parse(input).map(String::from)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(default, rename_all = "camelCase")]
#[ts(export)]
pub struct Brand {
    /// Data URIs.
    pub logos: Vec<String>,
    pub colors: Vec<HexColor>,
    /// Data URIs.
    pub reference_images: Vec<String>,
}

impl Brand {
    /// Adds a color unless the same normalized value is already present.
    pub fn add_color(&mut self, input: &str) -> Result<&HexColor, ColorError> {
        let color = HexColor::parse(input)?;
        let index = match self.colors.iter().position(|existing| *existing == color) {
            Some(index) => index,
            None => {
                self.colors.push(color);
                self.colors.len() - 1
            }
        };
        Ok(&self.colors[index])
    }

    pub fn remove_color(&mut self, input: &str) -> Result<bool, ColorError> {
        let color = HexColor::parse(input)?;
        let before = self.colors.len();
        self.colors.retain(|existing| *existing != color);
        Ok(self.colors.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_prefix() {
        assert_eq!(normalize_hex_color("FF5733").unwrap(), "#FF5733");
        assert_eq!(normalize_hex_color("#ff5733").unwrap(), "#FF5733");
        assert_eq!(normalize_hex_color("ff5733").unwrap(), "#FF5733");
    }

    #[test]
    fn expands_shorthand() {
        assert_eq!(normalize_hex_color("F00").unwrap(), "#FF0000");
        assert_eq!(normalize_hex_color("#a1c").unwrap(), "#AA11CC");
    }

    #[test]
    fn is_idempotent() {
        for input in ["#FF5733", "abc", "#0f0", "123456"] {
            let once = normalize_hex_color(input).unwrap();
            let twice = normalize_hex_color(&once).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn rejects_bad_lengths_and_characters() {
        for input in ["", "#", "1", "12", "1234", "12345", "1234567", "##FFF", "ZZZZZZ", "#GG0000", " FFF"] {
            assert!(
                matches!(normalize_hex_color(input), Err(ColorError::Invalid(_))),
                "expected {input:?} to be rejected"
            );
        }
    }

    #[test]
    fn brand_colors_deduplicate_after_normalization() {
        let mut brand = Brand::default();
        brand.add_color("f00").unwrap();
        brand.add_color("#FF0000").unwrap();
        brand.add_color("00ff00").unwrap();
        assert_eq!(brand.colors.len(), 2);

        assert!(brand.remove_color("#ff0000").unwrap());
        assert!(!brand.remove_color("ABC").unwrap());
        assert_eq!(brand.colors[0].as_str(), "#00FF00");
    }

    #[test]
    fn stored_colors_are_validated_on_load() {
        let brand: Brand = serde_json::from_str(r##"{"colors": ["#abc"]}"##).unwrap();
        assert_eq!(brand.colors[0].as_str(), "#AABBCC");
        assert!(brand.logos.is_empty());
        assert!(serde_json::from_str::<Brand>(r#"{"colors": ["nope"]}"#).is_err());
    }
}
