//! Display styles: colors, style maps and resolution against a theme.
//!
//! A style entry may be written either as a bare color string or as an
//! object:
//!
//! ```json
//! { "Keyword1": "#0000FF", "String": { "color": "#808080", "italic": true } }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::{StyleCategory, SyntaxError};

/// An RGB color, written as `#RRGGBB` or `#RGB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(0xff, 0xff, 0xff);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#RRGGBB` / `#RGB` (the leading `#` is optional).
    pub fn parse(s: &str) -> Result<Self, SyntaxError> {
        let hex = s.trim().trim_start_matches('#');
        let invalid = || SyntaxError::InvalidColor(s.to_string());
        if !hex.is_ascii() {
            return Err(invalid());
        }

        let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| invalid());
        match hex.len() {
            6 => Ok(Self::rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => {
                let short = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 0x11);
                Ok(Self::rgb(short(0)?, short(1)?, short(2)?))
            }
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = SyntaxError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Style attributes as written in a grammar or override file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayStyle {
    /// Foreground color (theme foreground when absent)
    #[serde(rename = "color", skip_serializing_if = "Option::is_none")]
    pub foreground: Option<Color>,
    /// Background override (theme background when absent)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<Color>,
    pub bold: bool,
    pub italic: bool,
}

/// One entry of a style map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StyleSpec {
    /// Plain color string (legacy form)
    Color(Color),
    /// Full attribute object
    Detailed(DisplayStyle),
}

impl StyleSpec {
    pub fn to_display_style(self) -> DisplayStyle {
        match self {
            StyleSpec::Color(color) => DisplayStyle {
                foreground: Some(color),
                ..Default::default()
            },
            StyleSpec::Detailed(style) => style,
        }
    }
}

/// Style-category display name to style.
pub type StyleMap = BTreeMap<String, StyleSpec>;

/// Theme colors used for anything a style map leaves unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeDefaults {
    pub foreground: Color,
    pub background: Color,
}

impl Default for ThemeDefaults {
    fn default() -> Self {
        Self {
            foreground: Color::BLACK,
            background: Color::WHITE,
        }
    }
}

/// Fully resolved style for one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedStyle {
    pub foreground: Color,
    pub background: Color,
    pub bold: bool,
    pub italic: bool,
}

impl ResolvedStyle {
    /// Resolves `category` from the first map that lists it.
    pub fn resolve(category: StyleCategory, maps: &[&StyleMap], theme: ThemeDefaults) -> Self {
        let style = maps
            .iter()
            .find_map(|map| map.get(category.display_name()))
            .map(|spec| spec.to_display_style())
            .unwrap_or_default();

        Self {
            foreground: style.foreground.unwrap_or(theme.foreground),
            background: style.background.unwrap_or(theme.background),
            bold: style.bold,
            italic: style.italic,
        }
    }
}

/// Reads a legacy per-language style override file.
pub fn load_style_overrides(path: impl AsRef<Path>) -> Result<StyleMap, SyntaxError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let map: StyleMap = serde_json::from_str(&content).map_err(|source| SyntaxError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    for name in map.keys() {
        if StyleCategory::from_name(name).is_none() {
            tracing::debug!(path = %path.display(), style = %name, "Ignoring unknown style name");
        }
    }
    Ok(map)
}
