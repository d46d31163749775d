//! The fixed style-category space shared by every grammar.

use serde::{Deserialize, Serialize};

/// Highlighting class assigned to a run of text.
///
/// Every grammar maps into this same set, which is what lets one engine
/// serve all languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StyleCategory {
    Default,
    BlockComment,
    LineComment,
    Number,
    Keyword1,
    Keyword2,
    Keyword3,
    Keyword4,
    Operator,
    String,
    String2,
    Property,
    Error,
}

impl StyleCategory {
    /// All categories, in style-number order.
    pub const ALL: [StyleCategory; 13] = [
        StyleCategory::Default,
        StyleCategory::BlockComment,
        StyleCategory::LineComment,
        StyleCategory::Number,
        StyleCategory::Keyword1,
        StyleCategory::Keyword2,
        StyleCategory::Keyword3,
        StyleCategory::Keyword4,
        StyleCategory::Operator,
        StyleCategory::String,
        StyleCategory::String2,
        StyleCategory::Property,
        StyleCategory::Error,
    ];

    /// Name used in descriptor `styles` maps and style override files.
    pub fn display_name(self) -> &'static str {
        match self {
            StyleCategory::Default => "Default",
            StyleCategory::BlockComment => "BlockComment",
            StyleCategory::LineComment => "LineComment",
            StyleCategory::Number => "Number",
            StyleCategory::Keyword1 => "Keyword1",
            StyleCategory::Keyword2 => "Keyword2",
            StyleCategory::Keyword3 => "Keyword3",
            StyleCategory::Keyword4 => "Keyword4",
            StyleCategory::Operator => "Operator",
            StyleCategory::String => "String",
            StyleCategory::String2 => "String2",
            StyleCategory::Property => "Property",
            StyleCategory::Error => "Error",
        }
    }

    /// Parses a display name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.display_name() == name)
    }

    /// Style number handed to the editing widget.
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Keyword tier for a 0-based class index.
    pub(crate) fn keyword(tier: usize) -> Self {
        match tier {
            0 => StyleCategory::Keyword1,
            1 => StyleCategory::Keyword2,
            2 => StyleCategory::Keyword3,
            _ => StyleCategory::Keyword4,
        }
    }
}

impl std::fmt::Display for StyleCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for category in StyleCategory::ALL {
            assert_eq!(StyleCategory::from_name(category.display_name()), Some(category));
        }
        assert_eq!(StyleCategory::from_name("Comment"), None);
        assert_eq!(StyleCategory::Property.index(), 11);
    }
}
