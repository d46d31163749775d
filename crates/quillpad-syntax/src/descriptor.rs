//! Grammar descriptors: declarative lexical rules for one language.
//!
//! ## Learning: Serde defaults
//!
//! Every field except `name` may be left out of a descriptor file.
//! `#[serde(default = "...")]` fills in the same defaults a hand-written
//! C-like grammar would use, so a minimal file is just a name, a few
//! extensions and a keyword list.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::style::StyleMap;
use crate::{StyleCategory, SyntaxError};

/// Declarative description of a language's lexical rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrammarDescriptor {
    /// Unique display name; also the lookup key for style override files
    pub name: String,

    /// File suffixes handled by this grammar (e.g. `".cpp"`)
    #[serde(default)]
    pub extensions: Vec<String>,

    #[serde(default)]
    pub keywords1: Vec<String>,
    #[serde(default)]
    pub keywords2: Vec<String>,
    #[serde(default)]
    pub keywords3: Vec<String>,
    #[serde(default)]
    pub keywords4: Vec<String>,

    /// Operator spellings; matched longest-first
    #[serde(default)]
    pub operators: Vec<String>,

    #[serde(default = "default_string_delimiters")]
    pub string_delimiters: Vec<char>,
    #[serde(default = "default_string2_delimiters")]
    pub string2_delimiters: Vec<char>,

    /// Empty disables line comments
    #[serde(default = "default_line_comment")]
    pub line_comment: String,
    /// Empty start or end disables block comments
    #[serde(default = "default_block_comment_start")]
    pub block_comment_start: String,
    #[serde(default = "default_block_comment_end")]
    pub block_comment_end: String,

    #[serde(default = "default_true")]
    pub case_sensitive: bool,
    #[serde(default = "default_true")]
    pub detect_numbers: bool,

    /// Classify `"key":` as `Property` instead of `String`
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub property_pattern: bool,

    /// Category display name to style
    #[serde(default)]
    pub styles: StyleMap,
}

fn default_string_delimiters() -> Vec<char> {
    vec!['"']
}

fn default_string2_delimiters() -> Vec<char> {
    vec!['\'']
}

fn default_line_comment() -> String {
    "//".to_string()
}

fn default_block_comment_start() -> String {
    "/*".to_string()
}

fn default_block_comment_end() -> String {
    "*/".to_string()
}

fn default_true() -> bool {
    true
}

/// Accepts `true`/`false`, `null`, or a pattern string (non-empty enables).
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Pattern(String),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(enabled)) => enabled,
        Some(Flag::Pattern(pattern)) => !pattern.is_empty(),
        None => false,
    })
}

impl GrammarDescriptor {
    /// Creates a descriptor with default rules and no keywords.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extensions: Vec::new(),
            keywords1: Vec::new(),
            keywords2: Vec::new(),
            keywords3: Vec::new(),
            keywords4: Vec::new(),
            operators: Vec::new(),
            string_delimiters: default_string_delimiters(),
            string2_delimiters: default_string2_delimiters(),
            line_comment: default_line_comment(),
            block_comment_start: default_block_comment_start(),
            block_comment_end: default_block_comment_end(),
            case_sensitive: true,
            detect_numbers: true,
            property_pattern: false,
            styles: StyleMap::new(),
        }
    }

    /// Parses a descriptor from JSON text.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Reads and parses a descriptor file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SyntaxError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let descriptor = Self::from_json(&content).map_err(|source| SyntaxError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        if descriptor.name.trim().is_empty() {
            return Err(SyntaxError::MissingName(path.to_path_buf()));
        }
        Ok(descriptor)
    }

    /// Extensions normalized to a leading dot, empties removed.
    pub fn normalized_extensions(&self) -> impl Iterator<Item = String> + '_ {
        self.extensions
            .iter()
            .map(|ext| ext.trim())
            .filter(|ext| !ext.is_empty() && *ext != ".")
            .map(|ext| {
                if ext.starts_with('.') {
                    ext.to_string()
                } else {
                    format!(".{}", ext)
                }
            })
    }
}

/// A descriptor plus the lookup tables the engine needs.
///
/// Built once when the descriptor is registered and never mutated
/// afterwards; the engine only ever borrows it.
#[derive(Debug, Clone)]
pub struct Grammar {
    descriptor: GrammarDescriptor,
    /// Keyword classes 1..4, case-folded when the grammar is case-insensitive
    keywords: [HashSet<String>; 4],
    /// Operators sorted longest-first
    operators: Vec<String>,
}

impl Grammar {
    pub fn new(descriptor: GrammarDescriptor) -> Self {
        let fold = |words: &[String]| -> HashSet<String> {
            words
                .iter()
                .map(|w| {
                    if descriptor.case_sensitive {
                        w.clone()
                    } else {
                        w.to_lowercase()
                    }
                })
                .collect()
        };
        let keywords = [
            fold(&descriptor.keywords1),
            fold(&descriptor.keywords2),
            fold(&descriptor.keywords3),
            fold(&descriptor.keywords4),
        ];

        let mut operators: Vec<String> = descriptor
            .operators
            .iter()
            .filter(|op| !op.is_empty())
            .cloned()
            .collect();
        // Stable sort: equal-length spellings keep their declared order.
        operators.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));

        Self {
            descriptor,
            keywords,
            operators,
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn descriptor(&self) -> &GrammarDescriptor {
        &self.descriptor
    }

    /// Classifies a word: first matching keyword class wins, otherwise `Default`.
    pub fn classify_word(&self, word: &str) -> StyleCategory {
        let folded;
        let key = if self.descriptor.case_sensitive {
            word
        } else {
            folded = word.to_lowercase();
            folded.as_str()
        };

        self.keywords
            .iter()
            .position(|class| class.contains(key))
            .map(StyleCategory::keyword)
            .unwrap_or(StyleCategory::Default)
    }

    /// Length in bytes of the longest operator starting `rest`.
    pub fn operator_at(&self, rest: &str) -> Option<usize> {
        self.operators
            .iter()
            .find(|op| rest.starts_with(op.as_str()))
            .map(|op| op.len())
    }

    pub(crate) fn string_kind(&self, c: char) -> Option<StringKind> {
        if self.descriptor.string_delimiters.contains(&c) {
            Some(StringKind::String)
        } else if self.descriptor.string2_delimiters.contains(&c) {
            Some(StringKind::String2)
        } else {
            None
        }
    }

    pub(crate) fn line_comment(&self) -> Option<&str> {
        Some(self.descriptor.line_comment.as_str()).filter(|t| !t.is_empty())
    }

    pub(crate) fn block_comment(&self) -> Option<(&str, &str)> {
        let start = self.descriptor.block_comment_start.as_str();
        let end = self.descriptor.block_comment_end.as_str();
        (!start.is_empty() && !end.is_empty()).then_some((start, end))
    }
}

/// Which of the two independently tracked string kinds a delimiter opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StringKind {
    String,
    String2,
}

impl StringKind {
    pub(crate) fn category(self) -> StyleCategory {
        match self {
            StringKind::String => StyleCategory::String,
            StringKind::String2 => StyleCategory::String2,
        }
    }
}
