//! # Quillpad Syntax
//!
//! Data-driven syntax styling.
//!
//! Languages are not hard-coded: each one is a [`GrammarDescriptor`]
//! (keywords, operators, delimiters, comment tokens, flags) and a single
//! engine turns any descriptor plus a text region into styled spans.
//!
//! ## Architecture
//!
//! ```text
//! grammars/*.json ──┐
//!                   ├──► GrammarRegistry ──► Grammar ──► restyle() ──► Vec<StyledSpan>
//! built-in table ───┘          │
//!                              └──► resolve_style() ──► ResolvedStyle
//! ```
//!
//! ## Learning: Data over code
//!
//! Adding a language means writing a JSON file, not a new module. The
//! engine only ever sees the compiled `Grammar`, so there is exactly one
//! tokenizer to test.

mod builtin;
mod category;
mod descriptor;
mod engine;
mod registry;
mod style;

pub use category::StyleCategory;
pub use descriptor::{Grammar, GrammarDescriptor};
pub use engine::{StyledSpan, restyle};
pub use registry::{GrammarRegistry, NO_LANGUAGE, load_descriptors};
pub use style::{
    Color, DisplayStyle, ResolvedStyle, StyleMap, StyleSpec, ThemeDefaults, load_style_overrides,
};

use std::path::PathBuf;

/// Errors that can occur while loading grammars or styles
#[derive(Debug, thiserror::Error)]
pub enum SyntaxError {
    #[error("Invalid color: {0}")]
    InvalidColor(String),

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Grammar in {0} has no name")]
    MissingName(PathBuf),

    #[error("Unknown grammar: {0}")]
    UnknownGrammar(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_styles_a_cpp_file() {
        let registry = GrammarRegistry::with_builtins();
        let grammar = registry.extension_lookup("main.cpp").unwrap();
        assert_eq!(grammar.name(), "C++");

        let text = "int x = 42; // done";
        let spans = restyle(text, 0..text.len(), grammar);
        assert_eq!(spans.first().map(|s| s.category), Some(StyleCategory::Keyword1));
        assert_eq!(spans.last().map(|s| s.category), Some(StyleCategory::LineComment));
    }
}
