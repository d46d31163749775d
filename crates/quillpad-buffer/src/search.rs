//! Find / find next / find previous.
//!
//! Both plain-text and regex searches compile to a `regex::Regex`; plain
//! text is escaped first so one code path handles case folding for both.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Search direction relative to the caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchDirection {
    /// Towards the end of the document
    #[default]
    Down,
    /// Towards the start of the document
    Up,
}

/// Options for a single search request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Text or pattern to look for
    pub text: String,
    /// Compare case-sensitively
    pub match_case: bool,
    /// Continue from the opposite end when nothing is found
    pub wrap_around: bool,
    /// Treat `text` as a regular expression
    pub use_regex: bool,
    /// Search direction
    pub direction: SearchDirection,
}

impl SearchOptions {
    /// Creates options for a plain, case-insensitive downward search.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Returns the same options searching in `direction`.
    pub fn with_direction(mut self, direction: SearchDirection) -> Self {
        self.direction = direction;
        self
    }

    fn compile(&self) -> Result<Regex, regex::Error> {
        let pattern = if self.use_regex {
            self.text.clone()
        } else {
            regex::escape(&self.text)
        };
        RegexBuilder::new(&pattern)
            .case_insensitive(!self.match_case)
            .build()
    }
}

/// Finds the match nearest to `caret` (a byte offset) in the requested direction.
///
/// Searching down returns the first match starting at or after the caret.
/// Searching up returns the most recent match that ends at or before it.
pub fn find(text: &str, caret: usize, options: &SearchOptions) -> Result<Option<Range<usize>>, regex::Error> {
    if options.text.is_empty() {
        return Ok(None);
    }
    let pattern = options.compile()?;
    let caret = clamp_to_boundary(text, caret);

    let found = match options.direction {
        SearchDirection::Down => pattern
            .find_at(text, caret)
            .or_else(|| {
                options
                    .wrap_around
                    .then(|| pattern.find(text))
                    .flatten()
            })
            .map(|m| m.range()),
        SearchDirection::Up => pattern
            .find_iter(&text[..caret])
            .last()
            .or_else(|| {
                options
                    .wrap_around
                    .then(|| pattern.find_iter(text).last())
                    .flatten()
            })
            .map(|m| m.range()),
    };

    Ok(found)
}

/// Returns every non-overlapping match as byte ranges.
pub fn find_all(text: &str, options: &SearchOptions) -> Result<Vec<Range<usize>>, regex::Error> {
    if options.text.is_empty() {
        return Ok(Vec::new());
    }
    let pattern = options.compile()?;
    Ok(pattern.find_iter(text).map(|m| m.range()).collect())
}

fn clamp_to_boundary(text: &str, mut idx: usize) -> usize {
    idx = idx.min(text.len());
    while !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}
