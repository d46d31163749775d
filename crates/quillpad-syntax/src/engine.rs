//! The styling engine: one scanner for every grammar.
//!
//! `restyle` walks the text once, byte offset by byte offset, and hands
//! back contiguous spans. Scanning always restarts at the beginning of the
//! line holding the edited region because a position's category depends on
//! whether a comment or string run is open, which only the text before it
//! can tell.
//!
//! Rules are tried in a fixed order at each position:
//!
//! 1. block comment (outside strings)
//! 2. line comment (outside strings)
//! 3. string / string2 delimiters
//! 4. string content
//! 5. numbers
//! 6. words and keywords
//! 7. operators, longest first
//! 8. anything else is `Default`

use std::ops::Range;

use crate::StyleCategory;
use crate::descriptor::{Grammar, StringKind};

/// A run of text tagged with one category. Offsets are in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StyledSpan {
    pub start: usize,
    pub len: usize,
    pub category: StyleCategory,
}

impl StyledSpan {
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end()
    }
}

/// Styles `region` of `text`, extended back to the start of its first line.
///
/// The result covers every byte from that line start up to at least
/// `region.end`, in order and without gaps. A block comment that starts in
/// the region is always consumed to its end token (or the end of the text);
/// a string still open at `region.end` runs on to the end of that line.
///
/// Identical inputs always produce identical spans: no state survives
/// between calls.
pub fn restyle(text: &str, region: Range<usize>, grammar: &Grammar) -> Vec<StyledSpan> {
    let end = ceil_boundary(text, region.end.min(text.len()));
    let start = floor_boundary(text, region.start.min(end));
    let line_start = text[..start].rfind('\n').map_or(0, |i| i + 1);

    let mut scanner = Scanner::new(text, grammar, line_start);
    scanner.scan_until(end);
    scanner.spans
}

/// An open string run.
#[derive(Debug, Clone, Copy)]
struct StringRun {
    kind: StringKind,
    delimiter: char,
    /// Index of the span holding the opening delimiter
    first_span: usize,
    category: StyleCategory,
}

struct Scanner<'a> {
    text: &'a str,
    grammar: &'a Grammar,
    pos: usize,
    spans: Vec<StyledSpan>,
    /// Whether the last span may absorb the next contiguous run of the same category
    open_tail: bool,
    run: Option<StringRun>,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str, grammar: &'a Grammar, pos: usize) -> Self {
        Self {
            text,
            grammar,
            pos,
            spans: Vec::new(),
            open_tail: false,
            run: None,
        }
    }

    fn scan_until(&mut self, end: usize) {
        while let Some(c) = self.text[self.pos..].chars().next() {
            if self.pos >= end && (self.run.is_none() || c == '\n') {
                break;
            }
            self.step(c);
        }
    }

    fn step(&mut self, c: char) {
        let rest = &self.text[self.pos..];

        if self.run.is_none() {
            if let Some((open, close)) = self.grammar.block_comment() {
                if rest.starts_with(open) {
                    let len = rest[open.len()..]
                        .find(close)
                        .map_or(rest.len(), |i| open.len() + i + close.len());
                    self.push(len, StyleCategory::BlockComment);
                    return;
                }
            }

            if let Some(token) = self.grammar.line_comment() {
                if rest.starts_with(token) {
                    let len = rest.find('\n').unwrap_or(rest.len()).max(token.len());
                    self.push(len, StyleCategory::LineComment);
                    return;
                }
            }
        }

        if let Some(kind) = self.grammar.string_kind(c) {
            if self.delimiter(c, kind) {
                return;
            }
        }

        if let Some(run) = self.run {
            self.extend(c.len_utf8(), run.category);
            return;
        }

        if self.grammar.descriptor().detect_numbers {
            if let Some(len) = number_len(rest) {
                self.push(len, StyleCategory::Number);
                return;
            }
        }

        if c.is_alphabetic() || c == '_' {
            let len = rest
                .find(|ch: char| !(ch.is_alphanumeric() || ch == '_'))
                .unwrap_or(rest.len());
            let category = self.grammar.classify_word(&rest[..len]);
            self.push(len, category);
            return;
        }

        if let Some(len) = self.grammar.operator_at(rest) {
            self.push(len, StyleCategory::Operator);
            return;
        }

        self.extend(c.len_utf8(), StyleCategory::Default);
    }

    /// Opens or closes a string run. Returns false when `c` is plain content.
    fn delimiter(&mut self, c: char, kind: StringKind) -> bool {
        let escaped = self.pos > 0 && self.text.as_bytes()[self.pos - 1] == b'\\';
        let after = self.pos + c.len_utf8();

        match self.run {
            None if !escaped => {
                let is_property = self
                    .find_closing(after, c)
                    .is_some_and(|close| self.is_property_key(close + c.len_utf8()));
                let category = if is_property {
                    StyleCategory::Property
                } else {
                    kind.category()
                };

                self.run = Some(StringRun {
                    kind,
                    delimiter: c,
                    first_span: self.spans.len(),
                    category,
                });
                self.push(c.len_utf8(), category);
                self.open_tail = true;
                true
            }
            Some(run) if run.kind == kind && run.delimiter == c && !escaped => {
                let category = if self.is_property_key(after) {
                    StyleCategory::Property
                } else {
                    kind.category()
                };

                self.extend(c.len_utf8(), run.category);
                if category != run.category {
                    for span in &mut self.spans[run.first_span..] {
                        span.category = category;
                    }
                }
                self.run = None;
                self.open_tail = false;
                true
            }
            _ => false,
        }
    }

    /// Offset of the next unescaped `delimiter` at or after `from`.
    fn find_closing(&self, from: usize, delimiter: char) -> Option<usize> {
        let bytes = self.text.as_bytes();
        self.text[from..]
            .char_indices()
            .map(|(i, ch)| (from + i, ch))
            .find(|&(i, ch)| ch == delimiter && bytes[i - 1] != b'\\')
            .map(|(i, _)| i)
    }

    /// A closing quote at `after` followed by optional blanks and a colon.
    fn is_property_key(&self, after: usize) -> bool {
        self.grammar.descriptor().property_pattern
            && self.text[after..]
                .trim_start_matches([' ', '\t'])
                .starts_with(':')
    }

    /// Emits a complete token as its own span.
    fn push(&mut self, len: usize, category: StyleCategory) {
        self.spans.push(StyledSpan {
            start: self.pos,
            len,
            category,
        });
        self.pos += len;
        self.open_tail = false;
    }

    /// Emits text that may merge into the previous span.
    fn extend(&mut self, len: usize, category: StyleCategory) {
        match self.spans.last_mut() {
            Some(last) if self.open_tail && last.category == category && last.end() == self.pos => {
                last.len += len;
            }
            _ => self.spans.push(StyledSpan {
                start: self.pos,
                len,
                category,
            }),
        }
        self.pos += len;
        self.open_tail = true;
    }
}

/// Length of a `-?digits(.digits)?([eE][+-]?digits)?` literal at the start of `rest`.
fn number_len(rest: &str) -> Option<usize> {
    let bytes = rest.as_bytes();
    let digits = |from: usize| bytes[from..].iter().take_while(|b| b.is_ascii_digit()).count();

    let mut len = usize::from(bytes.first() == Some(&b'-'));
    let integer = digits(len);
    if integer == 0 {
        return None;
    }
    len += integer;

    if bytes.get(len) == Some(&b'.') {
        let fraction = digits(len + 1);
        if fraction > 0 {
            len += 1 + fraction;
        }
    }

    if matches!(bytes.get(len), Some(b'e' | b'E')) {
        let mut exp = len + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exponent = digits(exp);
        if exponent > 0 {
            len = exp + exponent;
        }
    }

    Some(len)
}

fn floor_boundary(text: &str, mut idx: usize) -> usize {
    while !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn ceil_boundary(text: &str, mut idx: usize) -> usize {
    while !text.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GrammarDescriptor;
    use proptest::prelude::*;

    fn grammar(configure: impl FnOnce(&mut GrammarDescriptor)) -> Grammar {
        let mut descriptor = GrammarDescriptor::new("Test");
        configure(&mut descriptor);
        Grammar::new(descriptor)
    }

    fn style_all(text: &str, grammar: &Grammar) -> Vec<StyledSpan> {
        restyle(text, 0..text.len(), grammar)
    }

    /// One category per character, for comparisons that ignore span boundaries.
    fn per_char(text: &str, spans: &[StyledSpan]) -> Vec<(char, StyleCategory)> {
        spans
            .iter()
            .flat_map(|span| text[span.range()].chars().map(move |c| (c, span.category)))
            .collect()
    }

    fn expect(parts: &[(&str, StyleCategory)]) -> Vec<(char, StyleCategory)> {
        parts
            .iter()
            .flat_map(|&(s, category)| s.chars().map(move |c| (c, category)))
            .collect()
    }

    fn categories(text: &str, spans: &[StyledSpan]) -> Vec<(std::string::String, StyleCategory)> {
        spans
            .iter()
            .map(|span| (text[span.range()].to_string(), span.category))
            .collect()
    }

    #[test]
    fn test_end_to_end_line_comment_and_keywords() {
        let g = grammar(|d| d.keywords1 = vec!["if".into(), "else".into()]);
        let text = "if (x) // comment\nelse y;";
        let spans = style_all(text, &g);

        assert_eq!(
            per_char(text, &spans),
            expect(&[
                ("if", StyleCategory::Keyword1),
                (" (", StyleCategory::Default),
                ("x", StyleCategory::Default),
                (") ", StyleCategory::Default),
                ("// comment", StyleCategory::LineComment),
                ("\n", StyleCategory::Default),
                ("else", StyleCategory::Keyword1),
                (" y;", StyleCategory::Default),
            ])
        );
    }

    #[test]
    fn test_operator_longest_match() {
        let g = grammar(|d| d.operators = vec!["=".into(), "==".into()]);
        let spans = style_all("==", &g);
        assert_eq!(
            spans,
            vec![StyledSpan {
                start: 0,
                len: 2,
                category: StyleCategory::Operator
            }]
        );
    }

    #[test]
    fn test_keyword_precedence() {
        let g = grammar(|d| {
            d.keywords1 = vec!["let".into()];
            d.keywords2 = vec!["let".into(), "mut".into()];
        });
        let text = "let mut";
        assert_eq!(
            categories(text, &style_all(text, &g)),
            vec![
                ("let".to_string(), StyleCategory::Keyword1),
                (" ".to_string(), StyleCategory::Default),
                ("mut".to_string(), StyleCategory::Keyword2),
            ]
        );
    }

    #[test]
    fn test_case_folding() {
        let g = grammar(|d| {
            d.keywords1 = vec!["IF".into()];
            d.case_sensitive = false;
        });
        let text = "if If IF";
        let keywords = style_all(text, &g)
            .into_iter()
            .filter(|s| s.category == StyleCategory::Keyword1)
            .count();
        assert_eq!(keywords, 3);

        let strict = grammar(|d| d.keywords1 = vec!["IF".into()]);
        assert_eq!(style_all("if", &strict)[0].category, StyleCategory::Default);
    }

    #[test]
    fn test_property_detection() {
        let g = grammar(|d| d.property_pattern = true);

        let text = "\"key\": 1";
        assert_eq!(
            per_char(text, &style_all(text, &g)),
            expect(&[("\"key\"", StyleCategory::Property), (": ", StyleCategory::Default), ("1", StyleCategory::Number)])
        );

        let text = "\"value\"";
        assert_eq!(per_char(text, &style_all(text, &g)), expect(&[("\"value\"", StyleCategory::String)]));

        let text = "'k' :";
        assert_eq!(per_char(text, &style_all(text, &g))[0], ('\'', StyleCategory::Property));
    }

    #[test]
    fn test_property_detection_disabled() {
        let g = grammar(|_| {});
        let text = "\"key\": 1";
        assert_eq!(style_all(text, &g)[0].category, StyleCategory::String);
    }

    #[test]
    fn test_escaped_delimiter_stays_in_string() {
        let g = grammar(|d| d.property_pattern = true);
        let text = r#""a\"b": x"#;
        assert_eq!(
            per_char(text, &style_all(text, &g)),
            expect(&[(r#""a\"b""#, StyleCategory::Property), (": x", StyleCategory::Default)])
        );
    }

    #[test]
    fn test_string_kinds_do_not_close_each_other() {
        let g = grammar(|_| {});
        let text = r#""it's" 'say "hi"'"#;
        assert_eq!(
            per_char(text, &style_all(text, &g)),
            expect(&[("\"it's\"", StyleCategory::String), (" ", StyleCategory::Default), ("'say \"hi\"'", StyleCategory::String2)])
        );
    }

    #[test]
    fn test_same_set_different_delimiter_is_content() {
        let g = grammar(|d| d.string_delimiters = vec!['"', '`']);
        let text = "\"a`b\" c";
        assert_eq!(
            per_char(text, &style_all(text, &g)),
            expect(&[("\"a`b\"", StyleCategory::String), (" c", StyleCategory::Default)])
        );
    }

    #[test]
    fn test_comments_inside_strings_are_ignored() {
        let g = grammar(|_| {});
        let text = "\"// not /* a comment\" x";
        assert_eq!(
            per_char(text, &style_all(text, &g)),
            expect(&[("\"// not /* a comment\"", StyleCategory::String), (" x", StyleCategory::Default)])
        );
    }

    #[test]
    fn test_unterminated_block_comment_runs_to_end() {
        let g = grammar(|_| {});
        let text = "a /* open\nstill open";
        let spans = restyle(text, 0..3, &g);
        let last = spans.last().unwrap();
        assert_eq!(last.category, StyleCategory::BlockComment);
        assert_eq!(last.end(), text.len());
    }

    #[test]
    fn test_unterminated_string_stops_at_line_end_past_region() {
        let g = grammar(|_| {});
        let text = "x = \"open\nnext line";
        let spans = restyle(text, 0..5, &g);
        let last = spans.last().unwrap();
        assert_eq!(last.category, StyleCategory::String);
        assert_eq!(last.end(), text.find('\n').unwrap());
    }

    #[test]
    fn test_string_spans_lines_inside_region() {
        let g = grammar(|_| {});
        let text = "\"one\ntwo\" z";
        assert_eq!(
            per_char(text, &style_all(text, &g)),
            expect(&[("\"one\ntwo\"", StyleCategory::String), (" z", StyleCategory::Default)])
        );
    }

    #[test]
    fn test_disabled_comment_tokens() {
        let g = grammar(|d| {
            d.line_comment.clear();
            d.block_comment_end.clear();
        });
        let text = "// /* x";
        assert!(style_all(text, &g).iter().all(|s| s.category == StyleCategory::Default));
    }

    #[test]
    fn test_numbers() {
        let g = grammar(|d| d.operators = vec!["-".into()]);
        let text = "-12.5e+3 7. x1 -y";
        assert_eq!(
            per_char(text, &style_all(text, &g)),
            expect(&[
                ("-12.5e+3", StyleCategory::Number),
                (" ", StyleCategory::Default),
                ("7", StyleCategory::Number),
                (". ", StyleCategory::Default),
                ("x1", StyleCategory::Default),
                (" ", StyleCategory::Default),
                ("-", StyleCategory::Operator),
                ("y", StyleCategory::Default),
            ])
        );

        let off = grammar(|d| d.detect_numbers = false);
        assert!(style_all("42", &off).iter().all(|s| s.category == StyleCategory::Default));
    }

    #[test]
    fn test_restyle_starts_at_line_start() {
        let g = grammar(|d| d.keywords1 = vec!["fn".into()]);
        let text = "fn a\nfn b";
        let spans = restyle(text, 8..9, &g);
        assert_eq!(spans[0].start, 5);
        assert_eq!(spans[0].category, StyleCategory::Keyword1);
        assert_eq!(spans.last().unwrap().end(), 9);
    }

    #[test]
    fn test_multibyte_text() {
        let g = grammar(|d| d.keywords1 = vec!["größe".into()]);
        let text = "größe é";
        let spans = style_all(text, &g);
        assert_eq!(spans[0].category, StyleCategory::Keyword1);
        assert_eq!(spans.last().unwrap().end(), text.len());

        // A region edge inside a multibyte character is widened to the boundary.
        let spans = restyle(text, 0..(text.len() - 1), &g);
        assert_eq!(spans.last().unwrap().end(), text.len());
    }

    #[test]
    fn test_empty_text() {
        let g = grammar(|_| {});
        assert!(restyle("", 0..10, &g).is_empty());
    }

    fn sample_grammar() -> Grammar {
        grammar(|d| {
            d.keywords1 = vec!["if".into(), "x".into()];
            d.keywords2 = vec!["if_".into()];
            d.operators = vec!["=".into(), "==".into(), "-".into()];
            d.property_pattern = true;
        })
    }

    proptest! {
        #[test]
        fn prop_spans_cover_region(
            text in "[a-z0-9 _=.\"'/*\\\\\n:é-]{0,64}",
            a in 0usize..80,
            b in 0usize..80,
        ) {
            let g = sample_grammar();
            let spans = restyle(&text, a..b, &g);

            let end = ceil_boundary(&text, b.min(text.len()));
            let start = floor_boundary(&text, a.min(end));
            let line_start = text[..start].rfind('\n').map_or(0, |i| i + 1);

            let mut cursor = line_start;
            for span in &spans {
                prop_assert_eq!(span.start, cursor);
                prop_assert!(span.len > 0);
                prop_assert!(text.is_char_boundary(span.end()));
                cursor = span.end();
            }
            prop_assert!(cursor >= end);
            prop_assert!(cursor <= text.len());
        }

        #[test]
        fn prop_restyle_is_idempotent(
            text in "[a-z0-9 _=.\"'/*\\\\\n:-]{0,64}",
            a in 0usize..80,
            b in 0usize..80,
        ) {
            let g = sample_grammar();
            prop_assert_eq!(restyle(&text, a..b, &g), restyle(&text, a..b, &g));
        }
    }
}
