//! Core text buffer implementation using a rope.
//!
//! ## Why Rope?
//!
//! Ropes keep insertions and deletions at O(log n) even for large files,
//! and line/char/byte conversions are cheap, which the styling engine and
//! the search engine both lean on.

use ropey::Rope;
use std::borrow::Cow;
use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::search::{self, SearchOptions};
use crate::{BufferError, BufferResult, Position};

/// A text buffer backed by a rope data structure.
///
/// # Thread Safety
///
/// `TextBuffer` is `Send` but not `Sync`. The editor keeps every buffer on
/// the UI thread.
#[derive(Debug, Clone, Default)]
pub struct TextBuffer {
    /// The rope holding our text content
    rope: Rope,

    /// Whether the buffer has unsaved changes
    modified: bool,

    /// Associated file path (if any)
    file_path: Option<PathBuf>,
}

/// Decodes raw file bytes for display.
///
/// Valid UTF-8 is used as-is; anything else is shown as lowercase hex so
/// binary files can still be opened without corrupting them on screen.
pub fn decode_file_contents(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => err
            .into_bytes()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect(),
    }
}

/// Writes `contents` next to `path` and renames it into place.
///
/// The temporary file is removed again if either step fails.
pub fn write_atomic(path: &Path, contents: &str) -> std::io::Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = path.with_file_name(format!(".{}.tmp", file_name));

    let result = std::fs::write(&temp_path, contents.as_bytes())
        .and_then(|()| std::fs::rename(&temp_path, path));
    if result.is_err() {
        let _ = std::fs::remove_file(&temp_path);
    }
    result
}

impl TextBuffer {
    /// Creates a new empty buffer.
    ///
    /// # Example
    /// ```
    /// use quillpad_buffer::TextBuffer;
    ///
    /// let buffer = TextBuffer::new();
    /// assert!(buffer.is_empty());
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a buffer from a file.
    pub fn from_file(path: impl AsRef<Path>) -> BufferResult<Self> {
        let path = path.as_ref();
        let content = decode_file_contents(std::fs::read(path)?);

        Ok(Self {
            rope: Rope::from_str(&content),
            modified: false,
            file_path: Some(path.to_path_buf()),
        })
    }

    /// Saves the buffer to its associated file.
    pub fn save(&mut self) -> BufferResult<()> {
        let path = self.file_path.clone().ok_or(BufferError::NoFilePath)?;
        self.save_as(&path)
    }

    /// Saves the buffer to a specific path.
    pub fn save_as(&mut self, path: impl AsRef<Path>) -> BufferResult<()> {
        let path = path.as_ref();
        write_atomic(path, &self.text())?;

        self.file_path = Some(path.to_path_buf());
        self.modified = false;
        Ok(())
    }

    // ==================== Text Access ====================

    /// Returns the entire text content.
    #[inline]
    pub fn text(&self) -> Cow<'_, str> {
        self.rope.slice(..).into()
    }

    /// Returns a specific line (0-indexed), including its trailing newline.
    pub fn line(&self, line_idx: usize) -> BufferResult<Cow<'_, str>> {
        if line_idx >= self.len_lines() {
            return Err(BufferError::PositionOutOfBounds {
                line: line_idx,
                column: 0,
            });
        }
        Ok(self.rope.line(line_idx).into())
    }

    /// Returns a slice of text by character range.
    pub fn slice(&self, range: Range<usize>) -> BufferResult<Cow<'_, str>> {
        if range.start > range.end || range.end > self.len_chars() {
            return Err(BufferError::InvalidCharIndex(range.end));
        }
        Ok(self.rope.slice(range).into())
    }

    // ==================== Measurements ====================

    /// Returns true if the buffer is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    /// Returns the number of characters in the buffer.
    #[inline]
    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    /// Returns the number of bytes in the buffer.
    #[inline]
    pub fn len_bytes(&self) -> usize {
        self.rope.len_bytes()
    }

    /// Returns the number of lines in the buffer.
    ///
    /// An empty buffer has 1 line.
    #[inline]
    pub fn len_lines(&self) -> usize {
        self.rope.len_lines()
    }

    // ==================== Mutations ====================

    /// Inserts text at a character index.
    pub fn insert(&mut self, char_idx: usize, text: &str) -> BufferResult<()> {
        if char_idx > self.len_chars() {
            return Err(BufferError::InvalidCharIndex(char_idx));
        }
        self.rope.insert(char_idx, text);
        self.modified = true;
        Ok(())
    }

    /// Deletes text in a character range, returning what was removed.
    pub fn delete(&mut self, range: Range<usize>) -> BufferResult<String> {
        let deleted = self.slice(range.clone())?.into_owned();
        self.rope.remove(range);
        self.modified = true;
        Ok(deleted)
    }

    /// Replaces text in a character range.
    pub fn replace(&mut self, range: Range<usize>, text: &str) -> BufferResult<String> {
        let deleted = self.delete(range.clone())?;
        self.insert(range.start, text)?;
        Ok(deleted)
    }

    /// Replaces the whole content, marking the buffer modified.
    pub fn set_text(&mut self, text: &str) {
        self.rope = Rope::from_str(text);
        self.modified = true;
    }

    // ==================== Position Conversion ====================

    /// Converts a Position (line, column) to a character index.
    pub fn position_to_char_idx(&self, pos: Position) -> BufferResult<usize> {
        if pos.line >= self.len_lines() {
            return Err(BufferError::PositionOutOfBounds {
                line: pos.line,
                column: pos.column,
            });
        }

        let line_start = self.rope.line_to_char(pos.line);
        let line_len = self.rope.line(pos.line).len_chars();
        if pos.column > line_len {
            return Err(BufferError::PositionOutOfBounds {
                line: pos.line,
                column: pos.column,
            });
        }

        Ok(line_start + pos.column)
    }

    /// Converts a character index to a Position (line, column).
    pub fn char_idx_to_position(&self, char_idx: usize) -> BufferResult<Position> {
        if char_idx > self.len_chars() {
            return Err(BufferError::InvalidCharIndex(char_idx));
        }

        let line = self.rope.char_to_line(char_idx);
        let column = char_idx - self.rope.line_to_char(line);
        Ok(Position { line, column })
    }

    /// Converts a character index to a byte offset.
    pub fn char_to_byte(&self, char_idx: usize) -> BufferResult<usize> {
        if char_idx > self.len_chars() {
            return Err(BufferError::InvalidCharIndex(char_idx));
        }
        Ok(self.rope.char_to_byte(char_idx))
    }

    /// Converts a byte offset to a character index.
    pub fn byte_to_char(&self, byte_idx: usize) -> BufferResult<usize> {
        if byte_idx > self.len_bytes() {
            return Err(BufferError::InvalidCharIndex(byte_idx));
        }
        Ok(self.rope.byte_to_char(byte_idx))
    }

    // ==================== State Queries ====================

    /// Returns true if the buffer has unsaved changes.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Overrides the modified flag (used when restoring a session).
    pub fn set_modified(&mut self, modified: bool) {
        self.modified = modified;
    }

    /// Returns the associated file path, if any.
    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    /// Associates the buffer with a file without writing it.
    pub fn set_file_path(&mut self, path: Option<PathBuf>) {
        self.file_path = path;
    }

    // ==================== Search ====================

    /// Finds the next match for `options` relative to a caret.
    ///
    /// Returns the matched character range.
    pub fn find(&self, options: &SearchOptions, caret: Position) -> BufferResult<Option<Range<usize>>> {
        let text = self.text();
        let caret_char = self.position_to_char_idx(caret)?;
        let caret_byte = self.rope.char_to_byte(caret_char);

        Ok(search::find(&text, caret_byte, options)?.map(|found| {
            self.rope.byte_to_char(found.start)..self.rope.byte_to_char(found.end)
        }))
    }

    /// Finds all matches, as character ranges.
    pub fn find_all(&self, options: &SearchOptions) -> BufferResult<Vec<Range<usize>>> {
        let text = self.text();
        Ok(search::find_all(&text, options)?
            .into_iter()
            .map(|found| self.rope.byte_to_char(found.start)..self.rope.byte_to_char(found.end))
            .collect())
    }
}

impl From<&str> for TextBuffer {
    fn from(s: &str) -> Self {
        Self {
            rope: Rope::from_str(s),
            modified: false,
            file_path: None,
        }
    }
}

impl From<String> for TextBuffer {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_failed_rename_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("taken");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("inside.txt"), "x").unwrap();

        assert!(write_atomic(&target, "text").is_err());
        assert!(!dir.path().join(".taken.tmp").exists());
        assert!(target.is_dir());
    }

    #[test]
    fn test_save_as_clears_modified() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");

        let mut buffer = TextBuffer::from("draft");
        buffer.insert(5, " two").unwrap();
        assert!(buffer.is_modified());

        buffer.save_as(&path).unwrap();
        assert!(!buffer.is_modified());
        assert_eq!(buffer.file_path(), Some(path.as_path()));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "draft two");
        assert!(!dir.path().join(".notes.txt.tmp").exists());
    }

    #[test]
    fn test_save_without_path_fails() {
        let mut buffer = TextBuffer::from("x");
        assert!(matches!(buffer.save(), Err(BufferError::NoFilePath)));
    }

    #[test]
    fn test_non_utf8_file_opens_as_hex() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        std::fs::write(&path, [0xffu8, 0x00, 0x41]).unwrap();

        let buffer = TextBuffer::from_file(&path).unwrap();
        assert_eq!(buffer.text(), "ff0041");
    }

    #[test]
    fn test_position_conversions() {
        let buffer = TextBuffer::from("ab\ncdé\n");
        assert_eq!(buffer.position_to_char_idx(Position::new(1, 2)).unwrap(), 5);
        assert_eq!(buffer.char_idx_to_position(5).unwrap(), Position::new(1, 2));
        assert_eq!(buffer.char_to_byte(6).unwrap(), 7);
        assert!(buffer.position_to_char_idx(Position::new(9, 0)).is_err());
    }

    #[test]
    fn test_find_returns_char_ranges() {
        let buffer = TextBuffer::from("é needle needle");
        let options = SearchOptions::new("needle");

        let found = buffer.find(&options, Position::ZERO).unwrap();
        assert_eq!(found, Some(2..8));
        assert_eq!(buffer.find_all(&options).unwrap().len(), 2);
    }
}
