//! Open documents and tab order.
//!
//! ## Learning: Type Aliases and Newtypes
//!
//! `DocumentId` is a newtype wrapper around `Uuid`. This provides:
//! - Type safety: Can't accidentally use a string as a document ID
//! - Encapsulation: Can change the underlying type without breaking APIs
//! - Documentation: The type name explains its purpose

use quillpad_buffer::{Position, TextBuffer};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::{CoreError, CoreResult};

/// Unique identifier for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Creates a new unique document ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One tab: a text buffer plus the state the session remembers about it.
///
/// ## Learning: Composition over Inheritance
///
/// `Document` composes a `TextBuffer` and adds the tab title, caret and
/// grammar assignment on top.
#[derive(Debug, Clone)]
pub struct Document {
    /// Unique identifier
    id: DocumentId,

    /// Tab title: the file name, or `new N` for scratch documents
    title: String,

    /// Text and file association
    buffer: TextBuffer,

    /// Caret as last reported by the editing widget
    caret: Position,

    /// Name of the assigned grammar, `None` for plain text
    grammar: Option<String>,
}

impl Document {
    /// Creates an empty document with no file.
    pub fn scratch(title: impl Into<String>) -> Self {
        Self::from_text(title, "", None)
    }

    /// Creates a document from text already in memory.
    pub fn from_text(title: impl Into<String>, text: &str, path: Option<PathBuf>) -> Self {
        let mut buffer = TextBuffer::from(text);
        buffer.set_file_path(path);
        Self {
            id: DocumentId::new(),
            title: title.into(),
            buffer,
            caret: Position::ZERO,
            grammar: None,
        }
    }

    /// Opens a document from a file.
    pub fn from_file(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let buffer = TextBuffer::from_file(path)?;

        Ok(Self {
            id: DocumentId::new(),
            title: title_for(path),
            buffer,
            caret: Position::ZERO,
            grammar: None,
        })
    }

    // ==================== Getters ====================

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the file path; `None` for scratch documents.
    pub fn path(&self) -> Option<&Path> {
        self.buffer.file_path()
    }

    pub fn is_scratch(&self) -> bool {
        self.path().is_none()
    }

    /// Returns true if the document has unsaved changes.
    pub fn is_modified(&self) -> bool {
        self.buffer.is_modified()
    }

    pub fn set_modified(&mut self, modified: bool) {
        self.buffer.set_modified(modified);
    }

    pub fn text(&self) -> Cow<'_, str> {
        self.buffer.text()
    }

    pub fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut TextBuffer {
        &mut self.buffer
    }

    pub fn caret(&self) -> Position {
        self.caret
    }

    pub fn set_caret(&mut self, caret: Position) {
        self.caret = caret;
    }

    /// Caret as a byte offset, clamped to the end of the text.
    pub fn caret_offset(&self) -> usize {
        self.buffer
            .position_to_char_idx(self.caret)
            .and_then(|idx| self.buffer.char_to_byte(idx))
            .unwrap_or_else(|_| self.buffer.len_bytes())
    }

    pub fn grammar(&self) -> Option<&str> {
        self.grammar.as_deref()
    }

    pub fn set_grammar(&mut self, grammar: Option<String>) {
        self.grammar = grammar;
    }

    // ==================== File Operations ====================

    /// Saves to the associated file.
    pub fn save(&mut self) -> CoreResult<()> {
        self.buffer.save()?;
        Ok(())
    }

    /// Saves to `path`, which becomes the document's file.
    pub fn save_as(&mut self, path: impl AsRef<Path>) -> CoreResult<()> {
        let path = path.as_ref();
        self.buffer.save_as(path)?;
        self.title = title_for(path);
        Ok(())
    }
}

fn title_for(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Manages the open documents in tab order.
#[derive(Debug, Default)]
pub struct DocumentManager {
    /// All open documents
    documents: HashMap<DocumentId, Document>,

    /// Order of documents (for tabs)
    order: Vec<DocumentId>,

    /// Currently active document
    active: Option<DocumentId>,
}

impl DocumentManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a document as the last tab and activates it.
    pub fn add(&mut self, doc: Document) -> DocumentId {
        let id = doc.id();
        self.documents.insert(id, doc);
        self.order.push(id);
        self.active = Some(id);
        id
    }

    /// Removes a document, returning it.
    pub fn close(&mut self, id: DocumentId) -> CoreResult<Document> {
        let doc = self
            .documents
            .remove(&id)
            .ok_or(CoreError::DocumentNotFound(id))?;
        self.order.retain(|&i| i != id);

        if self.active == Some(id) {
            self.active = self.order.last().copied();
        }

        Ok(doc)
    }

    pub fn get(&self, id: DocumentId) -> Option<&Document> {
        self.documents.get(&id)
    }

    pub fn get_mut(&mut self, id: DocumentId) -> Option<&mut Document> {
        self.documents.get_mut(&id)
    }

    pub fn active(&self) -> Option<&Document> {
        self.active.and_then(|id| self.documents.get(&id))
    }

    pub fn active_id(&self) -> Option<DocumentId> {
        self.active
    }

    pub fn set_active(&mut self, id: DocumentId) {
        if self.documents.contains_key(&id) {
            self.active = Some(id);
        }
    }

    /// Finds a document by file path.
    pub fn find_by_path(&self, path: &Path) -> Option<DocumentId> {
        self.documents
            .values()
            .find(|doc| doc.path() == Some(path))
            .map(Document::id)
    }

    /// Documents in tab order.
    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.order.iter().filter_map(|id| self.documents.get(id))
    }

    /// Tab titles in order.
    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.iter().map(Document::title)
    }

    pub fn order(&self) -> &[DocumentId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
