//! Persisted session state: which documents were open and how.
//!
//! Stored as `session.toml`:
//!
//! ```toml
//! [[open_documents]]
//! file_path = "/home/me/notes.txt"
//! is_modified = true
//! grammar = "None"
//! backup_file = "/home/me/.config/quillpad/backup/notes.txt.bak"
//!
//! [open_documents.caret]
//! line = 3
//! column = 7
//! ```

use quillpad_buffer::Position;
use quillpad_syntax::NO_LANGUAGE;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::config::ConfigError;

/// Prefix of scratch document titles.
pub const SCRATCH_PREFIX: &str = "new ";

/// What the session remembers about one tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenDocumentRecord {
    /// Real file, or for scratch documents their `.bak` file in the backup directory
    pub file_path: PathBuf,

    #[serde(default)]
    pub is_modified: bool,

    #[serde(default)]
    pub caret: Position,

    /// Grammar name, or `"None"`
    #[serde(default = "no_language")]
    pub grammar: String,

    /// Backup file chosen for a real file, when it differs from the
    /// name derived from `file_path`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_file: Option<PathBuf>,
}

fn no_language() -> String {
    NO_LANGUAGE.to_string()
}

impl OpenDocumentRecord {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            is_modified: false,
            caret: Position::ZERO,
            grammar: no_language(),
            backup_file: None,
        }
    }

    /// Grammar name, `None` when the record carries the sentinel.
    pub fn grammar_name(&self) -> Option<&str> {
        Some(self.grammar.as_str()).filter(|name| *name != NO_LANGUAGE && !name.is_empty())
    }
}

/// Ordered open-document records, at most one per `file_path`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(default)]
    open_documents: Vec<OpenDocumentRecord>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a session file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let mut state: Self = toml::from_str(&content)?;
        state.dedup();
        Ok(state)
    }

    /// Reads a session file; a missing or malformed file is an empty session.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        Self::load_from(path).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "Malformed session file, starting empty");
            Self::default()
        })
    }

    /// Writes the session atomically.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        quillpad_buffer::write_atomic(path, &content)?;
        Ok(())
    }

    pub fn records(&self) -> &[OpenDocumentRecord] {
        &self.open_documents
    }

    pub fn get(&self, file_path: &Path) -> Option<&OpenDocumentRecord> {
        self.open_documents.iter().find(|r| r.file_path == file_path)
    }

    /// Adds a record, or updates the existing one for the same path in place.
    pub fn upsert(&mut self, record: OpenDocumentRecord) {
        match self
            .open_documents
            .iter_mut()
            .find(|r| r.file_path == record.file_path)
        {
            Some(existing) => *existing = record,
            None => self.open_documents.push(record),
        }
    }

    /// Removes the record for `file_path`.
    pub fn remove(&mut self, file_path: &Path) -> Option<OpenDocumentRecord> {
        let index = self
            .open_documents
            .iter()
            .position(|r| r.file_path == file_path)?;
        Some(self.open_documents.remove(index))
    }

    /// Replaces every record, keeping the first record per path.
    pub fn replace(&mut self, records: Vec<OpenDocumentRecord>) {
        self.open_documents = records;
        self.dedup();
    }

    pub fn len(&self) -> usize {
        self.open_documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open_documents.is_empty()
    }

    fn dedup(&mut self) {
        let mut seen = BTreeSet::new();
        self.open_documents
            .retain(|record| seen.insert(record.file_path.clone()));
    }
}

/// Number in a scratch name such as `new 3`, `new 3.bak` or `new 3~2.bak`.
pub fn scratch_number(name: &str) -> Option<u32> {
    let rest = name.strip_prefix(SCRATCH_PREFIX)?;
    let rest = rest.strip_suffix(".bak").unwrap_or(rest);
    let digits = rest.split('~').next().unwrap_or(rest);
    digits.parse().ok().filter(|n| *n > 0)
}

/// Smallest unused scratch title, `new 1` upwards.
///
/// `taken` should cover open tab titles, backup directory file names and the
/// file names of persisted records, so a new scratch document never lands on
/// a name a recoverable backup still uses.
pub fn next_scratch_title<'a>(taken: impl IntoIterator<Item = &'a str>) -> String {
    let used: BTreeSet<u32> = taken.into_iter().filter_map(scratch_number).collect();
    let next = (1..).find(|n| !used.contains(n)).unwrap_or(1);
    format!("{}{}", SCRATCH_PREFIX, next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn record(path: &str) -> OpenDocumentRecord {
        OpenDocumentRecord::new(path)
    }

    #[test]
    fn test_upsert_updates_in_place() {
        let mut session = SessionState::new();
        session.upsert(record("/a"));
        session.upsert(record("/b"));

        let mut updated = record("/a");
        updated.is_modified = true;
        session.upsert(updated);

        assert_eq!(session.len(), 2);
        assert_eq!(session.records()[0].file_path, PathBuf::from("/a"));
        assert!(session.records()[0].is_modified);
    }

    #[test]
    fn test_remove() {
        let mut session = SessionState::new();
        session.upsert(record("/a"));
        assert!(session.remove(Path::new("/a")).is_some());
        assert!(session.remove(Path::new("/a")).is_none());
        assert!(session.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.toml");

        let mut session = SessionState::new();
        let mut first = record("/tmp/one.txt");
        first.caret = Position::new(3, 7);
        first.grammar = "Python".to_string();
        first.backup_file = Some(PathBuf::from("/tmp/backup/one.txt~2.bak"));
        session.upsert(first);
        session.upsert(record("/tmp/two.txt"));
        session.save_to(&path).unwrap();

        let loaded = SessionState::load_from(&path).unwrap();
        assert_eq!(loaded, session);
        assert_eq!(loaded.records()[0].grammar_name(), Some("Python"));
        assert_eq!(loaded.records()[1].grammar_name(), None);
    }

    #[test]
    fn test_duplicate_paths_collapse_on_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.toml");
        std::fs::write(
            &path,
            r#"
            [[open_documents]]
            file_path = "/x"
            is_modified = true

            [[open_documents]]
            file_path = "/x"
            "#,
        )
        .unwrap();

        let session = SessionState::load_from(&path).unwrap();
        assert_eq!(session.len(), 1);
        assert!(session.records()[0].is_modified);
    }

    #[test]
    fn test_malformed_session_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.toml");
        std::fs::write(&path, "open_documents = 5").unwrap();
        assert!(SessionState::load_or_default(&path).is_empty());
    }

    #[test]
    fn test_scratch_numbers() {
        assert_eq!(scratch_number("new 3"), Some(3));
        assert_eq!(scratch_number("new 12.bak"), Some(12));
        assert_eq!(scratch_number("new 4~2.bak"), Some(4));
        assert_eq!(scratch_number("new 0"), None);
        assert_eq!(scratch_number("notes.txt.bak"), None);
    }

    #[test]
    fn test_next_scratch_title_fills_gaps() {
        assert_eq!(next_scratch_title([]), "new 1");
        assert_eq!(next_scratch_title(["new 1", "new 3.bak", "main.rs"]), "new 2");
        assert_eq!(next_scratch_title(["new 2", "new 1.bak"]), "new 3");
    }
}
