//! Main editor orchestration.
//!
//! ## Learning: The Facade Pattern
//!
//! `Editor` is the one type the shell talks to. It keeps the document list,
//! the persisted session records and the backup directory consistent with
//! each other: every operation that changes the tab list also updates the
//! session and rewrites `session.toml`.

use quillpad_buffer::{Position, SearchDirection, SearchOptions};
use quillpad_syntax::{GrammarRegistry, NO_LANGUAGE, ResolvedStyle, StyleCategory, StyledSpan};
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::backup::{BackupManager, Clock, RestoreSource, SystemClock};
use crate::command::{Command, CommandRegistry};
use crate::config::Config;
use crate::document::{Document, DocumentId, DocumentManager};
use crate::event::{EditorEvent, EventBus};
use crate::paths::AppPaths;
use crate::session::{SessionState, next_scratch_title};
use crate::{CoreError, CoreResult};

/// The main editor state.
///
/// ## Thread Safety
///
/// `Editor` is owned by a single thread. Other components observe it
/// through the event bus.
pub struct Editor {
    /// On-disk locations
    paths: AppPaths,

    /// Preferences
    config: Config,

    /// Available grammars
    grammars: GrammarRegistry,

    /// Open tabs
    documents: DocumentManager,

    /// Persisted open-document records
    session: SessionState,

    /// Crash-recovery snapshots
    backups: BackupManager,

    /// Named command handlers
    commands: CommandRegistry,

    /// Event bus for notifications
    event_bus: EventBus,

    /// Options of the last search, reused by find next/previous
    last_search: Option<SearchOptions>,

    /// Whether the editor should quit
    should_quit: bool,
}

impl Editor {
    /// Loads config, grammars and the session record list from `paths`.
    ///
    /// No documents are open yet; call [`Editor::restore_session`].
    pub fn open(paths: AppPaths) -> CoreResult<Self> {
        Self::open_with_clock(paths, Arc::new(SystemClock))
    }

    /// Like [`Editor::open`] with an explicit clock for backup timing.
    pub fn open_with_clock(paths: AppPaths, clock: Arc<dyn Clock>) -> CoreResult<Self> {
        paths.ensure_dirs()?;
        let config = Config::load_or_default(paths.config_file());
        let grammars = GrammarRegistry::load(paths.grammars_dir(), paths.styles_dir());
        let session = SessionState::load_or_default(paths.session_file());
        let backups = BackupManager::with_clock(
            paths.backup_dir(),
            Duration::from_secs(config.backup.interval_secs),
            clock,
        );

        tracing::info!(
            root = %paths.root().display(),
            grammars = grammars.len(),
            records = session.len(),
            "Editor initialized"
        );

        Ok(Self {
            paths,
            config,
            grammars,
            documents: DocumentManager::new(),
            session,
            backups,
            commands: CommandRegistry::new(),
            event_bus: EventBus::new(),
            last_search: None,
            should_quit: false,
        })
    }

    // ==================== Session ====================

    /// Reopens the previous session's tabs.
    ///
    /// Runs the recovery pass over the persisted records, deletes orphaned
    /// snapshots and rewrites the session with the surviving records.
    /// Returns the number of open tabs afterwards.
    pub fn restore_session(&mut self) -> usize {
        let records = if self.config.tabs.restore_files_on_close {
            self.session.records().to_vec()
        } else {
            Vec::new()
        };

        let outcome = self.backups.restore_session(&records);
        let survivors = outcome.surviving_records();
        self.backups.cleanup_orphans(&survivors);
        self.session.replace(survivors);

        for restored in outcome.documents {
            let mut document = restored.document;
            let grammar = self.grammar_for_restored(&document, restored.source);
            document.set_grammar(grammar);
            let id = self.documents.add(document);
            self.emit(EditorEvent::DocumentOpened(id));
        }

        self.persist_session();
        let count = self.documents.len();
        tracing::info!(count, "Session restored");
        self.emit(EditorEvent::SessionRestored { count });
        count
    }

    /// The recorded grammar when it is still registered, otherwise the
    /// grammar for the file's extension.
    fn grammar_for_restored(&self, document: &Document, source: RestoreSource) -> Option<String> {
        if source == RestoreSource::New {
            return None;
        }
        match document.grammar() {
            None => None,
            Some(name) => match self.grammars.name_lookup(name) {
                Some(grammar) => Some(grammar.name().to_string()),
                None => {
                    tracing::warn!(grammar = %name, "Recorded grammar no longer registered");
                    self.extension_grammar(document.path())
                }
            },
        }
    }

    fn extension_grammar(&self, path: Option<&Path>) -> Option<String> {
        path.and_then(|p| self.grammars.extension_lookup(p))
            .map(|g| g.name().to_string())
    }

    fn persist_session(&self) {
        if let Err(e) = self.session.save_to(self.paths.session_file()) {
            tracing::warn!(error = %e, "Could not save session");
        }
    }

    fn persist_config(&self) {
        if let Err(e) = self.config.save_to(self.paths.config_file()) {
            tracing::warn!(error = %e, "Could not save config");
        }
    }

    /// Upserts the record of a document that has one or should have one.
    fn refresh_record(&mut self, id: DocumentId) {
        let Some(doc) = self.documents.get(id) else {
            return;
        };
        let record = self.backups.record_for(doc);
        if !doc.is_scratch() || self.session.get(&record.file_path).is_some() {
            self.session.upsert(record);
        }
    }

    // ==================== Document Operations ====================

    /// Creates a new scratch document named `new N`.
    pub fn new_document(&mut self) -> DocumentId {
        let title = self.next_scratch_title();
        let id = self.documents.add(Document::scratch(title));

        self.emit(EditorEvent::DocumentOpened(id));
        self.emit(EditorEvent::DocumentFocused(id));
        id
    }

    fn next_scratch_title(&self) -> String {
        let mut taken: Vec<String> = self.documents.titles().map(str::to_string).collect();
        if let Ok(entries) = std::fs::read_dir(self.paths.backup_dir()) {
            taken.extend(
                entries
                    .flatten()
                    .map(|e| e.file_name().to_string_lossy().into_owned()),
            );
        }
        taken.extend(
            self.session
                .records()
                .iter()
                .filter_map(|r| r.file_path.file_name())
                .map(|n| n.to_string_lossy().into_owned()),
        );
        next_scratch_title(taken.iter().map(String::as_str))
    }

    /// Opens a file in a new tab and assigns its grammar by extension.
    ///
    /// A file that is already open is focused and reported as
    /// `CoreError::AlreadyOpen`.
    pub fn open_file(&mut self, path: impl AsRef<Path>) -> CoreResult<DocumentId> {
        let requested = path.as_ref();
        let path = requested
            .canonicalize()
            .map_err(|_| CoreError::FileNotFound(requested.to_path_buf()))?;

        if let Some(id) = self.documents.find_by_path(&path) {
            self.documents.set_active(id);
            self.emit(EditorEvent::DocumentFocused(id));
            return Err(CoreError::AlreadyOpen(path));
        }

        let mut document = Document::from_file(&path)?;
        document.set_grammar(self.extension_grammar(Some(&path)));
        let record = self.backups.record_for(&document);
        self.session.upsert(record);
        let id = self.documents.add(document);
        self.persist_session();

        tracing::info!(path = %path.display(), "Opened file");
        self.emit(EditorEvent::DocumentOpened(id));
        self.emit(EditorEvent::DocumentFocused(id));
        Ok(id)
    }

    /// Saves a document to its file and drops its snapshot.
    pub fn save(&mut self, id: DocumentId) -> CoreResult<()> {
        let doc = self
            .documents
            .get_mut(id)
            .ok_or(CoreError::DocumentNotFound(id))?;
        if doc.is_scratch() {
            return Err(CoreError::InvalidOperation(format!(
                "{} has no file, use Save As",
                doc.title()
            )));
        }
        doc.save()?;

        self.backups.discard(id);
        self.refresh_record(id);
        self.persist_session();
        self.emit(EditorEvent::DocumentSaved(id));
        Ok(())
    }

    /// Saves a document under a new path, which becomes its file.
    ///
    /// A scratch document's record is replaced by one for the new path.
    pub fn save_as(&mut self, id: DocumentId, path: impl AsRef<Path>) -> CoreResult<()> {
        let target = path.as_ref();
        if let Ok(existing) = target.canonicalize() {
            if self.documents.find_by_path(&existing).is_some_and(|other| other != id) {
                return Err(CoreError::AlreadyOpen(existing));
            }
        }

        let doc = self
            .documents
            .get_mut(id)
            .ok_or(CoreError::DocumentNotFound(id))?;
        let old_record = self.backups.record_path(doc);
        doc.save_as(target)?;
        if let Ok(canonical) = target.canonicalize() {
            doc.buffer_mut().set_file_path(Some(canonical));
        }

        let previous_grammar = doc.grammar().map(str::to_string);
        if previous_grammar.is_none() {
            let grammar = doc
                .path()
                .and_then(|p| self.grammars.extension_lookup(p))
                .map(|g| g.name().to_string());
            doc.set_grammar(grammar);
        }
        let grammar = doc.grammar().map(str::to_string);

        self.backups.discard(id);
        self.session.remove(&old_record);
        self.refresh_record(id);
        self.persist_session();

        if grammar != previous_grammar {
            self.emit(EditorEvent::LanguageChanged { id, language: grammar });
        }
        self.emit(EditorEvent::DocumentSaved(id));
        Ok(())
    }

    /// Closes a tab, discarding its snapshot and its session record.
    ///
    /// Unsaved changes are the caller's concern. When the last tab closes and
    /// `tabs.open_new_tab_on_last_closed` is set a fresh document opens.
    pub fn close_document(&mut self, id: DocumentId) -> CoreResult<()> {
        if self.config.tabs.lock_tabs {
            return Err(CoreError::InvalidOperation("Tabs are locked".to_string()));
        }

        let doc = self.documents.close(id)?;
        let record_path = self.backups.record_path(&doc);
        self.backups.discard(id);
        self.session.remove(&record_path);
        self.persist_session();
        self.emit(EditorEvent::DocumentClosed(id));

        if self.documents.is_empty() {
            if self.config.tabs.open_new_tab_on_last_closed {
                self.new_document();
            }
        } else if let Some(active) = self.documents.active_id() {
            self.emit(EditorEvent::DocumentFocused(active));
        }
        Ok(())
    }

    /// Makes a tab the active one.
    pub fn set_active(&mut self, id: DocumentId) -> CoreResult<()> {
        if self.documents.get(id).is_none() {
            return Err(CoreError::DocumentNotFound(id));
        }
        self.documents.set_active(id);
        self.emit(EditorEvent::DocumentFocused(id));
        Ok(())
    }

    /// Assigns a grammar by display name; `"None"` clears it.
    pub fn set_language(&mut self, id: DocumentId, name: &str) -> CoreResult<()> {
        let language = if name == NO_LANGUAGE {
            None
        } else {
            let grammar = self
                .grammars
                .name_lookup(name)
                .ok_or_else(|| CoreError::UnknownLanguage(name.to_string()))?;
            Some(grammar.name().to_string())
        };

        let doc = self
            .documents
            .get_mut(id)
            .ok_or(CoreError::DocumentNotFound(id))?;
        doc.set_grammar(language.clone());

        self.refresh_record(id);
        self.persist_session();
        self.emit(EditorEvent::LanguageChanged { id, language });
        Ok(())
    }

    // ==================== Editing ====================

    /// Replaces the whole text of a document.
    pub fn set_text(&mut self, id: DocumentId, text: &str) -> CoreResult<()> {
        self.document_mut(id)?.buffer_mut().set_text(text);
        self.on_modified(id);
        Ok(())
    }

    /// Replaces a character range of a document.
    pub fn replace_range(&mut self, id: DocumentId, range: Range<usize>, text: &str) -> CoreResult<()> {
        self.document_mut(id)?.buffer_mut().replace(range, text)?;
        self.on_modified(id);
        Ok(())
    }

    /// Records that the editing widget changed a document.
    pub fn on_modified(&mut self, id: DocumentId) {
        self.backups.on_modified(id);
        self.emit(EditorEvent::DocumentChanged(id));
    }

    pub fn set_caret(&mut self, id: DocumentId, caret: Position) -> CoreResult<()> {
        self.document_mut(id)?.set_caret(caret);
        Ok(())
    }

    // ==================== Styling ====================

    /// Styled spans for a byte region of a document.
    ///
    /// Empty for documents without a grammar.
    pub fn restyle(&self, id: DocumentId, region: Range<usize>) -> CoreResult<Vec<StyledSpan>> {
        let doc = self.document(id)?;
        let grammar = doc.grammar().and_then(|name| self.grammars.name_lookup(name));
        Ok(match grammar {
            Some(grammar) => quillpad_syntax::restyle(&doc.text(), region, grammar),
            None => Vec::new(),
        })
    }

    /// Display style of a category in a document's grammar.
    pub fn style_for(&self, id: DocumentId, category: StyleCategory) -> CoreResult<ResolvedStyle> {
        let doc = self.document(id)?;
        let name = doc.grammar().unwrap_or(NO_LANGUAGE);
        Ok(self
            .grammars
            .resolve_style(name, category, self.config.theme_defaults()))
    }

    // ==================== Search ====================

    /// Searches the active document from its caret.
    ///
    /// A match moves the caret past it (or to its start when searching up)
    /// so repeating the search walks through the document. Returns the
    /// matched character range.
    pub fn find(&mut self, options: SearchOptions) -> CoreResult<Option<Range<usize>>> {
        let id = self.active_id()?;

        let previous = self.config.search.clone();
        self.config.remember_search(&options);
        if self.config.search != previous {
            self.persist_config();
        }

        let doc = self.document_mut(id)?;
        let found = doc.buffer().find(&options, doc.caret())?;
        if let Some(range) = &found {
            let caret = match options.direction {
                SearchDirection::Down => range.end,
                SearchDirection::Up => range.start,
            };
            let position = doc.buffer().char_idx_to_position(caret)?;
            doc.set_caret(position);
        } else {
            tracing::debug!(text = %options.text, "No match");
        }

        self.last_search = Some(options);
        Ok(found)
    }

    /// Repeats the last search downwards.
    pub fn find_next(&mut self) -> CoreResult<Option<Range<usize>>> {
        self.repeat_search(SearchDirection::Down)
    }

    /// Repeats the last search upwards.
    pub fn find_previous(&mut self) -> CoreResult<Option<Range<usize>>> {
        self.repeat_search(SearchDirection::Up)
    }

    fn repeat_search(&mut self, direction: SearchDirection) -> CoreResult<Option<Range<usize>>> {
        match self.last_search.clone() {
            Some(options) => self.find(options.with_direction(direction)),
            None => Ok(None),
        }
    }

    pub fn last_search(&self) -> Option<&SearchOptions> {
        self.last_search.as_ref()
    }

    // ==================== Preferences ====================

    /// Flips word wrap and saves the config. Returns the new value.
    pub fn toggle_word_wrap(&mut self) -> bool {
        self.config.editor.word_wrap = !self.config.editor.word_wrap;
        self.persist_config();
        self.emit(EditorEvent::ConfigChanged);
        self.config.editor.word_wrap
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Replaces the config and saves it.
    pub fn set_config(&mut self, config: Config) {
        self.config = config;
        self.persist_config();
        self.emit(EditorEvent::ConfigChanged);
    }

    // ==================== Backups ====================

    /// Runs the periodic backup sweep when it is due.
    pub fn tick(&mut self) -> Vec<PathBuf> {
        if !self.config.backup.enabled {
            return Vec::new();
        }
        match self.backups.tick(&self.documents, &mut self.session) {
            Some(written) => self.after_sweep(written),
            None => Vec::new(),
        }
    }

    /// Snapshots every modified document now.
    pub fn backup_now(&mut self) -> Vec<PathBuf> {
        let written = self.backups.periodic_sweep(&self.documents, &mut self.session);
        self.after_sweep(written)
    }

    fn after_sweep(&mut self, written: Vec<(DocumentId, PathBuf)>) -> Vec<PathBuf> {
        if !written.is_empty() {
            self.persist_session();
        }
        written
            .into_iter()
            .map(|(id, path)| {
                self.emit(EditorEvent::BackupWritten { id, path: path.clone() });
                path
            })
            .collect()
    }

    /// Snapshots modified documents and saves session and config.
    pub fn shutdown(&mut self) -> CoreResult<()> {
        if self.config.backup.enabled {
            self.backup_now();
        }
        let ids: Vec<DocumentId> = self.documents.order().to_vec();
        for id in ids {
            self.refresh_record(id);
        }

        self.session.save_to(self.paths.session_file())?;
        self.config.save_to(self.paths.config_file())?;
        self.should_quit = true;
        tracing::info!("Editor shut down");
        self.emit(EditorEvent::Quit);
        Ok(())
    }

    // ==================== Commands ====================

    /// Executes a command.
    pub fn execute(&mut self, cmd: &Command) -> CoreResult<()> {
        // Handlers need `&mut Editor`, so the registry steps out while they run.
        let commands = std::mem::take(&mut self.commands);
        let result = commands.execute(cmd, self);
        let added = std::mem::replace(&mut self.commands, commands);
        if !added.list().is_empty() {
            tracing::warn!("Commands registered while a command ran were dropped");
        }
        result
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    pub fn commands_mut(&mut self) -> &mut CommandRegistry {
        &mut self.commands
    }

    // ==================== Accessors ====================

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn grammars(&self) -> &GrammarRegistry {
        &self.grammars
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    pub fn documents(&self) -> &DocumentManager {
        &self.documents
    }

    pub fn document(&self, id: DocumentId) -> CoreResult<&Document> {
        self.documents.get(id).ok_or(CoreError::DocumentNotFound(id))
    }

    fn document_mut(&mut self, id: DocumentId) -> CoreResult<&mut Document> {
        self.documents
            .get_mut(id)
            .ok_or(CoreError::DocumentNotFound(id))
    }

    pub fn active_id(&self) -> CoreResult<DocumentId> {
        self.documents.active_id().ok_or(CoreError::NoActiveDocument)
    }

    pub fn active_document(&self) -> CoreResult<&Document> {
        self.documents.active().ok_or(CoreError::NoActiveDocument)
    }

    /// Returns true if any document has unsaved changes.
    pub fn has_unsaved_changes(&self) -> bool {
        self.documents.iter().any(Document::is_modified)
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Subscribes to editor events.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<EditorEvent> {
        self.event_bus.subscribe()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    fn emit(&self, event: EditorEvent) {
        self.event_bus.emit(event);
    }
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("root", &self.paths.root())
            .field("documents", &self.documents.len())
            .field("records", &self.session.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::ManualClock;
    use crate::event::EventHandler;
    use crate::session::OpenDocumentRecord;
    use tempfile::{TempDir, tempdir};

    struct Fixture {
        home: TempDir,
        files: TempDir,
        clock: ManualClock,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                home: tempdir().unwrap(),
                files: tempdir().unwrap(),
                clock: ManualClock::new(),
            }
        }

        fn paths(&self) -> AppPaths {
            AppPaths::new(self.home.path())
        }

        fn editor(&self) -> Editor {
            Editor::open_with_clock(self.paths(), Arc::new(self.clock.clone())).unwrap()
        }

        fn file(&self, name: &str, text: &str) -> PathBuf {
            let path = self.files.path().join(name);
            std::fs::write(&path, text).unwrap();
            path.canonicalize().unwrap()
        }
    }

    #[test]
    fn test_empty_session_opens_scratch() {
        let fx = Fixture::new();
        let mut editor = fx.editor();
        assert_eq!(editor.restore_session(), 1);
        assert_eq!(editor.active_document().unwrap().title(), "new 1");
    }

    #[test]
    fn test_open_file_assigns_grammar_and_record() {
        let fx = Fixture::new();
        let path = fx.file("main.cpp", "int main() {}\n");
        let mut editor = fx.editor();

        let id = editor.open_file(&path).unwrap();
        assert_eq!(editor.document(id).unwrap().grammar(), Some("C++"));
        assert_eq!(editor.session().records()[0].file_path, path);
        assert_eq!(editor.session().records()[0].grammar, "C++");

        let persisted = SessionState::load_from(fx.paths().session_file()).unwrap();
        assert_eq!(persisted.len(), 1);
    }

    #[test]
    fn test_open_twice_is_rejected() {
        let fx = Fixture::new();
        let path = fx.file("a.txt", "a");
        let mut editor = fx.editor();

        editor.open_file(&path).unwrap();
        assert!(matches!(editor.open_file(&path), Err(CoreError::AlreadyOpen(_))));
        assert_eq!(editor.documents().len(), 1);
    }

    #[test]
    fn test_open_missing_file() {
        let fx = Fixture::new();
        let mut editor = fx.editor();
        let missing = fx.files.path().join("missing.txt");
        assert!(matches!(editor.open_file(&missing), Err(CoreError::FileNotFound(_))));
    }

    #[test]
    fn test_scratch_titles_skip_backups() {
        let fx = Fixture::new();
        std::fs::create_dir_all(fx.paths().backup_dir()).unwrap();
        std::fs::write(fx.paths().backup_dir().join("new 1.bak"), "old").unwrap();

        let mut editor = fx.editor();
        editor.new_document();
        assert_eq!(editor.active_document().unwrap().title(), "new 2");
        editor.new_document();
        assert_eq!(editor.active_document().unwrap().title(), "new 3");
    }

    #[test]
    fn test_crash_and_restore_round_trip() {
        let fx = Fixture::new();
        let path = fx.file("notes.txt", "saved");

        {
            let mut editor = fx.editor();
            let file_id = editor.open_file(&path).unwrap();
            editor.set_text(file_id, "edited").unwrap();
            editor.set_caret(file_id, Position::new(0, 3)).unwrap();

            let scratch = editor.new_document();
            editor.set_text(scratch, "draft").unwrap();

            fx.clock.advance(Duration::from_secs(60));
            let written = editor.tick();
            assert_eq!(written.len(), 2);
            // Dropped without shutdown: a crash.
        }

        let mut editor = fx.editor();
        assert_eq!(editor.restore_session(), 2);
        let docs: Vec<&Document> = editor.documents().iter().collect();

        assert_eq!(docs[0].text(), "edited");
        assert!(docs[0].is_modified());
        assert_eq!(docs[0].caret(), Position::new(0, 3));
        assert_eq!(docs[0].grammar(), None);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "saved");

        assert_eq!(docs[1].title(), "new 1");
        assert_eq!(docs[1].text(), "draft");
        assert!(docs[1].is_scratch());
    }

    #[test]
    fn test_same_named_file_never_takes_restored_files_backup() {
        let fx = Fixture::new();
        std::fs::create_dir_all(fx.files.path().join("a")).unwrap();
        std::fs::create_dir_all(fx.files.path().join("b")).unwrap();
        let a = fx.file("a/notes.txt", "A saved");
        let b = fx.file("b/notes.txt", "B saved");

        {
            let mut editor = fx.editor();
            editor.restore_session();
            editor.open_file(&a).unwrap();
            editor.shutdown().unwrap();
        }

        {
            let mut editor = fx.editor();
            editor.restore_session();
            let b_id = editor.open_file(&b).unwrap();
            editor.set_text(b_id, "B unsaved edits").unwrap();
            assert_eq!(editor.backup_now().len(), 1);
            // Dropped without shutdown: a crash.
        }

        let mut editor = fx.editor();
        editor.restore_session();
        let a_doc = editor.documents().iter().find(|d| d.path() == Some(a.as_path())).unwrap();
        assert_eq!(a_doc.text(), "A saved");
        assert!(!a_doc.is_modified());

        let b_doc = editor.documents().iter().find(|d| d.path() == Some(b.as_path())).unwrap();
        assert_eq!(b_doc.text(), "B unsaved edits");
        assert!(b_doc.is_modified());
    }

    #[test]
    fn test_restore_removes_orphans_and_dead_records() {
        let fx = Fixture::new();
        let paths = fx.paths();
        paths.ensure_dirs().unwrap();
        std::fs::write(paths.backup_dir().join("forgotten.txt.bak"), "x").unwrap();

        let mut session = SessionState::new();
        session.upsert(OpenDocumentRecord::new(fx.files.path().join("deleted.txt")));
        session.save_to(paths.session_file()).unwrap();

        let mut editor = fx.editor();
        editor.restore_session();
        assert!(!paths.backup_dir().join("forgotten.txt.bak").exists());
        assert!(editor.session().is_empty());
    }

    #[test]
    fn test_save_discards_backup() {
        let fx = Fixture::new();
        let path = fx.file("todo.md", "- a");
        let mut editor = fx.editor();
        let id = editor.open_file(&path).unwrap();
        editor.set_text(id, "- a\n- b").unwrap();

        let written = editor.backup_now();
        assert_eq!(written, vec![fx.paths().backup_dir().join("todo.md.bak")]);

        editor.save(id).unwrap();
        assert!(!written[0].exists());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "- a\n- b");
        assert!(!editor.session().records()[0].is_modified);
    }

    #[test]
    fn test_save_scratch_requires_path() {
        let fx = Fixture::new();
        let mut editor = fx.editor();
        let id = editor.new_document();
        assert!(matches!(editor.save(id), Err(CoreError::InvalidOperation(_))));
    }

    #[test]
    fn test_save_as_replaces_scratch_record() {
        let fx = Fixture::new();
        let mut editor = fx.editor();
        let id = editor.new_document();
        editor.set_text(id, "print(1)").unwrap();
        editor.backup_now();
        let scratch_backup = fx.paths().backup_dir().join("new 1.bak");
        assert_eq!(editor.session().records()[0].file_path, scratch_backup);

        let target = fx.files.path().join("script.py");
        editor.save_as(id, &target).unwrap();

        let doc = editor.document(id).unwrap();
        assert_eq!(doc.title(), "script.py");
        assert_eq!(doc.grammar(), Some("Python"));
        assert!(!scratch_backup.exists());
        assert_eq!(editor.session().len(), 1);
        assert_eq!(
            editor.session().records()[0].file_path,
            target.canonicalize().unwrap()
        );
    }

    #[test]
    fn test_close_last_tab_opens_new_one() {
        let fx = Fixture::new();
        let path = fx.file("a.txt", "a");
        let mut editor = fx.editor();
        let id = editor.open_file(&path).unwrap();

        editor.close_document(id).unwrap();
        assert!(editor.session().is_empty());
        assert_eq!(editor.documents().len(), 1);
        assert!(editor.active_document().unwrap().is_scratch());
    }

    #[test]
    fn test_close_with_locked_tabs() {
        let fx = Fixture::new();
        let mut editor = fx.editor();
        let id = editor.new_document();
        let mut config = editor.config().clone();
        config.tabs.lock_tabs = true;
        editor.set_config(config);

        assert!(matches!(
            editor.close_document(id),
            Err(CoreError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_set_language() {
        let fx = Fixture::new();
        let path = fx.file("notes.txt", "x");
        let mut editor = fx.editor();
        let id = editor.open_file(&path).unwrap();

        editor.set_language(id, "Rust").unwrap();
        assert_eq!(editor.document(id).unwrap().grammar(), Some("Rust"));
        assert_eq!(editor.session().records()[0].grammar, "Rust");

        editor.set_language(id, NO_LANGUAGE).unwrap();
        assert_eq!(editor.document(id).unwrap().grammar(), None);

        assert!(matches!(
            editor.set_language(id, "Klingon"),
            Err(CoreError::UnknownLanguage(_))
        ));
    }

    #[test]
    fn test_restyle_document() {
        let fx = Fixture::new();
        let path = fx.file("lib.rs", "fn main() {}");
        let mut editor = fx.editor();
        let id = editor.open_file(&path).unwrap();

        let spans = editor.restyle(id, 0..12).unwrap();
        assert_eq!(spans[0].category, StyleCategory::Keyword1);
        assert_eq!(spans.last().map(|s| s.end()), Some(12));

        editor.set_language(id, NO_LANGUAGE).unwrap();
        assert!(editor.restyle(id, 0..12).unwrap().is_empty());
    }

    #[test]
    fn test_find_next_and_previous() {
        let fx = Fixture::new();
        let mut editor = fx.editor();
        let id = editor.new_document();
        editor.set_text(id, "cat dog cat dog").unwrap();

        let mut options = SearchOptions::new("dog");
        options.wrap_around = true;
        assert_eq!(editor.find(options).unwrap(), Some(4..7));
        assert_eq!(editor.find_next().unwrap(), Some(12..15));
        assert_eq!(editor.find_next().unwrap(), Some(4..7));
        assert_eq!(editor.find_previous().unwrap(), Some(4..7));
        assert_eq!(editor.document(id).unwrap().caret(), Position::new(0, 4));

        assert!(editor.config().search.wrap_around);
        let saved = Config::load_from(fx.paths().config_file()).unwrap();
        assert!(saved.search.wrap_around);
    }

    #[test]
    fn test_invalid_regex_is_an_error() {
        let fx = Fixture::new();
        let mut editor = fx.editor();
        editor.new_document();

        let mut options = SearchOptions::new("(unclosed");
        options.use_regex = true;
        assert!(matches!(editor.find(options), Err(CoreError::Buffer(_))));
    }

    #[test]
    fn test_toggle_word_wrap_persists() {
        let fx = Fixture::new();
        let mut editor = fx.editor();
        assert!(editor.toggle_word_wrap());
        assert!(Config::load_from(fx.paths().config_file()).unwrap().editor.word_wrap);
    }

    #[test]
    fn test_execute_commands() {
        let fx = Fixture::new();
        let mut editor = fx.editor();
        editor
            .commands_mut()
            .register_fn("shout", "Uppercase the document", |ctx, _| {
                let id = ctx.editor.active_id()?;
                let text = ctx.editor.document(id)?.text().to_uppercase();
                ctx.editor.set_text(id, &text)
            });

        editor.execute(&Command::NewFile).unwrap();
        let id = editor.active_id().unwrap();
        editor.set_text(id, "hey").unwrap();
        editor
            .execute(&Command::Custom {
                name: "shout".to_string(),
                args: vec![],
            })
            .unwrap();
        assert_eq!(editor.document(id).unwrap().text(), "HEY");
        assert!(editor.commands().contains("shout"));

        let missing = Command::Custom {
            name: "nope".to_string(),
            args: vec![],
        };
        assert!(matches!(editor.execute(&missing), Err(CoreError::CommandNotFound(_))));
    }

    #[test]
    fn test_events_are_published() {
        let fx = Fixture::new();
        let mut editor = fx.editor();
        let mut events = EventHandler::new(editor.subscribe());

        let id = editor.new_document();
        editor.set_text(id, "x").unwrap();

        assert_eq!(
            events.drain(),
            vec![
                EditorEvent::DocumentOpened(id),
                EditorEvent::DocumentFocused(id),
                EditorEvent::DocumentChanged(id),
            ]
        );
    }

    #[test]
    fn test_shutdown_writes_session() {
        let fx = Fixture::new();
        let path = fx.file("a.txt", "abc");
        let mut editor = fx.editor();
        let id = editor.open_file(&path).unwrap();
        editor.set_caret(id, Position::new(0, 2)).unwrap();

        editor.shutdown().unwrap();
        assert!(editor.should_quit());

        let session = SessionState::load_from(fx.paths().session_file()).unwrap();
        assert_eq!(session.records()[0].caret, Position::new(0, 2));
    }
}
