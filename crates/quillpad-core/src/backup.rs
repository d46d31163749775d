//! Crash-recovery snapshots.
//!
//! Modified documents are periodically written to `<backup_dir>/<name>.bak`.
//! On the next start the persisted session records are reconciled against
//! those snapshots and the real files, and any snapshot nobody refers to
//! anymore is deleted.
//!
//! ## Learning: Trait Objects for Testability
//!
//! The manager asks a `Clock` for the time instead of calling
//! `Instant::now()` directly. Production code uses `SystemClock`; tests use
//! `ManualClock` and move time forward explicitly, so the 60 second gate can
//! be tested without sleeping.

use quillpad_syntax::NO_LANGUAGE;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::document::{Document, DocumentId, DocumentManager};
use crate::session::{OpenDocumentRecord, SessionState};
use crate::CoreResult;

/// Extension of snapshot files.
pub const BACKUP_EXTENSION: &str = "bak";

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Result of a snapshot request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotOutcome {
    /// The snapshot was written to this file
    Written(PathBuf),
    /// Content unchanged and the last snapshot is recent enough
    Skipped,
}

/// Where a restored document's text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreSource {
    /// A never-saved document read from its snapshot
    Scratch,
    /// A real file whose snapshot was newer than the file
    Backup,
    /// The real file itself
    Original,
    /// Nothing could be restored; an empty document was created
    New,
}

/// One document produced by the recovery pass.
#[derive(Debug)]
pub struct RestoredDocument {
    pub document: Document,
    pub source: RestoreSource,
    /// The record it was restored from, `None` for the fallback document
    pub record: Option<OpenDocumentRecord>,
}

/// Everything the recovery pass produced.
#[derive(Debug, Default)]
pub struct RestoreOutcome {
    /// Restored documents in record order
    pub documents: Vec<RestoredDocument>,
    /// Record paths that were dropped
    pub dropped: Vec<PathBuf>,
}

impl RestoreOutcome {
    /// Records of the restored documents, in order.
    pub fn surviving_records(&self) -> Vec<OpenDocumentRecord> {
        self.documents
            .iter()
            .filter_map(|restored| restored.record.clone())
            .collect()
    }
}

type ContentHash = sha2::digest::Output<Sha256>;

#[derive(Debug, Clone, Copy)]
struct SnapshotState {
    hash: ContentHash,
    taken_at: Instant,
}

/// Owns the backup directory.
///
/// A sweep runs through `&mut self`, so two sweeps can never overlap.
pub struct BackupManager {
    dir: PathBuf,
    interval: Duration,
    clock: Arc<dyn Clock>,
    states: HashMap<DocumentId, SnapshotState>,
    dirty: HashSet<DocumentId>,
    /// Snapshot file name per document, unique within the directory
    names: HashMap<DocumentId, String>,
    last_sweep: Instant,
}

impl std::fmt::Debug for BackupManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackupManager")
            .field("dir", &self.dir)
            .field("interval", &self.interval)
            .field("tracked", &self.states.len())
            .field("dirty", &self.dirty.len())
            .finish()
    }
}

impl BackupManager {
    pub fn new(dir: impl Into<PathBuf>, interval: Duration) -> Self {
        Self::with_clock(dir, interval, Arc::new(SystemClock))
    }

    pub fn with_clock(dir: impl Into<PathBuf>, interval: Duration, clock: Arc<dyn Clock>) -> Self {
        let last_sweep = clock.now();
        Self {
            dir: dir.into(),
            interval,
            clock,
            states: HashMap::new(),
            dirty: HashSet::new(),
            names: HashMap::new(),
            last_sweep,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    // ==================== Naming ====================

    /// Snapshot file name for `doc`: `<file name>.bak`, or `<title>.bak` for
    /// scratch documents, with `~N` inserted when another document holds that
    /// name or a file of that name is already in the directory.
    fn backup_name(&mut self, doc: &Document) -> String {
        if let Some(name) = self.names.get(&doc.id()) {
            return name.clone();
        }

        let base = base_name(doc);
        let mut candidate = format!("{}.{}", base, BACKUP_EXTENSION);
        let mut n = 2;
        while self.is_name_taken(&candidate) || self.dir.join(&candidate).exists() {
            candidate = format!("{}~{}.{}", base, n, BACKUP_EXTENSION);
            n += 1;
        }

        self.names.insert(doc.id(), candidate.clone());
        candidate
    }

    fn is_name_taken(&self, name: &str) -> bool {
        self.names.values().any(|taken| taken == name)
    }

    /// Claims `name` for a restored document unless another one holds it.
    fn reserve_name(&mut self, id: DocumentId, name: &Path) {
        let Some(name) = name.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            return;
        };
        if self.is_name_taken(&name) {
            tracing::warn!(backup = %name, "Backup name claimed by two records");
            return;
        }
        self.names.insert(id, name);
    }

    /// Path of the snapshot file for `doc`.
    pub fn backup_path(&mut self, doc: &Document) -> PathBuf {
        let name = self.backup_name(doc);
        self.dir.join(name)
    }

    /// Path a session record uses for `doc`.
    pub fn record_path(&mut self, doc: &Document) -> PathBuf {
        match doc.path() {
            Some(path) => path.to_path_buf(),
            None => self.backup_path(doc),
        }
    }

    /// Session record describing `doc` as it is now.
    pub fn record_for(&mut self, doc: &Document) -> OpenDocumentRecord {
        let backup_file = match doc.path() {
            Some(_) => {
                let name = self.backup_name(doc);
                let derived = format!("{}.{}", base_name(doc), BACKUP_EXTENSION);
                (name != derived).then(|| self.dir.join(name))
            }
            None => None,
        };

        OpenDocumentRecord {
            file_path: self.record_path(doc),
            is_modified: doc.is_modified(),
            caret: doc.caret(),
            grammar: doc.grammar().unwrap_or(NO_LANGUAGE).to_string(),
            backup_file,
        }
    }

    // ==================== Snapshots ====================

    /// Marks a document as changed since its last snapshot.
    pub fn on_modified(&mut self, id: DocumentId) {
        self.dirty.insert(id);
    }

    pub fn is_dirty(&self, id: DocumentId) -> bool {
        self.dirty.contains(&id)
    }

    /// Writes `doc` to its snapshot file and updates its session record.
    ///
    /// Skipped when the text hashes the same as the last snapshot and that
    /// snapshot is younger than the interval.
    pub fn snapshot(
        &mut self,
        doc: &Document,
        session: &mut SessionState,
    ) -> CoreResult<SnapshotOutcome> {
        let id = doc.id();
        let text = doc.text();
        let hash = Sha256::digest(text.as_bytes());
        let now = self.clock.now();

        let unchanged = self.states.get(&id).is_some_and(|state| {
            state.hash == hash && now.duration_since(state.taken_at) < self.interval
        });
        if unchanged {
            self.dirty.remove(&id);
            tracing::trace!(document = %id, "Snapshot unchanged, skipping");
            return Ok(SnapshotOutcome::Skipped);
        }

        std::fs::create_dir_all(&self.dir)?;
        let path = self.backup_path(doc);
        quillpad_buffer::write_atomic(&path, &text)?;

        self.states.insert(id, SnapshotState { hash, taken_at: now });
        self.dirty.remove(&id);
        session.upsert(self.record_for(doc));

        tracing::debug!(document = %id, path = %path.display(), "Wrote backup");
        Ok(SnapshotOutcome::Written(path))
    }

    /// Snapshots every modified or dirty document.
    ///
    /// A failing document is logged and the sweep continues. Returns the
    /// files that were written.
    pub fn periodic_sweep(
        &mut self,
        documents: &DocumentManager,
        session: &mut SessionState,
    ) -> Vec<(DocumentId, PathBuf)> {
        self.last_sweep = self.clock.now();
        let mut written = Vec::new();

        for doc in documents.iter() {
            if !doc.is_modified() && !self.dirty.contains(&doc.id()) {
                continue;
            }
            match self.snapshot(doc, session) {
                Ok(SnapshotOutcome::Written(path)) => written.push((doc.id(), path)),
                Ok(SnapshotOutcome::Skipped) => {}
                Err(e) => {
                    tracing::warn!(document = %doc.title(), error = %e, "Backup failed");
                }
            }
        }

        written
    }

    /// Runs a sweep if the interval has elapsed since the last one.
    pub fn tick(
        &mut self,
        documents: &DocumentManager,
        session: &mut SessionState,
    ) -> Option<Vec<(DocumentId, PathBuf)>> {
        if self.clock.now().duration_since(self.last_sweep) < self.interval {
            return None;
        }
        Some(self.periodic_sweep(documents, session))
    }

    /// Deletes a document's snapshot and forgets its state.
    ///
    /// Called after a successful save and when a tab closes.
    pub fn discard(&mut self, id: DocumentId) -> Option<PathBuf> {
        self.states.remove(&id);
        self.dirty.remove(&id);
        let path = self.dir.join(self.names.remove(&id)?);

        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Removed backup");
                Some(path)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Could not remove backup");
                None
            }
        }
    }

    // ==================== Recovery ====================

    fn is_scratch_record(&self, record: &OpenDocumentRecord) -> bool {
        record.file_path.starts_with(&self.dir)
            && record.file_path.extension().is_some_and(|ext| ext == BACKUP_EXTENSION)
    }

    fn derived_backup(&self, path: &Path) -> Option<PathBuf> {
        let name = path.file_name()?.to_string_lossy();
        Some(self.dir.join(format!("{}.{}", name, BACKUP_EXTENSION)))
    }

    /// Rebuilds documents from persisted records.
    ///
    /// Records whose file is gone or unreadable are dropped. A real file's
    /// snapshot wins over the file itself. When nothing survives an empty
    /// `new 1` document is returned.
    pub fn restore_session(&mut self, records: &[OpenDocumentRecord]) -> RestoreOutcome {
        let mut outcome = RestoreOutcome::default();

        for record in records {
            let path = &record.file_path;
            if !path.exists() {
                tracing::info!(path = %path.display(), "Dropping record, file no longer exists");
                outcome.dropped.push(path.clone());
                continue;
            }

            let scratch = self.is_scratch_record(record);
            let (source, read_from) = if scratch {
                (RestoreSource::Scratch, path.clone())
            } else {
                let backup = record
                    .backup_file
                    .clone()
                    .filter(|p| p.exists())
                    .or_else(|| self.derived_backup(path).filter(|p| p.exists()));
                match backup {
                    Some(backup) => {
                        tracing::info!(
                            path = %path.display(),
                            backup = %backup.display(),
                            "Restoring from backup"
                        );
                        (RestoreSource::Backup, backup)
                    }
                    None => (RestoreSource::Original, path.clone()),
                }
            };

            let text = match std::fs::read(&read_from) {
                Ok(bytes) => quillpad_buffer::decode_file_contents(bytes),
                Err(e) => {
                    tracing::warn!(path = %read_from.display(), error = %e, "Could not read, dropping record");
                    outcome.dropped.push(path.clone());
                    continue;
                }
            };

            let mut document = if scratch {
                let title = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                Document::from_text(title, &text, None)
            } else {
                let title = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                Document::from_text(title, &text, Some(path.clone()))
            };

            document.set_modified(record.is_modified || source == RestoreSource::Backup);
            document.set_caret(record.caret);
            document.set_grammar(record.grammar_name().map(str::to_string));

            // Every restored document owns its snapshot name, even one read
            // from its own file.
            let claimed = match source {
                RestoreSource::Original => record
                    .backup_file
                    .clone()
                    .or_else(|| self.derived_backup(path)),
                _ => Some(read_from.clone()),
            };
            if let Some(claimed) = claimed {
                self.reserve_name(document.id(), &claimed);
            }

            if source != RestoreSource::Original {
                self.states.insert(
                    document.id(),
                    SnapshotState {
                        hash: Sha256::digest(text.as_bytes()),
                        taken_at: self.clock.now(),
                    },
                );
            }

            outcome.documents.push(RestoredDocument {
                document,
                source,
                record: Some(record.clone()),
            });
        }

        if outcome.documents.is_empty() {
            outcome.documents.push(RestoredDocument {
                document: Document::scratch(format!("{}1", crate::session::SCRATCH_PREFIX)),
                source: RestoreSource::New,
                record: None,
            });
        }

        outcome
    }

    /// Deletes snapshot files that no record refers to.
    ///
    /// A file is kept if it is a scratch record's path, a record's
    /// `backup_file`, the name derived from a record's file, or a name
    /// currently assigned to an open document. Returns the deleted files.
    pub fn cleanup_orphans(&self, records: &[OpenDocumentRecord]) -> Vec<PathBuf> {
        let mut keep: HashSet<PathBuf> = self.names.values().map(|n| self.dir.join(n)).collect();
        for record in records {
            if self.is_scratch_record(record) {
                keep.insert(record.file_path.clone());
            } else if let Some(derived) = self.derived_backup(&record.file_path) {
                keep.insert(derived);
            }
            if let Some(backup) = &record.backup_file {
                keep.insert(backup.clone());
            }
        }

        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(dir = %self.dir.display(), error = %e, "Backup directory not readable");
                return Vec::new();
            }
        };

        let mut removed = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let is_backup = path.is_file()
                && path.extension().is_some_and(|ext| ext == BACKUP_EXTENSION);
            if !is_backup || keep.contains(&path) {
                continue;
            }
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    tracing::info!(path = %path.display(), "Removed orphaned backup");
                    removed.push(path);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Could not remove orphaned backup");
                }
            }
        }

        removed
    }
}

fn base_name(doc: &Document) -> String {
    doc.path()
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| doc.title().to_string())
}
