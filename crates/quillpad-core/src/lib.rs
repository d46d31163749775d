//! # Quillpad Core
//!
//! Editor state that outlives a single keystroke: open documents, the
//! persisted session, crash-recovery backups and preferences.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                         Editor                            │
//! │  ┌──────────┐ ┌──────────┐ ┌──────────────┐ ┌──────────┐ │
//! │  │  Config  │ │ AppPaths │ │ GrammarReg.  │ │ Commands │ │
//! │  └──────────┘ └──────────┘ └──────────────┘ └──────────┘ │
//! │  ┌───────────────────────┐  ┌──────────────────────────┐ │
//! │  │    DocumentManager    │  │      BackupManager       │ │
//! │  │  ┌─────┐ ┌─────┐      │  │  hashes, timers, names   │ │
//! │  │  │Doc 1│ │Doc 2│ ...  │  └────────────┬─────────────┘ │
//! │  │  └─────┘ └─────┘      │               │               │
//! │  └───────────────────────┘       SessionState (records)   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Learning: Module Organization
//!
//! Rust modules map to files:
//! - `mod foo;` looks for `foo.rs` or `foo/mod.rs`
//! - `pub use` re-exports items for cleaner public APIs

pub mod backup;
pub mod command;
pub mod config;
pub mod document;
pub mod editor;
pub mod event;
pub mod paths;
pub mod session;

pub use backup::{
    BackupManager, Clock, ManualClock, RestoreOutcome, RestoreSource, RestoredDocument,
    SnapshotOutcome, SystemClock,
};
pub use command::{Command, CommandContext, CommandHandler, CommandRegistry, FnCommand};
pub use config::{Config, ConfigError};
pub use document::{Document, DocumentId, DocumentManager};
pub use editor::Editor;
pub use event::{EditorEvent, EventBus, EventHandler};
pub use paths::AppPaths;
pub use session::{OpenDocumentRecord, SessionState, next_scratch_title};

use std::path::PathBuf;

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core operations
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Document not found: {0}")]
    DocumentNotFound(DocumentId),

    #[error("No active document")]
    NoActiveDocument,

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("File is already open: {}", .0.display())]
    AlreadyOpen(PathBuf),

    #[error("Unknown language: {0}")]
    UnknownLanguage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Buffer error: {0}")]
    Buffer(#[from] quillpad_buffer::BufferError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}
