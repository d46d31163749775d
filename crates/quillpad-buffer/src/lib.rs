//! # Quillpad Buffer
//!
//! Text storage for open documents.
//!
//! The editing widget owns rendering, carets and undo; this crate only keeps
//! the authoritative copy of each document's text so the rest of the editor
//! can snapshot, search and restyle it.
//!
//! ## Learning: Ownership & Borrowing
//!
//! - `TextBuffer` owns the rope data structure
//! - Methods like `text()` hand out borrowed views (`Cow<str>`)
//! - Mutations require `&mut self` (exclusive access)

mod buffer;
mod position;
pub mod search;

pub use buffer::{TextBuffer, decode_file_contents, write_atomic};
pub use position::Position;
pub use search::{SearchDirection, SearchOptions};

/// Result type for buffer operations
pub type BufferResult<T> = Result<T, BufferError>;

/// Errors that can occur during buffer operations
#[derive(Debug, thiserror::Error)]
pub enum BufferError {
    #[error("Position {line}:{column} is out of bounds")]
    PositionOutOfBounds { line: usize, column: usize },

    #[error("Invalid character index: {0}")]
    InvalidCharIndex(usize),

    #[error("Invalid search pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("No file path set")]
    NoFilePath,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
