//! Editor notifications.
//!
//! ## Learning: Observer Pattern in Rust
//!
//! Instead of holding references to observers, the editor publishes events
//! as values on a `tokio::sync::broadcast` channel. Subscribers (the shell,
//! plugins) each get their own clone of every event.

use crate::document::DocumentId;
use std::path::PathBuf;
use tokio::sync::broadcast;

/// Events published by the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
    // Document events
    /// A document was opened or created
    DocumentOpened(DocumentId),
    /// A tab was closed
    DocumentClosed(DocumentId),
    /// A document was written to its file
    DocumentSaved(DocumentId),
    /// A document's text changed
    DocumentChanged(DocumentId),
    /// A document became the active tab
    DocumentFocused(DocumentId),
    /// A document's grammar assignment changed
    LanguageChanged {
        id: DocumentId,
        language: Option<String>,
    },

    // Recovery events
    /// A crash-recovery snapshot was written
    BackupWritten { id: DocumentId, path: PathBuf },
    /// The previous session was restored
    SessionRestored { count: usize },

    // Editor events
    /// Preferences changed
    ConfigChanged,
    /// The editor is shutting down
    Quit,
}

/// Broadcasts editor events.
///
/// Lagging receivers lose old events instead of blocking the sender.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EditorEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }

    /// Emits an event to all subscribers.
    pub fn emit(&self, event: EditorEvent) {
        // No subscribers is fine.
        let _ = self.sender.send(event);
    }

    /// Subscribes to all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<EditorEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("receivers", &self.sender.receiver_count())
            .finish()
    }
}

/// Receives events, skipping over lag.
///
/// ```ignore
/// let mut handler = EventHandler::new(editor.subscribe());
/// tokio::spawn(async move {
///     while let Some(event) = handler.next().await {
///         if let EditorEvent::BackupWritten { path, .. } = event {
///             println!("backed up {}", path.display());
///         }
///     }
/// });
/// ```
pub struct EventHandler {
    receiver: broadcast::Receiver<EditorEvent>,
}

impl EventHandler {
    pub fn new(receiver: broadcast::Receiver<EditorEvent>) -> Self {
        Self { receiver }
    }

    /// Waits for the next event; `None` once the bus is gone.
    pub async fn next(&mut self) -> Option<EditorEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(missed = n, "Event handler lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Returns every event already queued, without waiting.
    pub fn drain(&mut self) -> Vec<EditorEvent> {
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(event) => events.push(event),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    tracing::warn!(missed = n, "Event handler lagged");
                }
                Err(_) => return events,
            }
        }
    }
}
