//! Command system for editor actions.
//!
//! ## Learning: The Command Pattern
//!
//! Menu entries, the CLI and plugins all trigger actions by value:
//! - Built-in actions are `Command` variants (exhaustive, no allocation)
//! - Plugin actions are `CommandHandler` trait objects looked up by name
//!   through `Command::Custom`

use crate::editor::Editor;
use crate::{CoreError, CoreResult};
use std::collections::HashMap;
use std::path::PathBuf;

/// Built-in editor commands.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Command {
    // File commands
    NewFile,
    OpenFile { path: PathBuf },
    Save,
    SaveAs { path: PathBuf },
    CloseFile,
    Quit,

    // Search
    Find { text: String },
    FindNext,
    FindPrevious,

    // View
    ToggleWordWrap,
    SetLanguage { name: String },

    // Custom command (name, arguments)
    Custom { name: String, args: Vec<String> },
}

impl Command {
    /// Returns the command's display name.
    pub fn display_name(&self) -> &str {
        match self {
            Command::NewFile => "New File",
            Command::OpenFile { .. } => "Open File",
            Command::Save => "Save",
            Command::SaveAs { .. } => "Save As",
            Command::CloseFile => "Close File",
            Command::Quit => "Quit",
            Command::Find { .. } => "Find",
            Command::FindNext => "Find Next",
            Command::FindPrevious => "Find Previous",
            Command::ToggleWordWrap => "Word Wrap",
            Command::SetLanguage { .. } => "Language",
            Command::Custom { name, .. } => name,
        }
    }
}

/// Context passed to command execution.
pub struct CommandContext<'a> {
    pub editor: &'a mut Editor,
}

/// Handler for a named command, usually contributed by a plugin.
///
/// ## Learning: Trait Objects
///
/// `Box<dyn CommandHandler>` lets handlers of unrelated types share one
/// `HashMap`. `Send + Sync` keeps the registry usable from any thread.
pub trait CommandHandler: Send + Sync {
    /// Returns the command name.
    fn name(&self) -> &str;

    /// Executes the command.
    fn execute(&self, ctx: &mut CommandContext, args: &[String]) -> CoreResult<()>;

    /// Returns a description for menus.
    fn description(&self) -> &str {
        self.name()
    }
}

type HandlerFn = dyn Fn(&mut CommandContext, &[String]) -> CoreResult<()> + Send + Sync;

/// A `CommandHandler` backed by a closure.
pub struct FnCommand {
    name: String,
    description: String,
    func: Box<HandlerFn>,
}

impl FnCommand {
    pub fn new<F>(name: impl Into<String>, description: impl Into<String>, func: F) -> Self
    where
        F: Fn(&mut CommandContext, &[String]) -> CoreResult<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            func: Box::new(func),
        }
    }
}

impl CommandHandler for FnCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&self, ctx: &mut CommandContext, args: &[String]) -> CoreResult<()> {
        (self.func)(ctx, args)
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Registry for named command handlers.
#[derive(Default)]
pub struct CommandRegistry {
    handlers: HashMap<String, Box<dyn CommandHandler>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler, replacing any handler with the same name.
    pub fn register(&mut self, handler: Box<dyn CommandHandler>) {
        let name = handler.name().to_string();
        if self.handlers.insert(name.clone(), handler).is_some() {
            tracing::debug!(command = %name, "Replaced command handler");
        }
    }

    /// Registers a closure as a handler.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, description: impl Into<String>, func: F)
    where
        F: Fn(&mut CommandContext, &[String]) -> CoreResult<()> + Send + Sync + 'static,
    {
        self.register(Box::new(FnCommand::new(name, description, func)));
    }

    /// Removes a handler.
    pub fn unregister(&mut self, name: &str) -> bool {
        self.handlers.remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Executes a command against `editor`.
    pub fn execute(&self, cmd: &Command, editor: &mut Editor) -> CoreResult<()> {
        let mut ctx = CommandContext { editor };

        match cmd {
            Command::NewFile => {
                ctx.editor.new_document();
                Ok(())
            }
            Command::OpenFile { path } => ctx.editor.open_file(path).map(|_| ()),
            Command::Save => {
                let id = ctx.editor.active_id()?;
                ctx.editor.save(id)
            }
            Command::SaveAs { path } => {
                let id = ctx.editor.active_id()?;
                ctx.editor.save_as(id, path)
            }
            Command::CloseFile => {
                let id = ctx.editor.active_id()?;
                ctx.editor.close_document(id)
            }
            Command::Quit => ctx.editor.shutdown(),
            Command::Find { text } => {
                let options = ctx.editor.config().search_options(text.clone());
                ctx.editor.find(options).map(|_| ())
            }
            Command::FindNext => ctx.editor.find_next().map(|_| ()),
            Command::FindPrevious => ctx.editor.find_previous().map(|_| ()),
            Command::ToggleWordWrap => {
                ctx.editor.toggle_word_wrap();
                Ok(())
            }
            Command::SetLanguage { name } => {
                let id = ctx.editor.active_id()?;
                ctx.editor.set_language(id, name)
            }
            Command::Custom { name, args } => match self.handlers.get(name) {
                Some(handler) => handler.execute(&mut ctx, args),
                None => Err(CoreError::CommandNotFound(name.clone())),
            },
        }
    }

    /// Registered handler names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Description of a registered handler.
    pub fn description(&self, name: &str) -> Option<&str> {
        self.handlers.get(name).map(|h| h.description())
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("handlers", &self.list())
            .finish()
    }
}
