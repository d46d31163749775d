//! The capabilities a plugin is given.

use quillpad_core::{CommandHandler, Editor};
use tracing::Level;

/// Version reported to plugins.
pub const PROGRAM_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Everything a plugin may do to the editor.
pub trait ExtensionHost {
    /// Adds a command, invoked later as `Command::Custom { name, .. }`.
    fn register_command(&mut self, handler: Box<dyn CommandHandler>);

    /// Adds `label` to this plugin's submenu, running `command` when chosen.
    fn register_menu_entry(&mut self, label: &str, command: &str);

    /// Writes to the editor's log, tagged with the plugin name.
    fn log(&self, level: Level, message: &str);

    /// Full text of the active document, if there is one.
    fn active_document_text(&self) -> Option<String>;

    fn program_version(&self) -> &str;
}

/// One entry of the Plugins menu: `Plugins > {plugin} > {label}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    pub plugin: String,
    pub label: String,
    pub command: String,
}

/// `ExtensionHost` backed by a live editor, scoped to one plugin.
pub struct EditorHost<'a> {
    editor: &'a mut Editor,
    plugin: String,
    commands: Vec<String>,
    menu: Vec<MenuEntry>,
}

impl<'a> EditorHost<'a> {
    pub fn new(editor: &'a mut Editor, plugin: impl Into<String>) -> Self {
        Self {
            editor,
            plugin: plugin.into(),
            commands: Vec::new(),
            menu: Vec::new(),
        }
    }

    /// Names of the commands registered through this host.
    pub fn commands(&self) -> &[String] {
        &self.commands
    }

    /// Consumes the host, returning what the plugin contributed.
    pub fn into_contributions(self) -> (Vec<String>, Vec<MenuEntry>) {
        (self.commands, self.menu)
    }
}

impl ExtensionHost for EditorHost<'_> {
    fn register_command(&mut self, handler: Box<dyn CommandHandler>) {
        let name = handler.name().to_string();
        tracing::debug!(plugin = %self.plugin, command = %name, "Plugin registered command");
        self.editor.commands_mut().register(handler);
        self.commands.push(name);
    }

    fn register_menu_entry(&mut self, label: &str, command: &str) {
        self.menu.push(MenuEntry {
            plugin: self.plugin.clone(),
            label: label.to_string(),
            command: command.to_string(),
        });
    }

    fn log(&self, level: Level, message: &str) {
        let plugin = self.plugin.as_str();
        match level {
            Level::ERROR => tracing::error!(plugin, "{}", message),
            Level::WARN => tracing::warn!(plugin, "{}", message),
            Level::INFO => tracing::info!(plugin, "{}", message),
            Level::DEBUG => tracing::debug!(plugin, "{}", message),
            _ => tracing::trace!(plugin, "{}", message),
        }
    }

    fn active_document_text(&self) -> Option<String> {
        self.editor
            .active_document()
            .ok()
            .map(|doc| doc.text().into_owned())
    }

    fn program_version(&self) -> &str {
        PROGRAM_VERSION
    }
}
