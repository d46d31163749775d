//! # Quillpad Plugin System
//!
//! Plugins extend the editor through a narrow capability interface,
//! [`ExtensionHost`]: they may register commands and menu entries, log, read
//! the active document's text and ask for the program version. They never
//! see the editor's internals.
//!
//! ## Plugin Sources
//!
//! 1. **Native plugins**: shared libraries found under `plugins/<dir>/`
//!    next to a `plugin.toml` manifest, loaded with `libloading`
//! 2. **Built-in plugins**: statically linked factories registered with
//!    [`PluginManager::register_builtin`]
//!
//! ## Safety Considerations
//!
//! Loading native code is inherently unsafe:
//! - Plugins must be trusted
//! - A native plugin must be built with the same compiler as the editor,
//!   since `Box<dyn Plugin>` crosses the library boundary with the Rust ABI

mod host;
mod loader;
mod manager;
mod manifest;

pub use host::{EditorHost, ExtensionHost, MenuEntry, PROGRAM_VERSION};
pub use loader::{CREATE_SYMBOL, NativeLoader, PluginCreate, PluginLoader};
pub use manager::{PluginInfo, PluginManager, PluginState};
pub use manifest::{API_VERSION, MANIFEST_FILE, PluginManifest, is_compatible};

use std::path::PathBuf;

/// Plugin system errors.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("Plugin not found: {0}")]
    NotFound(String),

    #[error("Failed to load plugin {id}: {reason}")]
    LoadFailed { id: String, reason: String },

    #[error("Invalid manifest {}: {source}", path.display())]
    InvalidManifest {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Incompatible plugin version: expected {expected}, got {got}")]
    IncompatibleVersion { expected: String, got: String },

    #[error("Plugin {id} failed to register: {reason}")]
    Registration { id: String, reason: String },

    #[error("Editor error: {0}")]
    Core(#[from] quillpad_core::CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The trait every plugin implements.
///
/// ## Learning: Trait Objects for Plugins
///
/// Native and built-in plugins are both handed to the manager as
/// `Box<dyn Plugin>`, so activation and reload treat them the same way.
pub trait Plugin: Send + Sync {
    /// Returns the plugin name, also used as its menu title.
    fn name(&self) -> &str;

    /// Called once per activation; contributes commands and menu entries.
    fn register(&mut self, host: &mut dyn ExtensionHost) -> Result<(), PluginError>;

    /// Called before the plugin is dropped on unload or reload.
    fn unregister(&mut self) {}
}

/// Exports a native plugin's constructor.
///
/// ```ignore
/// #[derive(Default)]
/// struct WordCount;
///
/// impl quillpad_plugin::Plugin for WordCount { /* ... */ }
///
/// quillpad_plugin::declare_plugin!(WordCount, WordCount::default);
/// ```
#[macro_export]
macro_rules! declare_plugin {
    ($plugin_type:ty, $constructor:path) => {
        #[unsafe(no_mangle)]
        pub fn _quillpad_plugin_create() -> ::std::boxed::Box<dyn $crate::Plugin> {
            let plugin: $plugin_type = $constructor();
            ::std::boxed::Box::new(plugin)
        }
    };
}
