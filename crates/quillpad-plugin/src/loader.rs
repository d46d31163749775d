//! Turning a discovered plugin into a `Box<dyn Plugin>`.
//!
//! ## Learning: Dynamic Loading
//!
//! `libloading` opens a shared library at runtime and looks up a symbol by
//! name. The symbol exported by [`declare_plugin!`](crate::declare_plugin)
//! is a constructor returning the boxed plugin.

use libloading::{Library, Symbol};

use crate::manager::PluginInfo;
use crate::{Plugin, PluginError};

/// Signature of the constructor a native plugin exports.
pub type PluginCreate = fn() -> Box<dyn Plugin>;

/// Symbol name of that constructor.
pub const CREATE_SYMBOL: &[u8] = b"_quillpad_plugin_create\0";

/// Produces plugin instances for discovered manifests.
pub trait PluginLoader {
    fn load(&mut self, info: &PluginInfo) -> Result<Box<dyn Plugin>, PluginError>;

    /// Releases everything loaded so far. Every plugin instance and every
    /// handler it registered must already be dropped.
    fn unload_all(&mut self) {}
}

/// Loads plugins from shared libraries.
#[derive(Default)]
pub struct NativeLoader {
    libraries: Vec<Library>,
}

impl NativeLoader {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PluginLoader for NativeLoader {
    fn load(&mut self, info: &PluginInfo) -> Result<Box<dyn Plugin>, PluginError> {
        let id = info.manifest.id.clone();
        let path = info.dir.join(libloading::library_filename(&info.manifest.main));
        if !path.exists() {
            return Err(PluginError::LoadFailed {
                id,
                reason: format!("{} does not exist", path.display()),
            });
        }

        // SAFETY: plugins are trusted code built against this crate.
        let library = unsafe { Library::new(&path) }.map_err(|e| PluginError::LoadFailed {
            id: id.clone(),
            reason: e.to_string(),
        })?;

        let plugin = {
            // SAFETY: the symbol is produced by `declare_plugin!` with this signature.
            let create: Symbol<PluginCreate> =
                unsafe { library.get(CREATE_SYMBOL) }.map_err(|e| PluginError::LoadFailed {
                    id: id.clone(),
                    reason: e.to_string(),
                })?;
            create()
        };

        tracing::debug!(plugin = %id, path = %path.display(), "Loaded native plugin");
        self.libraries.push(library);
        Ok(plugin)
    }

    fn unload_all(&mut self) {
        self.libraries.clear();
    }
}

impl Drop for NativeLoader {
    fn drop(&mut self) {
        // Handlers from these libraries may still sit in an editor's
        // command registry; their code has to stay mapped.
        for library in self.libraries.drain(..) {
            std::mem::forget(library);
        }
    }
}
