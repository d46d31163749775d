//! Plugin discovery, activation and reload.

use quillpad_core::Editor;
use std::path::{Path, PathBuf};

use crate::host::{EditorHost, MenuEntry};
use crate::loader::{NativeLoader, PluginLoader};
use crate::manifest::{MANIFEST_FILE, PluginManifest};
use crate::{Plugin, PluginError};

/// Plugin state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginState {
    /// Manifest found, not loaded
    Installed,
    /// Loaded and registered
    Active,
    /// Loading or registration failed
    Failed,
}

/// A discovered plugin.
#[derive(Debug, Clone)]
pub struct PluginInfo {
    /// Plugin manifest
    pub manifest: PluginManifest,
    /// Plugin directory
    pub dir: PathBuf,
    /// Current state
    pub state: PluginState,
    /// Error message (if state is Failed)
    pub error: Option<String>,
}

type PluginFactory = Box<dyn Fn() -> Box<dyn Plugin> + Send + Sync>;

struct ActivePlugin {
    id: String,
    plugin: Box<dyn Plugin>,
    commands: Vec<String>,
}

/// Plugin manager.
///
/// Handlers registered by plugins live in the editor's command registry, so
/// call [`PluginManager::unload_all`] before dropping a manager whose
/// plugins came from native libraries.
pub struct PluginManager {
    /// Plugin directory
    plugins_dir: PathBuf,

    /// Discovered plugins, in directory name order
    plugins: Vec<PluginInfo>,

    /// Statically linked plugins
    builtins: Vec<PluginFactory>,

    /// Registered plugin instances; dropped before the loader
    active: Vec<ActivePlugin>,

    /// Menu entries contributed by active plugins
    menu: Vec<MenuEntry>,

    loader: Box<dyn PluginLoader>,
}

impl PluginManager {
    /// Creates a manager that loads native libraries.
    pub fn new(plugins_dir: impl Into<PathBuf>) -> Self {
        Self::with_loader(plugins_dir, Box::new(NativeLoader::new()))
    }

    pub fn with_loader(plugins_dir: impl Into<PathBuf>, loader: Box<dyn PluginLoader>) -> Self {
        Self {
            plugins_dir: plugins_dir.into(),
            plugins: Vec::new(),
            builtins: Vec::new(),
            active: Vec::new(),
            menu: Vec::new(),
            loader,
        }
    }

    pub fn plugins_dir(&self) -> &Path {
        &self.plugins_dir
    }

    /// Adds a statically linked plugin, created anew on every load.
    pub fn register_builtin<F>(&mut self, factory: F)
    where
        F: Fn() -> Box<dyn Plugin> + Send + Sync + 'static,
    {
        self.builtins.push(Box::new(factory));
    }

    /// Scans the plugins directory for manifests.
    ///
    /// Directories without a manifest, malformed manifests and incompatible
    /// API versions are skipped with a warning. Returns the discovered ids.
    pub fn discover(&mut self) -> Result<Vec<String>, PluginError> {
        self.plugins.clear();

        if !self.plugins_dir.exists() {
            std::fs::create_dir_all(&self.plugins_dir)?;
            return Ok(Vec::new());
        }

        let mut dirs: Vec<PathBuf> = std::fs::read_dir(&self.plugins_dir)?
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        dirs.sort();

        for dir in dirs {
            let manifest_path = dir.join(MANIFEST_FILE);
            if !manifest_path.exists() {
                tracing::warn!(dir = %dir.display(), "Not loading plugin without {}", MANIFEST_FILE);
                continue;
            }

            match PluginManifest::from_file(&manifest_path) {
                Ok(manifest) if self.get(&manifest.id).is_some() => {
                    tracing::warn!(plugin = %manifest.id, dir = %dir.display(), "Duplicate plugin id, skipping");
                }
                Ok(manifest) => self.plugins.push(PluginInfo {
                    manifest,
                    dir,
                    state: PluginState::Installed,
                    error: None,
                }),
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), error = %e, "Failed to load plugin manifest");
                }
            }
        }

        Ok(self.plugins.iter().map(|p| p.manifest.id.clone()).collect())
    }

    /// Creates and registers every built-in and discovered plugin.
    ///
    /// A plugin that fails is marked `Failed` and the rest still load.
    /// Returns the names of the plugins now active.
    pub fn load_all(&mut self, editor: &mut Editor) -> Vec<String> {
        let builtins: Vec<Box<dyn Plugin>> = self.builtins.iter().map(|factory| factory()).collect();
        for plugin in builtins {
            let id = plugin.name().to_string();
            if let Err(e) = self.activate(id.clone(), plugin, editor) {
                tracing::warn!(plugin = %id, error = %e, "Built-in plugin failed");
            }
        }

        for index in 0..self.plugins.len() {
            let info = self.plugins[index].clone();
            let id = info.manifest.id.clone();
            let result = self
                .loader
                .load(&info)
                .and_then(|plugin| self.activate(id.clone(), plugin, editor));

            let entry = &mut self.plugins[index];
            match result {
                Ok(()) => {
                    tracing::info!(
                        plugin = %id,
                        version = %entry.manifest.version,
                        author = entry.manifest.author.as_deref().unwrap_or("unknown"),
                        "Loaded plugin"
                    );
                    entry.state = PluginState::Active;
                    entry.error = None;
                }
                Err(e) => {
                    tracing::warn!(plugin = %id, error = %e, "Failed to load plugin");
                    entry.state = PluginState::Failed;
                    entry.error = Some(e.to_string());
                }
            }
        }

        self.active.iter().map(|a| a.id.clone()).collect()
    }

    fn activate(
        &mut self,
        id: String,
        mut plugin: Box<dyn Plugin>,
        editor: &mut Editor,
    ) -> Result<(), PluginError> {
        let mut host = EditorHost::new(editor, plugin.name().to_string());
        let registered = plugin.register(&mut host);
        let (commands, menu) = host.into_contributions();

        if let Err(e) = registered {
            for name in &commands {
                editor.commands_mut().unregister(name);
            }
            return Err(e);
        }

        self.menu.extend(menu);
        self.active.push(ActivePlugin { id, plugin, commands });
        Ok(())
    }

    /// Unregisters and drops every active plugin, then releases the loader.
    pub fn unload_all(&mut self, editor: &mut Editor) {
        for mut active in self.active.drain(..) {
            active.plugin.unregister();
            for name in &active.commands {
                editor.commands_mut().unregister(name);
            }
            tracing::debug!(plugin = %active.id, "Unloaded plugin");
        }
        self.menu.clear();
        self.loader.unload_all();

        for info in &mut self.plugins {
            if info.state == PluginState::Active {
                info.state = PluginState::Installed;
            }
        }
    }

    /// Unloads everything, rescans the directory and loads again.
    pub fn reload(&mut self, editor: &mut Editor) -> Result<Vec<String>, PluginError> {
        self.unload_all(editor);
        self.discover()?;
        Ok(self.load_all(editor))
    }

    /// Returns information about a discovered plugin.
    pub fn get(&self, id: &str) -> Option<&PluginInfo> {
        self.plugins.iter().find(|p| p.manifest.id == id)
    }

    /// Returns all discovered plugins.
    pub fn list(&self) -> &[PluginInfo] {
        &self.plugins
    }

    /// Ids of active plugins, built-ins first.
    pub fn active_ids(&self) -> impl Iterator<Item = &str> {
        self.active.iter().map(|a| a.id.as_str())
    }

    /// Entries of the Plugins menu, in registration order.
    pub fn menu_entries(&self) -> &[MenuEntry] {
        &self.menu
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ExtensionHost;
    use quillpad_core::{AppPaths, Command, FnCommand};
    use tempfile::{TempDir, tempdir};
    use tracing::Level;

    struct Shout;

    impl Plugin for Shout {
        fn name(&self) -> &str {
            "Shout"
        }

        fn register(&mut self, host: &mut dyn ExtensionHost) -> Result<(), PluginError> {
            host.log(Level::INFO, "registering");
            host.register_command(Box::new(FnCommand::new(
                "shout.upper",
                "Uppercase the active document",
                |ctx, _| {
                    let id = ctx.editor.active_id()?;
                    let text = ctx.editor.document(id)?.text().to_uppercase();
                    ctx.editor.set_text(id, &text)
                },
            )));
            host.register_menu_entry("Uppercase", "shout.upper");
            Ok(())
        }
    }

    struct Broken;

    impl Plugin for Broken {
        fn name(&self) -> &str {
            "Broken"
        }

        fn register(&mut self, host: &mut dyn ExtensionHost) -> Result<(), PluginError> {
            host.register_command(Box::new(FnCommand::new("broken.half", "", |_, _| Ok(()))));
            Err(PluginError::Registration {
                id: "broken".to_string(),
                reason: "missing dependency".to_string(),
            })
        }
    }

    /// Hands out plugins by manifest `main` name instead of opening libraries.
    struct FakeLoader;

    impl PluginLoader for FakeLoader {
        fn load(&mut self, info: &PluginInfo) -> Result<Box<dyn Plugin>, PluginError> {
            match info.manifest.main.as_str() {
                "shout" => Ok(Box::new(Shout)),
                "broken" => Ok(Box::new(Broken)),
                other => Err(PluginError::LoadFailed {
                    id: info.manifest.id.clone(),
                    reason: format!("no library {other}"),
                }),
            }
        }
    }

    fn write_manifest(root: &Path, dir: &str, id: &str, api: &str, main: &str) {
        let dir = root.join(dir);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join(MANIFEST_FILE),
            format!(
                "id = \"{id}\"\nname = \"{id}\"\nversion = \"1.0.0\"\napi_version = \"{api}\"\nmain = \"{main}\"\n"
            ),
        )
        .unwrap();
    }

    fn editor(home: &TempDir) -> Editor {
        let mut editor = Editor::open(AppPaths::new(home.path())).unwrap();
        editor.new_document();
        editor
    }

    #[test]
    fn test_discover_empty_directory() {
        let dir = tempdir().unwrap();
        let mut manager = PluginManager::new(dir.path().join("plugins"));
        assert!(manager.discover().unwrap().is_empty());
        assert!(manager.plugins_dir().is_dir());
    }

    #[test]
    fn test_discover_skips_bad_manifests() {
        let dir = tempdir().unwrap();
        write_manifest(dir.path(), "a-shout", "shout", "0.1.0", "shout");
        write_manifest(dir.path(), "b-future", "future", "3.0.0", "future");
        std::fs::create_dir_all(dir.path().join("c-empty")).unwrap();
        std::fs::create_dir_all(dir.path().join("d-bad")).unwrap();
        std::fs::write(dir.path().join("d-bad").join(MANIFEST_FILE), "id =").unwrap();

        let mut manager = PluginManager::with_loader(dir.path(), Box::new(FakeLoader));
        assert_eq!(manager.discover().unwrap(), vec!["shout"]);
    }

    #[test]
    fn test_load_registers_commands_and_menu() {
        let home = tempdir().unwrap();
        let plugins = tempdir().unwrap();
        write_manifest(plugins.path(), "shout", "shout", "0.1.0", "shout");
        write_manifest(plugins.path(), "zzz", "missing", "0.1.0", "missing");

        let mut editor = editor(&home);
        let id = editor.active_id().unwrap();
        editor.set_text(id, "quiet").unwrap();

        let mut manager = PluginManager::with_loader(plugins.path(), Box::new(FakeLoader));
        manager.discover().unwrap();
        assert_eq!(manager.load_all(&mut editor), vec!["shout"]);

        assert_eq!(manager.get("shout").unwrap().state, PluginState::Active);
        let missing = manager.get("missing").unwrap();
        assert_eq!(missing.state, PluginState::Failed);
        assert!(missing.error.is_some());

        assert_eq!(
            manager.menu_entries(),
            &[MenuEntry {
                plugin: "Shout".to_string(),
                label: "Uppercase".to_string(),
                command: "shout.upper".to_string(),
            }]
        );

        editor
            .execute(&Command::Custom {
                name: "shout.upper".to_string(),
                args: vec![],
            })
            .unwrap();
        assert_eq!(editor.document(id).unwrap().text(), "QUIET");
    }

    #[test]
    fn test_failed_registration_rolls_back_commands() {
        let home = tempdir().unwrap();
        let plugins = tempdir().unwrap();
        write_manifest(plugins.path(), "broken", "broken", "0.1.0", "broken");

        let mut editor = editor(&home);
        let mut manager = PluginManager::with_loader(plugins.path(), Box::new(FakeLoader));
        manager.discover().unwrap();

        assert!(manager.load_all(&mut editor).is_empty());
        assert!(!editor.commands().contains("broken.half"));
        assert_eq!(manager.get("broken").unwrap().state, PluginState::Failed);
    }

    #[test]
    fn test_builtin_and_reload() {
        let home = tempdir().unwrap();
        let plugins = tempdir().unwrap();
        let mut editor = editor(&home);

        let mut manager = PluginManager::with_loader(plugins.path(), Box::new(FakeLoader));
        manager.register_builtin(|| Box::new(Shout));
        manager.discover().unwrap();
        assert_eq!(manager.load_all(&mut editor), vec!["Shout"]);

        let reloaded = manager.reload(&mut editor).unwrap();
        assert_eq!(reloaded, vec!["Shout"]);
        assert_eq!(manager.menu_entries().len(), 1);
        assert!(editor.commands().contains("shout.upper"));

        manager.unload_all(&mut editor);
        assert!(!editor.commands().contains("shout.upper"));
        assert!(manager.menu_entries().is_empty());
        assert_eq!(manager.active_ids().count(), 0);
    }

    #[test]
    fn test_host_reads_active_document() {
        let home = tempdir().unwrap();
        let mut editor = editor(&home);
        let id = editor.active_id().unwrap();
        editor.set_text(id, "hello").unwrap();

        let host = EditorHost::new(&mut editor, "Probe");
        assert_eq!(host.active_document_text().as_deref(), Some("hello"));
        assert_eq!(host.program_version(), crate::PROGRAM_VERSION);
        assert!(host.commands().is_empty());
    }
}
