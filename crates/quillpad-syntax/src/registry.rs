//! Grammar discovery and lookup.
//!
//! The registry owns every compiled [`Grammar`]. Built-ins go in first,
//! then descriptor files from the grammars directory in file-name order;
//! whoever registers an extension last owns it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::style::{ResolvedStyle, StyleMap, ThemeDefaults, load_style_overrides};
use crate::{Grammar, GrammarDescriptor, StyleCategory, builtin};

/// Grammar name meaning "no styling".
pub const NO_LANGUAGE: &str = "None";

/// Parses every `*.json` descriptor in `dir`, in file-name order.
///
/// A file that fails to read or parse is logged and skipped. A missing or
/// unreadable directory yields nothing.
pub fn load_descriptors(dir: impl AsRef<Path>) -> Vec<GrammarDescriptor> {
    let dir = dir.as_ref();
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(path = %dir.display(), error = %e, "Grammar directory not readable");
            return Vec::new();
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "json") && path.is_file())
        .collect();
    paths.sort();

    paths
        .into_iter()
        .filter_map(|path| match GrammarDescriptor::from_file(&path) {
            Ok(descriptor) => {
                debug!(path = %path.display(), grammar = %descriptor.name, "Loaded grammar");
                Some(descriptor)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping malformed grammar file");
                None
            }
        })
        .collect()
}

/// Registry of available grammars.
#[derive(Debug, Default)]
pub struct GrammarRegistry {
    /// Compiled grammars in registration order
    grammars: Vec<Grammar>,
    /// Grammar name to index
    by_name: HashMap<String, usize>,
    /// Normalized extension to index
    by_extension: HashMap<String, usize>,
    /// Legacy per-grammar style override files, by grammar name
    legacy_styles: HashMap<String, StyleMap>,
}

impl GrammarRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding only the built-in grammars.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for descriptor in builtin::descriptors() {
            registry.register(descriptor);
        }
        registry
    }

    /// Built-ins, then every descriptor in `grammars_dir`, then legacy
    /// style overrides from `styles_dir`.
    pub fn load(grammars_dir: impl AsRef<Path>, styles_dir: impl AsRef<Path>) -> Self {
        let mut registry = Self::with_builtins();
        let loaded = registry.load_dir(grammars_dir);
        registry.load_style_overrides(styles_dir);
        info!(
            total = registry.len(),
            external = loaded,
            "Grammar registry ready"
        );
        registry
    }

    /// Registers every descriptor found in `dir`. Returns how many were added.
    pub fn load_dir(&mut self, dir: impl AsRef<Path>) -> usize {
        let descriptors = load_descriptors(dir);
        let count = descriptors.len();
        for descriptor in descriptors {
            self.register(descriptor);
        }
        count
    }

    /// Reads `<styles_dir>/<name>.json` for every registered grammar.
    pub fn load_style_overrides(&mut self, styles_dir: impl AsRef<Path>) {
        let styles_dir = styles_dir.as_ref();
        for grammar in &self.grammars {
            let path = styles_dir.join(format!("{}.json", grammar.name()));
            if !path.is_file() {
                continue;
            }
            match load_style_overrides(&path) {
                Ok(map) => {
                    self.legacy_styles.insert(grammar.name().to_string(), map);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Ignoring style override file");
                }
            }
        }
    }

    /// Adds a grammar, replacing any grammar with the same name.
    ///
    /// Its extensions are claimed even if another grammar had them.
    pub fn register(&mut self, descriptor: GrammarDescriptor) {
        let extensions: Vec<String> = descriptor.normalized_extensions().collect();
        let name = descriptor.name.clone();
        let grammar = Grammar::new(descriptor);

        let index = match self.by_name.get(&name) {
            Some(&index) => {
                debug!(grammar = %name, "Replacing grammar");
                self.by_extension.retain(|_, owner| *owner != index);
                self.grammars[index] = grammar;
                index
            }
            None => {
                self.grammars.push(grammar);
                let index = self.grammars.len() - 1;
                self.by_name.insert(name.clone(), index);
                index
            }
        };

        for ext in extensions {
            if let Some(previous) = self.by_extension.insert(ext.clone(), index) {
                if previous != index {
                    debug!(
                        extension = %ext,
                        from = %self.grammars[previous].name(),
                        to = %name,
                        "Extension reassigned"
                    );
                }
            }
        }
    }

    /// Finds the grammar whose extension is the longest suffix of `file_name`.
    ///
    /// Matching is case-sensitive. Only the final path component is used.
    pub fn extension_lookup(&self, file_name: impl AsRef<Path>) -> Option<&Grammar> {
        let path = file_name.as_ref();
        let name = path.file_name().unwrap_or(path.as_os_str()).to_string_lossy();

        self.by_extension
            .iter()
            .filter(|(ext, _)| name.ends_with(ext.as_str()))
            .max_by_key(|(ext, _)| ext.len())
            .map(|(_, &index)| &self.grammars[index])
    }

    /// Finds a grammar by display name. `"None"` never matches.
    pub fn name_lookup(&self, name: &str) -> Option<&Grammar> {
        if name == NO_LANGUAGE {
            return None;
        }
        self.by_name.get(name).map(|&index| &self.grammars[index])
    }

    /// Grammar names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.grammars.iter().map(|g| g.name())
    }

    pub fn grammars(&self) -> &[Grammar] {
        &self.grammars
    }

    pub fn len(&self) -> usize {
        self.grammars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grammars.is_empty()
    }

    /// Display style for `category` under grammar `name`.
    ///
    /// The descriptor's own `styles` win, then the legacy override file,
    /// then the theme colors.
    pub fn resolve_style(&self, name: &str, category: StyleCategory, theme: ThemeDefaults) -> ResolvedStyle {
        let mut maps: Vec<&StyleMap> = Vec::with_capacity(2);
        if let Some(grammar) = self.name_lookup(name) {
            maps.push(&grammar.descriptor().styles);
        }
        if let Some(legacy) = self.legacy_styles.get(name) {
            maps.push(legacy);
        }
        ResolvedStyle::resolve(category, &maps, theme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Color;
    use tempfile::tempdir;

    fn write(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_load_skips_malformed_files() {
        let dir = tempdir().unwrap();
        write(dir.path(), "a.json", r#"{ "name": "Alpha", "extensions": [".alpha"] }"#);
        write(dir.path(), "b.json", r#"{ "name": "Broken", "extensions": [ "#);
        write(dir.path(), "c.json", r#"{ "name": "Gamma", "extensions": ["gam"] }"#);
        write(dir.path(), "notes.txt", "not a grammar");

        let descriptors = load_descriptors(dir.path());
        let names: Vec<_> = descriptors.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Gamma"]);
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = tempdir().unwrap();
        assert!(load_descriptors(dir.path().join("nope")).is_empty());

        let mut registry = GrammarRegistry::new();
        assert_eq!(registry.load_dir(dir.path().join("nope")), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_external_grammar_overrides_builtin_extension() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "mycpp.json",
            r#"{ "name": "MyCpp", "extensions": [".cpp"], "keywords1": ["widget"] }"#,
        );

        let registry = GrammarRegistry::load(dir.path(), dir.path().join("styles"));
        assert_eq!(registry.extension_lookup("main.cpp").unwrap().name(), "MyCpp");
        // Other C++ extensions stay with the built-in.
        assert_eq!(registry.extension_lookup("main.hpp").unwrap().name(), "C++");
    }

    #[test]
    fn test_last_registered_wins() {
        let mut registry = GrammarRegistry::new();
        let mut first = GrammarDescriptor::new("First");
        first.extensions = vec![".x".into()];
        let mut second = GrammarDescriptor::new("Second");
        second.extensions = vec!["x".into()];
        registry.register(first);
        registry.register(second);

        assert_eq!(registry.extension_lookup("file.x").unwrap().name(), "Second");
    }

    #[test]
    fn test_reregistering_a_name_replaces_it() {
        let mut registry = GrammarRegistry::new();
        let mut old = GrammarDescriptor::new("Lang");
        old.extensions = vec![".old".into()];
        let mut new = GrammarDescriptor::new("Lang");
        new.extensions = vec![".new".into()];
        registry.register(old);
        registry.register(new);

        assert_eq!(registry.len(), 1);
        assert!(registry.extension_lookup("a.old").is_none());
        assert_eq!(registry.extension_lookup("a.new").unwrap().name(), "Lang");
    }

    #[test]
    fn test_longest_suffix_wins() {
        let mut registry = GrammarRegistry::new();
        let mut gz = GrammarDescriptor::new("Gzip");
        gz.extensions = vec![".gz".into()];
        let mut tar = GrammarDescriptor::new("Tarball");
        tar.extensions = vec![".tar.gz".into()];
        registry.register(tar);
        registry.register(gz);

        assert_eq!(registry.extension_lookup("a.tar.gz").unwrap().name(), "Tarball");
        assert_eq!(registry.extension_lookup("a.gz").unwrap().name(), "Gzip");
        assert_eq!(registry.extension_lookup("/tmp/dir.tar.gz/b.gz").unwrap().name(), "Gzip");
        assert!(registry.extension_lookup("a.zip").is_none());
    }

    #[test]
    fn test_extension_match_is_case_sensitive() {
        let registry = GrammarRegistry::with_builtins();
        assert_eq!(registry.extension_lookup("x.C").unwrap().name(), "C++");
        assert_eq!(registry.extension_lookup("x.c").unwrap().name(), "C");
        assert!(registry.extension_lookup("x.PY").is_none());
    }

    #[test]
    fn test_name_lookup() {
        let registry = GrammarRegistry::with_builtins();
        assert_eq!(registry.name_lookup("Python").unwrap().name(), "Python");
        assert!(registry.name_lookup(NO_LANGUAGE).is_none());
        assert!(registry.name_lookup("Cobol").is_none());
    }

    #[test]
    fn test_resolve_style_precedence() {
        let dir = tempdir().unwrap();
        let grammars = dir.path().join("grammars");
        let styles = dir.path().join("styles");
        std::fs::create_dir_all(&grammars).unwrap();
        std::fs::create_dir_all(&styles).unwrap();
        write(
            &grammars,
            "ini.json",
            r##"{ "name": "INI", "extensions": [".ini"], "styles": { "Keyword1": "#0000FF" } }"##,
        );
        write(
            &styles,
            "INI.json",
            r##"{ "Keyword1": "#FF0000", "Number": { "color": "#00FF00", "bold": true } }"##,
        );

        let registry = GrammarRegistry::load(&grammars, &styles);
        let theme = ThemeDefaults::default();

        let keyword = registry.resolve_style("INI", StyleCategory::Keyword1, theme);
        assert_eq!(keyword.foreground, Color::rgb(0, 0, 0xff));

        let number = registry.resolve_style("INI", StyleCategory::Number, theme);
        assert_eq!(number.foreground, Color::rgb(0, 0xff, 0));
        assert!(number.bold);

        let fallback = registry.resolve_style("INI", StyleCategory::Operator, theme);
        assert_eq!(fallback.foreground, theme.foreground);
        assert_eq!(fallback.background, theme.background);
    }
}
