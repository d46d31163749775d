//! Editor preferences.
//!
//! ## Learning: Serde for Serialization
//!
//! `#[serde(default)]` on every section means a config file only needs the
//! keys a user actually changed; everything else falls back to
//! `Default::default()`, which keeps old files loading after new keys are
//! added.

use quillpad_buffer::SearchOptions;
use quillpad_syntax::{Color, ThemeDefaults};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main editor configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Editing behavior
    pub editor: EditorConfig,

    /// Search dialog defaults
    pub search: SearchConfig,

    /// Tab handling
    pub tabs: TabsConfig,

    /// Editing widget colors and font
    pub theme: ThemeConfig,

    /// Crash-recovery snapshots
    pub backup: BackupConfig,
}

impl Config {
    /// Loads config from a file.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Loads `path` if it exists; a missing or malformed file yields defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Malformed config, using defaults");
                Self::default()
            }
        }
    }

    /// Saves the config to a file, creating its directory.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        quillpad_buffer::write_atomic(path, &content)?;
        Ok(())
    }

    /// Theme colors used for unstyled categories.
    pub fn theme_defaults(&self) -> ThemeDefaults {
        ThemeDefaults {
            foreground: self.theme.foreground,
            background: self.theme.background,
        }
    }

    /// Search options pre-filled from the saved defaults.
    pub fn search_options(&self, text: impl Into<String>) -> SearchOptions {
        SearchOptions {
            text: text.into(),
            match_case: self.search.match_case,
            wrap_around: self.search.wrap_around,
            use_regex: self.search.use_regex,
            ..Default::default()
        }
    }

    /// Remembers the flags of a search as the new defaults.
    pub fn remember_search(&mut self, options: &SearchOptions) {
        self.search.match_case = options.match_case;
        self.search.wrap_around = options.wrap_around;
        self.search.use_regex = options.use_regex;
    }
}

/// Editor behavior configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Wrap long lines at word boundaries
    pub word_wrap: bool,

    /// Tab width in spaces
    pub tab_size: usize,

    /// Use spaces instead of tabs
    pub use_spaces: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            word_wrap: false,
            tab_size: 4,
            use_spaces: true,
        }
    }
}

/// Search defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub wrap_around: bool,
    pub use_regex: bool,
    pub match_case: bool,
}

/// Tab handling configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TabsConfig {
    /// Disallow closing and reordering tabs
    pub lock_tabs: bool,

    /// Reopen the previous session's documents on startup
    pub restore_files_on_close: bool,

    /// Open a fresh document when the last tab closes
    pub open_new_tab_on_last_closed: bool,
}

impl Default for TabsConfig {
    fn default() -> Self {
        Self {
            lock_tabs: false,
            restore_files_on_close: true,
            open_new_tab_on_last_closed: true,
        }
    }
}

/// Editing widget appearance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    pub background: Color,
    pub foreground: Color,
    pub caret: Color,
    pub margins: Color,
    pub font: String,
    pub font_size: u32,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            background: Color::WHITE,
            foreground: Color::BLACK,
            caret: Color::BLACK,
            margins: Color::rgb(0xc0, 0xc0, 0xc0),
            font: "Courier New".to_string(),
            font_size: 12,
        }
    }
}

/// Backup configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Write crash-recovery snapshots
    pub enabled: bool,

    /// Seconds between sweeps, and the minimum age before an unchanged
    /// snapshot is rewritten
    pub interval_secs: u64,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 60,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config directory not found")]
    NoConfigDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.editor.tab_size, 4);
        assert!(!config.editor.word_wrap);
        assert!(config.tabs.open_new_tab_on_last_closed);
        assert_eq!(config.backup.interval_secs, 60);
        assert_eq!(config.theme.background, Color::WHITE);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r##"
            [editor]
            word_wrap = true

            [theme]
            background = "#1E1E1E"
            "##,
        )
        .unwrap();

        assert!(config.editor.word_wrap);
        assert_eq!(config.editor.tab_size, 4);
        assert_eq!(config.theme.background, Color::rgb(0x1e, 0x1e, 0x1e));
        assert_eq!(config.theme.foreground, Color::BLACK);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.search.use_regex = true;
        config.theme.font_size = 15;
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_malformed_file_falls_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[editor\nword_wrap = ").unwrap();

        assert_eq!(Config::load_or_default(&path), Config::default());
    }

    #[test]
    fn test_search_defaults_round_trip() {
        let mut config = Config::default();
        let mut options = config.search_options("needle");
        assert!(!options.use_regex);

        options.use_regex = true;
        options.wrap_around = true;
        config.remember_search(&options);
        assert!(config.search_options("x").use_regex);
        assert!(config.search.wrap_around);
    }
}
