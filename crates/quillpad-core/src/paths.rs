//! On-disk locations.
//!
//! Everything Quillpad persists lives under one root directory:
//!
//! ```text
//! <root>/
//!   config.toml     preferences
//!   session.toml    open-document records
//!   grammars/       grammar descriptor files (*.json)
//!   styles/         legacy per-language style overrides (<Name>.json)
//!   backup/         crash-recovery snapshots (*.bak)
//!   plugins/        one directory per plugin, each with a plugin.toml
//! ```

use std::path::{Path, PathBuf};

use crate::config::ConfigError;

/// Environment variable overriding the root directory.
pub const HOME_ENV: &str = "QUILLPAD_HOME";

/// Resolved application directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    root: PathBuf,
}

impl AppPaths {
    /// Uses `root` as the application directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Picks the root: an explicit override, then `QUILLPAD_HOME`, then the
    /// platform config directory.
    pub fn resolve(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        if let Some(root) = explicit {
            return Ok(Self::new(root));
        }
        if let Some(root) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::new(root));
        }
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(Self::new(config_dir.join("quillpad")))
    }

    /// Creates every directory that may be written to.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [
            self.root.clone(),
            self.grammars_dir(),
            self.styles_dir(),
            self.backup_dir(),
            self.plugins_dir(),
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    pub fn session_file(&self) -> PathBuf {
        self.root.join("session.toml")
    }

    pub fn grammars_dir(&self) -> PathBuf {
        self.root.join("grammars")
    }

    pub fn styles_dir(&self) -> PathBuf {
        self.root.join("styles")
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.root.join("backup")
    }

    pub fn plugins_dir(&self) -> PathBuf {
        self.root.join("plugins")
    }
}
