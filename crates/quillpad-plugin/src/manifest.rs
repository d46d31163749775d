//! `plugin.toml` manifests.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::PluginError;

/// Plugin API version for compatibility checking.
pub const API_VERSION: &str = "0.1.0";

/// File name of a plugin manifest.
pub const MANIFEST_FILE: &str = "plugin.toml";

/// Plugin manifest (plugin.toml).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginManifest {
    /// Plugin identifier
    pub id: String,

    /// Display name
    pub name: String,

    /// Version string
    pub version: String,

    /// Author information
    #[serde(default)]
    pub author: Option<String>,

    /// Plugin description
    #[serde(default)]
    pub description: String,

    /// Required API version
    pub api_version: String,

    /// Library name without platform prefix or suffix (`wordcount` loads
    /// `libwordcount.so`, `wordcount.dll` or `libwordcount.dylib`)
    pub main: String,
}

impl PluginManifest {
    /// Parses and version-checks a manifest file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PluginError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let manifest: Self = toml::from_str(&content).map_err(|source| PluginError::InvalidManifest {
            path: path.to_path_buf(),
            source,
        })?;

        if !is_compatible(&manifest.api_version) {
            return Err(PluginError::IncompatibleVersion {
                expected: API_VERSION.to_string(),
                got: manifest.api_version,
            });
        }

        Ok(manifest)
    }
}

/// Checks if an API version is compatible (same major version).
pub fn is_compatible(version: &str) -> bool {
    let current_major = API_VERSION.split('.').next().unwrap_or("0");
    let plugin_major = version.split('.').next().unwrap_or("0");
    current_major == plugin_major
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_manifest_parsing() {
        let manifest: PluginManifest = toml::from_str(
            r#"
            id = "hello"
            name = "Hello World"
            version = "1.0.0"
            author = "Hotlands"
            api_version = "0.1.0"
            main = "hello"
            "#,
        )
        .unwrap();

        assert_eq!(manifest.id, "hello");
        assert_eq!(manifest.author.as_deref(), Some("Hotlands"));
        assert!(manifest.description.is_empty());
    }

    #[test]
    fn test_compatibility() {
        assert!(is_compatible("0.1.0"));
        assert!(is_compatible("0.9"));
        assert!(!is_compatible("1.0.0"));
    }

    #[test]
    fn test_incompatible_manifest_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        std::fs::write(
            &path,
            "id = \"x\"\nname = \"X\"\nversion = \"1\"\napi_version = \"2.0.0\"\nmain = \"x\"\n",
        )
        .unwrap();

        assert!(matches!(
            PluginManifest::from_file(&path),
            Err(PluginError::IncompatibleVersion { .. })
        ));
    }

    #[test]
    fn test_malformed_manifest_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        std::fs::write(&path, "id = ").unwrap();

        assert!(matches!(
            PluginManifest::from_file(&path),
            Err(PluginError::InvalidManifest { .. })
        ));
    }
}
