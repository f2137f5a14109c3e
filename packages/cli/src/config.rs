use folio_editor::EditorConfig;
use folio_render::DEFAULT_CONTENT_CLASS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONFIG_NAME: &str = "folio.config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config in {path}: {source}")]
    Invalid {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Folio configuration file format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Maximum undo levels (0 = unlimited)
    pub history_depth: usize,

    /// Destination handed to the media store for uploads
    pub upload_destination: String,

    /// One top-level block per line when printing markup
    pub pretty_markup: bool,

    /// Class marking rich-content containers for `folio render`
    pub content_class: String,
}

impl Config {
    /// Load config from a directory; a missing file gives the defaults
    pub fn load(cwd: &Path) -> Result<Self, ConfigError> {
        let path = cwd.join(DEFAULT_CONFIG_NAME);
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Invalid { path, source })
    }

    pub fn editor_config(&self) -> EditorConfig {
        EditorConfig {
            history_depth: self.history_depth,
            pretty_markup: self.pretty_markup,
            upload_destination: self.upload_destination.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let editor = EditorConfig::default();
        Self {
            history_depth: editor.history_depth,
            upload_destination: editor.upload_destination,
            pretty_markup: editor.pretty_markup,
            content_class: DEFAULT_CONTENT_CLASS.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let json = r#"{
            "historyDepth": 20,
            "uploadDestination": "media/posts",
            "prettyMarkup": false,
            "contentClass": "post-body"
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.history_depth, 20);
        assert_eq!(config.upload_destination, "media/posts");
        assert!(!config.pretty_markup);
        assert_eq!(config.content_class, "post-body");

        let editor = config.editor_config();
        assert_eq!(editor.history_depth, 20);
        assert_eq!(editor.upload_destination, "media/posts");
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.history_depth, 100);
        assert_eq!(config.upload_destination, "uploads");
        assert!(config.pretty_markup);
        assert_eq!(config.content_class, "rich-content");
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(Config::load(dir.path()).unwrap(), Config::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_NAME), r#"{"contentClass": "entry"}"#).unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.content_class, "entry");
        assert_eq!(config.history_depth, 100);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(DEFAULT_CONFIG_NAME), "{ not json").unwrap();

        let err = Config::load(dir.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }
}
