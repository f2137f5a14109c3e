use serde::{Deserialize, Serialize};

/// Editor settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorConfig {
    /// Maximum undo levels (0 = unlimited)
    pub history_depth: usize,

    /// Put top-level blocks on separate lines in `get_markup`
    pub pretty_markup: bool,

    /// Destination identifier handed to the media store
    pub upload_destination: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_depth: 100,
            pretty_markup: true,
            upload_destination: "uploads".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EditorConfig = serde_json::from_str(r#"{"historyDepth": 5}"#).unwrap();
        assert_eq!(config.history_depth, 5);
        assert!(config.pretty_markup);
        assert_eq!(config.upload_destination, "uploads");
    }
}
