//! Walk policy configuration.

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::patterns::ExclusionPatterns;

/// Configuration for indexing runs.
#[derive(Debug, Clone, Default, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct IndexConfig {
    /// Follow symbolic links to directories and files.
    #[builder(default = "false")]
    #[serde(default)]
    pub follow_symlinks: bool,

    /// Re-evaluate entries that carry a stored error.
    #[builder(default = "false")]
    #[serde(default)]
    pub retry_errors: bool,

    /// Log read and hash throughput for every hashed file.
    #[builder(default = "false")]
    #[serde(default)]
    pub instrument_hashing: bool,

    /// Exclusion patterns, in priority order.
    #[builder(default)]
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

impl IndexConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(ref patterns) = self.exclude_patterns {
            if patterns.iter().any(|p| p.trim().is_empty()) {
                return Err("Exclusion patterns cannot be empty".to_string());
            }
        }
        Ok(())
    }
}

impl IndexConfig {
    /// Create a new index config builder.
    pub fn builder() -> IndexConfigBuilder {
        IndexConfigBuilder::default()
    }

    /// Compile the configured patterns.
    pub fn exclusions(&self) -> ExclusionPatterns {
        ExclusionPatterns::new(self.exclude_patterns.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_config_builder() {
        let config = IndexConfig::builder()
            .follow_symlinks(true)
            .exclude_patterns(vec!["*.tmp".to_string()])
            .build()
            .unwrap();

        assert!(config.follow_symlinks);
        assert!(!config.retry_errors);
        assert_eq!(config.exclude_patterns, vec!["*.tmp"]);
    }

    #[test]
    fn test_config_rejects_blank_pattern() {
        let result = IndexConfig::builder()
            .exclude_patterns(vec!["  ".to_string()])
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_exclusions_keep_config_order() {
        let config = IndexConfig::builder()
            .exclude_patterns(vec!["node_modules/".to_string(), "*.log".to_string()])
            .build()
            .unwrap();
        let exclusions = config.exclusions();

        assert_eq!(
            exclusions.first_match(Path::new("/src/app/node_modules/pkg/index.js")),
            Some("node_modules/")
        );
        assert_eq!(exclusions.first_match(Path::new("/var/app.log")), Some("*.log"));
        assert_eq!(exclusions.first_match(Path::new("/src/main.rs")), None);
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: IndexConfig = serde_json::from_str(r#"{"retry_errors": true}"#).unwrap();
        assert!(config.retry_errors);
        assert!(!config.follow_symlinks);
        assert!(config.exclude_patterns.is_empty());
    }
}
