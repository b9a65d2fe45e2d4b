//! `[build]` section configuration.
//!
//! Settings of the build-time injection step, which picks the primary origin
//! for a deployment target and embeds the origin config into pages.
//!
//! # Example
//!
//! ```toml
//! [build]
//! output = "dist"                                   # Directory with built HTML pages
//! fallback_order = ["local", "github", "jsdelivr"]  # Order embedded for CDN targets
//! rewrite_paths = true                              # Prefix root-relative refs with the target base
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath, OriginConfig};

/// Build-time injection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSectionConfig {
    /// Output directory containing the built pages.
    pub output: PathBuf,

    /// Fallback order embedded for non-local targets; `cdn.fallback_order` when empty.
    pub fallback_order: Vec<String>,

    /// Rewrite root-relative asset references onto the target base URL.
    pub rewrite_paths: bool,
}

impl Default for BuildSectionConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("dist"),
            fallback_order: Vec::new(),
            rewrite_paths: true,
        }
    }
}

/// Field paths of the `[build]` section.
pub struct BuildSectionFields {
    pub output: FieldPath,
    pub fallback_order: FieldPath,
}

impl BuildSectionConfig {
    pub const FIELDS: BuildSectionFields = BuildSectionFields {
        output: FieldPath::new("build.output"),
        fallback_order: FieldPath::new("build.fallback_order"),
    };

    pub fn normalize(&mut self, root: &Path) {
        self.output = root.join(&self.output);
    }

    /// Fallback order embedded for CDN targets.
    pub fn target_order<'a>(&'a self, cdn: &'a OriginConfig) -> &'a [String] {
        if self.fallback_order.is_empty() {
            &cdn.fallback_order
        } else {
            &self.fallback_order
        }
    }

    pub fn validate(&self, cdn: &OriginConfig, diag: &mut ConfigDiagnostics) {
        if self.output.exists() && !self.output.is_dir() {
            diag.error(
                Self::FIELDS.output,
                format!("not a directory: {}", self.output.display()),
            );
        }

        for origin in &self.fallback_order {
            if !cdn.cdns.contains_key(origin) {
                diag.error(
                    Self::FIELDS.fallback_order,
                    format!("unknown origin `{origin}`"),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_build_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.build.output, PathBuf::from("dist"));
        assert!(config.build.rewrite_paths);
        assert_eq!(config.build.target_order(&config.cdn), &["local".to_string()]);
    }

    #[test]
    fn test_build_unknown_origin() {
        let config = test_parse_config("[build]\nfallback_order = [\"local\", \"ghost\"]");
        let mut diag = ConfigDiagnostics::new();
        config.build.validate(&config.cdn, &mut diag);
        assert_eq!(diag.len(), 1);
    }

    #[test]
    fn test_build_output_must_be_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("dist");
        std::fs::write(&file, "").unwrap();

        let mut config = test_parse_config("");
        config.build.output = file;
        let mut diag = ConfigDiagnostics::new();
        config.build.validate(&config.cdn, &mut diag);
        assert_eq!(diag.len(), 1);
        assert_eq!(diag.errors()[0].field, BuildSectionConfig::FIELDS.output);
    }
}
