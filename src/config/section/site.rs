//! `[site]` section configuration.
//!
//! Where same-origin (relative) URLs live when probed or loaded from the
//! command line, since there is no page origin to resolve them against.
//!
//! # Example
//!
//! ```toml
//! [site]
//! root_dir = "dist"                   # Local files back relative URLs
//! root_url = "https://example.com"    # Or: the deployed site answers them
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};

/// Same-origin settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSectionConfig {
    /// Local directory serving relative URLs (checked for file existence).
    pub root_dir: Option<PathBuf>,

    /// Site URL that relative URLs are joined onto.
    pub root_url: Option<String>,
}

/// Field paths of the `[site]` section.
pub struct SiteSectionFields {
    pub root_dir: FieldPath,
    pub root_url: FieldPath,
}

impl SiteSectionConfig {
    pub const FIELDS: SiteSectionFields = SiteSectionFields {
        root_dir: FieldPath::new("site.root_dir"),
        root_url: FieldPath::new("site.root_url"),
    };

    pub fn normalize(&mut self, root: &Path) {
        if let Some(dir) = self.root_dir.take() {
            self.root_dir = Some(root.join(dir));
        }
    }

    /// Parsed site URL, if configured and valid.
    pub fn root_url(&self) -> Option<url::Url> {
        self.root_url.as_deref().and_then(|u| url::Url::parse(u).ok())
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if let Some(url) = &self.root_url
            && url::Url::parse(url).is_err()
        {
            diag.error_with_hint(
                Self::FIELDS.root_url,
                format!("invalid URL `{url}`"),
                "use an absolute URL such as https://example.com",
            );
        }

        if let Some(dir) = &self.root_dir
            && !dir.is_dir()
        {
            diag.warn(
                Self::FIELDS.root_dir,
                format!("directory not found: {}", dir.display()),
            );
        }
    }
}
