//! Build-time injection of the origin config into built pages.
//!
//! For a deployment target this module:
//! 1. derives the target config ([`select_target`]),
//! 2. embeds it into every `*.html` page under the output directory,
//! 3. optionally rewrites root-relative asset references onto the target base,
//! 4. writes `cdn-config.json` next to the pages.

mod html;

pub use html::{inject_config, rewrite_asset_paths};

use std::fs;
use std::path::{Path, PathBuf};

use jwalk::WalkDir;
use thiserror::Error;

use crate::config::{BuildSectionConfig, OriginConfig};
use crate::core::LOCAL_ORIGIN;

/// File name of the standalone config written next to the pages.
pub const CONFIG_FILE: &str = "cdn-config.json";

#[derive(Debug, Error)]
pub enum InjectError {
    #[error("unknown target `{target}` (available: {available})")]
    UnknownTarget { target: String, available: String },

    #[error("output directory `{0}` does not exist")]
    MissingOutput(PathBuf),

    #[error("failed to access `{0}`")]
    Io(PathBuf, #[source] std::io::Error),
}

/// Outcome of [`inject_site`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectReport {
    pub target: String,
    /// Pages scanned.
    pub pages: usize,
    /// Pages whose content changed.
    pub updated: usize,
    pub config_file: PathBuf,
}

/// Derive the config embedded for a deployment target.
///
/// The local target probes nothing but itself. Other targets probe
/// themselves first, then the rest of the build fallback order.
pub fn select_target(
    build: &BuildSectionConfig,
    cdn: &OriginConfig,
    target: &str,
) -> Result<OriginConfig, InjectError> {
    if !cdn.cdns.contains_key(target) {
        return Err(InjectError::UnknownTarget {
            target: target.to_string(),
            available: cdn.cdns.keys().cloned().collect::<Vec<_>>().join(", "),
        });
    }

    let fallback_order = if target == LOCAL_ORIGIN {
        vec![LOCAL_ORIGIN.to_string()]
    } else {
        let mut order = cdn.sanitize_order(build.target_order(cdn));
        order.retain(|origin| origin != target);
        order.insert(0, target.to_string());
        order
    };

    Ok(OriginConfig {
        primary_cdn: target.to_string(),
        fallback_order,
        ..cdn.clone()
    })
}

/// Inject `config` into every page under `dir`.
///
/// With `rewrite`, root-relative asset references are prefixed with the
/// primary origin's base URL (a no-op for same-origin bases).
pub fn inject_site(
    dir: &Path,
    config: &OriginConfig,
    rewrite: bool,
) -> Result<InjectReport, InjectError> {
    if !dir.is_dir() {
        return Err(InjectError::MissingOutput(dir.to_path_buf()));
    }

    let base = if rewrite {
        config.base_url(&config.primary_cdn).unwrap_or_default()
    } else {
        ""
    };

    let mut pages = html_files(dir);
    pages.sort();

    let mut updated = 0;
    for page in &pages {
        let content = fs::read_to_string(page).map_err(|e| InjectError::Io(page.clone(), e))?;
        let injected = rewrite_asset_paths(&inject_config(&content, config), base);
        if injected != content {
            fs::write(page, &injected).map_err(|e| InjectError::Io(page.clone(), e))?;
            updated += 1;
        }
        crate::debug!("inject"; "{}", page.strip_prefix(dir).unwrap_or(page).display());
    }

    let config_file = dir.join(CONFIG_FILE);
    fs::write(&config_file, config.to_injected_json())
        .map_err(|e| InjectError::Io(config_file.clone(), e))?;

    Ok(InjectReport {
        target: config.primary_cdn.clone(),
        pages: pages.len(),
        updated,
        config_file,
    })
}

fn html_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("html")))
        .collect()
}
