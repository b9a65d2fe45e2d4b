//! `load` command: run the asset loader over a built page.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use super::common::http_resolver;
use crate::config::Config;
use crate::core::{AssetPath, is_external, plural_count};
use crate::loader::{AssetLoader, Document, ScriptOptions};
use crate::log;
use crate::logger::StatusLine;
use crate::net::HttpClient;

/// Load the lazy images of `html` (under the element with id `scope`, if
/// given), then `styles` and `scripts` (as ES modules with `module`), and
/// report the source each element ended up with.
///
/// Without a `[site]` root, relative URLs are answered from the page's directory.
pub async fn load_page(
    html: &Path,
    scope: Option<&str>,
    scripts: &[String],
    module: bool,
    styles: &[String],
    config: &Config,
) -> Result<()> {
    let content = fs::read_to_string(html).with_context(|| format!("failed to read {}", html.display()))?;
    let document = Arc::new(Document::parse(&content)?);

    let mut site = config.site.clone();
    if site.root_dir.is_none() && site.root_url.is_none() {
        site.root_dir = html.parent().map(Path::to_path_buf);
    }

    let resolver = http_resolver(config, &site);
    let renderer = Arc::new(HttpClient::new(&site));
    let loader = AssetLoader::new(resolver.clone(), document.clone(), renderer, &config.loader);

    let scope = match scope {
        Some(id) => document
            .element_by_id(id)
            .with_context(|| format!("no element with id `{id}` in {}", html.display()))?,
        None => document.body(),
    };
    let images = document.lazy_images(scope);
    log!("loader"; "{} in {}", plural_count(images.len(), "lazy image"), html.display());
    loader.load_all_images(scope).await;

    for (element, path) in &images {
        let src = document.source(*element).unwrap_or_default();
        if is_external(path) {
            StatusLine::success(&format!("{} → {src}", path.trim()));
        } else {
            report(AssetPath::new(path).as_str(), &src);
        }
    }

    for style in styles {
        if loader.load_css(style).await {
            let path = AssetPath::new(style);
            report(path.as_str(), &linked_source(&document, "link", &path, resolver.cached_url(style)));
        } else {
            StatusLine::error(style, "no source could be loaded");
        }
    }

    let options = if module { ScriptOptions::module() } else { ScriptOptions::default() };
    if !scripts.is_empty() && !loader.load_scripts(scripts, options).await {
        StatusLine::error("scripts", "some scripts could not be loaded");
    }
    for script in scripts {
        let path = AssetPath::new(script);
        report(path.as_str(), &linked_source(&document, "script", &path, resolver.cached_url(script)));
    }

    loader.log_stats();
    Ok(())
}

/// Source of the inserted element for `path`: its resolved URL, or the local
/// path it fell back to.
fn linked_source(document: &Document, tag: &str, path: &AssetPath, resolved: Option<String>) -> String {
    document
        .elements_by_tag(tag)
        .into_iter()
        .filter_map(|element| document.source(element))
        .find(|src| resolved.as_deref() == Some(src.as_str()) || src == path.as_str())
        .unwrap_or_else(|| path.to_string())
}

/// Same-origin sources are flagged: no remote origin served them.
fn report(path: &str, src: &str) {
    if src == path {
        StatusLine::warning(&format!("{path} → {src}"));
    } else {
        StatusLine::success(&format!("{path} → {src}"));
    }
}
