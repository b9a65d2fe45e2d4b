//! `resolve` and `clear` commands.

use anyhow::Result;
use futures::future::join_all;

use super::common::http_resolver;
use crate::config::Config;
use crate::core::{AssetPath, plural_count};
use crate::log;
use crate::logger::StatusLine;

/// Resolve every path and print where it will be served from.
///
/// Paths resolve concurrently; each one still walks its origins in order.
pub async fn resolve_paths(paths: &[String], prefer: &[String], config: &Config) -> Result<()> {
    let resolver = http_resolver(config, &config.site);
    if !prefer.is_empty() {
        resolver.set_preferred_order(prefer);
    }

    let urls = join_all(paths.iter().map(|path| resolver.resolve(path))).await;

    let mut local = 0;
    for (path, url) in paths.iter().zip(&urls) {
        let path = AssetPath::new(path);
        if *url == path.as_str() && !config.cdn.is_local_primary() {
            local += 1;
            StatusLine::warning(&format!("{path} → {url} (no origin answered)"));
        } else {
            StatusLine::success(&format!("{path} → {url}"));
        }
    }

    if local > 0 {
        log!("cdn"; "{} served from the local path", plural_count(local, "asset"));
    }
    resolver.log_stats();
    Ok(())
}

/// Drop every cached resolution and metric.
pub fn clear(config: &Config) -> Result<()> {
    let resolver = http_resolver(config, &config.site);
    let cached = resolver.stats().cache_size;
    resolver.clear_cache();
    StatusLine::success(&format!("cleared {}", plural_count(cached, "cached resolution")));
    Ok(())
}
