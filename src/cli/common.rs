//! Wiring shared across CLI commands.

use std::sync::Arc;

use crate::cache::open_storage;
use crate::config::{Config, SiteSectionConfig};
use crate::net::HttpClient;
use crate::resolver::CdnResolver;

/// Resolver over HTTP, backed by the configured storage.
pub fn http_resolver(config: &Config, site: &SiteSectionConfig) -> Arc<CdnResolver> {
    let client = Arc::new(HttpClient::new(site));
    let storage = open_storage(&config.storage);
    crate::debug!("cdn"; "state in {}", config.storage.dir.display());
    Arc::new(CdnResolver::create(config.cdn.clone(), client, storage))
}
