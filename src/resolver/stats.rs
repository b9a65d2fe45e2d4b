//! Read-only resolver snapshot for diagnostics.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::cache::MetricsTable;
use crate::config::OriginConfig;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolverStats {
    pub config: OriginConfig,
    /// Probe order used when the caller supplies none.
    pub active_order: Vec<String>,
    pub cache_size: usize,
    /// Cached path → URL pairs.
    pub resolutions: BTreeMap<String, String>,
    pub metrics: MetricsTable,
    /// Unix milliseconds when the snapshot was taken.
    pub timestamp: u64,
}

impl ResolverStats {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
