//! Durable resolution state: cached URLs, origin metrics, storage backends.

mod metrics;
mod resolution;
mod storage;

use std::sync::Arc;

pub use metrics::MetricsTable;
pub use resolution::ResolutionCache;
pub use storage::{FileStorage, MemoryStorage, Storage};

use crate::config::StorageConfig;

/// Storage backend selected by the `[storage]` section.
pub fn open_storage(config: &StorageConfig) -> Arc<dyn Storage> {
    if config.enable {
        Arc::new(FileStorage::new(&config.dir))
    } else {
        Arc::new(MemoryStorage::new())
    }
}
