//! Element load signal seam.

use async_trait::async_trait;

use super::dom::ElementKind;

/// Outcome an element reports once its resource settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSignal {
    Loaded,
    Error,
}

/// Fetches an element's resource and reports load or error.
///
/// Never resolving is allowed; the loader races every load against its
/// own deadline.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn load(&self, kind: ElementKind, url: &str) -> LoadSignal;
}
