//! Reachability probe seam.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Why a candidate URL was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("network failure: {0}")]
    Network(String),

    #[error("unexpected status {0}")]
    Status(u16),
}

/// Lightweight existence check (HEAD-style) of a candidate URL.
///
/// Implementations need not enforce a deadline: the resolver races every
/// probe against the configured timeout and drops the loser.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, url: &str) -> Result<(), ProbeError>;
}
