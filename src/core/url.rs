//! Asset path type and origin URL joining.
//!
//! - Asset paths are root-relative (`/css/app.css`), the key of the resolution cache
//! - Origin base URLs are joined with exactly one slash at the seam

use std::borrow::Borrow;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Root-relative asset path.
///
/// Invariants:
/// - Always starts with `/`
/// - Surrounding whitespace is trimmed
/// - Query string and fragment are kept (they are part of the asset identity)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetPath(Arc<str>);

impl AssetPath {
    /// Normalize a caller-supplied path (adds the leading slash when missing).
    pub fn new(raw: &str) -> Self {
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            return Self(Arc::from("/"));
        }

        if trimmed.starts_with('/') {
            Self(Arc::from(trimmed))
        } else {
            Self(Arc::from(format!("/{trimmed}")))
        }
    }

    /// Get the path as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Join this path onto an origin base URL.
    ///
    /// An empty base yields the path itself (same-origin).
    pub fn on_base(&self, base: &str) -> String {
        join_url(base, self.as_str())
    }
}

/// Join a base URL and a path with exactly one `/` at the seam.
///
/// ```ignore
/// join_url("https://cdn.example/dist/", "/css/app.css") -> "https://cdn.example/dist/css/app.css"
/// join_url("", "/css/app.css")                          -> "/css/app.css"
/// ```
pub fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

/// Check whether a reference is root-relative (`/x`, but not protocol-relative `//x`).
#[inline]
pub fn is_root_relative(reference: &str) -> bool {
    reference.starts_with('/') && !reference.starts_with("//")
}

/// Check whether a reference already names its host (`https://x/a.png`,
/// `//x/a.png`, `data:...`), so no origin applies to it.
pub fn is_external(reference: &str) -> bool {
    let reference = reference.trim();
    reference.starts_with("//") || ::url::Url::parse(reference).is_ok()
}

impl std::fmt::Display for AssetPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for AssetPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for AssetPath {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AssetPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for AssetPath {
    fn from(s: String) -> Self {
        Self::new(&s)
    }
}

impl PartialEq<str> for AssetPath {
    fn eq(&self, other: &str) -> bool {
        self.0.as_ref() == other
    }
}

impl PartialEq<&str> for AssetPath {
    fn eq(&self, other: &&str) -> bool {
        self.0.as_ref() == *other
    }
}

impl Serialize for AssetPath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AssetPath {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::new(&s))
    }
}
