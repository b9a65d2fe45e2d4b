//! `[cdn]` section configuration: the origin registry.
//!
//! Describes every known origin and how resolution walks them.
//!
//! # Example
//!
//! ```toml
//! [cdn]
//! primary_cdn = "jsdelivr"                          # First-choice origin ("local" = self-hosted)
//! fallback_order = ["jsdelivr", "github", "local"]  # Probe order
//! timeout = 5000                                    # Per-probe deadline (ms)
//! retry_attempts = 2                                # Full passes over fallback_order
//! enable_detailed_logging = false                   # Verbose resolution logs
//!
//! [cdn.cdns]
//! local = ""                                        # Same-origin
//! github = "https://raw.githubusercontent.com/owner/repo/master"
//! jsdelivr = "https://cdn.jsdelivr.net/gh/owner/repo@latest"
//! ```
//!
//! The same structure is accepted in the camelCase JSON form embedded into
//! pages by the build step (`primaryCdn`, `fallbackOrder`, `retryAttempts`, ...).

use std::collections::BTreeMap;
use std::time::Duration;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, ConfigError, FieldPath};
use crate::core::{AssetPath, LOCAL_ORIGIN, is_root_relative};

/// Default per-probe deadline in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Default number of passes over the fallback order.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 2;

/// Immutable origin registry consumed by the resolver and the loader.
///
/// There is no implicit default: load it from a file, or call
/// [`OriginConfig::default_config`] deliberately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginConfig {
    /// Preferred origin; `"local"` disables probing entirely.
    #[serde(alias = "primaryCdn")]
    pub primary_cdn: String,

    /// Origin identifier → base URL (`""` = same-origin).
    #[serde(alias = "origins")]
    pub cdns: BTreeMap<String, String>,

    /// Ordered origin identifiers to probe.
    #[serde(alias = "fallbackOrder")]
    pub fallback_order: Vec<String>,

    /// Milliseconds before a probe is abandoned.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Number of full passes over `fallback_order`.
    #[serde(default = "default_retry_attempts", alias = "retryAttempts")]
    pub retry_attempts: u32,

    /// Verbose diagnostic output.
    #[serde(default, alias = "enableDetailedLogging")]
    pub enable_detailed_logging: bool,
}

const fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_MS
}

const fn default_retry_attempts() -> u32 {
    DEFAULT_RETRY_ATTEMPTS
}

/// Field paths of the `[cdn]` section.
pub struct OriginConfigFields {
    pub primary_cdn: FieldPath,
    pub cdns: FieldPath,
    pub fallback_order: FieldPath,
    pub timeout: FieldPath,
    pub retry_attempts: FieldPath,
}

/// camelCase view embedded into pages.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InjectedConfig<'a> {
    primary_cdn: &'a str,
    cdns: &'a BTreeMap<String, String>,
    fallback_order: &'a [String],
    timeout: u64,
    retry_attempts: u32,
    enable_detailed_logging: bool,
}

impl OriginConfig {
    pub const FIELDS: OriginConfigFields = OriginConfigFields {
        primary_cdn: FieldPath::new("cdn.primary_cdn"),
        cdns: FieldPath::new("cdn.cdns"),
        fallback_order: FieldPath::new("cdn.fallback_order"),
        timeout: FieldPath::new("cdn.timeout"),
        retry_attempts: FieldPath::new("cdn.retry_attempts"),
    };

    /// Self-hosted configuration: a single same-origin `local` entry.
    pub fn default_config() -> Self {
        Self {
            primary_cdn: LOCAL_ORIGIN.to_string(),
            cdns: BTreeMap::from([(LOCAL_ORIGIN.to_string(), String::new())]),
            fallback_order: vec![LOCAL_ORIGIN.to_string()],
            timeout: DEFAULT_TIMEOUT_MS,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            enable_detailed_logging: false,
        }
    }

    /// Parse the JSON object embedded by the build step.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Serialize as the camelCase JSON object embedded into pages.
    pub fn to_injected_json(&self) -> String {
        let view = InjectedConfig {
            primary_cdn: &self.primary_cdn,
            cdns: &self.cdns,
            fallback_order: &self.fallback_order,
            timeout: self.timeout,
            retry_attempts: self.retry_attempts,
            enable_detailed_logging: self.enable_detailed_logging,
        };
        // Only strings and numbers: serialization cannot fail.
        serde_json::to_string_pretty(&view).unwrap_or_default()
    }

    /// Whether the primary origin is the self-hosted sentinel.
    #[inline]
    pub fn is_local_primary(&self) -> bool {
        self.primary_cdn == LOCAL_ORIGIN
    }

    /// Base URL of an origin.
    pub fn base_url(&self, origin: &str) -> Option<&str> {
        self.cdns.get(origin).map(String::as_str)
    }

    /// Candidate URL of an asset on an origin.
    pub fn candidate_url(&self, origin: &str, path: &AssetPath) -> Option<String> {
        self.base_url(origin).map(|base| path.on_base(base))
    }

    /// URL of an asset on the local origin (its base, or same-origin).
    pub fn local_url(&self, path: &AssetPath) -> String {
        path.on_base(self.base_url(LOCAL_ORIGIN).unwrap_or_default())
    }

    /// Per-probe deadline.
    #[inline]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }

    /// Keep only known origins, first occurrence wins.
    pub fn sanitize_order<S: AsRef<str>>(&self, order: &[S]) -> Vec<String> {
        let mut seen = FxHashSet::default();
        let mut sanitized = Vec::with_capacity(order.len());
        for origin in order {
            let origin = origin.as_ref();
            if !self.cdns.contains_key(origin) {
                crate::debug!("cdn"; "ignoring unknown origin `{}` in probe order", origin);
                continue;
            }
            if seen.insert(origin) {
                sanitized.push(origin.to_string());
            }
        }
        sanitized
    }

    /// Validate the registry invariants.
    ///
    /// # Checks
    /// - `cdns` is not empty and every base URL is absolute http(s), root-relative or empty.
    /// - `primary_cdn` is a known origin listed in `fallback_order`.
    /// - every `fallback_order` entry is a known origin.
    /// - `timeout > 0`, `retry_attempts >= 1`.
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        let fields = &Self::FIELDS;

        if self.cdns.is_empty() {
            diag.error_with_hint(
                fields.cdns,
                "no origins configured",
                "add at least `local = \"\"`",
            );
        }

        for (origin, base) in &self.cdns {
            if !is_valid_base(base) {
                diag.error(
                    fields.cdns,
                    format!("origin `{origin}` has invalid base URL `{base}`"),
                );
            }
        }

        if !self.cdns.contains_key(&self.primary_cdn) {
            diag.error(
                fields.primary_cdn,
                format!("unknown primary origin `{}`", self.primary_cdn),
            );
        } else if !self.fallback_order.contains(&self.primary_cdn) {
            diag.error_with_hint(
                fields.fallback_order,
                format!("primary origin `{}` is not in the fallback order", self.primary_cdn),
                format!("add \"{}\" to fallback_order", self.primary_cdn),
            );
        }

        if self.fallback_order.is_empty() {
            diag.error(fields.fallback_order, "fallback order is empty");
        }

        let mut seen = FxHashSet::default();
        for origin in &self.fallback_order {
            if !self.cdns.contains_key(origin) {
                diag.error_with_hint(
                    fields.fallback_order,
                    format!("unknown origin `{origin}`"),
                    "define it under [cdn.cdns] or remove it from fallback_order",
                );
            } else if !seen.insert(origin.as_str()) {
                diag.warn(fields.fallback_order, format!("`{origin}` listed more than once"));
            }
        }

        if self.timeout == 0 {
            diag.error(fields.timeout, "timeout must be greater than 0");
        }

        if self.retry_attempts == 0 {
            diag.error(fields.retry_attempts, "retry_attempts must be at least 1");
        }
    }
}

/// Base URLs: empty (same-origin), root-relative, or absolute http(s).
fn is_valid_base(base: &str) -> bool {
    if base.is_empty() || is_root_relative(base) {
        return true;
    }
    url::Url::parse(base).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    fn mirror_config() -> OriginConfig {
        OriginConfig {
            primary_cdn: "mirrorA".into(),
            cdns: BTreeMap::from([
                ("mirrorA".into(), "https://a.example/base".into()),
                ("local".into(), String::new()),
            ]),
            fallback_order: vec!["mirrorA".into(), "local".into()],
            timeout: 1000,
            retry_attempts: 1,
            enable_detailed_logging: false,
        }
    }

    fn errors_of(config: &OriginConfig) -> Vec<String> {
        let mut diag = ConfigDiagnostics::new();
        config.validate(&mut diag);
        diag.errors().iter().map(|e| e.message.clone()).collect()
    }

    #[test]
    fn test_parse_toml_section() {
        let config = test_parse_config("");
        assert_eq!(config.cdn.primary_cdn, "local");
        assert_eq!(config.cdn.timeout, DEFAULT_TIMEOUT_MS);
        assert_eq!(config.cdn.retry_attempts, DEFAULT_RETRY_ATTEMPTS);
    }

    #[test]
    fn test_parse_injected_json() {
        let json = r#"{
            "primaryCdn": "mirrorA",
            "cdns": { "mirrorA": "https://a.example/base", "local": "" },
            "fallbackOrder": ["mirrorA", "local"],
            "timeout": 1000,
            "retryAttempts": 1,
            "enableDetailedLogging": true
        }"#;
        let config = OriginConfig::from_json(json).unwrap();
        assert_eq!(config.primary_cdn, "mirrorA");
        assert_eq!(config.fallback_order, vec!["mirrorA", "local"]);
        assert_eq!(config.retry_attempts, 1);
        assert!(config.enable_detailed_logging);
    }

    #[test]
    fn test_injected_json_roundtrips_through_aliases() {
        let config = mirror_config();
        let json = config.to_injected_json();
        assert!(json.contains("\"primaryCdn\""));
        assert!(json.contains("\"fallbackOrder\""));
        assert_eq!(OriginConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_default_config_is_self_hosted() {
        let config = OriginConfig::default_config();
        assert!(config.is_local_primary());
        assert!(errors_of(&config).is_empty());
    }

    #[test]
    fn test_candidate_url() {
        let config = mirror_config();
        let path = AssetPath::new("/css/app.css");
        assert_eq!(
            config.candidate_url("mirrorA", &path).as_deref(),
            Some("https://a.example/base/css/app.css")
        );
        assert_eq!(config.candidate_url("local", &path).as_deref(), Some("/css/app.css"));
        assert_eq!(config.candidate_url("nope", &path), None);
        assert_eq!(config.local_url(&path), "/css/app.css");
    }

    #[test]
    fn test_sanitize_order_drops_unknown_and_duplicates() {
        let config = mirror_config();
        let order = config.sanitize_order(&["local", "ghost", "mirrorA", "local"]);
        assert_eq!(order, vec!["local", "mirrorA"]);
    }

    #[test]
    fn test_validate_unknown_fallback_origin() {
        let mut config = mirror_config();
        config.fallback_order.push("ghost".into());
        let errors = errors_of(&config);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("ghost"));
    }

    #[test]
    fn test_validate_primary_must_be_in_order() {
        let mut config = mirror_config();
        config.fallback_order = vec!["local".into()];
        let errors = errors_of(&config);
        assert!(errors.iter().any(|e| e.contains("not in the fallback order")));
    }

    #[test]
    fn test_validate_numeric_bounds() {
        let mut config = mirror_config();
        config.timeout = 0;
        config.retry_attempts = 0;
        assert_eq!(errors_of(&config).len(), 2);
    }

    #[test]
    fn test_validate_base_urls() {
        let mut config = mirror_config();
        config.cdns.insert("ftp".into(), "ftp://files.example".into());
        config.cdns.insert("rel".into(), "/mirror".into());
        let errors = errors_of(&config);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("ftp"));
    }
}
