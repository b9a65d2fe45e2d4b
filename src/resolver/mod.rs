//! CDN resolver: maps an asset path to a reachable URL.
//!
//! Resolution order for a path:
//!
//! 1. cached URL (no probe)
//! 2. primary origin is `local` → local URL (no probe)
//! 3. probe origins strictly one at a time, each raced against the timeout,
//!    in `retry_attempts` passes separated by exponential backoff; `local`
//!    entries are skipped
//! 4. every probe failed → the local URL when `local` is in the order,
//!    otherwise the normalized path itself
//!
//! Every outcome, including the last-resort one, is cached. Nothing here
//! returns an error: failures are recorded as metrics and log lines.

mod backoff;
mod probe;
mod stats;

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tokio::time::{Instant, sleep, timeout};

use backoff::Backoff;
pub use probe::{Probe, ProbeError};
pub use stats::ResolverStats;

use crate::cache::{ResolutionCache, Storage};
use crate::config::OriginConfig;
use crate::core::{AssetPath, LOCAL_ORIGIN, now_millis, plural_count};
use crate::{debug, log};

/// Origin selection engine. Construct once, share by `Arc`.
pub struct CdnResolver {
    config: OriginConfig,
    probe: Arc<dyn Probe>,
    cache: ResolutionCache,
    /// Session-scoped override of `fallback_order`.
    preferred: ArcSwapOption<Vec<String>>,
    backoff: Backoff,
}

impl CdnResolver {
    /// Build a resolver, restoring cached resolutions from `storage`.
    pub fn create(config: OriginConfig, probe: Arc<dyn Probe>, storage: Arc<dyn Storage>) -> Self {
        let cache = ResolutionCache::load(storage, &config);
        debug!("cdn"; "resolver ready: primary `{}`, order [{}]",
            config.primary_cdn, config.fallback_order.join(", "));
        Self {
            config,
            probe,
            cache,
            preferred: ArcSwapOption::empty(),
            backoff: Backoff::default(),
        }
    }

    #[inline]
    pub fn config(&self) -> &OriginConfig {
        &self.config
    }

    /// Resolve with the session probe order.
    pub async fn resolve(&self, path: &str) -> String {
        self.resolve_with(path, None).await
    }

    /// Resolve, probing `preferred` (unknown ids dropped) instead of the session order.
    pub async fn resolve_with(&self, path: &str, preferred: Option<&[String]>) -> String {
        let path = AssetPath::new(path);

        if let Some(url) = self.cache.get(path.as_str()) {
            debug!("cdn"; "cache hit {} → {}", path, url);
            return url;
        }

        let generation = self.cache.generation();

        if self.config.is_local_primary() {
            let url = self.config.local_url(&path);
            return self.cache.insert(&path, url, generation);
        }

        let order = self.probe_order(preferred);
        // The caller's own origin is never probed: it answers only once every
        // other origin failed.
        let remote: Vec<&str> = order
            .iter()
            .map(String::as_str)
            .filter(|origin| *origin != LOCAL_ORIGIN)
            .collect();
        let attempts = if remote.is_empty() { 0 } else { self.config.retry_attempts.max(1) };

        for attempt in 0..attempts {
            for origin in &remote {
                let Some(url) = self.config.candidate_url(origin, &path) else {
                    continue;
                };

                if self.probe_origin(origin, &url).await {
                    debug!("cdn"; "{} → {} ({})", path, url, origin);
                    return self.cache.insert(&path, url, generation);
                }
            }

            if attempt + 1 < attempts {
                let delay = self.backoff.delay(attempt);
                debug!("cdn"; "pass {} failed for {}, retrying in {}ms", attempt + 1, path, delay.as_millis());
                sleep(delay).await;
            }
        }

        let url = if order.iter().any(|origin| origin == LOCAL_ORIGIN) {
            self.config.local_url(&path)
        } else {
            path.to_string()
        };
        if attempts > 0 {
            log!("cdn"; "all origins failed for {}, serving {}", path, url);
        }
        self.cache.insert(&path, url, generation)
    }

    /// Probe one candidate against the deadline and record the outcome.
    async fn probe_origin(&self, origin: &str, url: &str) -> bool {
        let deadline = self.config.probe_timeout();
        let started = Instant::now();

        let outcome = match timeout(deadline, self.probe.probe(url)).await {
            Ok(result) => result,
            Err(_) => Err(ProbeError::Timeout(deadline)),
        };

        self.cache.record(origin, started.elapsed(), outcome.is_ok());

        match outcome {
            Ok(()) => true,
            Err(err) => {
                debug!("cdn"; "{} failed for {}: {}", origin, url, err);
                false
            }
        }
    }

    fn probe_order(&self, preferred: Option<&[String]>) -> Arc<Vec<String>> {
        if let Some(preferred) = preferred {
            let order = self.config.sanitize_order(preferred);
            if !order.is_empty() {
                return Arc::new(order);
            }
        }
        self.preferred
            .load_full()
            .unwrap_or_else(|| Arc::new(self.config.fallback_order.clone()))
    }

    /// Cached URL of a path, without probing.
    pub fn cached_url(&self, path: &str) -> Option<String> {
        self.cache.get(AssetPath::new(path).as_str())
    }

    /// Empty the cache and metrics, and their stored entries.
    ///
    /// Resolves in flight when this runs still return their URL but do not
    /// cache it.
    pub fn clear_cache(&self) {
        self.cache.clear();
        log!("cdn"; "cache cleared");
    }

    /// Override the probe order for subsequent resolves. An empty (or
    /// all-unknown) list restores `fallback_order`.
    pub fn set_preferred_order<S: AsRef<str>>(&self, order: &[S]) {
        let order = self.config.sanitize_order(order);
        if order.is_empty() {
            self.preferred.store(None);
        } else {
            debug!("cdn"; "preferred order: [{}]", order.join(", "));
            self.preferred.store(Some(Arc::new(order)));
        }
    }

    pub fn stats(&self) -> ResolverStats {
        ResolverStats {
            config: self.config.clone(),
            active_order: self.probe_order(None).as_ref().clone(),
            cache_size: self.cache.len(),
            resolutions: self.cache.entries().into_iter().collect(),
            metrics: self.cache.metrics(),
            timestamp: now_millis(),
        }
    }

    /// Print a per-origin summary.
    pub fn log_stats(&self) {
        let stats = self.stats();
        log!("cdn"; "primary `{}`, {} cached", stats.config.primary_cdn,
            plural_count(stats.cache_size, "resolution"));
        for (path, url) in &stats.resolutions {
            debug!("cdn"; "{} → {}", path, url);
        }
        if stats.metrics.is_empty() {
            log!("cdn"; "no probes recorded");
        }
        for (origin, metric) in &stats.metrics {
            log!("cdn"; "{}: {}/{} ok ({:.0}%), avg {:.0}ms", origin, metric.successes,
                metric.attempts, metric.success_rate() * 100.0, metric.average_latency_ms);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryStorage, Storage};
    use crate::testing::{Behavior, Scripted};
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn origins(primary: &str, order: &[&str], retry_attempts: u32) -> OriginConfig {
        OriginConfig {
            primary_cdn: primary.into(),
            cdns: BTreeMap::from([
                ("a".into(), "https://a.example".into()),
                ("b".into(), "https://b.example/".into()),
                ("c".into(), "https://c.example/assets".into()),
                ("local".into(), String::new()),
            ]),
            fallback_order: order.iter().map(|s| s.to_string()).collect(),
            timeout: 1000,
            retry_attempts,
            enable_detailed_logging: false,
        }
    }

    fn resolver(config: OriginConfig, probe: &Arc<Scripted>) -> CdnResolver {
        CdnResolver::create(config, probe.clone(), Arc::new(MemoryStorage::new()))
    }

    #[tokio::test]
    async fn test_cache_hit_skips_probe() {
        let probe = Scripted::probe(&[("https://a.example/app.js", Behavior::Ok)]);
        let resolver = resolver(origins("a", &["a"], 1), &probe);

        let first = resolver.resolve("/app.js").await;
        let second = resolver.resolve("app.js").await;

        assert_eq!(first, "https://a.example/app.js");
        assert_eq!(second, first);
        assert_eq!(probe.calls(), 1);
        assert_eq!(resolver.cached_url("/app.js").as_deref(), Some(first.as_str()));
    }

    #[tokio::test]
    async fn test_local_primary_never_probes() {
        let probe = Scripted::probe(&[]);
        let resolver = resolver(origins("local", &["local", "a"], 2), &probe);

        assert_eq!(resolver.resolve("css/app.css").await, "/css/app.css");
        assert_eq!(probe.calls(), 0);
        assert!(resolver.stats().metrics.is_empty());
    }

    #[tokio::test]
    async fn test_ordered_fallback_records_metrics() {
        let probe = Scripted::probe(&[
            ("https://a.example/img/x.png", Behavior::After(Duration::from_millis(5), false)),
            ("https://b.example/img/x.png", Behavior::Fail),
            ("https://c.example/assets/img/x.png", Behavior::Ok),
        ]);
        let resolver = resolver(origins("a", &["a", "b", "c"], 1), &probe);

        let url = resolver.resolve("/img/x.png").await;
        assert_eq!(url, "https://c.example/assets/img/x.png");

        let metrics = resolver.stats().metrics;
        assert_eq!((metrics["a"].attempts, metrics["a"].failures), (1, 1));
        assert_eq!((metrics["b"].attempts, metrics["b"].failures), (1, 1));
        assert_eq!((metrics["c"].attempts, metrics["c"].successes), (1, 1));

        // B starts only after A settled
        assert_eq!(
            probe.events(),
            vec![
                "start https://a.example/img/x.png",
                "end https://a.example/img/x.png",
                "start https://b.example/img/x.png",
                "end https://b.example/img/x.png",
                "start https://c.example/assets/img/x.png",
                "end https://c.example/assets/img/x.png",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_failed_returns_path_after_backoff() {
        let probe = Scripted::probe(&[]);
        let resolver = resolver(origins("a", &["a", "b"], 2), &probe);

        let started = Instant::now();
        let url = resolver.resolve("/js/app.js").await;

        assert_eq!(url, "/js/app.js");
        assert!(started.elapsed() >= Duration::from_millis(100));
        assert_eq!(probe.calls(), 4);
        assert_eq!(resolver.stats().metrics["a"].failures, 2);

        // Final fallback is cached like a success
        assert_eq!(resolver.resolve("/js/app.js").await, "/js/app.js");
        assert_eq!(probe.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mirror_timeout_falls_back_to_local() {
        let config = OriginConfig {
            primary_cdn: "mirrorA".into(),
            cdns: BTreeMap::from([
                ("mirrorA".into(), "https://a.example/base".into()),
                ("local".into(), String::new()),
            ]),
            fallback_order: vec!["mirrorA".into(), "local".into()],
            timeout: 1000,
            retry_attempts: 1,
            enable_detailed_logging: false,
        };
        let probe = Scripted::probe(&[("https://a.example/base/css/app.css", Behavior::Hang)]);
        let resolver = resolver(config, &probe);

        let started = Instant::now();
        assert_eq!(resolver.resolve("/css/app.css").await, "/css/app.css");
        assert!(started.elapsed() >= Duration::from_millis(1000));

        let metrics = resolver.stats().metrics;
        assert_eq!(metrics.len(), 1);
        let mirror = &metrics["mirrorA"];
        assert_eq!((mirror.attempts, mirror.failures, mirror.successes), (1, 1, 0));
    }

    #[tokio::test]
    async fn test_clear_cache_triggers_probe_again() {
        let probe = Scripted::probe(&[("https://a.example/app.js", Behavior::Ok)]);
        let resolver = resolver(origins("a", &["a"], 1), &probe);

        resolver.resolve("/app.js").await;
        resolver.clear_cache();
        assert!(resolver.cached_url("/app.js").is_none());
        assert!(resolver.stats().metrics.is_empty());

        resolver.resolve("/app.js").await;
        assert_eq!(probe.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_during_resolve_is_not_repopulated() {
        let probe = Scripted::probe(&[(
            "https://a.example/app.js",
            Behavior::After(Duration::from_millis(50), true),
        )]);
        let resolver = resolver(origins("a", &["a"], 1), &probe);

        let (url, ()) = tokio::join!(resolver.resolve("/app.js"), async {
            sleep(Duration::from_millis(10)).await;
            resolver.clear_cache();
        });

        assert_eq!(url, "https://a.example/app.js");
        assert!(resolver.cached_url("/app.js").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_resolves_converge_on_first_cached() {
        let probe = Scripted::probe(&[
            ("https://a.example/app.js", Behavior::After(Duration::from_millis(10), true)),
            ("https://b.example/app.js", Behavior::After(Duration::from_millis(30), true)),
        ]);
        let resolver = resolver(origins("a", &["a", "b"], 1), &probe);
        let slow = vec!["b".to_string()];

        let (slow_url, fast_url) = tokio::join!(
            resolver.resolve_with("/app.js", Some(&slow)),
            resolver.resolve("/app.js"),
        );

        assert_eq!(fast_url, "https://a.example/app.js");
        assert_eq!(slow_url, fast_url);
        assert_eq!(probe.calls(), 2);
    }

    #[tokio::test]
    async fn test_preferred_order_drops_unknown_ids() {
        let probe = Scripted::probe(&[
            ("https://a.example/app.js", Behavior::Ok),
            ("https://c.example/assets/app.js", Behavior::Ok),
        ]);
        let resolver = resolver(origins("a", &["a", "b", "c"], 1), &probe);

        resolver.set_preferred_order(&["ghost", "c"]);
        assert_eq!(resolver.stats().active_order, vec!["c"]);
        assert_eq!(resolver.resolve("/app.js").await, "https://c.example/assets/app.js");
        assert_eq!(probe.events()[0], "start https://c.example/assets/app.js");

        resolver.set_preferred_order::<&str>(&[]);
        assert_eq!(resolver.stats().active_order, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_state_survives_restart() {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let probe = Scripted::probe(&[("https://a.example/app.js", Behavior::Ok)]);

        let first = CdnResolver::create(origins("a", &["a"], 1), probe.clone(), storage.clone());
        first.resolve("/app.js").await;

        let second = CdnResolver::create(origins("a", &["a"], 1), probe.clone(), storage);
        assert_eq!(second.resolve("/app.js").await, "https://a.example/app.js");
        assert_eq!(probe.calls(), 1);
        assert_eq!(second.stats().metrics["a"].successes, 1);
    }

    #[tokio::test]
    async fn test_stats_snapshot() {
        let probe = Scripted::probe(&[("https://b.example/app.js", Behavior::Ok)]);
        let resolver = resolver(origins("a", &["a", "b"], 1), &probe);
        resolver.set_preferred_order(&["b", "a"]);
        resolver.resolve("/app.js").await;

        let stats = resolver.stats();
        assert_eq!(stats.active_order, vec!["b", "a"]);
        assert_eq!(stats.cache_size, 1);
        assert_eq!(stats.resolutions["/app.js"], "https://b.example/app.js");
        assert_eq!(stats.metrics["b"].attempts, 1);
        assert!(!stats.metrics.contains_key("a"));

        let json = stats.to_json().unwrap();
        assert!(json.contains("\"activeOrder\""));
        assert!(json.contains("\"cacheSize\": 1"));
    }

    #[tokio::test]
    async fn test_local_early_in_order_does_not_stop_probing() {
        let probe = Scripted::probe(&[("https://a.example/app.js", Behavior::Ok)]);
        let resolver = resolver(origins("a", &["local", "a"], 1), &probe);

        assert_eq!(resolver.resolve("/app.js").await, "https://a.example/app.js");
        assert_eq!(probe.calls(), 1);
        assert!(!resolver.stats().metrics.contains_key("local"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_local_answers_after_every_pass_failed() {
        let probe = Scripted::probe(&[]);
        let resolver = resolver(origins("a", &["local", "a", "b"], 2), &probe);

        let started = Instant::now();
        assert_eq!(resolver.resolve("img/x.png").await, "/img/x.png");
        assert!(started.elapsed() >= Duration::from_millis(100));
        assert_eq!(probe.calls(), 4);
        assert_eq!(resolver.stats().metrics.len(), 2);
    }

    #[tokio::test]
    async fn test_local_only_order_skips_probing() {
        let probe = Scripted::probe(&[]);
        let resolver = resolver(origins("a", &["a"], 3), &probe);

        resolver.set_preferred_order(&["local"]);
        assert_eq!(resolver.resolve("/app.js").await, "/app.js");
        assert_eq!(probe.calls(), 0);
    }
}
