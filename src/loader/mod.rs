//! Asset loader: binds resolved URLs onto document elements.
//!
//! The resolver picks an origin; this layer owns element-level fallback.
//! When an element fails to load from its resolved URL it is pointed at the
//! local path directly, and the path is marked failed so the resolver is
//! never consulted for it again this session.
//!
//! | Asset      | Deadline         | Overall failure                  |
//! |------------|------------------|----------------------------------|
//! | image      | `image_timeout`  | never (local path is displayed)  |
//! | script     | `script_timeout` | `false` after the local retry    |
//! | stylesheet | `script_timeout` | `false` after the local retry    |

mod dom;
mod options;
mod render;

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashSet;
use futures::future::{BoxFuture, FutureExt, Shared, join_all};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::Serialize;
use tokio::time::timeout;

pub use dom::{Document, ElementId, ElementKind};
pub use options::ScriptOptions;
pub use render::{LoadSignal, Renderer};

use crate::config::LoaderConfig;
use crate::core::{AssetPath, is_external, now_millis};
use crate::resolver::CdnResolver;
use crate::{debug, log};

type SharedLoad = Shared<BoxFuture<'static, bool>>;

/// Snapshot of loader bookkeeping.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoaderStats {
    pub loaded: usize,
    pub failed: usize,
    pub pending: usize,
    pub primary_cdn: String,
    pub timestamp: u64,
}

/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct AssetLoader {
    inner: Arc<LoaderInner>,
}

struct LoaderInner {
    resolver: Arc<CdnResolver>,
    document: Arc<Document>,
    renderer: Arc<dyn Renderer>,
    image_timeout: Duration,
    script_timeout: Duration,
    /// `kind:path` keys that loaded from their resolved URL.
    loaded: DashSet<String>,
    /// `kind:path` keys served from the local path for the rest of the session.
    failed: DashSet<String>,
    /// Script and stylesheet loads in progress.
    in_flight: Mutex<FxHashMap<String, SharedLoad>>,
}

fn asset_key(kind: ElementKind, path: &AssetPath) -> String {
    format!("{}:{}", kind.as_str(), path)
}

impl AssetLoader {
    pub fn new(
        resolver: Arc<CdnResolver>,
        document: Arc<Document>,
        renderer: Arc<dyn Renderer>,
        config: &LoaderConfig,
    ) -> Self {
        let script_timeout = config.script_timeout(resolver.config());
        Self {
            inner: Arc::new(LoaderInner {
                resolver,
                document,
                renderer,
                image_timeout: config.image_timeout(),
                script_timeout,
                loaded: DashSet::new(),
                failed: DashSet::new(),
                in_flight: Mutex::new(FxHashMap::default()),
            }),
        }
    }

    pub fn document(&self) -> &Arc<Document> {
        &self.inner.document
    }

    /// Load an image into `element`. Always ends with something displayed,
    /// so this only reports `true`.
    ///
    /// References that already name their host (as written by `inject`) are
    /// assigned as they are, without resolution.
    pub async fn load_image(&self, path: &str, element: ElementId) -> bool {
        let inner = &self.inner;
        if is_external(path) {
            return inner.load_external_image(path.trim(), element).await;
        }

        let path = AssetPath::new(path);
        let key = asset_key(ElementKind::Image, &path);

        if inner.loaded.contains(&key) {
            let url = inner
                .resolver
                .cached_url(path.as_str())
                .unwrap_or_else(|| path.to_string());
            inner.document.set_attr(element, "src", &url);
            return true;
        }

        if inner.failed.contains(&key) {
            inner.document.set_attr(element, "src", path.as_str());
            return true;
        }

        let url = inner.resolve(&path).await;
        inner.document.set_attr(element, "src", &url);

        if inner
            .settle(ElementKind::Image, &url, inner.image_timeout)
            .await
        {
            inner.loaded.insert(key);
        } else {
            log!("loader"; "image failed from {}, using local {}", url, path);
            inner.document.set_attr(element, "src", path.as_str());
            inner.failed.insert(key);
        }
        true
    }

    /// Insert a `<script>` for `path` into the head.
    ///
    /// Concurrent calls for the same path share one element and one outcome.
    /// Returns `false` when neither the resolved URL nor the local path loaded.
    pub async fn load_script(&self, path: &str, options: ScriptOptions) -> bool {
        self.load_linked(ElementKind::Script, path, options).await
    }

    /// Insert a `<link rel="stylesheet">` for `path` into the head.
    pub async fn load_css(&self, path: &str) -> bool {
        self.load_linked(ElementKind::Stylesheet, path, ScriptOptions::default())
            .await
    }

    /// Load scripts one after another; `true` only if all of them loaded.
    pub async fn load_scripts<S: AsRef<str>>(&self, paths: &[S], options: ScriptOptions) -> bool {
        let mut all_loaded = true;
        for path in paths {
            if !self.load_script(path.as_ref(), options).await {
                log!("loader"; "failed to load {}", path.as_ref());
                all_loaded = false;
            }
        }
        all_loaded
    }

    /// Load every `<img data-src>` under `scope` concurrently. Returns the
    /// number of images once all of them settled.
    pub async fn load_all_images(&self, scope: ElementId) -> usize {
        let images = self.inner.document.lazy_images(scope);
        if images.is_empty() {
            return 0;
        }

        debug!("loader"; "loading {} images", images.len());
        join_all(
            images
                .iter()
                .map(|(element, path)| self.load_image(path, *element)),
        )
        .await;
        images.len()
    }

    async fn load_linked(&self, kind: ElementKind, path: &str, options: ScriptOptions) -> bool {
        let path = AssetPath::new(path);
        let key = asset_key(kind, &path);

        if self.inner.loaded.contains(&key) {
            return true;
        }

        let pending = {
            let mut in_flight = self.inner.in_flight.lock();
            match in_flight.get(&key) {
                Some(pending) => pending.clone(),
                None => {
                    let inner = Arc::clone(&self.inner);
                    let task_key = key.clone();
                    let pending = async move {
                        let ok = inner.attach_and_load(kind, &path, options).await;
                        inner.in_flight.lock().remove(&task_key);
                        if ok {
                            inner.loaded.insert(task_key);
                        }
                        ok
                    }
                    .boxed()
                    .shared();
                    in_flight.insert(key, pending.clone());
                    pending
                }
            }
        };

        pending.await
    }

    pub fn stats(&self) -> LoaderStats {
        LoaderStats {
            loaded: self.inner.loaded.len(),
            failed: self.inner.failed.len(),
            pending: self.inner.in_flight.lock().len(),
            primary_cdn: self.inner.resolver.config().primary_cdn.clone(),
            timestamp: now_millis(),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.stats();
        log!("loader"; "primary `{}`: {} loaded, {} failed, {} pending",
            stats.primary_cdn, stats.loaded, stats.failed, stats.pending);
    }
}

impl LoaderInner {
    async fn load_external_image(&self, url: &str, element: ElementId) -> bool {
        let key = format!("{}:{}", ElementKind::Image.as_str(), url);
        self.document.set_attr(element, "src", url);
        if self.loaded.contains(&key) || self.failed.contains(&key) {
            return true;
        }

        if self.settle(ElementKind::Image, url, self.image_timeout).await {
            self.loaded.insert(key);
        } else {
            log!("loader"; "image failed from {}", url);
            self.failed.insert(key);
        }
        true
    }

    /// Resolved URL, or the path itself when the primary origin is local.
    async fn resolve(&self, path: &AssetPath) -> String {
        if self.resolver.config().is_local_primary() {
            path.to_string()
        } else {
            self.resolver.resolve(path.as_str()).await
        }
    }

    /// Race the element's load signal against `deadline`.
    async fn settle(&self, kind: ElementKind, url: &str, deadline: Duration) -> bool {
        match timeout(deadline, self.renderer.load(kind, url)).await {
            Ok(LoadSignal::Loaded) => true,
            Ok(LoadSignal::Error) => false,
            Err(_) => {
                debug!("loader"; "{} timed out after {}ms", url, deadline.as_millis());
                false
            }
        }
    }

    async fn attach_and_load(&self, kind: ElementKind, path: &AssetPath, options: ScriptOptions) -> bool {
        let url = self.resolve(path).await;
        let document = &self.document;

        let element = match kind {
            ElementKind::Stylesheet => {
                let link = document.create_element("link");
                document.set_attr(link, "rel", "stylesheet");
                link
            }
            _ => {
                let script = document.create_element("script");
                for (name, value) in options.attributes() {
                    document.set_attr(script, name, value);
                }
                script
            }
        };
        document.set_source(element, &url);
        document.append_to_head(element);

        if self.settle(kind, &url, self.script_timeout).await {
            debug!("loader"; "{} loaded: {}", kind.as_str(), url);
            return true;
        }

        // Already local: nothing left to fall back to
        if url == path.as_str() {
            log!("loader"; "{} failed: {}", kind.as_str(), path);
            return false;
        }

        log!("loader"; "{} failed from {}, trying local {}", kind.as_str(), url, path);
        document.set_source(element, path.as_str());
        document.append_to_head(element);

        let ok = self.settle(kind, path.as_str(), self.script_timeout).await;
        if !ok {
            log!("loader"; "{} failed from all sources: {}", kind.as_str(), path);
        }
        ok
    }
}
