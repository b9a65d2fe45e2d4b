//! Scripted network doubles shared by resolver and loader tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::time::sleep;

use crate::loader::{ElementKind, LoadSignal, Renderer};
use crate::resolver::{Probe, ProbeError};

/// How a scripted URL settles.
#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    Ok,
    Fail,
    /// Never settles.
    Hang,
    /// Settles with the given outcome after a delay.
    After(Duration, bool),
}

impl Behavior {
    async fn settle(self) -> bool {
        match self {
            Self::Ok => true,
            Self::Fail => false,
            Self::Hang => std::future::pending().await,
            Self::After(delay, ok) => {
                sleep(delay).await;
                ok
            }
        }
    }
}

/// Answers probes and loads from a per-URL script, logging start/end events.
pub struct Scripted {
    script: FxHashMap<String, Behavior>,
    fallback: Behavior,
    events: Mutex<Vec<String>>,
}

impl Scripted {
    pub fn new(fallback: Behavior, script: &[(&str, Behavior)]) -> Arc<Self> {
        Arc::new(Self {
            script: script
                .iter()
                .map(|(url, behavior)| (url.to_string(), *behavior))
                .collect(),
            fallback,
            events: Mutex::new(Vec::new()),
        })
    }

    /// Probe double: unscripted URLs fail.
    pub fn probe(script: &[(&str, Behavior)]) -> Arc<Self> {
        Self::new(Behavior::Fail, script)
    }

    /// Renderer double: unscripted URLs load.
    pub fn renderer(script: &[(&str, Behavior)]) -> Arc<Self> {
        Self::new(Behavior::Ok, script)
    }

    pub fn calls(&self) -> usize {
        self.events.lock().iter().filter(|e| e.starts_with("start")).count()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        let started = format!("start {url}");
        self.events.lock().iter().filter(|e| **e == started).count()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    async fn run(&self, url: &str) -> bool {
        self.events.lock().push(format!("start {url}"));
        let behavior = self.script.get(url).copied().unwrap_or(self.fallback);
        let ok = behavior.settle().await;
        self.events.lock().push(format!("end {url}"));
        ok
    }
}

#[async_trait]
impl Probe for Scripted {
    async fn probe(&self, url: &str) -> Result<(), ProbeError> {
        if self.run(url).await {
            Ok(())
        } else {
            Err(ProbeError::Status(404))
        }
    }
}

#[async_trait]
impl Renderer for Scripted {
    async fn load(&self, _kind: ElementKind, url: &str) -> LoadSignal {
        if self.run(url).await {
            LoadSignal::Loaded
        } else {
            LoadSignal::Error
        }
    }
}
