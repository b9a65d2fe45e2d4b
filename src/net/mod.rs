//! HTTP adapter: probes origins with HEAD and loads elements with GET.
//!
//! Absolute URLs go over the network. Root-relative URLs (the local origin)
//! have no page origin on the command line, so they are answered from the
//! `[site]` section: a local `root_dir` (file existence) or a `root_url`
//! they are joined onto.

use std::path::PathBuf;
use std::sync::OnceLock;

use async_trait::async_trait;

use crate::config::SiteSectionConfig;
use crate::core::is_root_relative;
use crate::loader::{ElementKind, LoadSignal, Renderer};
use crate::resolver::{Probe, ProbeError};

const USER_AGENT: &str = concat!("multicdn/", env!("CARGO_PKG_VERSION"));

fn shared_client() -> &'static reqwest::Client {
    static CLIENT: OnceLock<reqwest::Client> = OnceLock::new();
    CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default()
    })
}

/// Where a URL is answered.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Remote(url::Url),
    File(PathBuf),
    Unreachable(String),
}

/// [`Probe`] and [`Renderer`] over HTTP and the local site directory.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    root_dir: Option<PathBuf>,
    root_url: Option<url::Url>,
}

impl HttpClient {
    pub fn new(site: &SiteSectionConfig) -> Self {
        Self {
            client: shared_client().clone(),
            root_dir: site.root_dir.clone(),
            root_url: site.root_url(),
        }
    }

    fn locate(&self, url: &str) -> Target {
        if let Some(rest) = url.strip_prefix("//") {
            return parse_remote(&format!("https://{rest}"));
        }

        if !is_root_relative(url) {
            return parse_remote(url);
        }

        if let Some(dir) = &self.root_dir {
            let path = url
                .split(['?', '#'])
                .next()
                .unwrap_or_default()
                .trim_start_matches('/');
            if path.split(['/', '\\']).any(|segment| segment == "..") {
                return Target::Unreachable(format!("`{url}` escapes the site root"));
            }
            return Target::File(dir.join(path));
        }

        match &self.root_url {
            Some(base) => match base.join(url) {
                Ok(url) => Target::Remote(url),
                Err(err) => Target::Unreachable(err.to_string()),
            },
            None => Target::Unreachable(format!(
                "no [site] root_dir or root_url to answer relative `{url}`"
            )),
        }
    }

    async fn head(&self, url: url::Url) -> Result<(), ProbeError> {
        let response = self.client.head(url).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ProbeError::Status(status.as_u16()))
        }
    }

    async fn get(&self, url: url::Url) -> Result<(), ProbeError> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        response.bytes().await?;
        Ok(())
    }
}

fn parse_remote(url: &str) -> Target {
    match url::Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Target::Remote(parsed),
        Ok(parsed) => Target::Unreachable(format!("unsupported scheme `{}`", parsed.scheme())),
        Err(err) => Target::Unreachable(format!("invalid URL `{url}`: {err}")),
    }
}

impl From<reqwest::Error> for ProbeError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::Status(status.as_u16()),
            None => Self::Network(err.to_string()),
        }
    }
}

#[async_trait]
impl Probe for HttpClient {
    async fn probe(&self, url: &str) -> Result<(), ProbeError> {
        match self.locate(url) {
            Target::Remote(url) => self.head(url).await,
            Target::File(path) if path.is_file() => Ok(()),
            Target::File(_) => Err(ProbeError::Status(404)),
            Target::Unreachable(reason) => Err(ProbeError::Network(reason)),
        }
    }
}

#[async_trait]
impl Renderer for HttpClient {
    async fn load(&self, kind: ElementKind, url: &str) -> LoadSignal {
        let result = match self.locate(url) {
            Target::Remote(url) => self.get(url).await,
            Target::File(path) if path.is_file() => Ok(()),
            Target::File(_) => Err(ProbeError::Status(404)),
            Target::Unreachable(reason) => Err(ProbeError::Network(reason)),
        };

        match result {
            Ok(()) => LoadSignal::Loaded,
            Err(err) => {
                crate::debug!("loader"; "{} {} failed: {}", kind.as_str(), url, err);
                LoadSignal::Error
            }
        }
    }
}
