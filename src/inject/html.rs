//! Text-level HTML rewrites applied to built pages.
//!
//! Pages are rewritten as strings: the output keeps the author's formatting
//! byte for byte outside the touched spans.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::config::OriginConfig;
use crate::core::{is_root_relative, join_url};

/// `id` of the embedded origin config block.
const CONFIG_BLOCK_ID: &str = "cdn-config";

static CONFIG_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script\b[^>]*\bid="cdn-config"[^>]*>.*?</script>\n?"#)
        .expect("valid config block regex")
});

static HEAD_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</head\s*>").expect("valid head regex"));

static BODY_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<body\b[^>]*>").expect("valid body regex"));

/// Asset reference patterns: `(prefix)(reference)(suffix)`.
static ASSET_REFS: LazyLock<[Regex; 5]> = LazyLock::new(|| {
    [
        r#"(?i)(<script\b[^>]*?\ssrc=")([^"]*)(")"#,
        r#"(?i)(<link\b[^>]*?\brel="stylesheet"[^>]*?\shref=")([^"]*)(")"#,
        r#"(?i)(<link\b[^>]*?\shref=")([^"]*)("[^>]*?\srel="stylesheet")"#,
        r#"(?i)(\sdata-src=")([^"]*)(")"#,
        r#"(?i)(<img\b[^>]*?\ssrc=")([^"]*)(")"#,
    ]
    .map(|pattern| Regex::new(pattern).expect("valid asset regex"))
});

/// Render the config block for a page.
fn config_block(config: &OriginConfig) -> String {
    // `</` inside a script body would close it early.
    let json = config.to_injected_json().replace("</", "<\\/");
    format!("<script id=\"{CONFIG_BLOCK_ID}\" type=\"application/json\">\n{json}\n</script>\n")
}

/// Embed the origin config into a page.
///
/// The block goes right before `</head>`, else right after the opening
/// `<body>` tag, else at the very start. An existing block is replaced, so
/// running this twice yields the same page.
pub fn inject_config(html: &str, config: &OriginConfig) -> String {
    let html = CONFIG_BLOCK.replace_all(html, "");
    let block = config_block(config);

    let at = if let Some(head) = HEAD_CLOSE.find(&html) {
        head.start()
    } else if let Some(body) = BODY_OPEN.find(&html) {
        body.end()
    } else {
        0
    };

    let mut out = String::with_capacity(html.len() + block.len());
    out.push_str(&html[..at]);
    out.push_str(&block);
    out.push_str(&html[at..]);
    out
}

/// Prefix root-relative asset references with `base_url`.
///
/// Covers `<script src>`, `<link rel="stylesheet" href>`, `data-src` and
/// `<img src>`. Absolute, protocol-relative and page-relative references are
/// left alone, as are references already under `base_url`.
pub fn rewrite_asset_paths(html: &str, base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if base.is_empty() {
        return html.to_string();
    }
    let under_base = format!("{base}/");

    let mut out = html.to_string();
    for pattern in ASSET_REFS.iter() {
        out = pattern
            .replace_all(&out, |caps: &Captures| {
                let reference = &caps[2];
                if is_root_relative(reference) && !reference.starts_with(&under_base) {
                    format!("{}{}{}", &caps[1], join_url(base, reference), &caps[3])
                } else {
                    caps[0].to_string()
                }
            })
            .into_owned();
    }
    out
}
