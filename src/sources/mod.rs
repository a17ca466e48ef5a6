// src/sources/mod.rs
//! Source adapters: one outbound call per third-party source, normalized into
//! a serializable record or reported as a failure.

pub mod devpost;
pub mod geeksforgeeks;
pub mod leetcode;

use once_cell::sync::OnceCell;
use regex::Regex;
use reqwest::{Client, Url};
use scraper::{ElementRef, Selector};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::aggregate::{Family, SourceAdapter, SourceResult};
use crate::config::UpstreamConfig;

/// Source names as they appear in aggregate responses.
pub mod names {
    pub const PROFILE: &str = "profile";
    pub const BADGES: &str = "badges";
    pub const SOLVED: &str = "solved";
    pub const LANGUAGE_STATS: &str = "languageStats";
    pub const STREAK: &str = "streak";
    pub const PROJECTS: &str = "projects";
    pub const ARTICLES: &str = "articles";
}

#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("upstream returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("unexpected payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("{0}")]
    Missing(&'static str),
    #[error("invalid url: {0}")]
    Url(String),
    #[error("invalid selector: {0}")]
    Selector(String),
}

/// Shared, read-only plumbing handed to every adapter.
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub client: Client,
    pub upstream: UpstreamConfig,
}

impl SourceContext {
    pub fn new(upstream: UpstreamConfig) -> Result<Self, AdapterError> {
        let client = Client::builder().user_agent(&upstream.user_agent).build()?;
        Ok(Self { client, upstream })
    }

    async fn get_text(&self, url: Url) -> Result<String, AdapterError> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(AdapterError::Status(status));
        }
        Ok(resp.text().await?)
    }
}

/// The adapters that make up one family, in response-key order.
pub fn adapters_for(family: Family, ctx: &Arc<SourceContext>) -> Vec<Arc<dyn SourceAdapter>> {
    match family {
        Family::LeetCode => leetcode::adapters(ctx),
        Family::Devpost => vec![Arc::new(devpost::DevpostProjects::new(ctx.clone()))],
        Family::GeeksforGeeks => vec![Arc::new(geeksforgeeks::GfgArticles::new(ctx.clone()))],
    }
}

/// Append path segments to a base URL, escaping each one.
pub(crate) fn endpoint(base: &str, segments: &[&str]) -> Result<Url, AdapterError> {
    let mut url = Url::parse(base).map_err(|e| AdapterError::Url(format!("{base}: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| AdapterError::Url(format!("{base} cannot be a base")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

pub(crate) fn settle_record<T: Serialize>(r: Result<T, AdapterError>) -> SourceResult<Value> {
    r.and_then(|rec| serde_json::to_value(rec).map_err(AdapterError::from))
        .into()
}

pub(crate) fn selector(css: &str) -> Result<Selector, AdapterError> {
    Selector::parse(css).map_err(|e| AdapterError::Selector(format!("{css}: {e:?}")))
}

/// Collapsed text of the first match under `el`, empty when nothing matches.
pub(crate) fn first_text(el: &ElementRef<'_>, sel: &Selector) -> String {
    el.select(sel)
        .next()
        .map(|n| clean_text(&n.text().collect::<String>()))
        .unwrap_or_default()
}

pub(crate) fn first_attr(el: &ElementRef<'_>, sel: &Selector, attr: &str) -> Option<String> {
    el.select(sel)
        .next()
        .and_then(|n| n.value().attr(attr))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub(crate) fn all_texts(el: &ElementRef<'_>, sel: &Selector) -> Vec<String> {
    el.select(sel)
        .map(|n| clean_text(&n.text().collect::<String>()))
        .filter(|t| !t.is_empty())
        .collect()
}

/// Collapse runs of whitespace and trim.
pub fn clean_text(s: &str) -> String {
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    re_ws.replace_all(s, " ").trim().to_string()
}
