// src/sources/geeksforgeeks.rs
use async_trait::async_trait;
use scraper::Html;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use super::{
    endpoint, first_attr, first_text, names, selector, settle_record, AdapterError, SourceContext,
};
use crate::aggregate::{SourceAdapter, SourceResult};

pub const PLATFORM: &str = "GeeksforGeeks";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Article {
    pub title: String,
    pub link: Option<String>,
    pub description: String,
    pub date: String,
    pub platform: &'static str,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ArticleList {
    pub items: Vec<Article>,
    pub total: usize,
}

impl From<Vec<Article>> for ArticleList {
    fn from(items: Vec<Article>) -> Self {
        Self {
            total: items.len(),
            items,
        }
    }
}

/// Parse a GeeksforGeeks author page. Relative article links resolve against `site`.
pub fn parse_articles(html: &str, site: &str) -> Result<ArticleList, AdapterError> {
    let doc = Html::parse_document(html);

    let card_sel = selector(".article-card")?;
    let title_sel = selector(".article-title")?;
    let link_sel = selector(".article-title a")?;
    let desc_sel = selector(".article-description")?;
    let date_sel = selector(".article-date")?;

    let items = doc
        .select(&card_sel)
        .filter_map(|el| {
            let title = first_text(&el, &title_sel);
            if title.is_empty() {
                return None;
            }
            Some(Article {
                title,
                link: first_attr(&el, &link_sel, "href").map(|href| absolutize(&href, site)),
                description: first_text(&el, &desc_sel),
                date: first_text(&el, &date_sel),
                platform: PLATFORM,
            })
        })
        .collect::<Vec<_>>();

    Ok(items.into())
}

fn absolutize(href: &str, site: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    let site = site.trim_end_matches('/');
    if href.starts_with('/') {
        format!("{site}{href}")
    } else {
        format!("{site}/{href}")
    }
}

pub struct GfgArticles {
    ctx: Arc<SourceContext>,
}

impl GfgArticles {
    pub fn new(ctx: Arc<SourceContext>) -> Self {
        Self { ctx }
    }

    async fn fetch_record(&self, username: &str) -> Result<ArticleList, AdapterError> {
        let url = endpoint(&self.ctx.upstream.gfg_profile, &[username, "articles"])?;
        let html = self.ctx.get_text(url).await?;
        parse_articles(&html, &self.ctx.upstream.gfg_site)
    }
}

#[async_trait]
impl SourceAdapter for GfgArticles {
    fn name(&self) -> &'static str {
        names::ARTICLES
    }

    async fn fetch(&self, username: &str) -> SourceResult<Value> {
        settle_record(self.fetch_record(username).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SITE: &str = "https://www.geeksforgeeks.org";

    #[test]
    fn relative_links_are_made_absolute() {
        assert_eq!(absolutize("/graph-traversal", SITE), format!("{SITE}/graph-traversal"));
        assert_eq!(absolutize("sorting", SITE), format!("{SITE}/sorting"));
        assert_eq!(absolutize("https://x.org/a", SITE), "https://x.org/a");
    }

    #[test]
    fn card_without_link_keeps_the_article() {
        let html = r#"<div class="article-card"><h3 class="article-title">Heaps</h3></div>"#;
        let list = parse_articles(html, SITE).unwrap();
        assert_eq!(list.total, 1);
        assert_eq!(list.items[0].link, None);
    }
}
