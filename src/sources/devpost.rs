// src/sources/devpost.rs
use async_trait::async_trait;
use scraper::Html;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use super::{
    all_texts, endpoint, first_attr, first_text, names, selector, settle_record, AdapterError,
    SourceContext,
};
use crate::aggregate::{SourceAdapter, SourceResult};

pub const PLATFORM: &str = "Devpost";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Project {
    pub name: String,
    pub link: Option<String>,
    pub description: String,
    pub date: String,
    pub technologies: Vec<String>,
    /// First award listed on the entry, if any.
    pub achievement: Option<String>,
    pub platform: &'static str,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProjectList {
    pub items: Vec<Project>,
    pub total: usize,
}

impl From<Vec<Project>> for ProjectList {
    fn from(items: Vec<Project>) -> Self {
        Self {
            total: items.len(),
            items,
        }
    }
}

/// Parse a Devpost portfolio page. Entries without a title are skipped; a page
/// with no entries is a valid, empty portfolio.
pub fn parse_projects(html: &str) -> Result<ProjectList, AdapterError> {
    let doc = Html::parse_document(html);

    let item_sel = selector(".gallery-item")?;
    let title_sel = selector(".title")?;
    let link_sel = selector(".link-to-software")?;
    let desc_sel = selector(".description")?;
    let date_sel = selector(".date")?;
    let tech_sel = selector(".built-with .cp-tag")?;
    let award_sel = selector(".winner .small-title")?;

    let items = doc
        .select(&item_sel)
        .filter_map(|el| {
            let name = first_text(&el, &title_sel);
            if name.is_empty() {
                return None;
            }
            Some(Project {
                name,
                link: first_attr(&el, &link_sel, "href"),
                description: first_text(&el, &desc_sel),
                date: first_text(&el, &date_sel),
                technologies: all_texts(&el, &tech_sel),
                achievement: all_texts(&el, &award_sel).into_iter().next(),
                platform: PLATFORM,
            })
        })
        .collect::<Vec<_>>();

    Ok(items.into())
}

pub struct DevpostProjects {
    ctx: Arc<SourceContext>,
}

impl DevpostProjects {
    pub fn new(ctx: Arc<SourceContext>) -> Self {
        Self { ctx }
    }

    async fn fetch_record(&self, username: &str) -> Result<ProjectList, AdapterError> {
        let url = endpoint(&self.ctx.upstream.devpost_site, &[username, "projects"])?;
        let html = self.ctx.get_text(url).await?;
        parse_projects(&html)
    }
}

#[async_trait]
impl SourceAdapter for DevpostProjects {
    fn name(&self) -> &'static str {
        names::PROJECTS
    }

    async fn fetch(&self, username: &str) -> SourceResult<Value> {
        settle_record(self.fetch_record(username).await)
    }
}
