// src/sources/leetcode.rs
//! LeetCode adapters.
//!
//! - `profile`: official GraphQL endpoint (`matchedUser`), difficulty counts summed locally.
//! - `badges`, `solved`, `languageStats`: public REST mirror of the same profile.
//! - `streak`: profile page scrape, the only source for the streak counter.

use async_trait::async_trait;
use scraper::Html;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use super::{
    all_texts, endpoint, names, selector, settle_record, AdapterError, SourceContext,
};
use crate::aggregate::{SourceAdapter, SourceResult};

const PROFILE_QUERY: &str = r#"
query userPublicProfile($username: String!) {
  matchedUser(username: $username) {
    submitStats: submitStatsGlobal {
      acSubmissionNum {
        difficulty
        count
        submissions
      }
    }
    profile {
      ranking
      reputation
      starRating
      userAvatar
    }
  }
}
"#;

pub fn adapters(ctx: &Arc<SourceContext>) -> Vec<Arc<dyn SourceAdapter>> {
    vec![
        Arc::new(ProfileAdapter::new(ctx.clone())),
        Arc::new(BadgesAdapter::new(ctx.clone())),
        Arc::new(SolvedAdapter::new(ctx.clone())),
        Arc::new(LanguageStatsAdapter::new(ctx.clone())),
        Arc::new(StreakAdapter::new(ctx.clone())),
    ]
}

// ------------------------------------------------------------
// Normalized records
// ------------------------------------------------------------

/// Global ranking position, or a label when LeetCode has none to report.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Ranking {
    Position(u64),
    Label(String),
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct ProblemStats {
    pub easy: u32,
    pub medium: u32,
    pub hard: u32,
}

impl ProblemStats {
    pub fn total(&self) -> u32 {
        self.easy + self.medium + self.hard
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeetCodeProfile {
    pub ranking: Ranking,
    pub reputation: i64,
    pub star_rating: Option<f64>,
    pub avatar: Option<String>,
    pub problem_stats: ProblemStats,
    pub total_solved: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Badge {
    pub id: String,
    pub name: String,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BadgeSet {
    pub count: usize,
    pub badges: Vec<Badge>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SolvedCounts {
    pub total: u32,
    pub easy: u32,
    pub medium: u32,
    pub hard: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LanguageCount {
    pub language: String,
    pub solved: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LanguageStats {
    pub languages: Vec<LanguageCount>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Streak {
    pub streak: u32,
    pub badges: Vec<String>,
}

// ------------------------------------------------------------
// Upstream payloads
// ------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GraphQlEnvelope {
    data: Option<GraphQlData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphQlData {
    matched_user: Option<MatchedUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatchedUser {
    submit_stats: SubmitStats,
    profile: UserProfile,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitStats {
    ac_submission_num: Vec<DifficultyCount>,
}

#[derive(Debug, Deserialize)]
struct DifficultyCount {
    difficulty: String,
    count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserProfile {
    ranking: Option<u64>,
    reputation: Option<i64>,
    star_rating: Option<f64>,
    user_avatar: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RestBadges {
    badges_count: Option<usize>,
    badges: Vec<RestBadge>,
}

/// The mirror is inconsistent about badge ids: sometimes strings, sometimes numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BadgeId {
    Text(String),
    Number(u64),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RestBadge {
    id: BadgeId,
    display_name: String,
    icon: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RestSolved {
    solved_problem: u32,
    easy_solved: u32,
    medium_solved: u32,
    hard_solved: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RestLanguageStats {
    matched_user: Option<RestLanguageUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RestLanguageUser {
    language_problem_count: Vec<RestLanguage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RestLanguage {
    language_name: String,
    problems_solved: u32,
}

// ------------------------------------------------------------
// Parsers
// ------------------------------------------------------------

pub fn parse_profile(body: &str) -> Result<LeetCodeProfile, AdapterError> {
    let env: GraphQlEnvelope = serde_json::from_str(body)?;
    let user = env
        .data
        .and_then(|d| d.matched_user)
        .ok_or(AdapterError::Missing("user not found"))?;

    let mut stats = ProblemStats::default();
    for item in &user.submit_stats.ac_submission_num {
        match item.difficulty.to_ascii_lowercase().as_str() {
            "easy" => stats.easy = item.count,
            "medium" => stats.medium = item.count,
            "hard" => stats.hard = item.count,
            _ => {} // "All" is recomputed below
        }
    }

    Ok(LeetCodeProfile {
        ranking: user
            .profile
            .ranking
            .map(Ranking::Position)
            .unwrap_or_else(|| Ranking::Label("Unranked".to_string())),
        reputation: user.profile.reputation.unwrap_or(0),
        star_rating: user.profile.star_rating,
        avatar: user.profile.user_avatar.filter(|a| !a.is_empty()),
        total_solved: stats.total(),
        problem_stats: stats,
    })
}

pub fn parse_badges(body: &str) -> Result<BadgeSet, AdapterError> {
    let raw: RestBadges = serde_json::from_str(body)?;
    let badges: Vec<Badge> = raw
        .badges
        .into_iter()
        .map(|b| Badge {
            id: match b.id {
                BadgeId::Text(s) => s,
                BadgeId::Number(n) => n.to_string(),
            },
            name: b.display_name,
            icon: b.icon.filter(|i| !i.is_empty()),
        })
        .collect();
    Ok(BadgeSet {
        count: raw.badges_count.unwrap_or(badges.len()),
        badges,
    })
}

pub fn parse_solved(body: &str) -> Result<SolvedCounts, AdapterError> {
    let raw: RestSolved = serde_json::from_str(body)?;
    Ok(SolvedCounts {
        total: raw.solved_problem,
        easy: raw.easy_solved,
        medium: raw.medium_solved,
        hard: raw.hard_solved,
    })
}

/// Strips the `matchedUser.languageProblemCount` envelope; most-solved first.
pub fn parse_language_stats(body: &str) -> Result<LanguageStats, AdapterError> {
    let raw: RestLanguageStats = serde_json::from_str(body)?;
    let user = raw
        .matched_user
        .ok_or(AdapterError::Missing("user not found"))?;
    let mut languages: Vec<LanguageCount> = user
        .language_problem_count
        .into_iter()
        .map(|l| LanguageCount {
            language: l.language_name,
            solved: l.problems_solved,
        })
        .collect();
    languages.sort_by(|a, b| b.solved.cmp(&a.solved).then_with(|| a.language.cmp(&b.language)));
    Ok(LanguageStats { languages })
}

pub fn parse_streak(html: &str) -> Result<Streak, AdapterError> {
    let doc = Html::parse_document(html);
    let root = doc.root_element();

    let streak_sel = selector(".streak-count")?;
    let badge_sel = selector(".badge-item")?;

    let streak = root
        .select(&streak_sel)
        .next()
        .map(|n| n.text().collect::<String>())
        .and_then(|t| leading_number(&t))
        .unwrap_or(0);

    Ok(Streak {
        streak,
        badges: all_texts(&root, &badge_sel),
    })
}

/// `"45 days"` → 45; text without a leading number yields `None`.
fn leading_number(s: &str) -> Option<u32> {
    let digits: String = s
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

// ------------------------------------------------------------
// Adapters
// ------------------------------------------------------------

pub struct ProfileAdapter {
    ctx: Arc<SourceContext>,
}

impl ProfileAdapter {
    pub fn new(ctx: Arc<SourceContext>) -> Self {
        Self { ctx }
    }

    async fn fetch_record(&self, username: &str) -> Result<LeetCodeProfile, AdapterError> {
        let body = json!({
            "query": PROFILE_QUERY,
            "variables": { "username": username },
        });
        let resp = self
            .ctx
            .client
            .post(&self.ctx.upstream.leetcode_graphql)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(AdapterError::Status(status));
        }
        parse_profile(&resp.text().await?)
    }
}

#[async_trait]
impl SourceAdapter for ProfileAdapter {
    fn name(&self) -> &'static str {
        names::PROFILE
    }

    async fn fetch(&self, username: &str) -> SourceResult<Value> {
        settle_record(self.fetch_record(username).await)
    }
}

/// The three REST-mirror adapters differ only in path and parser.
macro_rules! rest_adapter {
    ($ty:ident, $name:expr, $parse:ident, $record:ty) => {
        pub struct $ty {
            ctx: Arc<SourceContext>,
        }

        impl $ty {
            pub fn new(ctx: Arc<SourceContext>) -> Self {
                Self { ctx }
            }

            async fn fetch_record(&self, username: &str) -> Result<$record, AdapterError> {
                let url = rest_url(&self.ctx.upstream.leetcode_rest, $name, username)?;
                let body = self.ctx.get_text(url).await?;
                $parse(&body)
            }
        }

        #[async_trait]
        impl SourceAdapter for $ty {
            fn name(&self) -> &'static str {
                $name
            }

            async fn fetch(&self, username: &str) -> SourceResult<Value> {
                settle_record(self.fetch_record(username).await)
            }
        }
    };
}

rest_adapter!(BadgesAdapter, names::BADGES, parse_badges, BadgeSet);
rest_adapter!(SolvedAdapter, names::SOLVED, parse_solved, SolvedCounts);
rest_adapter!(
    LanguageStatsAdapter,
    names::LANGUAGE_STATS,
    parse_language_stats,
    LanguageStats
);

fn rest_url(base: &str, source: &str, username: &str) -> Result<reqwest::Url, AdapterError> {
    if source == names::LANGUAGE_STATS {
        let mut url = endpoint(base, &["languageStats"])?;
        url.query_pairs_mut().append_pair("username", username);
        return Ok(url);
    }
    endpoint(base, &[username, source])
}

pub struct StreakAdapter {
    ctx: Arc<SourceContext>,
}

impl StreakAdapter {
    pub fn new(ctx: Arc<SourceContext>) -> Self {
        Self { ctx }
    }

    async fn fetch_record(&self, username: &str) -> Result<Streak, AdapterError> {
        let url = endpoint(&self.ctx.upstream.leetcode_site, &[username, ""])?;
        let html = self.ctx.get_text(url).await?;
        parse_streak(&html)
    }
}

#[async_trait]
impl SourceAdapter for StreakAdapter {
    fn name(&self) -> &'static str {
        names::STREAK
    }

    async fn fetch(&self, username: &str) -> SourceResult<Value> {
        settle_record(self.fetch_record(username).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_sums_difficulties_and_ignores_all_bucket() {
        let body = r#"{"data":{"matchedUser":{
            "username":"ts",
            "submitStats":{"acSubmissionNum":[
                {"difficulty":"All","count":999,"submissions":1},
                {"difficulty":"Easy","count":10,"submissions":1},
                {"difficulty":"Medium","count":5,"submissions":1},
                {"difficulty":"Hard","count":2,"submissions":1}]},
            "profile":{"ranking":12345,"reputation":3,"starRating":2.5,"userAvatar":""}}}}"#;
        let p = parse_profile(body).unwrap();
        assert_eq!(p.total_solved, 17);
        assert_eq!(p.ranking, Ranking::Position(12345));
        assert_eq!(p.avatar, None);
    }

    #[test]
    fn profile_without_matched_user_is_missing() {
        let err = parse_profile(r#"{"data":{"matchedUser":null}}"#).unwrap_err();
        assert!(matches!(err, AdapterError::Missing(_)));
    }

    #[test]
    fn solved_requires_all_counts() {
        assert!(parse_solved(r#"{"solvedProblem":3,"easySolved":3}"#).is_err());
    }

    #[test]
    fn badge_ids_accept_numbers() {
        let b = parse_badges(r#"{"badges":[{"id":42,"displayName":"50 Days","icon":null}]}"#)
            .unwrap();
        assert_eq!(b.count, 1);
        assert_eq!(b.badges[0].id, "42");
    }

    #[test]
    fn streak_text_without_digits_reads_as_zero() {
        let s = parse_streak(r#"<div class="streak-count">n/a</div>"#).unwrap();
        assert_eq!(s.streak, 0);
        assert!(s.badges.is_empty());
    }

    #[test]
    fn rest_urls_follow_mirror_layout() {
        let base = "https://mirror.example";
        assert_eq!(
            rest_url(base, names::BADGES, "ts").unwrap().as_str(),
            "https://mirror.example/ts/badges"
        );
        assert_eq!(
            rest_url(base, names::LANGUAGE_STATS, "ts").unwrap().as_str(),
            "https://mirror.example/languageStats?username=ts"
        );
    }
}
