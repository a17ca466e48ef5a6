// src/aggregate/fallback.rs
//! Static substitutes served in place of a failed source.
//!
//! Each record variant is tied to exactly one source name, so a substitute can
//! never be filed under the wrong key or carry the wrong shape.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::sources::devpost::{self, Project, ProjectList};
use crate::sources::geeksforgeeks::{self, Article, ArticleList};
use crate::sources::leetcode::{
    Badge, BadgeSet, LanguageCount, LanguageStats, LeetCodeProfile, ProblemStats, Ranking,
    SolvedCounts, Streak,
};
use crate::sources::names;

/// Bump when any substitute's content or shape changes.
pub const FALLBACK_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum FallbackRecord {
    Profile(LeetCodeProfile),
    Badges(BadgeSet),
    Solved(SolvedCounts),
    LanguageStats(LanguageStats),
    Streak(Streak),
    Projects(ProjectList),
    Articles(ArticleList),
}

impl FallbackRecord {
    pub fn source(&self) -> &'static str {
        match self {
            Self::Profile(_) => names::PROFILE,
            Self::Badges(_) => names::BADGES,
            Self::Solved(_) => names::SOLVED,
            Self::LanguageStats(_) => names::LANGUAGE_STATS,
            Self::Streak(_) => names::STREAK,
            Self::Projects(_) => names::PROJECTS,
            Self::Articles(_) => names::ARTICLES,
        }
    }
}

#[derive(Debug)]
pub struct FallbackTable {
    pub version: u32,
    entries: BTreeMap<&'static str, FallbackRecord>,
}

impl FallbackTable {
    fn from_records(records: Vec<FallbackRecord>) -> Self {
        let entries = records.into_iter().map(|r| (r.source(), r)).collect();
        Self {
            version: FALLBACK_VERSION,
            entries,
        }
    }

    pub fn get(&self, source: &str) -> Option<&FallbackRecord> {
        self.entries.get(source)
    }

    pub fn sources(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }
}

static TABLE: Lazy<FallbackTable> = Lazy::new(|| FallbackTable::from_records(builtin_records()));

pub fn table() -> &'static FallbackTable {
    &TABLE
}

/// Same record for the same name on every call.
pub fn fallback_for(source: &str) -> Option<&'static FallbackRecord> {
    TABLE.get(source)
}

fn builtin_records() -> Vec<FallbackRecord> {
    let problem_stats = ProblemStats {
        easy: 100,
        medium: 120,
        hard: 30,
    };
    let badge_names = ["Dynamic Programming", "Graph Theory", "Database"];

    vec![
        FallbackRecord::Profile(LeetCodeProfile {
            ranking: Ranking::Label("Top 10%".to_string()),
            reputation: 0,
            star_rating: None,
            avatar: None,
            total_solved: problem_stats.total(),
            problem_stats: problem_stats.clone(),
        }),
        FallbackRecord::Badges(BadgeSet {
            count: badge_names.len(),
            badges: badge_names
                .iter()
                .enumerate()
                .map(|(i, n)| Badge {
                    id: format!("fallback-{i}"),
                    name: n.to_string(),
                    icon: None,
                })
                .collect(),
        }),
        FallbackRecord::Solved(SolvedCounts {
            total: problem_stats.total(),
            easy: problem_stats.easy,
            medium: problem_stats.medium,
            hard: problem_stats.hard,
        }),
        FallbackRecord::LanguageStats(LanguageStats {
            languages: vec![
                LanguageCount {
                    language: "C++".to_string(),
                    solved: 150,
                },
                LanguageCount {
                    language: "Python3".to_string(),
                    solved: 70,
                },
                LanguageCount {
                    language: "MySQL".to_string(),
                    solved: 30,
                },
            ],
        }),
        FallbackRecord::Streak(Streak {
            streak: 45,
            badges: badge_names.iter().map(|n| n.to_string()).collect(),
        }),
        FallbackRecord::Projects(
            vec![Project {
                name: "Sample Hackathon 2025".to_string(),
                link: Some("https://devpost.com/software/ecotrack".to_string()),
                description: "Built a sustainability tracking application that helps users monitor their carbon footprint".to_string(),
                date: "March 2025".to_string(),
                technologies: vec!["React".into(), "Node.js".into(), "MongoDB".into()],
                achievement: Some("Top 10 Finalist".to_string()),
                platform: devpost::PLATFORM,
            }]
            .into(),
        ),
        FallbackRecord::Articles(
            vec![
                Article {
                    title: "Understanding Time Complexity in Sorting Algorithms".to_string(),
                    link: Some(
                        "https://www.geeksforgeeks.org/sorting-algorithms-time-complexity"
                            .to_string(),
                    ),
                    description: "A comprehensive guide to analyzing and comparing time complexities of common sorting algorithms".to_string(),
                    date: "January 2025".to_string(),
                    platform: geeksforgeeks::PLATFORM,
                },
                Article {
                    title: "Implementing Efficient Graph Traversal Algorithms".to_string(),
                    link: Some("https://www.geeksforgeeks.org/graph-traversal-algorithms".to_string()),
                    description: "Step-by-step guide to implementing BFS and DFS with practical applications".to_string(),
                    date: "November 2024".to_string(),
                    platform: geeksforgeeks::PLATFORM,
                },
            ]
            .into(),
        ),
    ]
}
