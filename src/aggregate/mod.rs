// src/aggregate/mod.rs
//! Resilient multi-source aggregation.
//!
//! An [`Aggregator`] owns the adapters of one [`Family`]. Each call fans out to
//! all of them at once, waits for every outcome, and folds the results into an
//! [`AggregateResponse`] keyed by source name. Failed sources are replaced by
//! their entry in the fallback table, so the response always carries every key.

pub mod fallback;
pub mod settle;
pub mod types;

pub use settle::{settle, settle_all, TIMEOUT_REASON};
pub use types::{AggregateRequest, SourceAdapter, SourceResult};

use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::sources::names;

/// A logical entity type and the fixed set of sources queried for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    LeetCode,
    Devpost,
    GeeksforGeeks,
}

impl Family {
    pub const ALL: [Family; 3] = [Family::LeetCode, Family::Devpost, Family::GeeksforGeeks];

    pub fn sources(&self) -> &'static [&'static str] {
        match self {
            Family::LeetCode => &[
                names::PROFILE,
                names::BADGES,
                names::SOLVED,
                names::LANGUAGE_STATS,
                names::STREAK,
            ],
            Family::Devpost => &[names::PROJECTS],
            Family::GeeksforGeeks => &[names::ARTICLES],
        }
    }

    /// Metric/log label.
    pub fn label(&self) -> &'static str {
        match self {
            Family::LeetCode => "leetcode",
            Family::Devpost => "devpost",
            Family::GeeksforGeeks => "geeksforgeeks",
        }
    }

    /// Human-facing name, as used in error bodies.
    pub fn display_name(&self) -> &'static str {
        match self {
            Family::LeetCode => "LeetCode",
            Family::Devpost => "Devpost",
            Family::GeeksforGeeks => "GeeksforGeeks",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    #[error("identifier must not be empty")]
    EmptyIdentifier,
    #[error("{family:?}: no adapter for source '{name}'")]
    MissingAdapter { family: Family, name: &'static str },
    #[error("{family:?}: adapter '{name}' is not part of this family")]
    UnexpectedAdapter { family: Family, name: &'static str },
    #[error("{family:?}: adapter '{name}' registered twice")]
    DuplicateAdapter { family: Family, name: &'static str },
    #[error("no fallback record for source '{0}'")]
    MissingFallback(&'static str),
    #[error("serializing fallback for '{name}': {err}")]
    Fallback {
        name: &'static str,
        #[source]
        err: serde_json::Error,
    },
}

/// Merged view of one aggregation. Serializes with sorted source keys, so equal
/// outcomes always yield equal bytes apart from `lastUpdated`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResponse {
    pub username: String,
    #[serde(flatten)]
    pub sources: BTreeMap<&'static str, Value>,
    pub is_fallback: BTreeMap<&'static str, bool>,
    pub last_updated: DateTime<Utc>,
    /// Set only when every source fell back.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AggregateResponse {
    pub fn fallback_count(&self) -> usize {
        self.is_fallback.values().filter(|f| **f).count()
    }
}

pub struct Aggregator {
    family: Family,
    adapters: Vec<Arc<dyn SourceAdapter>>,
    timeout: Option<Duration>,
}

impl Aggregator {
    /// The adapter set must cover the family's sources exactly, and each source
    /// needs a fallback record.
    pub fn new(
        family: Family,
        adapters: Vec<Arc<dyn SourceAdapter>>,
    ) -> Result<Self, AggregateError> {
        let expected: BTreeSet<&'static str> = family.sources().iter().copied().collect();
        let mut seen = BTreeSet::new();

        for a in &adapters {
            let name = a.name();
            if !expected.contains(name) {
                return Err(AggregateError::UnexpectedAdapter { family, name });
            }
            if !seen.insert(name) {
                return Err(AggregateError::DuplicateAdapter { family, name });
            }
        }
        if let Some(name) = expected.difference(&seen).next() {
            return Err(AggregateError::MissingAdapter {
                family,
                name: *name,
            });
        }
        for source in &expected {
            if fallback::fallback_for(source).is_none() {
                return Err(AggregateError::MissingFallback(*source));
            }
        }

        Ok(Self {
            family,
            adapters,
            timeout: None,
        })
    }

    /// Per-adapter bound; an adapter that exceeds it resolves to `Failure("timeout")`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub async fn aggregate(
        &self,
        req: &AggregateRequest,
    ) -> Result<AggregateResponse, AggregateError> {
        let family = self.family.label();
        let t0 = Instant::now();
        counter!("aggregate_requests_total", "family" => family).increment(1);

        let outcomes = settle_all(
            self.adapters.iter().map(|a| a.fetch(req.username())),
            self.timeout,
        )
        .await;

        let mut sources = BTreeMap::new();
        let mut is_fallback = BTreeMap::new();
        let mut failed = 0usize;

        for (adapter, outcome) in self.adapters.iter().zip(outcomes) {
            let source = adapter.name();
            let value = match outcome {
                SourceResult::Success(v) => {
                    debug!(family, source, "source ok");
                    is_fallback.insert(source, false);
                    v
                }
                SourceResult::Failure { reason } => {
                    failed += 1;
                    warn!(family, source, %reason, "source failed; serving fallback");
                    counter!("aggregate_source_failures_total", "source" => source).increment(1);

                    let record = fallback::fallback_for(source)
                        .ok_or(AggregateError::MissingFallback(source))?;
                    is_fallback.insert(source, true);
                    serde_json::to_value(record)
                        .map_err(|err| AggregateError::Fallback { name: source, err })?
                }
            };
            sources.insert(source, value);
        }

        let error = (failed == self.adapters.len()).then(|| {
            counter!("aggregate_total_failures_total", "family" => family).increment(1);
            format!(
                "Failed to fetch {} data: all sources unavailable",
                self.family.display_name()
            )
        });

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("aggregate_duration_ms", "family" => family).record(ms);
        debug!(family, failed, elapsed_ms = ms, "aggregation done");

        Ok(AggregateResponse {
            username: req.username().to_string(),
            sources,
            is_fallback,
            last_updated: Utc::now(),
            error,
        })
    }
}
