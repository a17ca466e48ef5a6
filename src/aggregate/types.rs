// src/aggregate/types.rs
use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Display;

/// Outcome of a single adapter invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceResult<T> {
    Success(T),
    Failure { reason: String },
}

impl<T> SourceResult<T> {
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }
}

impl<T, E: Display> From<Result<T, E>> for SourceResult<T> {
    fn from(r: Result<T, E>) -> Self {
        match r {
            Ok(v) => Self::Success(v),
            Err(e) => Self::failure(e.to_string()),
        }
    }
}

/// One third-party source. Implementations report every failure through
/// `SourceResult::Failure` and keep no mutable state between calls.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Key under which this source appears in the aggregate.
    fn name(&self) -> &'static str;

    async fn fetch(&self, username: &str) -> SourceResult<Value>;
}

/// The entity being aggregated. The source set comes from the aggregator handling it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateRequest {
    username: String,
}

impl AggregateRequest {
    /// Returns `None` for a blank identifier.
    pub fn new(username: impl Into<String>) -> Option<Self> {
        let username = username.into().trim().to_string();
        (!username.is_empty()).then_some(Self { username })
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}
