// src/aggregate/settle.rs
//! All-settled join: run independent branches together and wait for every one of them.

use futures::future::{join_all, FutureExt};
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use super::types::SourceResult;

pub const TIMEOUT_REASON: &str = "timeout";

/// Drive every branch concurrently. Output order matches input order, whatever
/// order the branches complete in. A branch that panics or exceeds `limit`
/// becomes a `Failure`; the others are unaffected.
pub async fn settle_all<I, F, T>(branches: I, limit: Option<Duration>) -> Vec<SourceResult<T>>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = SourceResult<T>>,
{
    join_all(branches.into_iter().map(|b| settle(b, limit))).await
}

pub async fn settle<F, T>(branch: F, limit: Option<Duration>) -> SourceResult<T>
where
    F: Future<Output = SourceResult<T>>,
{
    let caught = AssertUnwindSafe(branch).catch_unwind();
    let outcome = match limit {
        Some(d) => match tokio::time::timeout(d, caught).await {
            Ok(out) => out,
            Err(_) => return SourceResult::failure(TIMEOUT_REASON),
        },
        None => caught.await,
    };
    outcome.unwrap_or_else(|payload| SourceResult::failure(panic_reason(payload)))
}

fn panic_reason(payload: Box<dyn Any + Send>) -> String {
    let msg = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown".to_string());
    format!("adapter panicked: {msg}")
}
