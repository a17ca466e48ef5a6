// tests/aggregate_isolation.rs
//
// Aggregator contract, driven through scripted adapters (no network).
//
// Covered:
// - every family key is present for all-success, all-failure and mixed outcomes
// - failed sources carry their fallback record and isFallback=true
// - completion order does not change the serialized response
// - a panicking or hanging adapter does not hide the others' results
// - adapters run concurrently
// - construction rejects adapter sets that don't match the family

mod common;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{aggregator_with, live_value, Script, StubAdapter};
use portfolio_api::aggregate::fallback::fallback_for;
use portfolio_api::aggregate::{
    AggregateError, AggregateRequest, Aggregator, Family, SourceAdapter, SourceResult,
};
use serde_json::Value;
use tokio::sync::Barrier;

fn req() -> AggregateRequest {
    AggregateRequest::new("tushar-singh").unwrap()
}

fn keys(resp: &portfolio_api::AggregateResponse) -> BTreeSet<&'static str> {
    resp.sources.keys().copied().collect()
}

fn expected_keys(family: Family) -> BTreeSet<&'static str> {
    family.sources().iter().copied().collect()
}

fn fallback_value(source: &str) -> Value {
    serde_json::to_value(fallback_for(source).unwrap()).unwrap()
}

/// Serialized response minus the timestamp.
fn stable_json(resp: &portfolio_api::AggregateResponse) -> String {
    let mut v = serde_json::to_value(resp).unwrap();
    v.as_object_mut().unwrap().remove("lastUpdated");
    serde_json::to_string(&v).unwrap()
}

#[tokio::test]
async fn all_sources_succeed() {
    let agg = aggregator_with(Family::LeetCode, |n| Script::Ok(live_value(n)));
    let resp = agg.aggregate(&req()).await.unwrap();

    assert_eq!(keys(&resp), expected_keys(Family::LeetCode));
    assert_eq!(resp.fallback_count(), 0);
    assert!(resp.error.is_none());
    assert_eq!(resp.sources["badges"]["live"], "badges");
    assert_eq!(resp.sources["badges"]["requestedFor"], "tushar-singh");
}

#[tokio::test]
async fn all_sources_fail_still_fully_shaped() {
    for family in Family::ALL {
        let agg = aggregator_with(family, |_| Script::Fail("status 503"));
        let resp = agg.aggregate(&req()).await.unwrap();

        assert_eq!(keys(&resp), expected_keys(family), "{family:?}");
        for source in family.sources() {
            assert_eq!(resp.sources[source], fallback_value(source));
            assert_eq!(resp.is_fallback[source], true);
        }
        let err = resp.error.as_deref().expect("total failure sets error");
        assert!(err.contains(family.display_name()));
    }
}

#[tokio::test]
async fn mixed_outcomes_substitute_only_the_failures() {
    let agg = aggregator_with(Family::LeetCode, |n| match n {
        "solved" | "streak" => Script::Fail("boom"),
        other => Script::Ok(live_value(other)),
    });
    let resp = agg.aggregate(&req()).await.unwrap();

    assert_eq!(keys(&resp), expected_keys(Family::LeetCode));
    assert!(resp.error.is_none(), "partial failure must not set error");

    assert_eq!(resp.sources["solved"], fallback_value("solved"));
    assert!(resp.is_fallback["solved"]);
    assert_eq!(resp.sources["streak"], fallback_value("streak"));
    assert!(resp.is_fallback["streak"]);

    assert_eq!(resp.sources["profile"]["live"], "profile");
    assert!(!resp.is_fallback["profile"]);
    assert_eq!(resp.fallback_count(), 2);
}

#[tokio::test]
async fn completion_order_does_not_change_output() {
    let script = |n: &'static str| match n {
        "badges" => Script::Fail("nope"),
        other => Script::Ok(live_value(other)),
    };

    // Same outcomes, opposite finishing orders.
    let build = |delays: [u64; 5]| {
        let adapters: Vec<Arc<dyn SourceAdapter>> = Family::LeetCode
            .sources()
            .iter()
            .zip(delays)
            .map(|(&n, d)| Arc::new(StubAdapter::new(n, script(n)).delayed(d)) as Arc<dyn SourceAdapter>)
            .collect();
        Aggregator::new(Family::LeetCode, adapters).unwrap()
    };

    let forward = build([1, 5, 10, 15, 20]).aggregate(&req()).await.unwrap();
    let backward = build([20, 15, 10, 5, 1]).aggregate(&req()).await.unwrap();

    assert_eq!(stable_json(&forward), stable_json(&backward));
}

#[tokio::test]
async fn panicking_adapter_is_isolated() {
    let agg = aggregator_with(Family::LeetCode, |n| match n {
        "profile" => Script::Panic,
        other => Script::Ok(live_value(other)),
    });
    let resp = agg.aggregate(&req()).await.unwrap();

    assert!(resp.is_fallback["profile"]);
    assert_eq!(resp.sources["profile"], fallback_value("profile"));
    for n in ["badges", "solved", "languageStats", "streak"] {
        assert_eq!(resp.sources[n]["live"], n, "{n} should be live");
    }
}

#[tokio::test(start_paused = true)]
async fn hanging_adapter_times_out_into_fallback() {
    let agg = aggregator_with(Family::LeetCode, |n| match n {
        "languageStats" => Script::Hang,
        other => Script::Ok(live_value(other)),
    })
    .with_timeout(Duration::from_secs(5));
    let resp = agg.aggregate(&req()).await.unwrap();

    assert!(resp.is_fallback["languageStats"]);
    assert_eq!(resp.fallback_count(), 1);
}

/// Every adapter waits until all of them have started; a sequential
/// aggregator would never get past the first one.
struct RendezvousAdapter {
    name: &'static str,
    barrier: Arc<Barrier>,
}

#[async_trait]
impl SourceAdapter for RendezvousAdapter {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn fetch(&self, _username: &str) -> SourceResult<Value> {
        self.barrier.wait().await;
        SourceResult::Success(live_value(self.name))
    }
}

#[tokio::test]
async fn adapters_are_started_together() {
    let sources = Family::LeetCode.sources();
    let barrier = Arc::new(Barrier::new(sources.len()));
    let adapters: Vec<Arc<dyn SourceAdapter>> = sources
        .iter()
        .map(|&name| {
            Arc::new(RendezvousAdapter {
                name,
                barrier: barrier.clone(),
            }) as Arc<dyn SourceAdapter>
        })
        .collect();
    let agg = Aggregator::new(Family::LeetCode, adapters).unwrap();

    let resp = tokio::time::timeout(Duration::from_secs(2), agg.aggregate(&req()))
        .await
        .expect("adapters must run concurrently")
        .unwrap();
    assert_eq!(resp.fallback_count(), 0);
}

#[test]
fn construction_rejects_incomplete_adapter_sets() {
    let missing: Vec<Arc<dyn SourceAdapter>> =
        vec![Arc::new(StubAdapter::new("profile", Script::Fail("x")))];
    assert!(matches!(
        Aggregator::new(Family::LeetCode, missing),
        Err(AggregateError::MissingAdapter { .. })
    ));

    let foreign: Vec<Arc<dyn SourceAdapter>> =
        vec![Arc::new(StubAdapter::new("articles", Script::Fail("x")))];
    assert!(matches!(
        Aggregator::new(Family::Devpost, foreign),
        Err(AggregateError::UnexpectedAdapter { .. })
    ));

    let twice: Vec<Arc<dyn SourceAdapter>> = vec![
        Arc::new(StubAdapter::new("projects", Script::Fail("x"))),
        Arc::new(StubAdapter::new("projects", Script::Fail("x"))),
    ];
    assert!(matches!(
        Aggregator::new(Family::Devpost, twice),
        Err(AggregateError::DuplicateAdapter { .. })
    ));
}
