// tests/common/mod.rs
//
// Shared stubs for the integration tests: scripted adapters and a recording mail transport.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use portfolio_api::aggregate::{Aggregator, Family, SourceAdapter, SourceResult};
use portfolio_api::config::AppConfig;
use portfolio_api::contact::{MailTransport, OutgoingMail};
use portfolio_api::AppState;
use serde_json::{json, Value};

#[derive(Clone)]
pub enum Script {
    Ok(Value),
    Fail(&'static str),
    Panic,
    Hang,
}

/// Adapter that replays a fixed outcome after an optional delay.
pub struct StubAdapter {
    pub name: &'static str,
    pub script: Script,
    pub delay: Duration,
    pub calls: Arc<AtomicUsize>,
}

impl StubAdapter {
    pub fn new(name: &'static str, script: Script) -> Self {
        Self {
            name,
            script,
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn delayed(mut self, ms: u64) -> Self {
        self.delay = Duration::from_millis(ms);
        self
    }
}

#[async_trait]
impl SourceAdapter for StubAdapter {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn fetch(&self, username: &str) -> SourceResult<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.script {
            Script::Ok(v) => {
                let mut v = v.clone();
                if let Some(obj) = v.as_object_mut() {
                    obj.insert("requestedFor".into(), json!(username));
                }
                SourceResult::Success(v)
            }
            Script::Fail(reason) => SourceResult::failure(*reason),
            Script::Panic => panic!("stub adapter {} exploded", self.name),
            Script::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        }
    }
}

pub fn live_value(source: &str) -> Value {
    json!({ "live": source })
}

/// Build an aggregator whose every source follows `script_for`.
pub fn aggregator_with<F>(family: Family, script_for: F) -> Aggregator
where
    F: Fn(&'static str) -> Script,
{
    let adapters: Vec<Arc<dyn SourceAdapter>> = family
        .sources()
        .iter()
        .map(|&name| Arc::new(StubAdapter::new(name, script_for(name))) as Arc<dyn SourceAdapter>)
        .collect();
    Aggregator::new(family, adapters).expect("stub adapters cover the family")
}

pub fn all_live(family: Family) -> Aggregator {
    aggregator_with(family, |name| Script::Ok(live_value(name)))
}

/// Mail transport that records what it was asked to send.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<OutgoingMail>>,
    pub fail_with: Option<&'static str>,
}

impl RecordingMailer {
    pub fn failing(reason: &'static str) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_with: Some(reason),
        }
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl MailTransport for RecordingMailer {
    async fn send(&self, mail: OutgoingMail) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(mail);
        match self.fail_with {
            Some(reason) => Err(anyhow::anyhow!(reason)),
            None => Ok(()),
        }
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

pub fn state_with(
    config: AppConfig,
    aggregators: Vec<Aggregator>,
    mailer: Arc<RecordingMailer>,
) -> AppState {
    AppState::new(config, aggregators, mailer).expect("one aggregator per family")
}

pub fn live_state(mailer: Arc<RecordingMailer>) -> AppState {
    state_with(
        AppConfig::default(),
        Family::ALL.iter().map(|&f| all_live(f)).collect(),
        mailer,
    )
}
