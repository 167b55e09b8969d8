//! The crawl engine.
//!
//! An [`Engine`] owns the request queue and the record store and drives them
//! with two background loops started by [`Engine::run`]:
//!
//! - the request loop walks the active half of the queue one request at a time,
//!   fetching, parsing and pacing;
//! - the flush loop periodically hands the active half of the store to the sink.
//!
//! With `auto_stop` enabled a third task watches both structures and stops the
//! engine once they are seen empty on two consecutive checks.

mod flush_loop;
mod request_loop;
mod state;

pub use flush_loop::FlushSummary;
pub use state::EngineState;

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::CrawlError;
use crate::fetch::{Fetcher, Pacer};
use crate::observability::{CrawlStats, StatsSnapshot};
use crate::queue::{RecordStore, RequestQueue};
use crate::rules::{Request, Rule, RuleRegistry, normalize_rule_name};
use crate::sink::{LogSink, Sink};

pub struct Engine {
    name: String,
    default_method: String,
    default_timeout: Duration,
    flush_interval: Duration,
    liveness_interval: Duration,
    idle_poll: Duration,
    auto_stop: bool,
    rules: RwLock<RuleRegistry>,
    requests: RequestQueue,
    records: RecordStore,
    fetcher: Fetcher,
    pacer: Pacer,
    sink: Arc<dyn Sink>,
    stats: CrawlStats,
    state: watch::Sender<EngineState>,
    cancel: CancellationToken,
}

impl Engine {
    /// Engine whose records go to a [`LogSink`]
    pub fn new(config: Config) -> Result<Self, CrawlError> {
        let sink = Arc::new(LogSink::new(config.crawler.name.clone()));
        Self::with_sink(config, sink)
    }

    pub fn with_sink(config: Config, sink: Arc<dyn Sink>) -> Result<Self, CrawlError> {
        config.validate()?;

        let crawler = &config.crawler;
        // Distinct streams for pacing and user-agent choice, both reproducible
        let fetcher = Fetcher::new(&config.http, crawler.seed.map(|s| s.wrapping_add(1)))?;
        let pacer = Pacer::new(crawler.pause(), crawler.seed);
        let (state, _) = watch::channel(EngineState::Idle);

        Ok(Self {
            name: crawler.name.clone(),
            default_method: crawler.default_method.to_uppercase(),
            default_timeout: config.http.default_timeout.as_duration(),
            flush_interval: crawler.flush_interval.as_duration(),
            liveness_interval: crawler.liveness_interval.as_duration(),
            idle_poll: crawler.idle_poll.as_duration(),
            auto_stop: crawler.auto_stop,
            rules: RwLock::new(RuleRegistry::new()),
            requests: RequestQueue::new(),
            records: RecordStore::new(),
            fetcher,
            pacer,
            sink,
            stats: CrawlStats::new(),
            state,
            cancel: CancellationToken::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a rule; names are case-insensitive and a later rule replaces an earlier one
    pub fn add_rule(&self, name: &str, rule: Rule) {
        if self.rules.write().register(name, rule).is_some() {
            warn!(crawler = %self.name, rule = %normalize_rule_name(name), "Rule replaced");
        }
    }

    pub fn has_rule(&self, name: &str) -> bool {
        self.rules.read().has_rule(name)
    }

    /// Queue a request for a later pass.
    ///
    /// A missing target is logged but the request is still queued. Empty method
    /// and rule fall back to the configured default method and `"default"`.
    pub fn enqueue(&self, mut request: Request) {
        if request.target.is_empty() {
            warn!(crawler = %self.name, rule = %request.rule, "Request has no target");
        }
        if request.method.is_empty() {
            request.method = self.default_method.clone();
        }
        request.rule = normalize_rule_name(&request.rule);

        self.requests.push(request);
        self.stats.request_enqueued();
    }

    /// Append a serializable record to collection `name`
    pub fn record<T: Serialize>(&self, name: &str, value: T) -> Result<(), CrawlError> {
        let value = serde_json::to_value(value)?;
        self.record_value(name, value);
        Ok(())
    }

    pub fn record_value(&self, name: &str, value: Value) {
        self.records.append(name, value);
        self.stats.record_added();
    }

    /// Requests not yet completed, including the ones being processed
    pub fn pending_requests(&self) -> usize {
        self.requests.len()
    }

    /// Records not yet accepted by the sink, including an in-flight flush
    pub fn pending_records(&self) -> usize {
        self.records.len()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn state(&self) -> EngineState {
        *self.state.borrow()
    }

    /// Watch lifecycle transitions
    pub fn subscribe_state(&self) -> watch::Receiver<EngineState> {
        self.state.subscribe()
    }

    /// Ask both loops to stop; the flush loop still drains once
    pub fn shutdown(&self) {
        if !self.cancel.is_cancelled() {
            info!(crawler = %self.name, "Shutdown requested");
            self.cancel.cancel();
        }
    }

    /// Run the request and flush loops until shutdown or auto-stop
    pub async fn run(self: Arc<Self>) -> Result<(), CrawlError> {
        let mut started = false;
        self.state.send_if_modified(|state| {
            if *state == EngineState::Idle {
                *state = EngineState::Running;
                started = true;
            }
            started
        });
        if !started {
            return Err(CrawlError::AlreadyStarted(self.state()));
        }

        info!(
            crawler = %self.name,
            rules = self.rules.read().len(),
            pending = self.pending_requests(),
            auto_stop = self.auto_stop,
            "Engine started"
        );

        let request_loop = tokio::spawn(Arc::clone(&self).request_loop());
        let flush_loop = tokio::spawn(Arc::clone(&self).flush_loop());
        let liveness = self
            .auto_stop
            .then(|| tokio::spawn(Arc::clone(&self).liveness_loop()));

        let requests = request_loop.await;
        // Whatever ended the request loop ends the rest too
        self.cancel.cancel();
        self.state.send_replace(EngineState::Draining);

        let flushes = flush_loop.await;
        if let Some(liveness) = liveness {
            let _ = liveness.await;
        }
        self.state.send_replace(EngineState::Stopped);

        let stats = self.stats();
        info!(
            crawler = %self.name,
            completed = stats.requests_completed,
            pending_requests = self.pending_requests(),
            flushed = stats.records_flushed,
            pending_records = self.pending_records(),
            "Engine stopped"
        );

        requests?;
        flushes?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{FlushReport, FnSink};
    use crate::queue::Collections;
    use serde_json::json;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.crawler.pause_range = vec![0];
        config.crawler.seed = Some(1);
        config
    }

    #[test]
    fn test_enqueue_fills_defaults() {
        let mut config = test_config();
        config.crawler.default_method = "post".to_string();
        let engine = Engine::new(config).unwrap();

        engine.enqueue(Request::new("http://localhost/a"));
        engine.enqueue(Request::new("http://localhost/b").with_rule("Leaf").with_method("PUT"));
        engine.enqueue(Request::new(""));

        let pass = engine.requests.begin_pass();
        let summary: Vec<(&str, &str)> = pass
            .requests
            .iter()
            .map(|r| (r.method.as_str(), r.rule.as_str()))
            .collect();
        assert_eq!(summary, vec![("POST", "default"), ("PUT", "leaf"), ("POST", "default")]);
        assert_eq!(engine.pending_requests(), 3);
        assert_eq!(engine.stats().requests_enqueued, 3);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = test_config();
        config.http.user_agents.clear();
        assert!(matches!(Engine::new(config), Err(CrawlError::Config(_))));
    }

    #[test]
    fn test_add_rule_case_insensitive() {
        let engine = Engine::new(test_config()).unwrap();
        engine.add_rule("Repository", Rule::new());
        assert!(engine.has_rule("repository"));
        assert!(!engine.has_rule("default"));
    }

    #[tokio::test]
    async fn test_partial_flush_failure_keeps_collection() {
        let sink = FnSink::new(|collections: &Collections| -> FlushReport {
            collections
                .keys()
                .map(|name| (name.clone(), name == "a"))
                .collect()
        });
        let engine = Engine::with_sink(test_config(), Arc::new(sink)).unwrap();

        engine.record("a", json!({"id": 1})).unwrap();
        engine.record("b", json!({"id": 2})).unwrap();
        engine.record("b", json!({"id": 3})).unwrap();

        let summary = engine.flush_now().await;
        assert_eq!(summary.flushed, vec!["a".to_string()]);
        assert_eq!(summary.retained, vec!["b".to_string()]);
        assert_eq!(summary.flushed_records, 1);
        assert_eq!(engine.pending_records(), 2);

        engine.record("b", json!({"id": 4})).unwrap();
        let (_, collections) = engine.records.begin_flush();
        assert!(!collections.contains_key("a"));
        assert_eq!(
            collections["b"],
            vec![json!({"id": 2}), json!({"id": 3}), json!({"id": 4})]
        );
    }

    #[tokio::test]
    async fn test_missing_report_entry_counts_as_failure() {
        let sink = FnSink::new(|_: &Collections| FlushReport::new());
        let engine = Engine::with_sink(test_config(), Arc::new(sink)).unwrap();

        engine.record("items", "x").unwrap();
        let summary = engine.flush_now().await;

        assert!(summary.flushed.is_empty());
        assert_eq!(summary.retained, vec!["items".to_string()]);
        assert_eq!(engine.pending_records(), 1);
        assert_eq!(engine.stats().flush_failures, 1);
    }

    #[tokio::test]
    async fn test_run_twice_rejected() {
        let engine = Arc::new(Engine::new(test_config()).unwrap());
        assert_eq!(engine.state(), EngineState::Idle);

        engine.shutdown();
        engine.clone().run().await.unwrap();
        assert_eq!(engine.state(), EngineState::Stopped);

        assert!(matches!(
            engine.clone().run().await,
            Err(CrawlError::AlreadyStarted(EngineState::Stopped))
        ));
    }
}
