use scraper::Html;
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::Engine;
use crate::error::CrawlError;
use crate::queue::ActivePass;
use crate::rules::{FetchContext, FetchResponse, Request, Rule};

/// Consecutive empty observations before auto-stop kicks in
const IDLE_CHECKS_BEFORE_STOP: u32 = 2;

impl Engine {
    pub(crate) async fn request_loop(self: Arc<Self>) {
        info!(crawler = %self.name, "Request loop started");

        while !self.cancel.is_cancelled() {
            let pass = self.requests.begin_pass();
            if pass.is_empty() {
                tokio::select! {
                    _ = self.cancel.cancelled() => break,
                    _ = self.requests.wait_for_push(self.idle_poll) => continue,
                }
            }

            self.stats.request_pass();
            debug!(
                crawler = %self.name,
                generation = pass.generation,
                size = pass.len(),
                "Request pass"
            );

            let survivors = self.run_pass(pass).await;
            self.requests.finish_pass(survivors);
        }

        info!(crawler = %self.name, pending = self.pending_requests(), "Request loop stopped");
    }

    /// Walk one active generation in order; returns what has to be retried
    async fn run_pass(self: &Arc<Self>, pass: ActivePass) -> Vec<Request> {
        let mut survivors = Vec::new();
        let mut requests = pass.requests.into_iter();

        while let Some(request) = requests.next() {
            if self.cancel.is_cancelled() {
                survivors.push(request);
                survivors.extend(requests);
                break;
            }

            match self.attempt(&request).await {
                Ok(true) => {
                    self.requests.complete();
                    self.stats.request_completed();
                }
                Ok(false) => {
                    self.stats.request_retried();
                    debug!(crawler = %self.name, rule = %request.rule, target = %request.target, "Rule asked for a retry");
                    survivors.push(request);
                }
                Err(err) => {
                    self.report(&err, &request);
                    survivors.push(request);
                }
            }

            self.pace().await;
        }

        survivors
    }

    /// Fetch, read and parse one request; `Ok(true)` means it is done
    async fn attempt(self: &Arc<Self>, request: &Request) -> Result<bool, CrawlError> {
        let rule = self.lookup_rule(&request.rule);
        let attempt_id = Uuid::new_v4();

        let mut outgoing = self.fetcher.prepare(request)?;
        if let Some(hook) = rule.hook() {
            catch_unwind(AssertUnwindSafe(|| hook.before_request(&mut outgoing))).map_err(|panic| {
                CrawlError::Callback(format!(
                    "attempt {}: pre-request hook panicked: {}",
                    attempt_id,
                    panic_message(&*panic)
                ))
            })?;
        }

        let timeout = rule.timeout().unwrap_or(self.default_timeout);
        let response = self.fetcher.execute(&outgoing, timeout).await?;
        let response = FetchResponse::read(response).await?;

        debug!(
            crawler = %self.name,
            %attempt_id,
            rule = %rule.name(),
            status = response.status.as_u16(),
            bytes = response.body.len(),
            "Response read"
        );

        let Some(parser) = rule.parser().cloned() else {
            return Ok(true);
        };

        // The document is not Send, so it is built and dropped on the blocking thread
        let engine = Arc::clone(self);
        let params = request.params.clone();
        tokio::task::spawn_blocking(move || {
            let document = Html::parse_document(&response.text());
            let ctx = FetchContext::new(&engine, rule.name(), &outgoing, &response, &document, &params);
            parser.parse(&ctx)
        })
        .await
        .map_err(|e| match e.try_into_panic() {
            Ok(panic) => CrawlError::Callback(format!(
                "attempt {}: parse callback panicked: {}",
                attempt_id,
                panic_message(&*panic)
            )),
            Err(e) => CrawlError::Callback(format!("attempt {}: {}", attempt_id, e)),
        })
    }

    fn lookup_rule(&self, name: &str) -> Arc<Rule> {
        let found = self.rules.read().get(name);
        match found {
            Ok(rule) => rule,
            Err(_) => {
                let err = CrawlError::Configuration(name.to_string());
                error!(
                    crawler = %self.name,
                    kind = err.kind(),
                    rule = %name,
                    error = %err,
                    "Unknown rule, fetching without parse callback"
                );
                self.stats.unknown_rule();
                Arc::new(Rule::fallback(name))
            }
        }
    }

    fn report(&self, err: &CrawlError, request: &Request) {
        match err {
            CrawlError::Transport(_) => self.stats.fetch_failed(),
            CrawlError::Parse(_) => self.stats.parse_failed(),
            CrawlError::Callback(_) => self.stats.callback_failed(),
            _ => {}
        }
        self.stats.request_retried();

        warn!(
            crawler = %self.name,
            kind = err.kind(),
            rule = %request.rule,
            target = %request.target,
            error = %err,
            "Request failed, retrying next pass"
        );
    }

    async fn pace(&self) {
        let pause = self.pacer.pause();
        if pause.is_zero() {
            return;
        }
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            _ = tokio::time::sleep(pause) => {}
        }
    }

    pub(crate) async fn liveness_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.liveness_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick fires immediately
        ticker.tick().await;

        let mut idle_checks = 0;
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return,
                _ = ticker.tick() => {}
            }

            let requests = self.pending_requests();
            let records = self.pending_records();
            if requests + records == 0 {
                idle_checks += 1;
            } else {
                idle_checks = 0;
            }
            debug!(crawler = %self.name, requests, records, idle_checks, "Liveness check");

            if idle_checks >= IDLE_CHECKS_BEFORE_STOP {
                info!(crawler = %self.name, "Queue and store drained, stopping");
                self.cancel.cancel();
                return;
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
