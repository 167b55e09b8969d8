use std::sync::Arc;
use tracing::{debug, info, warn};

use super::Engine;
use crate::error::CrawlError;
use crate::queue::Collections;

/// Outcome of one flush pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushSummary {
    pub generation: u64,
    /// Collections the sink accepted, now cleared
    pub flushed: Vec<String>,
    /// Collections kept for the next pass
    pub retained: Vec<String>,
    pub flushed_records: usize,
}

impl Engine {
    pub(crate) async fn flush_loop(self: Arc<Self>) {
        info!(crawler = %self.name, interval = ?self.flush_interval, "Flush loop started");

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.flush_interval) => {}
            }
            self.flush_now().await;
        }

        // Records produced before the stop still get one pass
        let summary = self.flush_now().await;
        info!(
            crawler = %self.name,
            flushed = summary.flushed_records,
            pending = self.pending_records(),
            "Flush loop stopped"
        );
    }

    /// Hand the active generation of records to the sink.
    ///
    /// Collections the sink reports as flushed are dropped; the rest are merged
    /// back ahead of records appended meanwhile. The sink is not called when
    /// nothing is pending.
    pub async fn flush_now(&self) -> FlushSummary {
        let (generation, collections) = self.records.begin_flush();
        let mut summary = FlushSummary {
            generation,
            ..FlushSummary::default()
        };
        if collections.is_empty() {
            return summary;
        }

        self.stats.flush_pass();
        debug!(
            crawler = %self.name,
            generation,
            collections = collections.len(),
            "Flushing records"
        );

        let report = self.sink.flush(&collections).await;

        let mut retained = Collections::new();
        for (name, records) in collections {
            if report.get(&name).copied().unwrap_or(false) {
                summary.flushed_records += records.len();
                summary.flushed.push(name);
            } else {
                let err = CrawlError::Sink(name.clone());
                warn!(
                    crawler = %self.name,
                    kind = err.kind(),
                    collection = %name,
                    records = records.len(),
                    error = %err,
                    "Collection kept for next flush"
                );
                self.stats.flush_failed();
                summary.retained.push(name.clone());
                retained.insert(name, records);
            }
        }

        self.records.flushed(summary.flushed_records);
        self.stats.records_flushed(summary.flushed_records);
        self.records.retain(retained);

        info!(
            crawler = %self.name,
            generation,
            flushed = summary.flushed_records,
            retained = summary.retained.len(),
            "Flush complete"
        );

        summary
    }
}
