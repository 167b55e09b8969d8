//! Flush targets for recorded collections

use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::info;

use crate::queue::Collections;

/// Per-collection outcome of a flush; missing names count as failed
pub type FlushReport = BTreeMap<String, bool>;

/// Receives every pending collection once per flush pass.
///
/// The same records are handed over again until the sink reports their
/// collection as flushed, so implementations must tolerate repeats.
#[async_trait]
pub trait Sink: Send + Sync {
    async fn flush(&self, collections: &Collections) -> FlushReport;
}

/// Logs every record and accepts every collection
#[derive(Debug, Clone, Default)]
pub struct LogSink {
    name: String,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Sink for LogSink {
    async fn flush(&self, collections: &Collections) -> FlushReport {
        let mut report = FlushReport::new();
        for (collection, records) in collections {
            for record in records {
                info!(crawler = %self.name, collection = %collection, %record, "Record");
            }
            report.insert(collection.clone(), true);
        }
        report
    }
}

/// Adapts a synchronous closure into a [`Sink`].
///
/// The closure runs directly on the flush loop's async worker, so it must be
/// fast and must not block. Sinks doing network or disk writes should
/// implement [`Sink`] themselves and await the I/O.
pub struct FnSink<F>(F);

impl<F> FnSink<F>
where
    F: Fn(&Collections) -> FlushReport + Send + Sync,
{
    pub fn new(flush: F) -> Self {
        Self(flush)
    }
}

#[async_trait]
impl<F> Sink for FnSink<F>
where
    F: Fn(&Collections) -> FlushReport + Send + Sync,
{
    async fn flush(&self, collections: &Collections) -> FlushReport {
        (self.0)(collections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Collections {
        let mut collections = Collections::new();
        collections.insert("a".to_string(), vec![json!(1)]);
        collections.insert("b".to_string(), vec![json!(2), json!(3)]);
        collections
    }

    #[tokio::test]
    async fn test_log_sink_accepts_everything() {
        let report = LogSink::new("test").flush(&sample()).await;
        assert_eq!(report.len(), 2);
        assert!(report.values().all(|ok| *ok));
    }

    #[tokio::test]
    async fn test_fn_sink() {
        let sink = FnSink::new(|collections: &Collections| -> FlushReport {
            collections
                .iter()
                .map(|(name, records)| (name.clone(), records.len() == 1))
                .collect()
        });

        let report = sink.flush(&sample()).await;
        assert_eq!(report.get("a"), Some(&true));
        assert_eq!(report.get("b"), Some(&false));
    }
}
