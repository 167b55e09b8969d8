use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::buffer::DoubleBuffer;

/// Collection name → records, in append order
pub type Collections = BTreeMap<String, Vec<Value>>;

/// Double-buffered record store.
///
/// `append` writes into the staging map. A flush checks out the active map with
/// `begin_flush`; collections the sink did not accept are merged back with
/// `retain`, ahead of records appended while the flush was in flight.
pub struct RecordStore {
    buffer: DoubleBuffer<Collections>,
    pending: AtomicUsize,
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore {
    pub fn new() -> Self {
        Self {
            buffer: DoubleBuffer::new(),
            pending: AtomicUsize::new(0),
        }
    }

    pub fn append(&self, name: &str, record: Value) {
        self.pending.fetch_add(1, Ordering::SeqCst);
        self.buffer.with_staging(|collections| {
            collections.entry(name.to_string()).or_default().push(record);
        });
    }

    /// Check out the active generation
    pub fn begin_flush(&self) -> (u64, Collections) {
        let (generation, mut collections) = self.buffer.swap();
        collections.retain(|_, records| !records.is_empty());
        (generation, collections)
    }

    /// Put back collections that were not flushed
    pub fn retain(&self, retained: Collections) {
        if retained.is_empty() {
            return;
        }
        self.buffer.with_staging(|collections| {
            for (name, records) in retained {
                let entry = collections.entry(name).or_default();
                let appended = std::mem::replace(entry, records);
                entry.extend(appended);
            }
        });
    }

    /// Forget `count` records that reached the sink
    pub fn flushed(&self, count: usize) {
        let _ = self
            .pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(count)));
    }

    /// Records not yet flushed, including those checked out by a flush
    pub fn len(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
