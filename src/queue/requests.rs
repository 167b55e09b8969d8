use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::trace;

use super::buffer::DoubleBuffer;
use crate::rules::Request;

/// Requests checked out for one pass of the request loop
#[derive(Debug)]
pub struct ActivePass {
    pub generation: u64,
    pub requests: Vec<Request>,
}

impl ActivePass {
    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

/// Double-buffered request queue.
///
/// `push` appends to the staging area and never waits for the request loop.
/// `begin_pass` promotes staging to active; the requests that survive the pass
/// go back through `finish_pass` ahead of anything pushed meanwhile.
pub struct RequestQueue {
    buffer: DoubleBuffer<Vec<Request>>,
    pending: AtomicUsize,
    notify: Notify,
}

impl Default for RequestQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestQueue {
    pub fn new() -> Self {
        Self {
            buffer: DoubleBuffer::new(),
            pending: AtomicUsize::new(0),
            notify: Notify::new(),
        }
    }

    pub fn push(&self, request: Request) {
        self.pending.fetch_add(1, Ordering::SeqCst);
        self.buffer.with_staging(|area| area.push(request));
        self.notify.notify_one();
    }

    pub fn begin_pass(&self) -> ActivePass {
        let (generation, requests) = self.buffer.swap();
        trace!(generation, size = requests.len(), "Request pass started");
        ActivePass {
            generation,
            requests,
        }
    }

    /// Hand unfinished requests back for the next pass, in their original order
    pub fn finish_pass(&self, survivors: Vec<Request>) {
        if survivors.is_empty() {
            return;
        }
        self.buffer.with_staging(|area| {
            area.splice(0..0, survivors);
        });
    }

    /// Mark one checked-out request as done
    pub fn complete(&self) {
        // Saturate so a stray call can't wrap the counter
        let _ = self
            .pending
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    /// Requests not yet completed, including those checked out by a pass
    pub fn len(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait until something is pushed or `timeout` elapses
    pub async fn wait_for_push(&self, timeout: Duration) {
        let _ = tokio::time::timeout(timeout, self.notify.notified()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn request(target: &str) -> Request {
        Request::new(target)
    }

    fn targets(pass: &ActivePass) -> Vec<&str> {
        pass.requests.iter().map(|r| r.target.as_str()).collect()
    }

    #[test]
    fn test_push_mid_pass_lands_in_next_pass() {
        let queue = RequestQueue::new();
        queue.push(request("/a"));

        let pass = queue.begin_pass();
        assert_eq!(targets(&pass), vec!["/a"]);

        queue.push(request("/b"));
        queue.complete();
        queue.finish_pass(Vec::new());

        let pass = queue.begin_pass();
        assert_eq!(targets(&pass), vec!["/b"]);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_survivors_retried_next_pass_first() {
        let queue = RequestQueue::new();
        queue.push(request("/retry"));

        let pass = queue.begin_pass();
        queue.push(request("/new"));
        queue.finish_pass(pass.requests);

        let pass = queue.begin_pass();
        assert_eq!(targets(&pass), vec!["/retry", "/new"]);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_always_retried_request_does_not_grow_queue() {
        let queue = RequestQueue::new();
        queue.push(request("/stuck"));

        for _ in 0..10 {
            let pass = queue.begin_pass();
            assert_eq!(targets(&pass), vec!["/stuck"]);
            queue.finish_pass(pass.requests);
        }
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_completed_request_is_gone() {
        let queue = RequestQueue::new();
        queue.push(request("/done"));

        let pass = queue.begin_pass();
        assert_eq!(pass.len(), 1);
        queue.complete();
        queue.finish_pass(Vec::new());

        for _ in 0..3 {
            assert!(queue.begin_pass().is_empty());
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn test_complete_saturates() {
        let queue = RequestQueue::new();
        queue.complete();
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_concurrent_push_during_pass_exactly_once() {
        let queue = Arc::new(RequestQueue::new());
        queue.push(request("/seed"));
        let pass = queue.begin_pass();

        let pushers: Vec<_> = (0..4)
            .map(|t| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for i in 0..250 {
                        queue.push(request(&format!("/t{}/{}", t, i)));
                    }
                })
            })
            .collect();
        for pusher in pushers {
            pusher.join().unwrap();
        }

        // Nothing pushed mid-pass leaked into the pass being walked
        assert_eq!(targets(&pass), vec!["/seed"]);
        queue.complete();
        queue.finish_pass(Vec::new());

        let next = queue.begin_pass();
        let mut seen: Vec<String> = next.requests.into_iter().map(|r| r.target).collect();
        seen.sort();
        let before = seen.len();
        seen.dedup();
        assert_eq!(before, 1000);
        assert_eq!(seen.len(), 1000);
        assert_eq!(queue.len(), 1000);
    }

    #[tokio::test]
    async fn test_wait_for_push_wakes_on_push() {
        let queue = Arc::new(RequestQueue::new());
        let waiter = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move {
                queue.wait_for_push(Duration::from_secs(30)).await;
            })
        };

        queue.push(request("/wake"));
        tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .expect("waiter should wake")
            .unwrap();
    }
}
