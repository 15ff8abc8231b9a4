//! Turns chunk failures into delayed resubmissions or terminal errors.
//!
//! The coordinator never sleeps. Failed ranges wait in a min-heap keyed by
//! their ready time; the engine's dispatch loop drains whatever is due and
//! resubmits it to the pool, so backoff never holds a worker thread.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use crate::retry::classify::classify;
use crate::retry::error::ChunkTransferError;
use crate::retry::policy::{RetryDecision, RetryPolicy};
use crate::segmenter::ChunkRange;

/// One unit of pool work: a chunk plus the 1-based attempt number it runs as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkItem {
    pub chunk: ChunkRange,
    pub attempt: u32,
}

impl WorkItem {
    pub fn first(chunk: ChunkRange) -> Self {
        Self { chunk, attempt: 1 }
    }
}

#[derive(Debug)]
pub enum RetryVerdict {
    /// The same range was queued again as `attempt`, ready after `delay`.
    Scheduled { attempt: u32, delay: Duration },
    /// Attempts are used up or the failure is not retryable.
    Exhausted(ChunkTransferError),
}

#[derive(Debug)]
struct Delayed {
    ready_at: Instant,
    seq: u64,
    item: WorkItem,
}

impl PartialEq for Delayed {
    fn eq(&self, other: &Self) -> bool {
        self.ready_at == other.ready_at && self.seq == other.seq
    }
}

impl Eq for Delayed {}

impl PartialOrd for Delayed {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Delayed {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.ready_at, self.seq).cmp(&(other.ready_at, other.seq))
    }
}

#[derive(Debug)]
pub struct RetryCoordinator {
    policy: RetryPolicy,
    delayed: BinaryHeap<Reverse<Delayed>>,
    seq: u64,
    retries: u32,
}

impl RetryCoordinator {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            delayed: BinaryHeap::new(),
            seq: 0,
            retries: 0,
        }
    }

    /// Record a failed attempt. Retryable failures under the attempt cap are
    /// queued for resubmission of the identical range; anything else is
    /// handed back as terminal.
    pub fn on_failure(&mut self, err: ChunkTransferError, now: Instant) -> RetryVerdict {
        let kind = classify(&err.failure);
        match self.policy.decide(err.attempt, kind) {
            RetryDecision::NoRetry => {
                tracing::error!(
                    chunk = err.chunk.index(),
                    attempt = err.attempt,
                    ?kind,
                    error = %err.failure,
                    "chunk failed, giving up"
                );
                RetryVerdict::Exhausted(err)
            }
            RetryDecision::RetryAfter(delay) => {
                let attempt = err.attempt + 1;
                tracing::warn!(
                    chunk = err.chunk.index(),
                    attempt = err.attempt,
                    ?kind,
                    delay_ms = delay.as_millis() as u64,
                    error = %err.failure,
                    "chunk failed, retrying"
                );
                self.push(
                    WorkItem {
                        chunk: err.chunk,
                        attempt,
                    },
                    now + delay,
                );
                self.retries += 1;
                RetryVerdict::Scheduled { attempt, delay }
            }
        }
    }

    fn push(&mut self, item: WorkItem, ready_at: Instant) {
        self.seq += 1;
        self.delayed.push(Reverse(Delayed {
            ready_at,
            seq: self.seq,
            item,
        }));
    }

    /// Pops every queued retry whose delay has elapsed, earliest first.
    pub fn take_ready(&mut self, now: Instant) -> Vec<WorkItem> {
        let mut ready = Vec::new();
        while let Some(Reverse(head)) = self.delayed.peek() {
            if head.ready_at > now {
                break;
            }
            if let Some(Reverse(d)) = self.delayed.pop() {
                ready.push(d.item);
            }
        }
        ready
    }

    /// When the earliest queued retry becomes ready.
    pub fn next_ready_at(&self) -> Option<Instant> {
        self.delayed.peek().map(|Reverse(d)| d.ready_at)
    }

    /// Retries queued but not yet handed back by `take_ready`.
    pub fn waiting(&self) -> usize {
        self.delayed.len()
    }

    /// Total retries scheduled so far.
    pub fn retries(&self) -> u32 {
        self.retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::error::TransferFailure;

    fn chunk(i: usize) -> ChunkRange {
        ChunkRange::new(i, i as u64 * 10, i as u64 * 10 + 10).unwrap()
    }

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
        }
    }

    fn http500(c: ChunkRange, attempt: u32) -> ChunkTransferError {
        ChunkTransferError::new(c, attempt, TransferFailure::Http(500))
    }

    #[test]
    fn retry_resubmits_identical_range_after_delay() {
        let mut rc = RetryCoordinator::new(policy(3));
        let now = Instant::now();
        let c = chunk(4);
        match rc.on_failure(http500(c, 1), now) {
            RetryVerdict::Scheduled { attempt, delay } => {
                assert_eq!(attempt, 2);
                assert_eq!(delay, Duration::from_millis(100));
            }
            other => panic!("expected retry, got {:?}", other),
        }
        assert!(rc.take_ready(now).is_empty());
        assert_eq!(rc.next_ready_at(), Some(now + Duration::from_millis(100)));

        let ready = rc.take_ready(now + Duration::from_millis(100));
        assert_eq!(ready, vec![WorkItem { chunk: c, attempt: 2 }]);
        assert_eq!(rc.waiting(), 0);
        assert_eq!(rc.retries(), 1);
    }

    #[test]
    fn exhausted_after_max_attempts() {
        let mut rc = RetryCoordinator::new(policy(2));
        let now = Instant::now();
        assert!(matches!(
            rc.on_failure(http500(chunk(0), 1), now),
            RetryVerdict::Scheduled { .. }
        ));
        match rc.on_failure(http500(chunk(0), 2), now) {
            RetryVerdict::Exhausted(e) => {
                assert_eq!(e.chunk, chunk(0));
                assert_eq!(e.attempt, 2);
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
    }

    #[test]
    fn non_retryable_fails_immediately() {
        let mut rc = RetryCoordinator::new(policy(5));
        let err = ChunkTransferError::new(chunk(1), 1, TransferFailure::Http(404));
        assert!(matches!(
            rc.on_failure(err, Instant::now()),
            RetryVerdict::Exhausted(_)
        ));
        assert_eq!(rc.retries(), 0);
        assert!(rc.next_ready_at().is_none());
    }

    #[test]
    fn ready_items_come_out_earliest_first() {
        let mut rc = RetryCoordinator::new(policy(5));
        let now = Instant::now();
        // attempt 2 fails -> 200ms; attempt 1 fails -> 100ms.
        rc.on_failure(http500(chunk(0), 2), now);
        rc.on_failure(http500(chunk(1), 1), now);
        let ready = rc.take_ready(now + Duration::from_secs(1));
        let order: Vec<usize> = ready.iter().map(|w| w.chunk.index()).collect();
        assert_eq!(order, vec![1, 0]);
    }
}
