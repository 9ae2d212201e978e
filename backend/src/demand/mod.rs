//! Demand Queue
//!
//! Concurrent ingestion of item requests. Any thread may submit; exactly one
//! thread (the orchestrator's tick) drains a sorted [`DemandSnapshot`] per
//! scheduling cycle.
//!
//! # Critical Invariants
//!
//! 1. **Lock-free submit**: appends go through an unbounded crossbeam channel
//! 2. **Deterministic order**: snapshots sort by priority (desc), creation tick
//!    (asc), then submission sequence (asc)
//! 3. **Counted once**: `submit` counts new demand; `requeue` puts drained
//!    requests back without counting them again
//! 4. **Single drainer**: concurrent `drain_snapshot` calls may split requests
//!    between snapshots; callers must not do that

use crate::models::request::ItemRequest;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::cmp::Reverse;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
struct QueuedRequest {
    sequence: u64,
    request: ItemRequest,
}

/// Thread-safe request queue
///
/// # Example
/// ```
/// use courier_logistics_core::{BlockPos, DemandQueue, ItemRequest, Priority, WarehouseLocation};
///
/// let queue = DemandQueue::new();
/// let dest = WarehouseLocation::new(1, "overworld", BlockPos::new(9, 64, 0));
/// queue.submit(ItemRequest::new(1, "wood", 5, dest.clone(), 0).unwrap());
/// queue.submit(
///     ItemRequest::new(1, "iron", 1, dest, 1)
///         .unwrap()
///         .with_priority(Priority::Urgent),
/// );
///
/// let snapshot = queue.drain_snapshot();
/// assert_eq!(snapshot.len(), 2);
/// assert_eq!(snapshot.requests()[0].item_id(), "iron");
/// assert_eq!(queue.requests_processed(), 2);
/// ```
#[derive(Debug)]
pub struct DemandQueue {
    tx: Sender<QueuedRequest>,
    rx: Receiver<QueuedRequest>,
    next_sequence: AtomicU64,
    submitted: AtomicU64,
    processed: AtomicU64,
}

impl DemandQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self {
            tx,
            rx,
            next_sequence: AtomicU64::new(0),
            submitted: AtomicU64::new(0),
            processed: AtomicU64::new(0),
        }
    }

    /// Enqueue a new request
    pub fn submit(&self, request: ItemRequest) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
        self.enqueue(request);
    }

    /// Put a previously drained request back for a later snapshot
    pub fn requeue(&self, request: ItemRequest) {
        self.enqueue(request);
    }

    fn enqueue(&self, request: ItemRequest) {
        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
        // Both channel ends live in `self`, so the send cannot fail
        let _ = self.tx.send(QueuedRequest { sequence, request });
    }

    /// Empty the queue into a sorted snapshot
    pub fn drain_snapshot(&self) -> DemandSnapshot {
        let mut drained: Vec<QueuedRequest> = self.rx.try_iter().collect();
        self.processed
            .fetch_add(drained.len() as u64, Ordering::Relaxed);

        drained.sort_by_key(|queued| {
            (
                Reverse(queued.request.priority()),
                queued.request.created_at(),
                queued.sequence,
            )
        });

        DemandSnapshot {
            requests: drained.into_iter().map(|queued| queued.request).collect(),
        }
    }

    /// Total requests submitted so far, from any thread
    pub fn requests_submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    /// Total requests drained into snapshots so far
    pub fn requests_processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Requests currently waiting
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

impl Default for DemandQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable, pre-sorted list of requests for one solve
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DemandSnapshot {
    requests: Vec<ItemRequest>,
}

impl DemandSnapshot {
    /// Build a snapshot from requests already in submission order
    ///
    /// Applies the same ordering as [`DemandQueue::drain_snapshot`], using the
    /// position in `requests` as submission order.
    pub fn from_requests(requests: Vec<ItemRequest>) -> Self {
        let mut indexed: Vec<(usize, ItemRequest)> = requests.into_iter().enumerate().collect();
        indexed.sort_by_key(|(index, request)| {
            (Reverse(request.priority()), request.created_at(), *index)
        });
        Self {
            requests: indexed.into_iter().map(|(_, request)| request).collect(),
        }
    }

    pub fn requests(&self) -> &[ItemRequest] {
        &self.requests
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}
