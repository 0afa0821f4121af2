//! # Request Store
//!
//! Pending requests keyed by workflow execution id, plus their insertion
//! order for batch retrieval.
//!
//! `evict` only removes the keyed entry. The id stays in the order list
//! until `first_n` walks past it. Both structures live under one lock, so no
//! caller can observe them out of step.

use crate::domain::{PendingRequest, Request};
use crate::error::StoreError;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::debug;

struct Slot {
    seq: u64,
    pending: PendingRequest,
}

#[derive(Default)]
struct StoreInner {
    requests: HashMap<String, Slot>,
    /// Insertion sequence number and id. An entry is stale once its id is
    /// evicted or re-added under a newer sequence number.
    order: VecDeque<(u64, String)>,
    next_seq: u64,
}

impl StoreInner {
    fn live(&self, seq: u64, id: &str) -> Option<&PendingRequest> {
        self.requests
            .get(id)
            .filter(|slot| slot.seq == seq)
            .map(|slot| &slot.pending)
    }
}

/// Ordered, keyed collection of pending requests.
#[derive(Default)]
pub struct RequestStore {
    inner: Mutex<StoreInner>,
}

impl RequestStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a request and return its insertion sequence number. Fails
    /// without side effects if its execution id is already pending.
    pub fn add(&self, pending: PendingRequest) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock();
        let id = pending.workflow_execution_id().to_string();
        if inner.requests.contains_key(&id) {
            return Err(StoreError::DuplicateId(id));
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.order.push_back((seq, id.clone()));
        inner.requests.insert(id, Slot { seq, pending });
        Ok(seq)
    }

    pub fn get(&self, id: &str) -> Option<Arc<Request>> {
        self.inner
            .lock()
            .requests
            .get(id)
            .map(|slot| Arc::clone(&slot.pending.request))
    }

    /// Requests for the given ids, in the given order. Unknown ids are
    /// omitted.
    pub fn get_n(&self, ids: &[String]) -> Vec<Arc<Request>> {
        let inner = self.inner.lock();
        ids.iter()
            .filter_map(|id| inner.requests.get(id))
            .map(|slot| Arc::clone(&slot.pending.request))
            .collect()
    }

    /// Claim a request. Returns `None` if it was already claimed or never
    /// stored; exactly one caller ever receives `Some` for a stored request.
    pub fn evict(&self, id: &str) -> Option<PendingRequest> {
        let claimed = self.inner.lock().requests.remove(id).map(|slot| slot.pending);
        if claimed.is_none() {
            debug!(workflow_execution_id = id, "Evict of absent request");
        }
        claimed
    }

    /// Claim a request only if it is still the one stored under `seq`. An
    /// id re-added after an earlier eviction is left alone.
    pub fn evict_if(&self, id: &str, seq: u64) -> Option<PendingRequest> {
        let mut inner = self.inner.lock();
        if inner.requests.get(id)?.seq != seq {
            debug!(workflow_execution_id = id, seq, "Evict of superseded request");
            return None;
        }
        inner.requests.remove(id).map(|slot| slot.pending)
    }

    /// Remove every stored request.
    pub fn drain(&self) -> Vec<PendingRequest> {
        let mut inner = self.inner.lock();
        inner.order.clear();
        inner.requests.drain().map(|(_, slot)| slot.pending).collect()
    }

    /// Up to `n` live requests in insertion order.
    ///
    /// Evicted and expired ids are dropped from the order list as they are
    /// walked past; an expired request stays keyed until its timer answers
    /// it. Returned requests stay queued until evicted, so an execution that
    /// misses quorum is proposed again.
    pub fn first_n(&self, n: usize) -> Result<Vec<Arc<Request>>, StoreError> {
        if n == 0 {
            return Err(StoreError::InvalidBatchSize);
        }

        let now = Instant::now();
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        if inner.order.is_empty() {
            return Err(StoreError::QueueEmpty);
        }

        let mut batch = Vec::with_capacity(n);
        let mut kept = VecDeque::with_capacity(inner.order.len());

        while batch.len() < n {
            let Some((seq, id)) = inner.order.pop_front() else {
                break;
            };
            let Some(pending) = inner.live(seq, &id) else {
                continue;
            };
            if pending.request.is_expired(now) {
                continue;
            }
            batch.push(Arc::clone(&pending.request));
            kept.push_back((seq, id));
        }

        kept.append(&mut inner.order);
        inner.order = kept;

        if batch.is_empty() {
            return Err(StoreError::QueueEmpty);
        }
        Ok(batch)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Length of the order list, including ids not yet compacted.
    pub fn queued_ids(&self) -> usize {
        self.inner.lock().order.len()
    }
}
