//! Bounded process-local job store.
//!
//! Jobs are retained until either the capacity bound evicts the oldest
//! or a terminal job outlives its TTL. The store lock is held only for
//! insert, lookup, and eviction; result appends take the per-job lock.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::debug;
use uuid::Uuid;

use super::job::JobRecord;

/// Store bounds.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Maximum retained jobs; oldest evicted first
    pub capacity: usize,
    /// Terminal jobs older than this are evicted
    pub terminal_ttl: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            capacity: 256,
            terminal_ttl: Duration::from_secs(30 * 60),
        }
    }
}

struct StoreInner {
    map: HashMap<Uuid, Arc<JobRecord>>,
    /// Insertion order for capacity eviction
    order: VecDeque<Uuid>,
}

pub struct JobStore {
    config: StoreConfig,
    inner: Mutex<StoreInner>,
}

impl JobStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(StoreInner {
                map: HashMap::new(),
                order: VecDeque::new(),
            }),
        }
    }

    pub fn insert(&self, job: Arc<JobRecord>) {
        let mut inner = self.inner.lock().unwrap();
        inner.order.push_back(job.id());
        inner.map.insert(job.id(), job);
        self.evict_locked(&mut inner);
    }

    pub fn get(&self, id: Uuid) -> Option<Arc<JobRecord>> {
        let mut inner = self.inner.lock().unwrap();
        self.evict_locked(&mut inner);
        inner.map.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn evict_locked(&self, inner: &mut StoreInner) {
        // expired terminal jobs first
        let expired: Vec<Uuid> = inner
            .map
            .iter()
            .filter(|(_, job)| {
                job.terminal_elapsed()
                    .map(|age| age >= self.config.terminal_ttl)
                    .unwrap_or(false)
            })
            .map(|(id, _)| *id)
            .collect();
        for id in expired {
            inner.map.remove(&id);
            debug!(job_id = %id, "evicted expired job");
        }

        let StoreInner { map, order } = inner;
        order.retain(|id| map.contains_key(id));

        // then capacity, oldest first
        while map.len() > self.config.capacity {
            if let Some(id) = order.pop_front() {
                map.remove(&id);
                debug!(job_id = %id, "evicted job over capacity");
            } else {
                break;
            }
        }
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}
