use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, RwLock};

/// Captured values of one pool, keyed by per-pool sequence id.
pub type PoolResults = BTreeMap<u64, String>;

/// Every pool's captured values.
pub type AllPools = HashMap<String, PoolResults>;

/// Task results grouped into named pools.
///
/// Workers write, callers read. Reads hand out snapshots so a caller never
/// holds the lock while inspecting results.
#[derive(Debug, Default)]
pub struct ResultStore {
    pools: RwLock<AllPools>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a result, returning the value it replaced.
    pub fn record(&self, pool: &str, sequence_id: u64, value: impl Into<String>) -> Option<String> {
        let mut pools = self.pools.write().unwrap_or_else(|p| p.into_inner());
        pools
            .entry(pool.to_string())
            .or_default()
            .insert(sequence_id, value.into())
    }

    /// Snapshot of one pool. Empty when the pool does not exist.
    pub fn get(&self, pool: &str) -> PoolResults {
        let pools = self.pools.read().unwrap_or_else(|p| p.into_inner());
        pools.get(pool).cloned().unwrap_or_default()
    }

    pub fn get_all(&self) -> AllPools {
        self.pools.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Remove a pool. Returns whether it existed.
    pub fn clear(&self, pool: &str) -> bool {
        let mut pools = self.pools.write().unwrap_or_else(|p| p.into_inner());
        pools.remove(pool).is_some()
    }
}

/// Hands out sequence ids per pool, starting at 0.
#[derive(Debug, Default)]
pub struct PoolSequences {
    next: Mutex<HashMap<String, u64>>,
}

impl PoolSequences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next id for `pool`. Never returns the same id twice per pool.
    pub fn next_id(&self, pool: &str) -> u64 {
        let mut next = self.next.lock().unwrap_or_else(|p| p.into_inner());
        let slot = next.entry(pool.to_string()).or_insert(0);
        let id = *slot;
        *slot += 1;
        id
    }
}
