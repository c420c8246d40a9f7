use std::sync::atomic::{AtomicU64, Ordering};

/// Unit costs for provider-bound operations, in abstract budget units.
/// Search (many cheap results) and research (per-candidate actor run)
/// cost the same today but are priced separately so they can diverge.
pub struct OperationCost;

impl OperationCost {
    pub const SEARCH_CALL: u64 = 1;
    pub const RESEARCH_CALL: u64 = 1;
}

/// Caps provider spend for one pipeline run. Shared across stages via
/// reference; exhaustion is a graceful stop signal, never an error.
/// A limit of 0 means unlimited.
pub struct RunBudget {
    limit: u64,
    spent: AtomicU64,
}

impl RunBudget {
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            spent: AtomicU64::new(0),
        }
    }

    pub fn unlimited() -> Self {
        Self::new(0)
    }

    pub fn is_limited(&self) -> bool {
        self.limit > 0
    }

    /// Whether at least `cost` units remain.
    pub fn has_budget(&self, cost: u64) -> bool {
        if self.limit == 0 {
            return true;
        }
        self.spent.load(Ordering::Relaxed) + cost <= self.limit
    }

    /// Record spend. Call after the operation is committed to, whether
    /// or not it ultimately succeeds — a failed actor run still bills.
    pub fn spend(&self, cost: u64) {
        self.spent.fetch_add(cost, Ordering::Relaxed);
    }

    pub fn total_spent(&self) -> u64 {
        self.spent.load(Ordering::Relaxed)
    }

    pub fn remaining(&self) -> Option<u64> {
        if self.limit == 0 {
            None
        } else {
            Some(self.limit.saturating_sub(self.spent.load(Ordering::Relaxed)))
        }
    }
}
