//! The recently-used ledger.
//!
//! The ledger orders sources by last access. When a new source would grow
//! it past its capacity, the least recently used source is handed back to
//! the context so its heavy artifacts can be flushed. Eviction can be
//! suspended with a nesting counter while one computation needs several
//! artifacts alive at once; re-enabling it hands back the whole backlog.

use std::collections::VecDeque;

use strand_source::Source;

/// Number of sources whose heavy artifacts are kept.
pub const MAX_CACHE_SIZE: usize = 64;

/// Sources in order of access, most recent last.
#[derive(Clone, Debug)]
pub struct RecentlyUsed {
    order: VecDeque<Source>,
    capacity: usize,
    removal_disabled: u32,
}

impl Default for RecentlyUsed {
    fn default() -> Self {
        Self::new(MAX_CACHE_SIZE)
    }
}

impl RecentlyUsed {
    /// Creates an empty ledger keeping at most `capacity` sources.
    pub fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::with_capacity(capacity),
            capacity,
            removal_disabled: 0,
        }
    }

    /// Records an access to `source`. Returns the source to flush, if the
    /// ledger overflowed.
    pub fn accessed(&mut self, source: &Source) -> Option<Source> {
        if let Some(index) = self.order.iter().position(|s| s == source) {
            if let Some(existing) = self.order.remove(index) {
                self.order.push_back(existing);
            }
            return None;
        }
        let evicted = if self.removal_disabled == 0 && self.order.len() >= self.capacity {
            self.order.pop_front()
        } else {
            None
        };
        self.order.push_back(source.clone());
        evicted
    }

    /// Suspends eviction until a matching [`enable_removal`](Self::enable_removal).
    pub fn disable_removal(&mut self) {
        self.removal_disabled += 1;
    }

    /// Ends one suspension. Once no suspension is left, returns every source
    /// accessed beyond capacity in the meantime, oldest first.
    pub fn enable_removal(&mut self) -> Vec<Source> {
        self.removal_disabled = self.removal_disabled.saturating_sub(1);
        if self.removal_disabled > 0 {
            return Vec::new();
        }
        let excess = self.order.len().saturating_sub(self.capacity);
        self.order.drain(..excess).collect()
    }

    /// Returns `true` while some computation suspended eviction.
    pub fn is_removal_disabled(&self) -> bool {
        self.removal_disabled > 0
    }

    /// Forgets `source`.
    pub fn remove(&mut self, source: &Source) {
        self.order.retain(|s| s != source);
    }

    /// Returns `true` if `source` is in the ledger.
    pub fn contains(&self, source: &Source) -> bool {
        self.order.contains(source)
    }

    /// The tracked sources, least recently used first.
    pub fn iter(&self) -> impl Iterator<Item = &Source> {
        self.order.iter()
    }

    /// Number of tracked sources.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if no source is tracked.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
