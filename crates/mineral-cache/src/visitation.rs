use crate::key::CacheKey;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// What a lookup observed for a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellState<V> {
    Absent,
    /// A call with this key is running and has not produced a value yet.
    InProgress,
    Resolved(V),
}

/// Result of the atomic check-and-claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim<V> {
    /// The key was absent and now belongs to the caller (InProgress).
    Claimed,
    /// Another call holds the key: a dependency cycle, or a concurrent twin.
    InProgress,
    Resolved(V),
}

#[derive(Debug)]
enum Cell<V> {
    InProgress,
    Resolved(V),
}

/// Visitation statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub cycles: u64,
    pub entries: usize,
    pub in_progress: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses + self.cycles;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

/// Memo table whose cells move Absent -> InProgress -> Resolved and never back.
///
/// A resolved cell is immutable for the lifetime of the cache; there is no eviction. The
/// InProgress state is the cycle guard: a call that finds its own key in progress must give up
/// instead of waiting.
#[derive(Debug)]
pub struct VisitationCache<V> {
    cells: DashMap<CacheKey, Cell<V>>,
    hits: AtomicU64,
    misses: AtomicU64,
    cycles: AtomicU64,
}

impl<V> Default for VisitationCache<V> {
    fn default() -> Self {
        Self {
            cells: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            cycles: AtomicU64::new(0),
        }
    }
}

impl<V: Clone> VisitationCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, key: &CacheKey) -> CellState<V> {
        match self.cells.get(key).as_deref() {
            None => CellState::Absent,
            Some(Cell::InProgress) => CellState::InProgress,
            Some(Cell::Resolved(value)) => CellState::Resolved(value.clone()),
        }
    }

    /// Absent -> InProgress. Returns false, changing nothing, if the key was already present.
    /// Leaves the hit, miss and cycle counters alone.
    pub fn mark_in_progress(&self, key: &CacheKey) -> bool {
        match self.cells.entry(key.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(Cell::InProgress);
                true
            }
        }
    }

    /// Check and claim in one step: at most one caller ever gets `Claimed` for a key.
    pub fn claim(&self, key: &CacheKey) -> Claim<V> {
        match self.cells.entry(key.clone()) {
            Entry::Occupied(entry) => match entry.get() {
                Cell::InProgress => {
                    self.cycles.fetch_add(1, Ordering::Relaxed);
                    debug!("visitation cache: {} is in progress", key);
                    Claim::InProgress
                }
                Cell::Resolved(value) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    debug!("visitation cache: hit for {}", key);
                    Claim::Resolved(value.clone())
                }
            },
            Entry::Vacant(entry) => {
                entry.insert(Cell::InProgress);
                self.misses.fetch_add(1, Ordering::Relaxed);
                Claim::Claimed
            }
        }
    }

    /// InProgress (or Absent) -> Resolved. A resolved cell keeps its first value; the return
    /// value tells whether this call stored anything.
    pub fn resolve(&self, key: &CacheKey, value: V) -> bool {
        match self.cells.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                if matches!(entry.get(), Cell::Resolved(_)) {
                    return false;
                }
                entry.insert(Cell::Resolved(value));
                true
            }
            Entry::Vacant(entry) => {
                entry.insert(Cell::Resolved(value));
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let in_progress = self
            .cells
            .iter()
            .filter(|cell| matches!(cell.value(), Cell::InProgress))
            .count();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            cycles: self.cycles.load(Ordering::Relaxed),
            entries: self.cells.len(),
            in_progress,
        }
    }
}
