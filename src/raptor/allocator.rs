use bitvec::prelude::*;

use crate::raptor::state::{ParentRecord, Update};
use crate::repository::index::ServingRoute;
use crate::repository::Repository;
use crate::shared::time;
use crate::shared::Time;

fn flat_index(round: usize, stop_idx: u32, stop_count: usize) -> usize {
    round * stop_count + stop_idx as usize
}

/// Per-round counters surfaced back to the caller for diagnostics, per spec's
/// round-by-round public contract: how much work a round actually did.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoundStats {
    pub round: usize,
    pub reached_stops: usize,
    pub route_updates: usize,
    pub walk_updates: usize,
    /// Wall-clock time spent relaxing this round, per spec's `rounds_stats[]`
    /// diagnostics contract.
    pub elapsed_seconds: f64,
}

/// Per-query scratch space. A fresh query reuses one of these (see
/// [`Allocator::reset`]) instead of allocating arrays sized to the whole feed on
/// every call, per the crate's "read-only shared index, per-query allocator"
/// concurrency model — the `Repository` is never mutated, only this struct is.
#[derive(Clone)]
pub struct Allocator {
    stop_count: usize,
    max_rounds: usize,
    /// Flat `(round, stop)` matrix of best known arrival time, rounds `0..=max_rounds`.
    arrivals: Vec<Time>,
    /// Flat `(round, stop)` matrix of how each entry in `arrivals` was reached.
    parents: Vec<Option<ParentRecord>>,
    /// Best arrival time seen for a stop across *any* round so far — the running
    /// "tau star" used to reject updates that wouldn't actually improve anything.
    best_arrival: Vec<Time>,
    pub(crate) marked: BitVec<usize, Lsb0>,
    pub(crate) updates: Vec<Update>,
    pub(crate) stats: Vec<RoundStats>,
}

impl Allocator {
    pub fn new(repository: &Repository, max_rounds: usize) -> Self {
        let stop_count = repository.stop_count();
        Self {
            stop_count,
            max_rounds,
            arrivals: vec![time::MAX; (max_rounds + 1) * stop_count],
            parents: vec![None; (max_rounds + 1) * stop_count],
            best_arrival: vec![time::MAX; stop_count],
            marked: bitvec![usize, Lsb0; 0; stop_count],
            updates: Vec::new(),
            stats: Vec::with_capacity(max_rounds + 1),
        }
    }

    /// Clears all state for reuse by a new query, without releasing the underlying
    /// allocations.
    pub fn reset(&mut self) {
        self.arrivals.fill(time::MAX);
        self.parents.fill(None);
        self.best_arrival.fill(time::MAX);
        self.marked.fill(false);
        self.updates.clear();
        self.stats.clear();
    }

    pub fn stop_count(&self) -> usize {
        self.stop_count
    }

    pub fn max_rounds(&self) -> usize {
        self.max_rounds
    }

    pub fn arrival(&self, round: usize, stop_idx: u32) -> Time {
        self.arrivals[flat_index(round, stop_idx, self.stop_count)]
    }

    pub fn best_arrival(&self, stop_idx: u32) -> Time {
        self.best_arrival[stop_idx as usize]
    }

    pub fn parent(&self, round: usize, stop_idx: u32) -> Option<ParentRecord> {
        self.parents[flat_index(round, stop_idx, self.stop_count)]
    }

    pub fn set_origin(&mut self, stop_idx: u32, departure_time: Time) {
        let idx = flat_index(0, stop_idx, self.stop_count);
        self.arrivals[idx] = departure_time;
        self.best_arrival[stop_idx as usize] = departure_time;
        self.marked.set(stop_idx as usize, true);
    }

    /// Copies round `round - 1`'s arrivals forward into round `round` as the
    /// starting point, so a stop that is never improved this round keeps its best
    /// known time rather than reverting to "unreached".
    pub fn carry_forward(&mut self, round: usize) {
        let stop_count = self.stop_count;
        let (prev, curr) = self.arrivals.split_at_mut(round * stop_count);
        curr[..stop_count].copy_from_slice(&prev[(round - 1) * stop_count..round * stop_count]);
        let (prev_p, curr_p) = self.parents.split_at_mut(round * stop_count);
        curr_p[..stop_count].clone_from_slice(&prev_p[(round - 1) * stop_count..round * stop_count]);
    }

    /// Applies every batched update for `round` that strictly improves on both the
    /// running best and the round's own current value, then marks the improved
    /// stops for the next round's route-scan phase. Returns how many stops improved.
    pub fn apply_updates(&mut self, round: usize, newly_marked: &mut BitVec<usize, Lsb0>) -> usize {
        let mut improved = 0;
        for update in self.updates.drain(..) {
            let idx = flat_index(round, update.stop_idx, self.stop_count);
            if update.arrival_time < self.arrivals[idx] && update.arrival_time < self.best_arrival[update.stop_idx as usize] {
                self.arrivals[idx] = update.arrival_time;
                self.parents[idx] = Some(update.parent);
                self.best_arrival[update.stop_idx as usize] = update.arrival_time;
                newly_marked.set(update.stop_idx as usize, true);
                improved += 1;
            }
        }
        improved
    }

    pub fn push_stat(&mut self, stats: RoundStats) {
        self.stats.push(stats);
    }
}

/// A small per-thread scratch buffer, lazily allocated, used by the parallel route
/// scan so each rayon worker reuses one `Vec` across the routes it processes instead
/// of allocating one per route.
pub struct LazyBuffer<T> {
    inner: Option<Vec<T>>,
}

impl<T> LazyBuffer<T> {
    pub fn new() -> Self {
        Self { inner: None }
    }

    pub fn get(&mut self) -> &mut Vec<T> {
        let buffer = self.inner.get_or_insert_with(Vec::new);
        buffer.clear();
        buffer
    }
}

impl<T> Default for LazyBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Routes newly reachable because one of their stops was marked, de-duplicated so a
/// route serving several marked stops is scanned from its earliest marked stop only.
pub fn routes_to_scan(repository: &Repository, marked: &BitVec<usize, Lsb0>) -> Vec<ServingRoute> {
    let mut earliest: std::collections::HashMap<u32, ServingRoute> = std::collections::HashMap::new();
    for stop_idx in marked.iter_ones() {
        for serving in repository.by_stop_index().routes_serving(stop_idx as u32) {
            earliest
                .entry(serving.raptor_route_idx)
                .and_modify(|existing| {
                    if serving.position_in_route < existing.position_in_route {
                        *existing = *serving;
                    }
                })
                .or_insert(*serving);
        }
    }
    earliest.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_index_is_row_major() {
        assert_eq!(flat_index(0, 0, 10), 0);
        assert_eq!(flat_index(1, 0, 10), 10);
        assert_eq!(flat_index(1, 3, 10), 13);
    }
}
