//! The RAPTOR solver: round-based earliest-arrival search over a [`Repository`].

pub mod allocator;
pub mod discovery;
pub mod explorer;
pub mod journey;
pub mod path;
pub mod state;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use bitvec::prelude::*;
use thiserror::Error;
use tracing::debug;

use crate::repository::Repository;
use crate::shared::{time, Duration, Time};
use allocator::{Allocator, RoundStats};
use journey::Journey;

#[derive(Error, Debug)]
pub enum Error {
    #[error("bad time format: {0}")]
    BadTimeFormat(#[from] crate::shared::time::ParseTimeError),
    #[error("origin stop `{0}` is not known to this feed")]
    OriginUnknown(String),
    #[error("destination stop `{0}` is not known to this feed")]
    DestinationUnknown(String),
    #[error("data inconsistency: {0}")]
    DataInconsistency(String),
    #[error("no path to `{0}` was found within the transfer budget")]
    Unreachable(String),
}

/// Tunable parameters of a query. Defaults match the reference values the engine was
/// validated against.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub walking_speed_mps: f64,
    pub footpath_radius_m: f64,
    pub trip_search_horizon_s: u32,
    pub max_transfers: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            walking_speed_mps: 1.4,
            footpath_radius_m: 320.0,
            trip_search_horizon_s: 10_800,
            max_transfers: 3,
        }
    }
}

/// Cooperative cancellation for a query: checked at round boundaries only, never
/// inside a round's relaxation, so an in-progress round always finishes cleanly.
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Option<Arc<AtomicBool>>,
    deadline: Option<Instant>,
}

impl CancelToken {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_flag(flag: Arc<AtomicBool>) -> Self {
        Self { flag: Some(flag), deadline: None }
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self { flag: None, deadline: Some(deadline) }
    }

    fn should_stop(&self) -> bool {
        let flagged = self.flag.as_ref().is_some_and(|f| f.load(Ordering::Relaxed));
        let expired = self.deadline.is_some_and(|d| Instant::now() >= d);
        flagged || expired
    }
}

/// Entry point for a single earliest-arrival query against a [`Repository`].
pub struct Raptor<'a> {
    repository: &'a Repository,
    config: EngineConfig,
}

impl<'a> Raptor<'a> {
    pub fn new(repository: &'a Repository) -> Self {
        Self {
            repository,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Computes earliest-arrival labels for every stop reachable from `origin_stop_id`
    /// departing no earlier than `departure_time` (`H[H]:MM[:SS]`), bounded by
    /// `max_transfers`. Call [`QueryResult::reconstruct`] to turn a reached stop into
    /// a full itinerary.
    pub fn find_routes(&self, origin_stop_id: &str, departure_time: &str) -> Result<QueryResult<'a>, Error> {
        self.find_routes_cancellable(origin_stop_id, departure_time, &CancelToken::none())
    }

    pub fn find_routes_cancellable(
        &self,
        origin_stop_id: &str,
        departure_time: &str,
        cancel: &CancelToken,
    ) -> Result<QueryResult<'a>, Error> {
        let departure = Time::parse(departure_time)?;
        let origin_idx = self
            .repository
            .stop_index(origin_stop_id)
            .map_err(|_| Error::OriginUnknown(origin_stop_id.to_string()))?;

        let mut allocator = Allocator::new(self.repository, self.config.max_transfers + 1);
        let completed = self.solve(origin_idx, departure, &mut allocator, cancel);

        Ok(QueryResult {
            repository: self.repository,
            allocator,
            origin_idx,
            incomplete: !completed,
        })
    }

    /// Runs the round loop with a caller-supplied, already-sized [`Allocator`],
    /// avoiding an allocation for callers issuing many queries back to back (e.g. a
    /// benchmark or a server holding one allocator per worker thread).
    pub fn solve_with_allocator(
        &self,
        origin_stop_id: &str,
        departure_time: &str,
        allocator: &mut Allocator,
        cancel: &CancelToken,
    ) -> Result<QueryResult<'a>, Error> {
        let departure = Time::parse(departure_time)?;
        let origin_idx = self
            .repository
            .stop_index(origin_stop_id)
            .map_err(|_| Error::OriginUnknown(origin_stop_id.to_string()))?;

        allocator.reset();
        let completed = self.solve(origin_idx, departure, allocator, cancel);

        Ok(QueryResult {
            repository: self.repository,
            allocator: allocator.clone(),
            origin_idx,
            incomplete: !completed,
        })
    }

    /// Runs the round loop to completion or until `cancel` fires at a round
    /// boundary. Returns `false` if cancellation cut the query short, per spec.md
    /// §5/§7's "partial result marked incomplete" policy — callers never learn this
    /// mid-round, only between rounds.
    fn solve(&self, origin_idx: u32, departure: Time, allocator: &mut Allocator, cancel: &CancelToken) -> bool {
        allocator.set_origin(origin_idx, departure);
        let horizon = Duration::from_seconds(self.config.trip_search_horizon_s);
        let max_round = allocator.max_rounds();
        let stop_count = allocator.stop_count();

        // Round 0's intra-round walking pass, per spec.md §4.G.1: `updated[0] =
        // {origin}`, and a footpath never consumes a transfer, so the origin's walk
        // neighbors belong in round 0 alongside the origin itself — otherwise
        // round 1's route scan (which only looks at stops marked from round 0)
        // never sees them, and walking directly out of the origin is impossible.
        let round0_start = Instant::now();
        let origin_marked = allocator.marked.clone();
        let walk_updates = explorer::explore_transfers(self.repository, allocator, 0, &origin_marked);
        let mut origin_walks = bitvec![usize, Lsb0; 0; stop_count];
        let reached_stops = allocator.apply_updates(0, &mut origin_walks);
        for stop_idx in origin_walks.iter_ones() {
            allocator.marked.set(stop_idx, true);
        }
        allocator.push_stat(RoundStats {
            round: 0,
            reached_stops,
            route_updates: 0,
            walk_updates,
            elapsed_seconds: round0_start.elapsed().as_secs_f64(),
        });

        for round in 1..=max_round {
            if cancel.should_stop() {
                debug!(round, "query cancelled at round boundary");
                return false;
            }

            let round_start = Instant::now();
            allocator.carry_forward(round);
            let route_updates = explorer::explore_routes(self.repository, allocator, round, horizon);

            let mut newly_marked = bitvec![usize, Lsb0; 0; stop_count];
            let improved_by_routes = allocator.apply_updates(round, &mut newly_marked);

            let walk_updates = explorer::explore_transfers(self.repository, allocator, round, &newly_marked);
            let improved_by_walks = allocator.apply_updates(round, &mut newly_marked);

            allocator.push_stat(RoundStats {
                round,
                reached_stops: improved_by_routes + improved_by_walks,
                route_updates,
                walk_updates,
                elapsed_seconds: round_start.elapsed().as_secs_f64(),
            });

            allocator.marked = newly_marked;
            if improved_by_routes == 0 && improved_by_walks == 0 {
                debug!(round, "no stop improved this round, stopping early");
                break;
            }
        }

        true
    }
}

/// The outcome of a query: per-stop earliest-arrival labels, ready to be turned into
/// a concrete itinerary with [`reconstruct`](QueryResult::reconstruct).
pub struct QueryResult<'a> {
    repository: &'a Repository,
    allocator: Allocator,
    origin_idx: u32,
    incomplete: bool,
}

impl<'a> QueryResult<'a> {
    /// The earliest time `stop_id` can be reached, if it was reached at all within
    /// the query's transfer budget.
    pub fn earliest_arrival(&self, stop_id: &str) -> Result<Option<Time>, Error> {
        let stop_idx = self
            .repository
            .stop_index(stop_id)
            .map_err(|_| Error::DestinationUnknown(stop_id.to_string()))?;
        let best = self.allocator.best_arrival(stop_idx);
        Ok((best < time::MAX).then_some(best))
    }

    /// The best arrival time reached at `stop_id` by round `round` specifically
    /// (as opposed to [`earliest_arrival`](Self::earliest_arrival)'s best-over-any-
    /// round), for diagnostics against spec.md §4.G's `arrivals[0..K][·]` table.
    pub fn arrival_in_round(&self, round: usize, stop_id: &str) -> Result<Option<Time>, Error> {
        let stop_idx = self
            .repository
            .stop_index(stop_id)
            .map_err(|_| Error::DestinationUnknown(stop_id.to_string()))?;
        let arrival = self.allocator.arrival(round.min(self.allocator.max_rounds()), stop_idx);
        Ok((arrival < time::MAX).then_some(arrival))
    }

    pub fn rounds_completed(&self) -> &[RoundStats] {
        &self.allocator.stats
    }

    /// `true` if a [`CancelToken`] cut the round loop short before it converged or
    /// exhausted `max_transfers` — the caller may still use whatever labels were
    /// computed, per spec.md §5/§7, but `final_result`/`reconstruct` only reflect
    /// the rounds actually run.
    pub fn is_incomplete(&self) -> bool {
        self.incomplete
    }

    /// Rebuilds the full itinerary to `destination_stop_id`, following parent
    /// pointers back to the origin. Fails with [`Error::Unreachable`] if the stop was
    /// never improved, i.e. there is no path within the configured transfer budget.
    pub fn reconstruct(&self, destination_stop_id: &str) -> Result<Journey, Error> {
        let destination_idx = self
            .repository
            .stop_index(destination_stop_id)
            .map_err(|_| Error::DestinationUnknown(destination_stop_id.to_string()))?;

        let max_round = self.allocator.max_rounds();
        path::backtrack(self.repository, &self.allocator, self.origin_idx, destination_idx, max_round)
            .ok_or_else(|| Error::Unreachable(destination_stop_id.to_string()))
    }

    /// Reconstructs a journey for every reachable stop, per spec.md §4.G's
    /// `final_result` contract: a mapping from stop id to itinerary. Stops never
    /// improved in any round (`Unreachable`, per spec.md §7) are simply absent,
    /// matching the spec's "never raises on unreachable destinations" rule. Ordered
    /// by ascending stop index rather than a hash map, so two queries against the
    /// same repository with identical inputs produce the same order (spec.md §8
    /// property 7, idempotence).
    pub fn final_result(&self) -> Vec<(String, Journey)> {
        let max_round = self.allocator.max_rounds();
        (0..self.repository.stop_count() as u32)
            .filter(|&stop_idx| self.allocator.best_arrival(stop_idx) < time::MAX)
            .filter_map(|stop_idx| {
                let journey = path::backtrack(self.repository, &self.allocator, self.origin_idx, stop_idx, max_round)?;
                Some((self.repository.stop(stop_idx).id.to_string(), journey))
            })
            .collect()
    }
}
