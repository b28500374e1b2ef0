use bitvec::prelude::*;
use rayon::prelude::*;

use crate::raptor::allocator::{routes_to_scan, Allocator, LazyBuffer};
use crate::raptor::discovery::find_earliest_trip;
use crate::raptor::state::{LegMode, ParentRecord, Update};
use crate::repository::Repository;
use crate::shared::{time, Duration};

/// Scans every route newly reachable from last round's marked stops (the classic
/// RAPTOR route-scan phase): walk each route's stop sequence in order, boarding the
/// earliest catchable trip and re-boarding an earlier one whenever a stop's arrival
/// from the previous round would let us, improving every later stop a boarded trip
/// passes through. Writes into `allocator.updates`; callers apply them with
/// [`Allocator::apply_updates`].
pub fn explore_routes(
    repository: &Repository,
    allocator: &mut Allocator,
    round: usize,
    horizon: Duration,
) -> usize {
    let routes = routes_to_scan(repository, &allocator.marked);
    let by_trip = repository.by_trip_index();

    let batches: Vec<Vec<Update>> = routes
        .par_iter()
        .map_init(LazyBuffer::new, |buffer, serving| {
            let route = repository.raptor_route(serving.raptor_route_idx);
            let buf = buffer.get();
            let mut boarded: Option<(u32, u32, crate::shared::Time)> = None;

            for pos in serving.position_in_route as usize..route.stops.len() {
                let stop_idx = route.stops[pos];
                let prev_arrival = allocator.arrival(round - 1, stop_idx);

                if prev_arrival < time::MAX {
                    if let Some(candidate_trip) =
                        find_earliest_trip(repository, serving.raptor_route_idx, pos, prev_arrival, horizon)
                    {
                        let candidate_departure = by_trip.entries(candidate_trip)[pos].departure_time;
                        let better = match boarded {
                            None => true,
                            Some((_, _, current_departure)) => candidate_departure < current_departure,
                        };
                        if better {
                            boarded = Some((candidate_trip, stop_idx, candidate_departure));
                        }
                    }
                }

                if let Some((trip_idx, board_stop, board_departure)) = boarded {
                    let arrival = by_trip.entries(trip_idx)[pos].arrival_time;
                    if arrival < allocator.best_arrival(stop_idx) {
                        buf.push(Update {
                            stop_idx,
                            arrival_time: arrival,
                            parent: ParentRecord {
                                prev_stop: board_stop,
                                prev_round: round - 1,
                                mode: LegMode::Trip(trip_idx),
                                board_or_walk_start_time: board_departure,
                                arrive_time: arrival,
                            },
                        });
                    }
                }
            }

            buf.clone()
        })
        .collect();

    let count: usize = batches.iter().map(Vec::len).sum();
    allocator.updates.par_extend(batches.into_par_iter().flatten());
    count
}

/// Relaxes footpaths out of every stop newly improved this round (by the route scan
/// that just ran). Walking is folded into the same round rather than spent on its
/// own round, since a footpath is never a transit leg.
pub fn explore_transfers(repository: &Repository, allocator: &mut Allocator, round: usize, newly_marked: &BitVec<usize, Lsb0>) -> usize {
    let stops: Vec<u32> = newly_marked.iter_ones().map(|i| i as u32).collect();

    let updates: Vec<Update> = stops
        .par_iter()
        .flat_map(|&stop_idx| {
            let arrival = allocator.arrival(round, stop_idx);
            repository
                .transfers_from(stop_idx)
                .iter()
                .filter_map(move |transfer| {
                    let candidate = arrival + transfer.walk_time;
                    if candidate < allocator.best_arrival(transfer.to_stop_idx) {
                        Some(Update {
                            stop_idx: transfer.to_stop_idx,
                            arrival_time: candidate,
                            parent: ParentRecord {
                                prev_stop: stop_idx,
                                prev_round: round,
                                mode: LegMode::Walk,
                                board_or_walk_start_time: arrival,
                                arrive_time: candidate,
                            },
                        })
                    } else {
                        None
                    }
                })
                .collect::<Vec<_>>()
        })
        .collect();

    let count = updates.len();
    allocator.updates.par_extend(updates);
    count
}
