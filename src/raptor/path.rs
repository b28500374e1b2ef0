use std::collections::HashSet;

use crate::raptor::allocator::Allocator;
use crate::raptor::journey::{Journey, JourneyLeg};
use crate::repository::Repository;
use crate::shared::time;

/// Picks the earliest round in which `stop_idx` reached its overall best arrival
/// time. Scanning rounds in ascending order and stopping at the first match means
/// two rounds with an identical arrival time prefer the one with fewer transfers,
/// which is the tie-break spec's reconstructor is required to be stable under.
fn earliest_achieving_round(allocator: &Allocator, stop_idx: u32, max_round: usize) -> Option<usize> {
    let best = allocator.best_arrival(stop_idx);
    if best >= time::MAX {
        return None;
    }
    (0..=max_round).find(|&round| allocator.arrival(round, stop_idx) == best)
}

/// Walks parent pointers back from `destination_idx` to `origin_idx`, producing legs
/// in travel order. Guards against cycles with a `(stop, round)` visited set — the
/// same protection the Python reference implementation's `visited_set` gave its
/// backtracking loop, which the pointer-chasing port this crate started from had
/// dropped.
pub fn backtrack(
    _repository: &Repository,
    allocator: &Allocator,
    origin_idx: u32,
    destination_idx: u32,
    max_round: usize,
) -> Option<Journey> {
    let target_round = earliest_achieving_round(allocator, destination_idx, max_round)?;

    if destination_idx == origin_idx {
        let arrival = allocator.arrival(target_round, destination_idx);
        return Some(Journey {
            legs: Vec::new(),
            departure_time: arrival,
            arrival_time: arrival,
            transfer_count: 0,
        });
    }

    let mut legs = Vec::new();
    let mut visited: HashSet<(u32, usize)> = HashSet::new();
    let mut stop_idx = destination_idx;
    let mut round = target_round;

    while !(stop_idx == origin_idx && round == 0) {
        if !visited.insert((stop_idx, round)) {
            // A repeated (stop, round) pair means the parent chain loops back on
            // itself; treat the journey as unreconstructible rather than spin.
            return None;
        }

        let parent = allocator.parent(round, stop_idx)?;
        legs.push(JourneyLeg {
            from_stop_idx: parent.prev_stop,
            to_stop_idx: stop_idx,
            mode: parent.mode,
            depart_time: parent.board_or_walk_start_time,
            arrive_time: parent.arrive_time,
        });

        stop_idx = parent.prev_stop;
        round = parent.prev_round;
    }

    legs.reverse();
    let departure_time = legs.first().map(|leg| leg.depart_time).unwrap_or_default();
    let arrival_time = legs.last().map(|leg| leg.arrive_time).unwrap_or_default();
    let transfer_count = legs.iter().filter(|leg| leg.mode.is_trip()).count().saturating_sub(1);

    Some(Journey {
        legs,
        departure_time,
        arrival_time,
        transfer_count,
    })
}
