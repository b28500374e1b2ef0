use crate::repository::Repository;
use crate::shared::{Duration, Time};

/// Finds the earliest trip on `raptor_route_idx` that can be boarded at
/// `position_in_route` no earlier than `earliest_departure`, and no later than
/// `earliest_departure + horizon`. Trips are pre-sorted by departure time at the
/// route's first stop (ties broken by trip_id), and because every trip on a
/// `RaptorRoute` shares the same stop sequence and never overtakes another trip on
/// it, that ordering is preserved at every position along the route — so a single
/// binary search suffices.
///
/// The horizon bound keeps a query from walking arbitrarily far into a sparse
/// overnight schedule chasing a trip that departs hours from now; spec calls this
/// out explicitly as `trip_search_horizon_s`, a bound the reference implementation
/// this crate grew from did not have.
pub fn find_earliest_trip(
    repository: &Repository,
    raptor_route_idx: u32,
    position_in_route: usize,
    earliest_departure: Time,
    horizon: Duration,
) -> Option<u32> {
    let route = repository.raptor_route(raptor_route_idx);
    let by_trip = repository.by_trip_index();
    let horizon_limit = earliest_departure + horizon;

    let idx = route.trips.partition_point(|&trip_idx| {
        by_trip.entries(trip_idx)[position_in_route].departure_time < earliest_departure
    });

    route.trips.get(idx).copied().filter(|&trip_idx| {
        by_trip.entries(trip_idx)[position_in_route].departure_time <= horizon_limit
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::entities::{RaptorRoute, StopTimeEntry};
    use crate::repository::index::{ByStopIndex, ByTripIndex};
    use crate::repository::Repository;

    fn tiny_repository() -> Repository {
        let stops: Box<[_]> = vec![
            crate::repository::entities::Stop {
                index: 0,
                id: "A".into(),
                name: "A".into(),
                coordinate: Default::default(),
                projected: Default::default(),
            },
            crate::repository::entities::Stop {
                index: 1,
                id: "B".into(),
                name: "B".into(),
                coordinate: Default::default(),
                projected: Default::default(),
            },
        ]
        .into();

        let stop_times = vec![
            StopTimeEntry { trip_idx: 0, stop_idx: 0, sequence: 0, arrival_time: Time::from_seconds(100), departure_time: Time::from_seconds(100) },
            StopTimeEntry { trip_idx: 0, stop_idx: 1, sequence: 1, arrival_time: Time::from_seconds(200), departure_time: Time::from_seconds(200) },
            StopTimeEntry { trip_idx: 1, stop_idx: 0, sequence: 0, arrival_time: Time::from_seconds(1000), departure_time: Time::from_seconds(1000) },
            StopTimeEntry { trip_idx: 1, stop_idx: 1, sequence: 1, arrival_time: Time::from_seconds(1100), departure_time: Time::from_seconds(1100) },
        ];
        let by_trip_index = ByTripIndex::build(2, stop_times);

        let raptor_routes: Box<[_]> = vec![RaptorRoute {
            index: 0,
            route_idx: 0,
            stops: vec![0, 1].into(),
            trips: vec![0, 1].into(),
        }]
        .into();
        let by_stop_index = ByStopIndex::build(2, &raptor_routes);

        Repository {
            stops,
            routes: vec![].into(),
            trips: vec![
                crate::repository::entities::Trip { index: 0, id: "t0".into(), route_idx: 0, raptor_route_idx: 0, headsign: None, short_name: None },
                crate::repository::entities::Trip { index: 1, id: "t1".into(), route_idx: 0, raptor_route_idx: 0, headsign: None, short_name: None },
            ]
            .into(),
            raptor_routes,
            transfers: vec![].into(),
            transfer_offsets: vec![0, 0].into(),
            stop_meta: vec![Default::default(), Default::default()].into(),
            stop_lookup: Default::default(),
            by_stop_index,
            by_trip_index,
        }
    }

    #[test]
    fn picks_the_earliest_boardable_trip_within_horizon() {
        let repository = tiny_repository();
        let found = find_earliest_trip(&repository, 0, 0, Time::from_seconds(50), Duration::from_seconds(10_800));
        assert_eq!(found, Some(0));
    }

    #[test]
    fn skips_a_trip_that_already_departed() {
        let repository = tiny_repository();
        let found = find_earliest_trip(&repository, 0, 0, Time::from_seconds(150), Duration::from_seconds(10_800));
        assert_eq!(found, Some(1));
    }

    #[test]
    fn horizon_bound_excludes_a_trip_too_far_in_the_future() {
        let repository = tiny_repository();
        let found = find_earliest_trip(&repository, 0, 0, Time::from_seconds(50), Duration::from_seconds(60));
        assert_eq!(found, None);
    }
}
