use crate::repository::entities::{RaptorRoute, StopTimeEntry, StopTimeSlice};

/// Where a stop sits within one of the `RaptorRoute`s that serves it.
#[derive(Debug, Clone, Copy)]
pub struct ServingRoute {
    pub raptor_route_idx: u32,
    pub position_in_route: u16,
}

/// Maps every stop to the routes that call at it, so a round can answer "which
/// routes became reachable by a newly marked stop" without scanning all routes.
#[derive(Debug, Clone)]
pub struct ByStopIndex {
    offsets: Box<[u32]>,
    entries: Box<[ServingRoute]>,
}

impl ByStopIndex {
    pub fn build(stop_count: usize, raptor_routes: &[RaptorRoute]) -> Self {
        let mut per_stop: Vec<Vec<ServingRoute>> = vec![Vec::new(); stop_count];
        for route in raptor_routes {
            for (position, &stop_idx) in route.stops.iter().enumerate() {
                per_stop[stop_idx as usize].push(ServingRoute {
                    raptor_route_idx: route.index,
                    position_in_route: position as u16,
                });
            }
        }

        let mut offsets = Vec::with_capacity(stop_count + 1);
        let mut entries = Vec::new();
        offsets.push(0u32);
        for routes in per_stop {
            entries.extend(routes);
            offsets.push(entries.len() as u32);
        }

        Self {
            offsets: offsets.into_boxed_slice(),
            entries: entries.into_boxed_slice(),
        }
    }

    pub fn routes_serving(&self, stop_idx: u32) -> &[ServingRoute] {
        let start = self.offsets[stop_idx as usize] as usize;
        let end = self.offsets[stop_idx as usize + 1] as usize;
        &self.entries[start..end]
    }
}

/// Per-trip access into the flat `stop_times` array, plus the binary-search helpers
/// RAPTOR's route scan needs: find the earliest boardable trip at a stop, and find
/// where along a trip a given stop sits.
#[derive(Debug, Clone)]
pub struct ByTripIndex {
    slices: Box<[StopTimeSlice]>,
    stop_times: Box<[StopTimeEntry]>,
}

impl ByTripIndex {
    pub fn build(trip_count: usize, mut stop_times: Vec<StopTimeEntry>) -> Self {
        stop_times.sort_by(|a, b| a.trip_idx.cmp(&b.trip_idx).then(a.sequence.cmp(&b.sequence)));

        let mut slices = vec![StopTimeSlice { start_idx: 0, count: 0 }; trip_count];
        let mut idx = 0usize;
        while idx < stop_times.len() {
            let trip_idx = stop_times[idx].trip_idx as usize;
            let start = idx;
            while idx < stop_times.len() && stop_times[idx].trip_idx as usize == trip_idx {
                idx += 1;
            }
            slices[trip_idx] = StopTimeSlice {
                start_idx: start as u32,
                count: (idx - start) as u32,
            };
        }

        Self {
            slices: slices.into_boxed_slice(),
            stop_times: stop_times.into_boxed_slice(),
        }
    }

    /// The stop-time entries of one trip, in stop-sequence order.
    pub fn entries(&self, trip_idx: u32) -> &[StopTimeEntry] {
        let slice = self.slices[trip_idx as usize];
        let start = slice.start_idx as usize;
        let end = start + slice.count as usize;
        &self.stop_times[start..end]
    }

    /// Position of `stop_idx` within `trip_idx`'s stop sequence, if it calls there.
    pub fn position_of(&self, trip_idx: u32, stop_idx: u32) -> Option<usize> {
        self.entries(trip_idx).iter().position(|entry| entry.stop_idx == stop_idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::Time;

    fn entry(trip: u32, stop: u32, seq: u16, t: u32) -> StopTimeEntry {
        StopTimeEntry {
            trip_idx: trip,
            stop_idx: stop,
            sequence: seq,
            arrival_time: Time::from_seconds(t),
            departure_time: Time::from_seconds(t),
        }
    }

    #[test]
    fn by_trip_index_slices_and_orders_per_trip() {
        let rows = vec![
            entry(0, 5, 1, 100),
            entry(1, 2, 0, 50),
            entry(0, 7, 0, 90),
            entry(1, 9, 1, 120),
        ];
        let index = ByTripIndex::build(2, rows);

        let trip0 = index.entries(0);
        assert_eq!(trip0.len(), 2);
        assert_eq!(trip0[0].stop_idx, 7);
        assert_eq!(trip0[1].stop_idx, 5);

        assert_eq!(index.position_of(1, 9), Some(1));
        assert_eq!(index.position_of(1, 5), None);
    }

    #[test]
    fn by_stop_index_groups_routes_per_stop() {
        let routes = vec![RaptorRoute {
            index: 0,
            route_idx: 0,
            stops: vec![3, 1, 4].into(),
            trips: vec![].into(),
        }];
        let index = ByStopIndex::build(5, &routes);
        assert_eq!(index.routes_serving(1)[0].position_in_route, 1);
        assert!(index.routes_serving(2).is_empty());
    }
}
