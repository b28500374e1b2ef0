//! Turns a parsed [`GtfsData`] into a [`Repository`]: selects the busiest service
//! date, interns every id into a dense `u32`, projects stops, groups trips into
//! [`RaptorRoute`]s, and builds the schedule and spatial indices.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use dashmap::DashMap;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::gtfs::models::{CalendarDateRow, CalendarRow, GtfsData};
use crate::repository::entities::{RaptorRoute, Route, Stop, StopMeta, StopTimeEntry, Trip};
use crate::repository::index::{ByStopIndex, ByTripIndex};
use crate::repository::{footpath, Error, LoadConfig, Repository};
use crate::shared::{AeqdProjection, Coordinate, Time};

const GTFS_DATE_FORMAT: &str = "%Y%m%d";

/// Builds a [`Repository`] from raw feed rows, using `config` for the footpath
/// radius and walking speed baked into the resulting footpath graph.
pub fn load(data: GtfsData, config: LoadConfig) -> Result<Repository, Error> {
    if data.stops.is_empty() {
        return Err(Error::DataInconsistency("feed has no stops".into()));
    }

    let active_services = busiest_service_date(&data.calendar, &data.calendar_dates, &data.trips);

    let (stop_lookup, stops) = load_stops(&data.stops);
    let coordinates: Vec<Coordinate> = stops.iter().map(|s| s.coordinate).collect();
    let projection = AeqdProjection::centered_on_centroid(&coordinates);
    let stops: Box<[Stop]> = stops
        .into_iter()
        .map(|mut stop| {
            stop.projected = projection.project(stop.coordinate);
            stop
        })
        .collect();

    let (route_lookup, routes) = load_routes(&data.routes);

    let mut trip_lookup: HashMap<Arc<str>, u32> = HashMap::new();
    let mut trips: Vec<Trip> = Vec::new();
    for row in &data.trips {
        if let Some(active) = &active_services {
            if !active.contains(row.service_id.as_str()) {
                continue;
            }
        }
        let Some(&route_idx) = route_lookup.get(row.route_id.as_str()) else {
            warn!(trip_id = %row.trip_id, route_id = %row.route_id, "trip references unknown route, skipping");
            continue;
        };
        let index = trips.len() as u32;
        trip_lookup.insert(row.trip_id.as_str().into(), index);
        trips.push(Trip {
            index,
            id: row.trip_id.as_str().into(),
            route_idx,
            raptor_route_idx: u32::MAX,
            headsign: row.trip_headsign.as_deref().map(Into::into),
            short_name: row.trip_short_name.as_deref().map(Into::into),
        });
    }

    let mut stop_times: Vec<StopTimeEntry> = Vec::with_capacity(data.stop_times.len());
    let mut stop_meta: Vec<Option<StopMeta>> = vec![None; stops.len()];
    for row in &data.stop_times {
        let Some(&trip_idx) = trip_lookup.get(row.trip_id.as_str()) else {
            continue;
        };
        let Some(&stop_idx) = stop_lookup.get(row.stop_id.as_str()) else {
            warn!(stop_id = %row.stop_id, "stop_times references unknown stop, skipping row");
            continue;
        };
        let arrival_time = match Time::parse(&row.arrival_time) {
            Ok(t) => t,
            Err(_) => {
                warn!(trip_id = %row.trip_id, value = %row.arrival_time, "bad arrival_time, skipping row");
                continue;
            }
        };
        let departure_time = match Time::parse(&row.departure_time) {
            Ok(t) => t,
            Err(_) => {
                warn!(trip_id = %row.trip_id, value = %row.departure_time, "bad departure_time, skipping row");
                continue;
            }
        };

        if stop_meta[stop_idx as usize].is_none() {
            let trip = &trips[trip_idx as usize];
            let route = &routes[trip.route_idx as usize];
            stop_meta[stop_idx as usize] = Some(StopMeta {
                agency_id: route.agency_id.clone(),
                route_short_name: route.short_name.clone(),
                route_long_name: route.long_name.clone(),
            });
        }

        stop_times.push(StopTimeEntry {
            trip_idx,
            stop_idx,
            sequence: row.stop_sequence,
            arrival_time,
            departure_time,
        });
    }
    let stop_meta: Box<[StopMeta]> = stop_meta.into_iter().map(Option::unwrap_or_default).collect();

    let stop_times = reject_non_monotone_trips(stop_times, &trips);
    let by_trip_index = ByTripIndex::build(trips.len(), stop_times);

    let (raptor_routes, trips) = group_raptor_routes(trips, &by_trip_index);
    let by_stop_index = ByStopIndex::build(stops.len(), &raptor_routes);

    let mut transfers = footpath::build_transfers(&stops, crate::shared::Distance::from_meters(config.footpath_radius_m), config.walking_speed_mps);
    transfers.sort_by_key(|t| t.from_stop_idx);
    let mut transfer_offsets = vec![0u32; stops.len() + 1];
    for transfer in &transfers {
        transfer_offsets[transfer.from_stop_idx as usize + 1] += 1;
    }
    for i in 1..transfer_offsets.len() {
        transfer_offsets[i] += transfer_offsets[i - 1];
    }

    debug!(
        stops = stops.len(),
        routes = routes.len(),
        trips = trips.len(),
        raptor_routes = raptor_routes.len(),
        transfers = transfers.len(),
        "repository built"
    );

    Ok(Repository {
        stops,
        routes,
        trips: trips.into_boxed_slice(),
        raptor_routes: raptor_routes.into_boxed_slice(),
        transfers: transfers.into_boxed_slice(),
        transfer_offsets: transfer_offsets.into_boxed_slice(),
        stop_meta,
        stop_lookup,
        by_stop_index,
        by_trip_index,
    })
}

fn load_stops(rows: &[crate::gtfs::models::StopRow]) -> (HashMap<Arc<str>, u32>, Vec<Stop>) {
    let mut lookup = HashMap::with_capacity(rows.len());
    let mut stops = Vec::with_capacity(rows.len());
    for row in rows {
        let index = stops.len() as u32;
        let id: Arc<str> = row.stop_id.as_str().into();
        lookup.insert(id.clone(), index);
        stops.push(Stop {
            index,
            id,
            name: row.stop_name.as_str().into(),
            coordinate: Coordinate::new(row.stop_lat, row.stop_lon),
            projected: Default::default(),
        });
    }
    (lookup, stops)
}

fn load_routes(rows: &[crate::gtfs::models::RouteRow]) -> (HashMap<Arc<str>, u32>, Vec<Route>) {
    let mut lookup = HashMap::with_capacity(rows.len());
    let mut routes = Vec::with_capacity(rows.len());
    for row in rows {
        let index = routes.len() as u32;
        let id: Arc<str> = row.route_id.as_str().into();
        lookup.insert(id.clone(), index);
        routes.push(Route {
            index,
            id,
            agency_id: row.agency_id.as_deref().map(Into::into),
            short_name: row.route_short_name.as_deref().map(Into::into),
            long_name: row.route_long_name.as_deref().map(Into::into),
            route_type: row.route_type,
        });
    }
    (lookup, routes)
}

/// Groups trips sharing an identical stop sequence (within the same GTFS route) into
/// one [`RaptorRoute`] each, and sorts each group's trips by their departure time
/// from the first stop. This is the "split GTFS routes on stop-sequence signature"
/// precondition RAPTOR needs, since a single GTFS route can have branching variants.
fn group_raptor_routes(mut trips: Vec<Trip>, by_trip_index: &ByTripIndex) -> (Vec<RaptorRoute>, Vec<Trip>) {
    let groups: DashMap<(u32, Vec<u32>), Vec<u32>> = DashMap::new();
    trips.par_iter().for_each(|trip| {
        let signature: Vec<u32> = by_trip_index.entries(trip.index).iter().map(|e| e.stop_idx).collect();
        if signature.is_empty() {
            return;
        }
        groups.entry((trip.route_idx, signature)).or_default().push(trip.index);
    });

    let mut raptor_routes = Vec::with_capacity(groups.len());
    for ((route_idx, stop_sequence), mut trip_indices) in groups.into_iter() {
        // Ties on departure_time (two trips leaving the first stop at the same
        // instant) are broken by trip_id, lexicographically, so which trip
        // find_earliest_trip boards is deterministic regardless of the DashMap's
        // insertion order.
        trip_indices.sort_by(|&a, &b| {
            let dep_a = by_trip_index.entries(a).first().map(|e| e.departure_time).unwrap_or(crate::shared::time::MAX);
            let dep_b = by_trip_index.entries(b).first().map(|e| e.departure_time).unwrap_or(crate::shared::time::MAX);
            dep_a.cmp(&dep_b).then_with(|| trips[a as usize].id.cmp(&trips[b as usize].id))
        });

        let raptor_route_idx = raptor_routes.len() as u32;
        for &trip_idx in &trip_indices {
            trips[trip_idx as usize].raptor_route_idx = raptor_route_idx;
        }
        raptor_routes.push(RaptorRoute {
            index: raptor_route_idx,
            route_idx,
            stops: stop_sequence.into(),
            trips: trip_indices.into(),
        });
    }

    (raptor_routes, trips)
}

/// Picks the service date with the most scheduled trips, the way
/// `partridge.read_busiest_date` selects a representative weekday for a feed, and
/// returns the set of `service_id`s active on it. Returns `None` when the feed
/// carries no calendar information at all, meaning every trip's service is
/// considered active (the feed is assumed to describe a single representative day).
fn busiest_service_date(
    calendar: &[CalendarRow],
    calendar_dates: &[CalendarDateRow],
    trips: &[crate::gtfs::models::TripRow],
) -> Option<HashSet<String>> {
    if calendar.is_empty() && calendar_dates.is_empty() {
        return None;
    }

    let mut trips_per_service: HashMap<&str, u32> = HashMap::new();
    for trip in trips {
        *trips_per_service.entry(trip.service_id.as_str()).or_default() += 1;
    }

    let parsed_calendar: Vec<(&CalendarRow, NaiveDate, NaiveDate)> = calendar
        .iter()
        .filter_map(|row| {
            let start = NaiveDate::parse_from_str(&row.start_date, GTFS_DATE_FORMAT).ok()?;
            let end = NaiveDate::parse_from_str(&row.end_date, GTFS_DATE_FORMAT).ok()?;
            Some((row, start, end))
        })
        .collect();

    let mut exceptions_by_date: HashMap<NaiveDate, Vec<&CalendarDateRow>> = HashMap::new();
    for row in calendar_dates {
        if let Ok(date) = NaiveDate::parse_from_str(&row.date, GTFS_DATE_FORMAT) {
            exceptions_by_date.entry(date).or_default().push(row);
        }
    }

    let mut candidate_dates: HashSet<NaiveDate> = exceptions_by_date.keys().copied().collect();
    for (_, start, end) in &parsed_calendar {
        candidate_dates.insert(*start);
        candidate_dates.insert(*end);
    }

    let mut best: Option<(NaiveDate, u32, HashSet<String>)> = None;
    for date in candidate_dates {
        let mut active: HashSet<String> = parsed_calendar
            .iter()
            .filter(|(row, start, end)| *start <= date && date <= *end && weekday_active(row, date))
            .map(|(row, _, _)| row.service_id.clone())
            .collect();

        if let Some(exceptions) = exceptions_by_date.get(&date) {
            for exception in exceptions {
                match exception.exception_type {
                    1 => {
                        active.insert(exception.service_id.clone());
                    }
                    2 => {
                        active.remove(&exception.service_id);
                    }
                    _ => {}
                }
            }
        }

        let trip_count: u32 = active.iter().map(|s| trips_per_service.get(s.as_str()).copied().unwrap_or(0)).sum();

        let better = match &best {
            Some((best_date, best_count, _)) => {
                trip_count > *best_count || (trip_count == *best_count && date < *best_date)
            }
            None => true,
        };
        if better {
            best = Some((date, trip_count, active));
        }
    }

    best.map(|(date, count, services)| {
        debug!(%date, trip_count = count, "selected busiest service date");
        services
    })
}

/// Drops every `stop_time` row belonging to a trip whose `stop_sequence` values
/// aren't strictly increasing (a duplicate sequence number within one trip), per
/// spec.md §4.G.3: "non-monotone stop_sequence in a trip → log and skip trip". A
/// trip failing this check contributes no entries to `ByTripIndex`, so it naturally
/// never forms a `RaptorRoute` rather than needing a second skip-list threaded
/// through route grouping.
fn reject_non_monotone_trips(stop_times: Vec<StopTimeEntry>, trips: &[Trip]) -> Vec<StopTimeEntry> {
    let mut sequences_by_trip: HashMap<u32, Vec<u16>> = HashMap::new();
    for entry in &stop_times {
        sequences_by_trip.entry(entry.trip_idx).or_default().push(entry.sequence);
    }

    let mut invalid_trips: HashSet<u32> = HashSet::new();
    for (trip_idx, mut sequences) in sequences_by_trip {
        sequences.sort_unstable();
        if sequences.windows(2).any(|pair| pair[0] == pair[1]) {
            warn!(trip_id = %trips[trip_idx as usize].id, "non-monotone stop_sequence, skipping trip");
            invalid_trips.insert(trip_idx);
        }
    }

    if invalid_trips.is_empty() {
        return stop_times;
    }
    stop_times.into_iter().filter(|entry| !invalid_trips.contains(&entry.trip_idx)).collect()
}

fn weekday_active(row: &CalendarRow, date: NaiveDate) -> bool {
    use chrono::Datelike;
    let flag = match date.weekday() {
        chrono::Weekday::Mon => row.monday,
        chrono::Weekday::Tue => row.tuesday,
        chrono::Weekday::Wed => row.wednesday,
        chrono::Weekday::Thu => row.thursday,
        chrono::Weekday::Fri => row.friday,
        chrono::Weekday::Sat => row.saturday,
        chrono::Weekday::Sun => row.sunday,
    };
    flag == 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::Time;

    fn trip(index: u32, id: &str) -> Trip {
        Trip {
            index,
            id: id.into(),
            route_idx: 0,
            raptor_route_idx: u32::MAX,
            headsign: None,
            short_name: None,
        }
    }

    fn entry(trip_idx: u32, stop_idx: u32, sequence: u16) -> StopTimeEntry {
        StopTimeEntry {
            trip_idx,
            stop_idx,
            sequence,
            arrival_time: Time::from_seconds(0),
            departure_time: Time::from_seconds(0),
        }
    }

    #[test]
    fn drops_only_the_trip_with_a_duplicate_stop_sequence() {
        let trips = vec![trip(0, "good"), trip(1, "bad")];
        let stop_times = vec![
            entry(0, 0, 0),
            entry(0, 1, 1),
            entry(1, 0, 0),
            entry(1, 1, 0),
        ];

        let kept = reject_non_monotone_trips(stop_times, &trips);
        assert!(kept.iter().all(|e| e.trip_idx == 0));
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn leaves_well_formed_trips_untouched() {
        let trips = vec![trip(0, "good")];
        let stop_times = vec![entry(0, 0, 0), entry(0, 1, 1), entry(0, 2, 2)];
        let kept = reject_non_monotone_trips(stop_times.clone(), &trips);
        assert_eq!(kept.len(), stop_times.len());
    }
}
