use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use transit_raptor::gtfs::models::{GtfsData, RouteRow, StopRow, StopTimeRow, TripRow};
use transit_raptor::raptor::{CancelToken, Error as RaptorError};
use transit_raptor::{EngineConfig, LoadConfig, Repository};

fn stop(id: &str, lat: f64, lon: f64) -> StopRow {
    StopRow {
        stop_id: id.to_string(),
        stop_name: id.to_string(),
        stop_lat: lat,
        stop_lon: lon,
        location_type: None,
        parent_station: None,
    }
}

fn route(id: &str) -> RouteRow {
    RouteRow {
        route_id: id.to_string(),
        agency_id: None,
        route_short_name: Some(id.to_string()),
        route_long_name: None,
        route_type: 3,
    }
}

fn trip(route_id: &str, trip_id: &str) -> TripRow {
    TripRow {
        route_id: route_id.to_string(),
        service_id: "weekday".to_string(),
        trip_id: trip_id.to_string(),
        trip_headsign: None,
        trip_short_name: None,
    }
}

fn stop_time(trip_id: &str, stop_id: &str, seq: u16, arrival: &str, departure: &str) -> StopTimeRow {
    StopTimeRow {
        trip_id: trip_id.to_string(),
        arrival_time: arrival.to_string(),
        departure_time: departure.to_string(),
        stop_id: stop_id.to_string(),
        stop_sequence: seq,
    }
}

fn repository(data: GtfsData) -> Repository {
    Repository::from_gtfs_data(data, LoadConfig::default()).expect("feed builds")
}

#[test]
fn single_stop_query_is_trivially_reachable_at_departure_time() {
    let data = GtfsData {
        stops: vec![stop("A", 0.0, 0.0)],
        ..Default::default()
    };
    let repo = repository(data);
    let result = repo.router().find_routes("A", "08:00:00").unwrap();
    let arrival = result.earliest_arrival("A").unwrap().unwrap();
    assert_eq!(arrival.as_seconds(), 8 * 3600);

    let journey = result.reconstruct("A").unwrap();
    assert_eq!(journey.transfer_count, 0);
    assert!(journey.legs.is_empty());
}

#[test]
fn two_stops_one_trip_is_a_direct_ride() {
    let data = GtfsData {
        stops: vec![stop("A", 0.0, 0.0), stop("B", 5.0, 5.0)],
        routes: vec![route("R1")],
        trips: vec![trip("R1", "T1")],
        stop_times: vec![
            stop_time("T1", "A", 0, "08:00:00", "08:00:00"),
            stop_time("T1", "B", 1, "08:20:00", "08:20:00"),
        ],
        ..Default::default()
    };
    let repo = repository(data);
    let result = repo.router().find_routes("A", "07:55:00").unwrap();

    let arrival = result.earliest_arrival("B").unwrap().unwrap();
    assert_eq!(arrival.as_seconds(), 8 * 3600 + 20 * 60);

    let journey = result.reconstruct("B").unwrap();
    assert_eq!(journey.legs.len(), 1);
    assert!(journey.legs[0].mode.is_trip());
    assert_eq!(journey.transfer_count, 0);
}

#[test]
fn walking_is_preferred_when_faster_than_waiting_for_the_next_trip() {
    // F and G sit ~230m apart (within the default 320m footpath radius); the only
    // scheduled trip between them doesn't leave until an hour after the query time,
    // so walking should win.
    let data = GtfsData {
        stops: vec![stop("F", 0.0, 0.0), stop("G", 0.0, 0.0025)],
        routes: vec![route("R2")],
        trips: vec![trip("R2", "T2")],
        stop_times: vec![
            stop_time("T2", "F", 0, "09:00:00", "09:00:00"),
            stop_time("T2", "G", 1, "09:05:00", "09:05:00"),
        ],
        ..Default::default()
    };
    let repo = repository(data);
    let result = repo.router().find_routes("F", "08:00:00").unwrap();

    let journey = result.reconstruct("G").unwrap();
    assert_eq!(journey.legs.len(), 1);
    assert!(!journey.legs[0].mode.is_trip(), "expected a walk leg, not a trip leg");
    assert!(journey.arrival_time.as_seconds() < 9 * 3600);
}

#[test]
fn a_journey_requiring_one_transfer_is_found_and_costed_correctly() {
    let data = GtfsData {
        stops: vec![stop("I", 0.0, 0.0), stop("J", 10.0, 10.0), stop("K", 20.0, 20.0)],
        routes: vec![route("R3"), route("R4")],
        trips: vec![trip("R3", "T3"), trip("R4", "T4")],
        stop_times: vec![
            stop_time("T3", "I", 0, "08:00:00", "08:00:00"),
            stop_time("T3", "J", 1, "08:20:00", "08:20:00"),
            stop_time("T4", "J", 0, "08:25:00", "08:25:00"),
            stop_time("T4", "K", 1, "08:40:00", "08:40:00"),
        ],
        ..Default::default()
    };
    let repo = repository(data);
    let result = repo.router().find_routes("I", "07:55:00").unwrap();

    let journey = result.reconstruct("K").unwrap();
    assert_eq!(journey.transfer_count, 1);
    assert_eq!(journey.legs.len(), 2);
    assert_eq!(journey.arrival_time.as_seconds(), 8 * 3600 + 40 * 60);
}

#[test]
fn an_isolated_stop_is_reported_unreachable_not_panicked_on() {
    let data = GtfsData {
        stops: vec![stop("A", 0.0, 0.0), stop("Isolated", 45.0, 45.0)],
        ..Default::default()
    };
    let repo = repository(data);
    let result = repo.router().find_routes("A", "08:00:00").unwrap();

    match result.reconstruct("Isolated") {
        Err(RaptorError::Unreachable(stop_id)) => assert_eq!(stop_id, "Isolated"),
        other => panic!("expected Unreachable, got {other:?}"),
    }
}

#[test]
fn ties_favor_the_itinerary_with_fewer_transfers() {
    // A direct trip and a one-transfer trip both land at M at the same instant; the
    // reconstructed journey must prefer the direct ride.
    let data = GtfsData {
        stops: vec![stop("A", 0.0, 0.0), stop("B", 10.0, 10.0), stop("M", 20.0, 20.0)],
        routes: vec![route("DIRECT"), route("LEG1"), route("LEG2")],
        trips: vec![trip("DIRECT", "D1"), trip("LEG1", "L1"), trip("LEG2", "L2")],
        stop_times: vec![
            stop_time("D1", "A", 0, "08:00:00", "08:00:00"),
            stop_time("D1", "M", 1, "09:00:00", "09:00:00"),
            stop_time("L1", "A", 0, "08:00:00", "08:00:00"),
            stop_time("L1", "B", 1, "08:30:00", "08:30:00"),
            stop_time("L2", "B", 0, "08:35:00", "08:35:00"),
            stop_time("L2", "M", 1, "09:00:00", "09:00:00"),
        ],
        ..Default::default()
    };
    let repo = repository(data);
    let result = repo.router().find_routes("A", "07:55:00").unwrap();

    let journey = result.reconstruct("M").unwrap();
    assert_eq!(journey.transfer_count, 0, "expected the direct trip to win the tie");
}

#[test]
fn max_transfers_bounds_how_many_transfers_a_query_will_take() {
    let data = GtfsData {
        stops: vec![stop("A", 0.0, 0.0), stop("B", 10.0, 10.0), stop("C", 20.0, 20.0), stop("D", 30.0, 30.0)],
        routes: vec![route("R1"), route("R2"), route("R3")],
        trips: vec![trip("R1", "T1"), trip("R2", "T2"), trip("R3", "T3")],
        stop_times: vec![
            stop_time("T1", "A", 0, "08:00:00", "08:00:00"),
            stop_time("T1", "B", 1, "08:10:00", "08:10:00"),
            stop_time("T2", "B", 0, "08:15:00", "08:15:00"),
            stop_time("T2", "C", 1, "08:25:00", "08:25:00"),
            stop_time("T3", "C", 0, "08:30:00", "08:30:00"),
            stop_time("T3", "D", 1, "08:40:00", "08:40:00"),
        ],
        ..Default::default()
    };
    let repo = repository(data);

    let strict = repo.router().with_config(EngineConfig { max_transfers: 1, ..Default::default() });
    let result = strict.find_routes("A", "07:55:00").unwrap();
    assert!(result.earliest_arrival("D").unwrap().is_none());

    let lenient = repo.router().with_config(EngineConfig { max_transfers: 2, ..Default::default() });
    let result = lenient.find_routes("A", "07:55:00").unwrap();
    assert!(result.earliest_arrival("D").unwrap().is_some());
}

#[test]
fn unknown_origin_stop_is_a_clear_error_not_a_panic() {
    let data = GtfsData {
        stops: vec![stop("A", 0.0, 0.0)],
        ..Default::default()
    };
    let repo = repository(data);
    match repo.router().find_routes("does-not-exist", "08:00:00") {
        Err(RaptorError::OriginUnknown(stop_id)) => assert_eq!(stop_id, "does-not-exist"),
        other => panic!("expected OriginUnknown, got {other:?}"),
    }
}

#[test]
fn final_result_lists_every_reachable_stop_but_not_the_isolated_one() {
    let data = GtfsData {
        stops: vec![stop("A", 0.0, 0.0), stop("B", 10.0, 10.0), stop("Isolated", 45.0, 45.0)],
        routes: vec![route("R1")],
        trips: vec![trip("R1", "T1")],
        stop_times: vec![
            stop_time("T1", "A", 0, "08:00:00", "08:00:00"),
            stop_time("T1", "B", 1, "08:20:00", "08:20:00"),
        ],
        ..Default::default()
    };
    let repo = repository(data);
    let result = repo.router().find_routes("A", "07:55:00").unwrap();

    let final_result = result.final_result();
    let stop_ids: Vec<&str> = final_result.iter().map(|(id, _)| id.as_str()).collect();
    assert!(stop_ids.contains(&"A"));
    assert!(stop_ids.contains(&"B"));
    assert!(!stop_ids.contains(&"Isolated"));
    assert!(!result.is_incomplete());
}

#[test]
fn a_cancelled_query_is_reported_incomplete() {
    let data = GtfsData {
        stops: vec![stop("A", 0.0, 0.0), stop("B", 10.0, 10.0)],
        routes: vec![route("R1")],
        trips: vec![trip("R1", "T1")],
        stop_times: vec![
            stop_time("T1", "A", 0, "08:00:00", "08:00:00"),
            stop_time("T1", "B", 1, "08:20:00", "08:20:00"),
        ],
        ..Default::default()
    };
    let repo = repository(data);

    let flag = Arc::new(AtomicBool::new(true));
    let cancel = CancelToken::with_flag(flag);
    let result = repo
        .router()
        .find_routes_cancellable("A", "07:55:00", &cancel)
        .unwrap();

    assert!(result.is_incomplete());
}
