use std::sync::Arc;

use crate::shared::{Coordinate, Projected, Time};

/// A transit stop, projected onto the local plane at load time so every later
/// distance computation is a flat Euclidean one.
#[derive(Debug, Clone)]
pub struct Stop {
    pub index: u32,
    pub id: Arc<str>,
    pub name: Arc<str>,
    pub coordinate: Coordinate,
    pub projected: Projected,
}

/// Display metadata for a route: the line a rider would actually see on a sign,
/// kept separate from the [`Route`] record used for indexing so a UI can show a
/// human-friendly name without touching the routing hot path.
#[derive(Debug, Clone)]
pub struct Route {
    pub index: u32,
    pub id: Arc<str>,
    pub agency_id: Option<Arc<str>>,
    pub short_name: Option<Arc<str>>,
    pub long_name: Option<Arc<str>>,
    pub route_type: i32,
}

/// A single scheduled trip. `raptor_route_idx` points at the [`RaptorRoute`] this
/// trip belongs to — the group of trips sharing an identical stop sequence, which is
/// the unit RAPTOR actually scans.
#[derive(Debug, Clone)]
pub struct Trip {
    pub index: u32,
    pub id: Arc<str>,
    pub route_idx: u32,
    pub raptor_route_idx: u32,
    pub headsign: Option<Arc<str>>,
    pub short_name: Option<Arc<str>>,
}

/// One row out of `stop_times.txt`, normalized to integer seconds-since-midnight.
#[derive(Debug, Clone, Copy)]
pub struct StopTimeEntry {
    pub trip_idx: u32,
    pub stop_idx: u32,
    pub sequence: u16,
    pub arrival_time: Time,
    pub departure_time: Time,
}

/// A route as RAPTOR sees it: every trip in `trips` serves exactly the stop sequence
/// in `stops`, in order. This precondition is established once at load time by
/// grouping trips on their stop-sequence signature, so the round-relaxation loop
/// never has to branch on a trip's actual stop list.
#[derive(Debug, Clone)]
pub struct RaptorRoute {
    pub index: u32,
    pub route_idx: u32,
    pub stops: Arc<[u32]>,
    /// Trips sorted by departure time from the first stop, ascending.
    pub trips: Arc<[u32]>,
}

/// A direct footpath edge between two stops, symmetric by construction.
#[derive(Debug, Clone, Copy)]
pub struct Transfer {
    pub from_stop_idx: u32,
    pub to_stop_idx: u32,
    pub walk_time: crate::shared::Duration,
}

/// A contiguous slice of `stop_times`, sorted by `sequence`, for one trip. Storing
/// trips' stop-times as slices into one flat array instead of per-trip `Vec`s avoids
/// a pointer-chase and an allocation per trip.
#[derive(Debug, Clone, Copy)]
pub struct StopTimeSlice {
    pub start_idx: u32,
    pub count: u32,
}

/// Rider-facing metadata for a stop, resolved at load time by taking the first trip
/// (by stop_times row order) that calls there — the same "groupby stop_id, take
/// first" choice the original station-data builder made, rather than trying to
/// reconcile every route that might serve a stop into one record.
#[derive(Debug, Clone, Default)]
pub struct StopMeta {
    pub agency_id: Option<Arc<str>>,
    pub route_short_name: Option<Arc<str>>,
    pub route_long_name: Option<Arc<str>>,
}
