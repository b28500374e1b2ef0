use serde::{Deserialize, Serialize};

/// One row of `stops.txt`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct StopRow {
    pub stop_id: String,
    pub stop_name: String,
    pub stop_lat: f64,
    pub stop_lon: f64,
    pub location_type: Option<u8>,
    pub parent_station: Option<String>,
}

/// One row of `routes.txt`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RouteRow {
    pub route_id: String,
    pub agency_id: Option<String>,
    pub route_short_name: Option<String>,
    pub route_long_name: Option<String>,
    pub route_type: i32,
}

/// One row of `trips.txt`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TripRow {
    pub route_id: String,
    pub service_id: String,
    pub trip_id: String,
    pub trip_headsign: Option<String>,
    pub trip_short_name: Option<String>,
}

/// One row of `stop_times.txt`. Times are kept as text here; conversion to integer
/// seconds happens when the feed loader normalizes rows into the repository, per
/// spec.md §4.B.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct StopTimeRow {
    pub trip_id: String,
    pub arrival_time: String,
    pub departure_time: String,
    pub stop_id: String,
    pub stop_sequence: u16,
}

/// One row of `transfers.txt`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TransferRow {
    pub from_stop_id: String,
    pub to_stop_id: String,
    pub min_transfer_time: Option<u32>,
}

/// One row of `calendar.txt`. `*_day` fields use GTFS's own `0`/`1` convention.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CalendarRow {
    pub service_id: String,
    pub monday: u8,
    pub tuesday: u8,
    pub wednesday: u8,
    pub thursday: u8,
    pub friday: u8,
    pub saturday: u8,
    pub sunday: u8,
    pub start_date: String,
    pub end_date: String,
}

/// One row of `calendar_dates.txt`.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CalendarDateRow {
    pub service_id: String,
    pub date: String,
    pub exception_type: u8,
}

/// A fully loaded, in-memory GTFS feed: plain row vectors, not yet indexed. This is
/// the boundary the RAPTOR core actually consumes — whether these vectors came from
/// a zip archive, a directory of text files, or were constructed by hand in a test,
/// is of no concern past this point.
#[derive(Debug, Default, Clone)]
pub struct GtfsData {
    pub stops: Vec<StopRow>,
    pub routes: Vec<RouteRow>,
    pub trips: Vec<TripRow>,
    pub stop_times: Vec<StopTimeRow>,
    pub transfers: Vec<TransferRow>,
    pub calendar: Vec<CalendarRow>,
    pub calendar_dates: Vec<CalendarDateRow>,
}
