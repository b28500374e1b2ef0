pub mod entities;
pub mod footpath;
pub mod index;
pub mod source;

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::raptor::Raptor;
use entities::{RaptorRoute, Route, Stop, StopMeta, Transfer, Trip};
use index::{ByStopIndex, ByTripIndex};

#[derive(Error, Debug)]
pub enum Error {
    #[error("stop `{0}` does not appear in the feed")]
    UnknownStop(String),
    #[error("data inconsistency: {0}")]
    DataInconsistency(String),
}

/// Load-time geometry settings: these affect which footpath edges exist at all, so
/// unlike the per-query engine settings they are baked into the repository once and
/// cannot be changed without rebuilding it.
#[derive(Debug, Clone, Copy)]
pub struct LoadConfig {
    pub footpath_radius_m: f64,
    pub walking_speed_mps: f64,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            footpath_radius_m: 320.0,
            walking_speed_mps: 1.4,
        }
    }
}

/// The read-only, immutable schedule store a query runs against. Everything here is
/// interned into dense `u32` indices and packed into boxed slices at load time, so a
/// query thread only ever does array indexing and binary search, never a hash lookup
/// or an allocation, on its hot path.
#[derive(Debug)]
pub struct Repository {
    pub(crate) stops: Box<[Stop]>,
    pub(crate) routes: Box<[Route]>,
    pub(crate) trips: Box<[Trip]>,
    pub(crate) raptor_routes: Box<[RaptorRoute]>,
    pub(crate) transfers: Box<[Transfer]>,
    pub(crate) transfer_offsets: Box<[u32]>,
    pub(crate) stop_meta: Box<[StopMeta]>,
    pub(crate) stop_lookup: HashMap<Arc<str>, u32>,
    pub(crate) by_stop_index: ByStopIndex,
    pub(crate) by_trip_index: ByTripIndex,
}

impl Repository {
    /// Builds a repository from already-parsed GTFS rows. `config` controls the
    /// footpath radius and walking speed baked into the resulting footpath graph.
    pub fn from_gtfs_data(data: crate::gtfs::GtfsData, config: LoadConfig) -> Result<Self, Error> {
        source::gtfs::load(data, config)
    }

    pub fn stop_count(&self) -> usize {
        self.stops.len()
    }

    pub fn stop_index(&self, stop_id: &str) -> Result<u32, Error> {
        self.stop_lookup
            .get(stop_id)
            .copied()
            .ok_or_else(|| Error::UnknownStop(stop_id.to_string()))
    }

    pub fn stop(&self, stop_idx: u32) -> &Stop {
        &self.stops[stop_idx as usize]
    }

    pub fn trip(&self, trip_idx: u32) -> &Trip {
        &self.trips[trip_idx as usize]
    }

    pub fn route(&self, route_idx: u32) -> &Route {
        &self.routes[route_idx as usize]
    }

    pub fn raptor_route(&self, raptor_route_idx: u32) -> &RaptorRoute {
        &self.raptor_routes[raptor_route_idx as usize]
    }

    pub fn stop_meta(&self, stop_idx: u32) -> &StopMeta {
        &self.stop_meta[stop_idx as usize]
    }

    pub fn by_stop_index(&self) -> &ByStopIndex {
        &self.by_stop_index
    }

    pub fn by_trip_index(&self) -> &ByTripIndex {
        &self.by_trip_index
    }

    /// Footpaths originating at `stop_idx`, including the implicit zero-length
    /// self-loop is never included — only genuine walk edges to other stops.
    pub fn transfers_from(&self, stop_idx: u32) -> &[Transfer] {
        let start = self.transfer_offsets[stop_idx as usize] as usize;
        let end = self.transfer_offsets[stop_idx as usize + 1] as usize;
        &self.transfers[start..end]
    }

    /// Entry point into the RAPTOR solver: borrows this repository for the lifetime
    /// of the query, per the crate's "read-only shared index, per-query allocator"
    /// concurrency model.
    pub fn router(&self) -> Raptor<'_> {
        Raptor::new(self)
    }
}
