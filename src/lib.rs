//! An in-memory RAPTOR (Round-bAsed Public Transit Optimized Router) engine.
//!
//! Load a schedule into a [`repository::Repository`] — either by hand from parsed
//! [`gtfs::GtfsData`] rows, or conveniently from a `.zip` archive or directory via
//! [`gtfs::Gtfs`] — then run earliest-arrival queries against it with
//! [`repository::Repository::router`].

pub mod gtfs;
pub mod raptor;
pub mod repository;
pub mod shared;

pub use raptor::{EngineConfig, Raptor};
pub use repository::{LoadConfig, Repository};
