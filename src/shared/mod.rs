pub mod geo;
pub mod time;

pub use geo::{AeqdProjection, Cell, Coordinate, Distance, Projected};
pub use time::{Duration, Time};
