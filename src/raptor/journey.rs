use crate::raptor::state::LegMode;
use crate::shared::Time;

/// One leg of a reconstructed journey: either riding a single trip from one stop to
/// another, or walking a footpath between two stops.
#[derive(Debug, Clone, Copy)]
pub struct JourneyLeg {
    pub from_stop_idx: u32,
    pub to_stop_idx: u32,
    pub mode: LegMode,
    pub depart_time: Time,
    pub arrive_time: Time,
}

impl JourneyLeg {
    pub fn duration(&self) -> crate::shared::Duration {
        self.arrive_time - self.depart_time
    }
}

/// A complete earliest-arrival itinerary from an origin to a destination stop, as
/// produced by [`crate::raptor::path::backtrack`].
#[derive(Debug, Clone)]
pub struct Journey {
    pub legs: Vec<JourneyLeg>,
    pub departure_time: Time,
    pub arrival_time: Time,
    pub transfer_count: usize,
}

impl Journey {
    pub fn total_duration(&self) -> crate::shared::Duration {
        self.arrival_time - self.departure_time
    }
}
