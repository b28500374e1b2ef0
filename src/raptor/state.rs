use crate::shared::Time;

/// How a leg of a journey was traversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegMode {
    Walk,
    Trip(u32),
}

impl LegMode {
    pub fn is_trip(&self) -> bool {
        matches!(self, LegMode::Trip(_))
    }
}

/// One parent pointer in the backtracking graph: how a stop was reached in a given
/// round, and from where. Mirrors spec's `ParentRecord` exactly (`prev_stop`,
/// `prev_round`, `mode`, `board_or_walk_start_time`, `arrive_time`); `leg_duration`
/// is derived rather than stored, since it is always `arrive_time -
/// board_or_walk_start_time`.
#[derive(Debug, Clone, Copy)]
pub struct ParentRecord {
    pub prev_stop: u32,
    pub prev_round: usize,
    pub mode: LegMode,
    pub board_or_walk_start_time: Time,
    pub arrive_time: Time,
}

impl ParentRecord {
    pub fn leg_duration(&self) -> crate::shared::Duration {
        self.arrive_time - self.board_or_walk_start_time
    }
}

/// A pending improvement to a stop's arrival time within the round currently being
/// relaxed. Collected into a batch and applied all at once at the end of a phase, so
/// a stop improved by a route scan in this round cannot itself be re-scanned by a
/// later route in the same round (each round strictly uses only the previous
/// round's labels as input).
#[derive(Debug, Clone, Copy)]
pub struct Update {
    pub stop_idx: u32,
    pub arrival_time: Time,
    pub parent: ParentRecord,
}
