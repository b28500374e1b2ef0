use std::collections::HashMap;

use rayon::prelude::*;

use crate::repository::entities::{Stop, Transfer};
use crate::shared::{Cell, Distance, Duration};

/// A uniform grid over the projected plane, cell size equal to the footpath search
/// radius, so a candidate search only ever has to look at a stop's own cell and its
/// eight neighbors instead of scanning every stop in the feed.
struct Grid {
    cell_size: f64,
    cells: HashMap<Cell, Vec<u32>>,
}

impl Grid {
    fn build(stops: &[Stop], cell_size: f64) -> Self {
        let mut cells: HashMap<Cell, Vec<u32>> = HashMap::new();
        for stop in stops {
            cells.entry(stop.projected.to_cell(cell_size)).or_default().push(stop.index);
        }
        Self { cell_size, cells }
    }

    fn candidates_near(&self, cell: Cell) -> impl Iterator<Item = u32> + '_ {
        let (cx, cy) = cell;
        (-1..=1).flat_map(move |dx| (-1..=1).map(move |dy| (cx + dx, cy + dy))).flat_map(move |neighbor| {
            self.cells.get(&neighbor).into_iter().flatten().copied()
        })
    }
}

/// Builds the symmetric footpath graph: an edge between every pair of stops within
/// `radius` of each other on the projected plane, weighted by walk time at
/// `walking_speed_mps`. Mirrors the teacher's grid-bucket nearest-neighbor search
/// (`stops_by_coordinate`), generalized from a single point lookup to an
/// all-pairs-within-radius scan run once at load time.
pub fn build_transfers(stops: &[Stop], radius: Distance, walking_speed_mps: f64) -> Vec<Transfer> {
    let grid = Grid::build(stops, radius.as_meters());

    stops
        .par_iter()
        .flat_map(|from| {
            let cell = from.projected.to_cell(grid.cell_size);
            grid.candidates_near(cell)
                .filter(|&to_idx| to_idx != from.index)
                .filter_map(|to_idx| {
                    let to = &stops[to_idx as usize];
                    let distance = from.projected.euclidean_distance(&to.projected);
                    if distance <= radius {
                        let walk_time = Duration::from_seconds_f64(distance.as_meters() / walking_speed_mps);
                        Some(Transfer {
                            from_stop_idx: from.index,
                            to_stop_idx: to.index,
                            walk_time,
                        })
                    } else {
                        None
                    }
                })
                .collect::<Vec<_>>()
        })
        .collect()
}
