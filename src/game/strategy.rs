//! Targeting strategies for the automated opponent

use std::cmp::Ordering;

use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use super::board::{Board, CellState, BOARD_SIZE};
use super::Difficulty;

type DensityGrid = [[f64; BOARD_SIZE as usize]; BOARD_SIZE as usize];

/// Weight multiplier for candidate runs crossing an unresolved hit.
const HIT_BIAS: f64 = 8.0;

/// Picks the automated opponent's next shot from the public shot history of
/// the opposing board. Implementations must only return unresolved cells;
/// `None` means nothing is left to target.
pub trait TargetingStrategy: Send + Sync {
    fn choose_target(&self, board: &Board, rng: &mut ChaCha8Rng) -> Option<(u8, u8)>;
}

/// Total mapping from a difficulty to its strategy.
pub fn strategy_for(difficulty: Difficulty) -> Box<dyn TargetingStrategy> {
    match difficulty {
        Difficulty::Basic => Box::new(RandomTargeting),
        Difficulty::Intermediate => Box::new(DensityTargeting),
        Difficulty::Advanced => Box::new(HuntTargeting),
    }
}

/// Uniform choice among the untried cells.
pub struct RandomTargeting;

impl TargetingStrategy for RandomTargeting {
    fn choose_target(&self, board: &Board, rng: &mut ChaCha8Rng) -> Option<(u8, u8)> {
        let open = board.untried_cells();
        open.choose(rng).copied()
    }
}

/// Samples untried cells weighted by how many placements of the still-afloat
/// ships could cover them.
pub struct DensityTargeting;

impl TargetingStrategy for DensityTargeting {
    fn choose_target(&self, board: &Board, rng: &mut ChaCha8Rng) -> Option<(u8, u8)> {
        let open = board.untried_cells();
        let density = placement_density(board);
        weighted_sample(&open, &density, rng).or_else(|| open.choose(rng).copied())
    }
}

/// Hunts around unresolved hits, extending detected lines first; with no
/// open lead it takes the densest untried cell.
pub struct HuntTargeting;

impl TargetingStrategy for HuntTargeting {
    fn choose_target(&self, board: &Board, rng: &mut ChaCha8Rng) -> Option<(u8, u8)> {
        if let Some(cell) = hunt_around_hits(board, rng) {
            return Some(cell);
        }
        let density = placement_density(board);
        board.untried_cells().into_iter().max_by(|a, b| {
            let wa = density[a.0 as usize][a.1 as usize];
            let wb = density[b.0 as usize][b.1 as usize];
            wa.partial_cmp(&wb).unwrap_or(Ordering::Equal)
        })
    }
}

/// Density of possible placements for the ships still afloat. Misses and
/// sunk wreckage block a run; unresolved hits multiply its weight.
fn placement_density(board: &Board) -> DensityGrid {
    let mut density = [[0.0; BOARD_SIZE as usize]; BOARD_SIZE as usize];
    let unresolved = board.unresolved_hits();
    for size in board.afloat_sizes() {
        for y in 0..BOARD_SIZE {
            for x in 0..BOARD_SIZE {
                if x + size <= BOARD_SIZE {
                    let run: Vec<(u8, u8)> = (0..size).map(|i| (x + i, y)).collect();
                    accumulate_run(board, &unresolved, &mut density, &run);
                }
                if y + size <= BOARD_SIZE {
                    let run: Vec<(u8, u8)> = (0..size).map(|i| (x, y + i)).collect();
                    accumulate_run(board, &unresolved, &mut density, &run);
                }
            }
        }
    }
    density
}

fn accumulate_run(
    board: &Board,
    unresolved: &[(u8, u8)],
    density: &mut DensityGrid,
    run: &[(u8, u8)],
) {
    let mut weight = 1.0;
    for &(x, y) in run {
        match board.cell(x, y) {
            Some(CellState::Missed) => return,
            Some(CellState::Hit) => {
                if unresolved.contains(&(x, y)) {
                    weight *= HIT_BIAS;
                } else {
                    return;
                }
            }
            _ => {}
        }
    }
    for &(x, y) in run {
        if matches!(board.cell(x, y), Some(CellState::Water | CellState::Ship)) {
            density[x as usize][y as usize] += weight;
        }
    }
}

fn weighted_sample(
    open: &[(u8, u8)],
    density: &DensityGrid,
    rng: &mut ChaCha8Rng,
) -> Option<(u8, u8)> {
    let total: f64 = open
        .iter()
        .map(|&(x, y)| density[x as usize][y as usize])
        .sum();
    if total <= 0.0 {
        return None;
    }
    let mut roll = rng.gen::<f64>() * total;
    for &(x, y) in open {
        roll -= density[x as usize][y as usize];
        if roll <= 0.0 {
            return Some((x, y));
        }
    }
    open.last().copied()
}

fn hunt_around_hits(board: &Board, rng: &mut ChaCha8Rng) -> Option<(u8, u8)> {
    let hits = board.unresolved_hits();
    if hits.is_empty() {
        return None;
    }
    let is_open = |x: u8, y: u8| {
        matches!(
            board.cell(x, y),
            Some(CellState::Water | CellState::Ship)
        )
    };

    let open_ends: Vec<(u8, u8)> = line_extensions(&hits)
        .into_iter()
        .filter(|&(x, y)| is_open(x, y))
        .collect();
    if let Some(&cell) = open_ends.choose(rng) {
        return Some(cell);
    }

    let mut neighbors = Vec::new();
    for &(x, y) in &hits {
        for (nx, ny) in orthogonal(x, y) {
            if is_open(nx, ny) {
                neighbors.push((nx, ny));
            }
        }
    }
    neighbors.sort_unstable();
    neighbors.dedup();
    neighbors.choose(rng).copied()
}

fn orthogonal(x: u8, y: u8) -> Vec<(u8, u8)> {
    let mut cells = Vec::with_capacity(4);
    if y > 0 {
        cells.push((x, y - 1));
    }
    if y + 1 < BOARD_SIZE {
        cells.push((x, y + 1));
    }
    if x > 0 {
        cells.push((x - 1, y));
    }
    if x + 1 < BOARD_SIZE {
        cells.push((x + 1, y));
    }
    cells
}

/// Cells just beyond each contiguous run of two or more hits.
fn line_extensions(hits: &[(u8, u8)]) -> Vec<(u8, u8)> {
    let mut ends = Vec::new();
    let hit = |x: u8, y: u8| hits.contains(&(x, y));
    for &(x, y) in hits {
        // walk each run once, from its lowest cell
        if x + 1 < BOARD_SIZE && hit(x + 1, y) && (x == 0 || !hit(x - 1, y)) {
            let mut end = x + 1;
            while end + 1 < BOARD_SIZE && hit(end + 1, y) {
                end += 1;
            }
            if x > 0 {
                ends.push((x - 1, y));
            }
            if end + 1 < BOARD_SIZE {
                ends.push((end + 1, y));
            }
        }
        if y + 1 < BOARD_SIZE && hit(x, y + 1) && (y == 0 || !hit(x, y - 1)) {
            let mut end = y + 1;
            while end + 1 < BOARD_SIZE && hit(x, end + 1) {
                end += 1;
            }
            if y > 0 {
                ends.push((x, y - 1));
            }
            if end + 1 < BOARD_SIZE {
                ends.push((x, end + 1));
            }
        }
    }
    ends
}
