//! Fleet composition and placement geometry

use rand::Rng;

use super::board::{Board, Coordinate, Orientation, Ship, BOARD_SIZE};
use super::GameError;

/// Name and size of every ship a side must field.
pub const FLEET: [(&str, u8); 5] = [
    ("Carrier", 5),
    ("Battleship", 4),
    ("Submarine", 3),
    ("Destroyer", 3),
    ("Patrol Boat", 2),
];

/// Random draws allowed per ship before placement is abandoned.
const PLACEMENT_ATTEMPTS: u32 = 100;

/// Contiguous coordinates for a ship laid from an origin cell along its
/// orientation axis. Bounds are not checked here; `Board::add_ship` is the
/// single validation point.
pub fn ship_coordinates(x: u8, y: u8, size: u8, orientation: Orientation) -> Vec<Coordinate> {
    (0..size)
        .map(|i| match orientation {
            Orientation::Horizontal => Coordinate::new(x.saturating_add(i), y),
            Orientation::Vertical => Coordinate::new(x, y.saturating_add(i)),
        })
        .collect()
}

/// Checks a submitted multiset of ship sizes against the canonical fleet.
pub fn validate_composition(sizes: &[u8]) -> Result<(), GameError> {
    let mut expected: Vec<u8> = FLEET.iter().map(|(_, size)| *size).collect();
    let mut submitted = sizes.to_vec();
    expected.sort_unstable();
    submitted.sort_unstable();
    if expected == submitted {
        Ok(())
    } else {
        Err(GameError::InvalidFleet)
    }
}

/// Builds a fresh board carrying the full canonical fleet at random
/// positions. Each ship gets up to `PLACEMENT_ATTEMPTS` origin/orientation
/// draws; running out is an error rather than a partial fleet.
pub fn random_board<R: Rng + ?Sized>(rng: &mut R) -> Result<Board, GameError> {
    let mut board = Board::new();
    for (name, size) in FLEET {
        let mut placed = false;
        for _ in 0..PLACEMENT_ATTEMPTS {
            let orientation = if rng.gen_bool(0.5) {
                Orientation::Horizontal
            } else {
                Orientation::Vertical
            };
            let x = rng.gen_range(0..BOARD_SIZE);
            let y = rng.gen_range(0..BOARD_SIZE);
            let ship = Ship::new(name, size, orientation, ship_coordinates(x, y, size, orientation));
            if board.add_ship(ship).is_ok() {
                placed = true;
                break;
            }
        }
        if !placed {
            return Err(GameError::PlacementExhausted { size });
        }
    }
    Ok(board)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::game::CellState;

    #[test]
    fn coordinates_run_along_the_orientation_axis() {
        let horizontal = ship_coordinates(2, 7, 3, Orientation::Horizontal);
        let xs: Vec<u8> = horizontal.iter().map(Coordinate::x).collect();
        assert_eq!(xs, vec![2, 3, 4]);
        assert!(horizontal.iter().all(|c| c.y() == 7));

        let vertical = ship_coordinates(4, 1, 4, Orientation::Vertical);
        let ys: Vec<u8> = vertical.iter().map(Coordinate::y).collect();
        assert_eq!(ys, vec![1, 2, 3, 4]);
        assert!(vertical.iter().all(|c| c.x() == 4));
    }

    #[test]
    fn composition_accepts_the_canonical_fleet_in_any_order() {
        assert_eq!(validate_composition(&[3, 5, 2, 4, 3]), Ok(()));
    }

    #[test]
    fn composition_rejects_wrong_sizes() {
        assert_eq!(validate_composition(&[5, 4, 3, 3]), Err(GameError::InvalidFleet));
        assert_eq!(
            validate_composition(&[5, 4, 3, 3, 3]),
            Err(GameError::InvalidFleet)
        );
        assert_eq!(validate_composition(&[]), Err(GameError::InvalidFleet));
    }

    #[test]
    fn random_board_carries_the_full_fleet() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let board = random_board(&mut rng).expect("placement succeeds");
        assert_eq!(board.ships().len(), FLEET.len());

        let mut sizes: Vec<u8> = board.ships().iter().map(Ship::size).collect();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![2, 3, 3, 4, 5]);

        let ship_cells = (0..BOARD_SIZE)
            .flat_map(|x| (0..BOARD_SIZE).map(move |y| (x, y)))
            .filter(|&(x, y)| board.cell(x, y) == Some(CellState::Ship))
            .count();
        assert_eq!(ship_cells, 17);
    }

    #[test]
    fn random_board_is_reproducible_for_a_seed() {
        let mut a = ChaCha8Rng::seed_from_u64(42);
        let mut b = ChaCha8Rng::seed_from_u64(42);
        let left = random_board(&mut a).expect("placement succeeds");
        let right = random_board(&mut b).expect("placement succeeds");
        for (l, r) in left.ships().iter().zip(right.ships().iter()) {
            assert_eq!(l.coordinates(), r.coordinates());
        }
    }
}
