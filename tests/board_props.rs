//! Property tests for board geometry and fleet generation.

use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use armada_server::game::{fleet, Board, CellState, Orientation, Ship, BOARD_SIZE};

proptest! {
    #[test]
    fn random_fleets_are_canonical(seed in any::<u64>()) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let board = fleet::random_board(&mut rng).unwrap();

        prop_assert_eq!(board.ships().len(), 5);

        let mut sizes: Vec<u8> = board.ships().iter().map(|s| s.size()).collect();
        sizes.sort_unstable();
        prop_assert_eq!(sizes, vec![2, 3, 3, 4, 5]);

        let ship_cells = (0..BOARD_SIZE)
            .flat_map(|x| (0..BOARD_SIZE).map(move |y| (x, y)))
            .filter(|&(x, y)| board.cell(x, y) == Some(CellState::Ship))
            .count();
        prop_assert_eq!(ship_cells, 17);
    }

    #[test]
    fn repeated_shots_never_change_the_outcome(
        seed in any::<u64>(),
        x in 0u8..BOARD_SIZE,
        y in 0u8..BOARD_SIZE,
    ) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut board = fleet::random_board(&mut rng).unwrap();

        board.receive_shot(x, y).unwrap();
        let resolved = board.cell(x, y);

        // a resolved cell never flips and a repeat never reports a hit
        let repeat = board.receive_shot(x, y).unwrap();
        prop_assert!(!repeat);
        prop_assert_eq!(board.cell(x, y), resolved);
    }

    #[test]
    fn oversized_placements_are_rejected(
        x in (BOARD_SIZE - 4)..BOARD_SIZE,
        y in 0u8..BOARD_SIZE,
    ) {
        let mut board = Board::new();
        let coords = fleet::ship_coordinates(x, y, 5, Orientation::Horizontal);
        let ship = Ship::new("Carrier", 5, Orientation::Horizontal, coords);

        prop_assert!(board.add_ship(ship).is_err());
    }
}
