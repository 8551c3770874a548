//! Board geometry: coordinates, ships, and shot resolution

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{GameError, MoveDirection};

/// Side length of the square grid.
pub const BOARD_SIZE: u8 = 10;

type Grid = [[CellState; BOARD_SIZE as usize]; BOARD_SIZE as usize];

/// Axis a ship lies along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// State of a single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellState {
    Water,
    Ship,
    Hit,
    Missed,
}

/// A single board position.
///
/// Equality and hashing consider position only, so a damaged coordinate still
/// compares equal to its pristine counterpart. Damage is applied by building a
/// new value, never by mutating in place.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Coordinate {
    x: u8,
    y: u8,
    is_hit: bool,
}

impl Coordinate {
    pub fn new(x: u8, y: u8) -> Self {
        Self { x, y, is_hit: false }
    }

    pub fn x(&self) -> u8 {
        self.x
    }

    pub fn y(&self) -> u8 {
        self.y
    }

    pub fn is_hit(&self) -> bool {
        self.is_hit
    }

    /// Copy of this coordinate with the hit marker set.
    pub fn as_hit(self) -> Self {
        Self { is_hit: true, ..self }
    }

    pub fn is_within_bounds(&self) -> bool {
        self.x < BOARD_SIZE && self.y < BOARD_SIZE
    }

    /// Position one cell away in `direction`, when it stays on the board.
    /// The hit marker travels with the coordinate.
    pub fn step(&self, direction: MoveDirection) -> Option<Coordinate> {
        let (x, y) = match direction {
            MoveDirection::Up => (Some(self.x), self.y.checked_sub(1)),
            MoveDirection::Down => (Some(self.x), self.y.checked_add(1)),
            MoveDirection::Left => (self.x.checked_sub(1), Some(self.y)),
            MoveDirection::Right => (self.x.checked_add(1), Some(self.y)),
        };
        let stepped = Self {
            x: x?,
            y: y?,
            is_hit: self.is_hit,
        };
        stepped.is_within_bounds().then_some(stepped)
    }
}

impl PartialEq for Coordinate {
    fn eq(&self, other: &Self) -> bool {
        self.x == other.x && self.y == other.y
    }
}

impl Eq for Coordinate {}

impl Hash for Coordinate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.x.hash(state);
        self.y.hash(state);
    }
}

/// A fleet unit occupying a contiguous run of cells.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ship {
    id: Uuid,
    name: String,
    size: u8,
    orientation: Orientation,
    coordinates: Vec<Coordinate>,
}

impl Ship {
    pub fn new(
        name: impl Into<String>,
        size: u8,
        orientation: Orientation,
        coordinates: Vec<Coordinate>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            size,
            orientation,
            coordinates,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u8 {
        self.size
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn coordinates(&self) -> &[Coordinate] {
        &self.coordinates
    }

    /// A ship with no undamaged coordinate left is sunk.
    pub fn is_sunk(&self) -> bool {
        !self.coordinates.is_empty() && self.coordinates.iter().all(Coordinate::is_hit)
    }

    pub fn occupies(&self, x: u8, y: u8) -> bool {
        self.coordinates.iter().any(|c| c.x == x && c.y == y)
    }

    /// Coordinate set after one step in `direction`, or `None` when any cell
    /// would leave the board.
    fn stepped_coordinates(&self, direction: MoveDirection) -> Option<Vec<Coordinate>> {
        self.coordinates.iter().map(|c| c.step(direction)).collect()
    }

    /// Marks the coordinate at `target` as hit, replacing the list wholesale.
    fn apply_damage(&mut self, target: Coordinate) {
        self.coordinates = self
            .coordinates
            .iter()
            .map(|c| if *c == target { c.as_hit() } else { *c })
            .collect();
    }

    fn replace_coordinates(&mut self, coordinates: Vec<Coordinate>) {
        self.coordinates = coordinates;
    }
}

/// One side's 10x10 grid plus its fleet. The grid mirrors the ships at all
/// times: a cell is `Ship` exactly when an undamaged coordinate covers it,
/// while `Hit` and `Missed` record resolved shots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    cells: Grid,
    ships: Vec<Ship>,
}

impl Board {
    pub fn new() -> Self {
        Self {
            cells: [[CellState::Water; BOARD_SIZE as usize]; BOARD_SIZE as usize],
            ships: Vec::new(),
        }
    }

    pub fn ships(&self) -> &[Ship] {
        &self.ships
    }

    pub fn ship(&self, id: Uuid) -> Option<&Ship> {
        self.ships.iter().find(|s| s.id == id)
    }

    /// The ship covering (x, y), if any.
    pub fn ship_at(&self, x: u8, y: u8) -> Option<&Ship> {
        self.ships.iter().find(|s| s.occupies(x, y))
    }

    /// Cell state at (x, y), or `None` off the board.
    pub fn cell(&self, x: u8, y: u8) -> Option<CellState> {
        if x < BOARD_SIZE && y < BOARD_SIZE {
            Some(self.cells[x as usize][y as usize])
        } else {
            None
        }
    }

    /// Places a ship after checking bounds and overlap for every coordinate.
    pub fn add_ship(&mut self, ship: Ship) -> Result<(), GameError> {
        self.validate_placement(ship.coordinates(), None)?;
        for c in ship.coordinates() {
            self.cells[c.x as usize][c.y as usize] = CellState::Ship;
        }
        self.ships.push(ship);
        Ok(())
    }

    /// Shifts a ship one cell, re-validating bounds and occupancy against
    /// every other ship. Resolved-shot cells left behind keep their state and
    /// damage markers travel with the ship.
    pub fn move_ship(&mut self, ship_id: Uuid, direction: MoveDirection) -> Result<(), GameError> {
        let index = self
            .ships
            .iter()
            .position(|s| s.id == ship_id)
            .ok_or(GameError::ShipNotFound(ship_id))?;
        let target = self.ships[index]
            .stepped_coordinates(direction)
            .ok_or(GameError::MoveOutOfBounds)?;
        self.validate_placement(&target, Some(ship_id))?;

        let old: Vec<Coordinate> = self.ships[index].coordinates().to_vec();
        for c in &old {
            if self.cells[c.x as usize][c.y as usize] == CellState::Ship {
                self.cells[c.x as usize][c.y as usize] = CellState::Water;
            }
        }
        for c in &target {
            self.cells[c.x as usize][c.y as usize] = if c.is_hit {
                CellState::Hit
            } else {
                CellState::Ship
            };
        }
        self.ships[index].replace_coordinates(target);
        Ok(())
    }

    /// Resolves a shot at (x, y). Returns whether something was hit; a cell
    /// that was already resolved is a no-effect shot and changes nothing.
    pub fn receive_shot(&mut self, x: u8, y: u8) -> Result<bool, GameError> {
        if x >= BOARD_SIZE {
            return Err(GameError::CoordinateOutOfRange {
                axis: "horizontal",
                value: x,
            });
        }
        if y >= BOARD_SIZE {
            return Err(GameError::CoordinateOutOfRange {
                axis: "vertical",
                value: y,
            });
        }
        match self.cells[x as usize][y as usize] {
            CellState::Hit | CellState::Missed => Ok(false),
            CellState::Ship => {
                let target = Coordinate::new(x, y);
                if let Some(ship) = self.ships.iter_mut().find(|s| s.occupies(x, y)) {
                    ship.apply_damage(target);
                }
                self.cells[x as usize][y as usize] = CellState::Hit;
                Ok(true)
            }
            CellState::Water => {
                self.cells[x as usize][y as usize] = CellState::Missed;
                Ok(false)
            }
        }
    }

    /// True only for a fleet that exists and is fully sunk. An empty board is
    /// never "all sunk".
    pub fn all_ships_sunk(&self) -> bool {
        !self.ships.is_empty() && self.ships.iter().all(Ship::is_sunk)
    }

    /// Cells with no resolved shot yet.
    pub fn untried_cells(&self) -> Vec<(u8, u8)> {
        let mut open = Vec::new();
        for x in 0..BOARD_SIZE {
            for y in 0..BOARD_SIZE {
                if matches!(
                    self.cells[x as usize][y as usize],
                    CellState::Water | CellState::Ship
                ) {
                    open.push((x, y));
                }
            }
        }
        open
    }

    /// Hit cells belonging to ships still afloat.
    pub fn unresolved_hits(&self) -> Vec<(u8, u8)> {
        self.ships
            .iter()
            .filter(|s| !s.is_sunk())
            .flat_map(|s| {
                s.coordinates()
                    .iter()
                    .filter(|c| c.is_hit)
                    .map(|c| (c.x, c.y))
            })
            .collect()
    }

    /// Sizes of the ships still afloat.
    pub fn afloat_sizes(&self) -> Vec<u8> {
        self.ships
            .iter()
            .filter(|s| !s.is_sunk())
            .map(Ship::size)
            .collect()
    }

    fn validate_placement(
        &self,
        coordinates: &[Coordinate],
        ignore_ship: Option<Uuid>,
    ) -> Result<(), GameError> {
        for c in coordinates {
            if !c.is_within_bounds() {
                return Err(GameError::ShipOutOfBounds { x: c.x, y: c.y });
            }
            let occupied = self
                .ships
                .iter()
                .filter(|s| Some(s.id) != ignore_ship)
                .any(|s| s.occupies(c.x, c.y));
            if occupied {
                return Err(GameError::CellOccupied { x: c.x, y: c.y });
            }
        }
        Ok(())
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}
