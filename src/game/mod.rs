//! Naval combat domain: boards, fleets, matches, and targeting strategies

pub mod board;
pub mod fleet;
pub mod r#match;
pub mod strategy;

pub use board::{Board, CellState, Coordinate, Orientation, Ship, BOARD_SIZE};
pub use r#match::{CancelOutcome, Match, MatchStatus};
pub use strategy::{strategy_for, TargetingStrategy};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Rule set of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    /// Ships stay where they were placed.
    Classic,
    /// Ships may move one cell per turn.
    Dynamic,
}

/// Skill tier of the automated opponent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Basic,
    Intermediate,
    Advanced,
}

/// One step of ship movement in dynamic mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveDirection {
    Up,
    Down,
    Left,
    Right,
}

/// A side in a match: a real player or the server-driven opponent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Combatant {
    Player(Uuid),
    AutomatedOpponent,
}

impl Combatant {
    /// The player id when this side is a real player.
    pub fn player_id(&self) -> Option<Uuid> {
        match self {
            Combatant::Player(id) => Some(*id),
            Combatant::AutomatedOpponent => None,
        }
    }
}

/// Rule violations raised by boards and matches.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameError {
    #[error("{axis} coordinate {value} is outside the board")]
    CoordinateOutOfRange { axis: &'static str, value: u8 },
    #[error("ship coordinate ({x}, {y}) is outside the board")]
    ShipOutOfBounds { x: u8, y: u8 },
    #[error("moving in that direction would take the ship off the board")]
    MoveOutOfBounds,
    #[error("cell ({x}, {y}) is already occupied by another ship")]
    CellOccupied { x: u8, y: u8 },
    #[error("ship {0} was not found on this board")]
    ShipNotFound(Uuid),
    #[error("a fleet must field ships of sizes 5, 4, 3, 3 and 2")]
    InvalidFleet,
    #[error("no valid placement found for a ship of size {size}")]
    PlacementExhausted { size: u8 },
    #[error("that side does not belong to this match")]
    UnknownSide,
    #[error("the match is not in the setup phase")]
    NotInSetup,
    #[error("the match is not in progress")]
    NotInProgress,
    #[error("the match is already finished")]
    AlreadyFinished,
    #[error("it is not this side's turn")]
    NotYourTurn,
    #[error("the turn time budget was exceeded and the turn has passed to the opponent")]
    TurnTimeout,
    #[error("ship movement is only allowed in dynamic mode")]
    MovementNotAllowed,
}
