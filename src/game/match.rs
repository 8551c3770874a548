//! Match entity: phases, turns, shots, and cancellation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::board::Board;
use super::{Combatant, Difficulty, GameError, GameMode, MoveDirection};

/// Lifecycle phase of a match. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Setup,
    InProgress,
    Finished,
}

/// What a cancellation did, so the caller can persist accordingly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The match never started and should be removed outright.
    Discarded,
    /// The match was live; the non-cancelling side wins by forfeit.
    Forfeited { winner: Combatant },
}

/// A match between player1 and either a second player or the automated
/// opponent. Fields are private so the status, turn, and ready invariants
/// can only change through the operations below.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    id: Uuid,
    player1: Uuid,
    player2: Option<Uuid>,
    mode: GameMode,
    difficulty: Option<Difficulty>,
    status: MatchStatus,
    player1_board: Board,
    player2_board: Board,
    player1_ready: bool,
    player2_ready: bool,
    turn: Combatant,
    winner: Option<Combatant>,
    turn_timeout_secs: u64,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    last_move_at: Option<DateTime<Utc>>,
}

impl Match {
    pub fn new(
        player1: Uuid,
        mode: GameMode,
        player2: Option<Uuid>,
        difficulty: Option<Difficulty>,
        turn_timeout_secs: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            player1,
            player2,
            mode,
            difficulty,
            status: MatchStatus::Setup,
            player1_board: Board::new(),
            player2_board: Board::new(),
            player1_ready: false,
            player2_ready: false,
            turn: Combatant::Player(player1),
            winner: None,
            turn_timeout_secs,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            last_move_at: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn player1(&self) -> Uuid {
        self.player1
    }

    pub fn player2(&self) -> Option<Uuid> {
        self.player2
    }

    pub fn mode(&self) -> GameMode {
        self.mode
    }

    pub fn difficulty(&self) -> Option<Difficulty> {
        self.difficulty
    }

    pub fn status(&self) -> MatchStatus {
        self.status
    }

    pub fn is_finished(&self) -> bool {
        self.status == MatchStatus::Finished
    }

    pub fn turn(&self) -> Combatant {
        self.turn
    }

    pub fn winner(&self) -> Option<Combatant> {
        self.winner
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_participant(&self, player: Uuid) -> bool {
        self.player1 == player || self.player2 == Some(player)
    }

    /// True when this match runs against the automated opponent.
    pub fn is_automated(&self) -> bool {
        self.player2.is_none()
    }

    pub fn player1_board(&self) -> &Board {
        &self.player1_board
    }

    pub fn player2_board(&self) -> &Board {
        &self.player2_board
    }

    /// The board `actor` shoots at.
    pub fn opposing_board(&self, actor: Combatant) -> &Board {
        if self.is_side1(actor) {
            &self.player2_board
        } else {
            &self.player1_board
        }
    }

    /// Marks a side ready; a no-op outside setup or for an unknown side.
    /// The match starts the moment both sides are ready.
    pub fn set_ready(&mut self, side: Combatant) {
        if self.status != MatchStatus::Setup {
            return;
        }
        if self.is_side1(side) {
            self.player1_ready = true;
        } else if self.is_side2(side) {
            self.player2_ready = true;
        }
        if self.player1_ready && self.player2_ready {
            self.start();
        }
    }

    /// Installs a freshly built board for a side. Only legal during setup;
    /// resubmission replaces the previous board entirely.
    pub fn install_board(&mut self, side: Combatant, board: Board) -> Result<(), GameError> {
        if self.status != MatchStatus::Setup {
            return Err(GameError::NotInSetup);
        }
        if self.is_side1(side) {
            self.player1_board = board;
        } else if self.is_side2(side) {
            self.player2_board = board;
        } else {
            return Err(GameError::UnknownSide);
        }
        Ok(())
    }

    /// Resolves a shot by `actor` against the opposing board. A hit retains
    /// the turn, anything else passes it, and sinking the last ship finishes
    /// the match in this same call.
    pub fn execute_shot(&mut self, actor: Combatant, x: u8, y: u8) -> Result<bool, GameError> {
        self.validate_turn(actor)?;
        let hit = if self.is_side1(actor) {
            self.player2_board.receive_shot(x, y)?
        } else {
            self.player1_board.receive_shot(x, y)?
        };
        if self.opposing_board(actor).all_ships_sunk() {
            self.finish(actor);
        } else if !hit {
            self.pass_turn();
        }
        self.last_move_at = Some(Utc::now());
        Ok(hit)
    }

    /// Moves one of the actor's own ships. Dynamic mode only; a successful
    /// movement always passes the turn.
    pub fn execute_ship_movement(
        &mut self,
        actor: Combatant,
        ship_id: Uuid,
        direction: MoveDirection,
    ) -> Result<(), GameError> {
        if self.mode != GameMode::Dynamic {
            return Err(GameError::MovementNotAllowed);
        }
        self.validate_turn(actor)?;
        if self.is_side1(actor) {
            self.player1_board.move_ship(ship_id, direction)?;
        } else {
            self.player2_board.move_ship(ship_id, direction)?;
        }
        self.pass_turn();
        self.last_move_at = Some(Utc::now());
        Ok(())
    }

    /// Cancels the match on behalf of `actor`. During setup the match is
    /// simply discarded; a live match is forfeited to the opponent.
    pub fn cancel(&mut self, actor: Combatant) -> Result<CancelOutcome, GameError> {
        match self.status {
            MatchStatus::Finished => Err(GameError::AlreadyFinished),
            MatchStatus::Setup => Ok(CancelOutcome::Discarded),
            MatchStatus::InProgress => {
                let winner = self.opponent_of(actor);
                self.finish(winner);
                Ok(CancelOutcome::Forfeited { winner })
            }
        }
    }

    fn validate_turn(&mut self, actor: Combatant) -> Result<(), GameError> {
        match self.status {
            MatchStatus::Setup => return Err(GameError::NotInProgress),
            MatchStatus::Finished => return Err(GameError::AlreadyFinished),
            MatchStatus::InProgress => {}
        }
        if self.turn != actor {
            return Err(GameError::NotYourTurn);
        }
        if self.turn_expired() {
            // the forced pass restarts the clock so the opponent can act
            self.pass_turn();
            self.last_move_at = Some(Utc::now());
            return Err(GameError::TurnTimeout);
        }
        Ok(())
    }

    fn turn_expired(&self) -> bool {
        match self.last_move_at {
            Some(at) => {
                (Utc::now() - at).num_milliseconds() > (self.turn_timeout_secs as i64) * 1000
            }
            None => false,
        }
    }

    fn is_side1(&self, side: Combatant) -> bool {
        matches!(side, Combatant::Player(id) if id == self.player1)
    }

    fn is_side2(&self, side: Combatant) -> bool {
        match side {
            Combatant::Player(id) => self.player2 == Some(id),
            Combatant::AutomatedOpponent => self.player2.is_none(),
        }
    }

    fn opponent_of(&self, side: Combatant) -> Combatant {
        if self.is_side1(side) {
            self.player2
                .map(Combatant::Player)
                .unwrap_or(Combatant::AutomatedOpponent)
        } else {
            Combatant::Player(self.player1)
        }
    }

    fn pass_turn(&mut self) {
        self.turn = self.opponent_of(self.turn);
    }

    fn start(&mut self) {
        let now = Utc::now();
        self.status = MatchStatus::InProgress;
        self.turn = Combatant::Player(self.player1);
        self.started_at = Some(now);
        self.last_move_at = Some(now);
    }

    fn finish(&mut self, winner: Combatant) {
        self.status = MatchStatus::Finished;
        self.winner = Some(winner);
        self.finished_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::board::{Coordinate, Orientation, Ship};

    fn patrol_boat(x: u8, y: u8) -> Ship {
        Ship::new(
            "Patrol Boat",
            2,
            Orientation::Horizontal,
            vec![Coordinate::new(x, y), Coordinate::new(x + 1, y)],
        )
    }

    fn board_with_patrol(x: u8, y: u8) -> Board {
        let mut board = Board::new();
        board.add_ship(patrol_boat(x, y)).expect("placement fits");
        board
    }

    /// Automated match with one patrol boat per side, already in progress.
    fn live_automated_match(mode: GameMode, timeout_secs: u64) -> (Match, Uuid) {
        let p1 = Uuid::new_v4();
        let mut game = Match::new(p1, mode, None, Some(Difficulty::Basic), timeout_secs);
        game.install_board(Combatant::Player(p1), board_with_patrol(0, 0))
            .expect("setup phase");
        game.install_board(Combatant::AutomatedOpponent, board_with_patrol(0, 0))
            .expect("setup phase");
        game.set_ready(Combatant::Player(p1));
        game.set_ready(Combatant::AutomatedOpponent);
        (game, p1)
    }

    #[test]
    fn both_sides_ready_starts_the_match() {
        let p1 = Uuid::new_v4();
        let p2 = Uuid::new_v4();
        let mut game = Match::new(p1, GameMode::Classic, Some(p2), None, 300);
        assert_eq!(game.status(), MatchStatus::Setup);
        game.set_ready(Combatant::Player(p1));
        assert_eq!(game.status(), MatchStatus::Setup);
        game.set_ready(Combatant::Player(p2));
        assert_eq!(game.status(), MatchStatus::InProgress);
        assert_eq!(game.turn(), Combatant::Player(p1));
    }

    #[test]
    fn ready_for_a_stranger_is_ignored() {
        let p1 = Uuid::new_v4();
        let mut game = Match::new(p1, GameMode::Classic, Some(Uuid::new_v4()), None, 300);
        game.set_ready(Combatant::Player(p1));
        game.set_ready(Combatant::Player(Uuid::new_v4()));
        assert_eq!(game.status(), MatchStatus::Setup);
    }

    #[test]
    fn shot_before_start_is_rejected() {
        let p1 = Uuid::new_v4();
        let mut game = Match::new(p1, GameMode::Classic, None, Some(Difficulty::Basic), 300);
        assert_eq!(
            game.execute_shot(Combatant::Player(p1), 0, 0),
            Err(GameError::NotInProgress)
        );
    }

    #[test]
    fn hit_retains_the_turn() {
        let (mut game, p1) = live_automated_match(GameMode::Classic, 300);
        assert_eq!(game.execute_shot(Combatant::Player(p1), 0, 0), Ok(true));
        assert_eq!(game.turn(), Combatant::Player(p1));
        assert_eq!(game.status(), MatchStatus::InProgress);
    }

    #[test]
    fn miss_passes_the_turn() {
        let (mut game, p1) = live_automated_match(GameMode::Classic, 300);
        assert_eq!(game.execute_shot(Combatant::Player(p1), 9, 9), Ok(false));
        assert_eq!(game.turn(), Combatant::AutomatedOpponent);
    }

    #[test]
    fn repeated_cell_passes_the_turn_without_side_effects() {
        let (mut game, p1) = live_automated_match(GameMode::Classic, 300);
        game.execute_shot(Combatant::Player(p1), 0, 0).expect("hit");
        let result = game.execute_shot(Combatant::Player(p1), 0, 0);
        assert_eq!(result, Ok(false));
        assert_eq!(game.turn(), Combatant::AutomatedOpponent);
        let sunk: Vec<bool> = game
            .opposing_board(Combatant::Player(p1))
            .ships()
            .iter()
            .map(Ship::is_sunk)
            .collect();
        assert_eq!(sunk, vec![false]);
    }

    #[test]
    fn acting_out_of_turn_is_rejected() {
        let (mut game, _p1) = live_automated_match(GameMode::Classic, 300);
        assert_eq!(
            game.execute_shot(Combatant::AutomatedOpponent, 0, 0),
            Err(GameError::NotYourTurn)
        );
    }

    #[test]
    fn sinking_the_last_ship_finishes_the_match() {
        let (mut game, p1) = live_automated_match(GameMode::Classic, 300);
        game.execute_shot(Combatant::Player(p1), 0, 0).expect("hit");
        game.execute_shot(Combatant::Player(p1), 1, 0).expect("hit");
        assert_eq!(game.status(), MatchStatus::Finished);
        assert_eq!(game.winner(), Some(Combatant::Player(p1)));
        assert!(game.is_finished());
        assert_eq!(
            game.execute_shot(Combatant::Player(p1), 2, 0),
            Err(GameError::AlreadyFinished)
        );
    }

    #[test]
    fn movement_is_rejected_in_classic_mode() {
        let (mut game, p1) = live_automated_match(GameMode::Classic, 300);
        let ship_id = game.player1_board().ships()[0].id();
        assert_eq!(
            game.execute_ship_movement(Combatant::Player(p1), ship_id, MoveDirection::Down),
            Err(GameError::MovementNotAllowed)
        );
        assert_eq!(game.turn(), Combatant::Player(p1));
    }

    #[test]
    fn movement_always_passes_the_turn() {
        let (mut game, p1) = live_automated_match(GameMode::Dynamic, 300);
        let ship_id = game.player1_board().ships()[0].id();
        game.execute_ship_movement(Combatant::Player(p1), ship_id, MoveDirection::Down)
            .expect("move ok");
        assert_eq!(game.turn(), Combatant::AutomatedOpponent);
    }

    #[test]
    fn expired_turn_is_forfeited_to_the_opponent() {
        let (mut game, p1) = live_automated_match(GameMode::Classic, 0);
        std::thread::sleep(std::time::Duration::from_millis(20));
        assert_eq!(
            game.execute_shot(Combatant::Player(p1), 0, 0),
            Err(GameError::TurnTimeout)
        );
        assert_eq!(game.turn(), Combatant::AutomatedOpponent);
        // the clock restarted, so the opponent can act immediately
        assert_eq!(
            game.execute_shot(Combatant::AutomatedOpponent, 9, 9),
            Ok(false)
        );
        assert_eq!(game.turn(), Combatant::Player(p1));
    }

    #[test]
    fn cancel_during_setup_discards() {
        let p1 = Uuid::new_v4();
        let mut game = Match::new(p1, GameMode::Classic, None, Some(Difficulty::Basic), 300);
        assert_eq!(
            game.cancel(Combatant::Player(p1)),
            Ok(CancelOutcome::Discarded)
        );
        assert_eq!(game.status(), MatchStatus::Setup);
    }

    #[test]
    fn cancel_of_a_live_match_forfeits_to_the_opponent() {
        let (mut game, p1) = live_automated_match(GameMode::Classic, 300);
        let outcome = game.cancel(Combatant::Player(p1)).expect("cancellable");
        assert_eq!(
            outcome,
            CancelOutcome::Forfeited {
                winner: Combatant::AutomatedOpponent
            }
        );
        assert_eq!(game.status(), MatchStatus::Finished);
        assert_eq!(game.winner(), Some(Combatant::AutomatedOpponent));
    }

    #[test]
    fn cancel_of_a_finished_match_is_rejected() {
        let (mut game, p1) = live_automated_match(GameMode::Classic, 300);
        game.execute_shot(Combatant::Player(p1), 0, 0).expect("hit");
        game.execute_shot(Combatant::Player(p1), 1, 0).expect("hit");
        assert_eq!(
            game.cancel(Combatant::Player(p1)),
            Err(GameError::AlreadyFinished)
        );
    }

    #[test]
    fn pvp_miss_passes_to_player_two() {
        let p1 = Uuid::new_v4();
        let p2 = Uuid::new_v4();
        let mut game = Match::new(p1, GameMode::Classic, Some(p2), None, 300);
        game.install_board(Combatant::Player(p1), board_with_patrol(0, 0))
            .expect("setup phase");
        game.install_board(Combatant::Player(p2), board_with_patrol(4, 4))
            .expect("setup phase");
        game.set_ready(Combatant::Player(p1));
        game.set_ready(Combatant::Player(p2));
        assert_eq!(game.execute_shot(Combatant::Player(p1), 9, 9), Ok(false));
        assert_eq!(game.turn(), Combatant::Player(p2));
        assert_eq!(game.execute_shot(Combatant::Player(p2), 4, 4), Ok(true));
        assert_eq!(game.turn(), Combatant::Player(p2));
    }

    #[test]
    fn board_swap_after_start_is_rejected() {
        let (mut game, p1) = live_automated_match(GameMode::Classic, 300);
        assert_eq!(
            game.install_board(Combatant::Player(p1), Board::new()),
            Err(GameError::NotInSetup)
        );
    }
}
