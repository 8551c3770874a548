//! Match orchestration - validates actions, persists through the versioned
//! store, runs the automated opponent and credits results

use std::sync::Arc;

use parking_lot::Mutex;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::game::{
    fleet, strategy_for, Board, CancelOutcome, Combatant, Difficulty, GameError, GameMode, Match,
    MatchStatus, MoveDirection, Orientation, Ship,
};
use crate::store::{MatchStore, StoreError, UserDirectory};

/// Points a real player earns for a win.
const WIN_POINTS: u32 = 100;

/// Medal for winning without losing a single ship.
const FLAWLESS_MEDAL: &str = "ADMIRAL";

/// One requested ship placement: origin cell plus orientation.
#[derive(Debug, Clone, Deserialize)]
pub struct ShipPlacement {
    pub name: String,
    pub size: u8,
    pub x: u8,
    pub y: u8,
    pub orientation: Orientation,
}

/// Identifier handed back for each ship accepted during setup.
#[derive(Debug, Clone, Serialize)]
pub struct PlacedShip {
    pub id: Uuid,
    pub name: String,
}

/// An accepted fleet: the placed ship ids plus the match status afterwards,
/// which tells the caller whether the match already started.
#[derive(Debug, Clone, Serialize)]
pub struct FleetPlacement {
    pub ships: Vec<PlacedShip>,
    pub match_status: MatchStatus,
}

/// Outcome of a player's shot after any automated turns have run.
#[derive(Debug, Clone, Serialize)]
pub struct TurnResult {
    pub hit: bool,
    pub sunk: bool,
    pub finished: bool,
    pub winner: Option<Combatant>,
    pub message: String,
}

/// Failures surfaced by the orchestrator, from validation through storage.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("player {0} does not exist")]
    PlayerNotFound(Uuid),
    #[error("opponent {0} does not exist")]
    OpponentNotFound(Uuid),
    #[error("choose an opponent or a difficulty, not both")]
    OpponentAndDifficulty,
    #[error("a player cannot face themselves")]
    SelfPlay,
    #[error("player already has an active match")]
    ActiveMatch(Uuid),
    #[error("opponent {0} already has an active match")]
    OpponentBusy(Uuid),
    #[error("match {0} was not found")]
    MatchNotFound(Uuid),
    #[error("player is not part of this match")]
    NotParticipant,
    #[error("automated match has no difficulty recorded")]
    MissingDifficulty,
    #[error("no target cell left on the board")]
    NoTarget,
    #[error(transparent)]
    Game(#[from] GameError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Application service behind the match endpoints. Every success persists
/// through the versioned store, so two racing writers cannot both commit.
pub struct MatchService {
    store: Arc<dyn MatchStore>,
    users: Arc<dyn UserDirectory>,
    turn_timeout_secs: u64,
    /// Seedable so automated play is reproducible in tests.
    rng: Mutex<ChaCha8Rng>,
}

impl MatchService {
    pub fn new(
        store: Arc<dyn MatchStore>,
        users: Arc<dyn UserDirectory>,
        turn_timeout_secs: u64,
    ) -> Self {
        Self::seeded(store, users, turn_timeout_secs, rand::random::<u64>())
    }

    pub fn seeded(
        store: Arc<dyn MatchStore>,
        users: Arc<dyn UserDirectory>,
        turn_timeout_secs: u64,
        seed: u64,
    ) -> Self {
        Self {
            store,
            users,
            turn_timeout_secs,
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
        }
    }

    /// Creates a match in setup and persists it as a new row.
    pub async fn start_match(
        &self,
        actor: Uuid,
        mode: GameMode,
        opponent: Option<Uuid>,
        difficulty: Option<Difficulty>,
    ) -> Result<Match, MatchError> {
        if !self.users.exists(actor).await? {
            return Err(MatchError::PlayerNotFound(actor));
        }
        if opponent.is_some() && difficulty.is_some() {
            return Err(MatchError::OpponentAndDifficulty);
        }
        if opponent == Some(actor) {
            return Err(MatchError::SelfPlay);
        }
        if let Some(opponent) = opponent {
            if !self.users.exists(opponent).await? {
                return Err(MatchError::OpponentNotFound(opponent));
            }
        }
        if let Some(active) = self.store.active_match_id(actor).await? {
            return Err(MatchError::ActiveMatch(active));
        }
        if let Some(opponent) = opponent {
            if self.store.active_match_id(opponent).await?.is_some() {
                return Err(MatchError::OpponentBusy(opponent));
            }
        }
        // An automated match always records a difficulty.
        let difficulty = if opponent.is_none() {
            Some(difficulty.unwrap_or(Difficulty::Basic))
        } else {
            None
        };

        let game = Match::new(actor, mode, opponent, difficulty, self.turn_timeout_secs);
        self.store.save(&game, None).await?;
        info!(
            match_id = %game.id(),
            player = %actor,
            automated = game.is_automated(),
            "Match created"
        );
        Ok(game)
    }

    /// Installs the actor's fleet. For an automated match this also places
    /// the automated fleet, which starts the match.
    pub async fn setup_fleet(
        &self,
        actor: Uuid,
        match_id: Uuid,
        placements: &[ShipPlacement],
    ) -> Result<FleetPlacement, MatchError> {
        let stored = self
            .store
            .load(match_id)
            .await?
            .ok_or(MatchError::MatchNotFound(match_id))?;
        let mut game = stored.game;
        if !game.is_participant(actor) {
            return Err(MatchError::NotParticipant);
        }
        if game.status() != MatchStatus::Setup {
            return Err(GameError::NotInSetup.into());
        }
        let sizes: Vec<u8> = placements.iter().map(|p| p.size).collect();
        fleet::validate_composition(&sizes)?;

        // Resubmission replaces any previously installed board.
        let mut board = Board::new();
        let mut placed = Vec::with_capacity(placements.len());
        for p in placements {
            let coordinates = fleet::ship_coordinates(p.x, p.y, p.size, p.orientation);
            let ship = Ship::new(p.name.clone(), p.size, p.orientation, coordinates);
            placed.push(PlacedShip {
                id: ship.id(),
                name: ship.name().to_string(),
            });
            board.add_ship(ship)?;
        }
        game.install_board(Combatant::Player(actor), board)?;
        game.set_ready(Combatant::Player(actor));

        if game.is_automated() && game.status() == MatchStatus::Setup {
            let board = fleet::random_board(&mut *self.rng.lock())?;
            game.install_board(Combatant::AutomatedOpponent, board)?;
            game.set_ready(Combatant::AutomatedOpponent);
        }

        self.store.save(&game, Some(stored.version)).await?;
        info!(
            match_id = %match_id,
            player = %actor,
            status = ?game.status(),
            "Fleet placed"
        );
        Ok(FleetPlacement {
            ships: placed,
            match_status: game.status(),
        })
    }

    /// Resolves one shot from a real player, then any automated turns it
    /// hands over.
    pub async fn execute_shot(
        &self,
        actor: Uuid,
        match_id: Uuid,
        x: u8,
        y: u8,
    ) -> Result<TurnResult, MatchError> {
        let stored = self
            .store
            .load(match_id)
            .await?
            .ok_or(MatchError::MatchNotFound(match_id))?;
        let mut game = stored.game;
        let side = Combatant::Player(actor);

        let hit = match game.execute_shot(side, x, y) {
            Ok(hit) => hit,
            Err(err) => {
                // A forced timeout pass is a real state change and must
                // reach the store even though the action failed.
                if err == GameError::TurnTimeout {
                    self.store.save(&game, Some(stored.version)).await?;
                }
                return Err(err.into());
            }
        };
        let sunk = hit
            && game
                .opposing_board(side)
                .ship_at(x, y)
                .map_or(false, Ship::is_sunk);

        let version = self.store.save(&game, Some(stored.version)).await?;

        if game.turn() == Combatant::AutomatedOpponent && !game.is_finished() {
            self.run_automated_turns(&mut game)?;
            self.store.save(&game, Some(version)).await?;
        }
        if game.is_finished() {
            self.credit_outcome(&game).await?;
        }

        let finished = game.is_finished();
        let winner = game.winner();
        Ok(TurnResult {
            hit,
            sunk,
            finished,
            winner,
            message: shot_message(hit, sunk, finished, winner == Some(side)),
        })
    }

    /// Moves one of the actor's ships in dynamic mode. Movement always hands
    /// the turn over, so the automated loop may run before returning.
    pub async fn execute_ship_movement(
        &self,
        actor: Uuid,
        match_id: Uuid,
        ship_id: Uuid,
        direction: MoveDirection,
    ) -> Result<(), MatchError> {
        let stored = self
            .store
            .load(match_id)
            .await?
            .ok_or(MatchError::MatchNotFound(match_id))?;
        let mut game = stored.game;

        if let Err(err) = game.execute_ship_movement(Combatant::Player(actor), ship_id, direction) {
            if err == GameError::TurnTimeout {
                self.store.save(&game, Some(stored.version)).await?;
            }
            return Err(err.into());
        }
        let version = self.store.save(&game, Some(stored.version)).await?;

        if game.turn() == Combatant::AutomatedOpponent && !game.is_finished() {
            self.run_automated_turns(&mut game)?;
            self.store.save(&game, Some(version)).await?;
        }
        if game.is_finished() {
            self.credit_outcome(&game).await?;
        }
        Ok(())
    }

    /// Cancels a match: discarded outright in setup, forfeited in progress.
    pub async fn cancel_match(&self, actor: Uuid, match_id: Uuid) -> Result<(), MatchError> {
        let stored = self
            .store
            .load(match_id)
            .await?
            .ok_or(MatchError::MatchNotFound(match_id))?;
        let mut game = stored.game;
        if !game.is_participant(actor) {
            return Err(MatchError::NotParticipant);
        }
        match game.cancel(Combatant::Player(actor))? {
            CancelOutcome::Discarded => {
                self.store.delete(match_id).await?;
                info!(match_id = %match_id, player = %actor, "Setup match discarded");
            }
            CancelOutcome::Forfeited { winner } => {
                self.store.save(&game, Some(stored.version)).await?;
                self.credit_outcome(&game).await?;
                info!(
                    match_id = %match_id,
                    player = %actor,
                    winner = ?winner,
                    "Match forfeited"
                );
            }
        }
        Ok(())
    }

    /// Plays automated turns until the turn comes back to a player or the
    /// match ends. Terminates: a hit consumes an untried cell and every
    /// other outcome passes the turn.
    fn run_automated_turns(&self, game: &mut Match) -> Result<(), MatchError> {
        let difficulty = game.difficulty().ok_or(MatchError::MissingDifficulty)?;
        let strategy = strategy_for(difficulty);
        let mut rng = self.rng.lock();
        while game.status() == MatchStatus::InProgress
            && game.turn() == Combatant::AutomatedOpponent
        {
            let board = game.opposing_board(Combatant::AutomatedOpponent);
            let (x, y) = strategy
                .choose_target(board, &mut *rng)
                .ok_or(MatchError::NoTarget)?;
            game.execute_shot(Combatant::AutomatedOpponent, x, y)?;
        }
        Ok(())
    }

    /// Credits a finished match: win, points and medal for a real winner, a
    /// loss for a real loser. The automated opponent earns nothing.
    async fn credit_outcome(&self, game: &Match) -> Result<(), StoreError> {
        let Some(winner) = game.winner() else {
            return Ok(());
        };
        if let Combatant::Player(winner_id) = winner {
            let mut profile = self.store.load_or_create_profile(winner_id).await?;
            profile.credit_win(WIN_POINTS);
            let own_board = if winner_id == game.player1() {
                game.player1_board()
            } else {
                game.player2_board()
            };
            let flawless = !own_board.ships().iter().any(|ship| ship.is_sunk());
            if flawless && profile.award_medal(FLAWLESS_MEDAL) {
                info!(player = %winner_id, "Flawless victory medal awarded");
            }
            self.store.update_profile(&profile).await?;
        }
        let loser = match winner {
            Combatant::Player(id) if id == game.player1() => game.player2(),
            _ => Some(game.player1()),
        };
        if let Some(loser_id) = loser {
            let mut profile = self.store.load_or_create_profile(loser_id).await?;
            profile.credit_loss();
            self.store.update_profile(&profile).await?;
        }
        Ok(())
    }
}

fn shot_message(hit: bool, sunk: bool, finished: bool, actor_won: bool) -> String {
    let message = if finished {
        if actor_won {
            "Victory! All enemy ships are sunk."
        } else {
            "Defeat. Your fleet was destroyed."
        }
    } else if sunk {
        "Hit and sunk!"
    } else if hit {
        "Hit!"
    } else {
        "Miss."
    };
    message.to_string()
}
