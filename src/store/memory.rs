//! In-memory store backend for tests and Supabase-less development runs

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use super::{MatchStore, PlayerProfile, StoreError, StoredMatch, UserDirectory, Version};
use crate::game::Match;

/// Keeps everything in process memory. State is volatile; the directory
/// only knows ids registered through [`MemoryStore::register_user`].
#[derive(Default)]
pub struct MemoryStore {
    matches: DashMap<Uuid, StoredMatch>,
    profiles: DashMap<Uuid, PlayerProfile>,
    users: DashMap<Uuid, ()>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an id the directory will report as existing.
    pub fn register_user(&self, id: Uuid) {
        self.users.insert(id, ());
    }
}

#[async_trait]
impl MatchStore for MemoryStore {
    async fn load(&self, id: Uuid) -> Result<Option<StoredMatch>, StoreError> {
        Ok(self.matches.get(&id).map(|entry| entry.clone()))
    }

    async fn save(&self, game: &Match, expected: Option<Version>) -> Result<Version, StoreError> {
        match (self.matches.entry(game.id()), expected) {
            (Entry::Vacant(slot), None) => {
                slot.insert(StoredMatch {
                    game: game.clone(),
                    version: 1,
                });
                Ok(1)
            }
            (Entry::Occupied(mut slot), Some(version)) if slot.get().version == version => {
                slot.insert(StoredMatch {
                    game: game.clone(),
                    version: version + 1,
                });
                Ok(version + 1)
            }
            _ => Err(StoreError::VersionConflict(game.id())),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        self.matches.remove(&id);
        Ok(())
    }

    async fn active_match_id(&self, player: Uuid) -> Result<Option<Uuid>, StoreError> {
        Ok(self
            .matches
            .iter()
            .find(|entry| entry.game.is_participant(player) && !entry.game.is_finished())
            .map(|entry| entry.game.id()))
    }

    async fn load_or_create_profile(&self, player: Uuid) -> Result<PlayerProfile, StoreError> {
        Ok(self
            .profiles
            .entry(player)
            .or_insert_with(|| PlayerProfile::new(player))
            .clone())
    }

    async fn update_profile(&self, profile: &PlayerProfile) -> Result<(), StoreError> {
        self.profiles.insert(profile.user_id(), profile.clone());
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn exists(&self, player: Uuid) -> Result<bool, StoreError> {
        Ok(self.users.contains_key(&player))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{Combatant, Difficulty, GameMode};
    use tokio_test::block_on;

    fn sample_match() -> Match {
        Match::new(
            Uuid::new_v4(),
            GameMode::Classic,
            None,
            Some(Difficulty::Basic),
            300,
        )
    }

    #[test]
    fn save_then_load_round_trips() {
        let store = MemoryStore::new();
        let game = sample_match();
        assert_eq!(block_on(store.save(&game, None)).ok(), Some(1));
        let stored = block_on(store.load(game.id()))
            .expect("load ok")
            .expect("row present");
        assert_eq!(stored.version, 1);
        assert_eq!(stored.game.id(), game.id());
    }

    #[test]
    fn stale_version_is_rejected() {
        let store = MemoryStore::new();
        let game = sample_match();
        block_on(store.save(&game, None)).expect("insert");
        assert_eq!(block_on(store.save(&game, Some(1))).ok(), Some(2));
        assert!(matches!(
            block_on(store.save(&game, Some(1))),
            Err(StoreError::VersionConflict(_))
        ));
    }

    #[test]
    fn double_insert_is_rejected() {
        let store = MemoryStore::new();
        let game = sample_match();
        block_on(store.save(&game, None)).expect("insert");
        assert!(matches!(
            block_on(store.save(&game, None)),
            Err(StoreError::VersionConflict(_))
        ));
    }

    #[test]
    fn active_match_lookup_skips_finished_matches() {
        let store = MemoryStore::new();
        let mut game = sample_match();
        let p1 = game.player1();
        block_on(store.save(&game, None)).expect("insert");
        assert_eq!(
            block_on(store.active_match_id(p1)).expect("query ok"),
            Some(game.id())
        );

        // a forfeit during setup is impossible, so walk the match to finished
        let mut board = crate::game::Board::new();
        board
            .add_ship(crate::game::Ship::new(
                "Patrol Boat",
                2,
                crate::game::Orientation::Horizontal,
                vec![
                    crate::game::Coordinate::new(0, 0),
                    crate::game::Coordinate::new(1, 0),
                ],
            ))
            .expect("placement fits");
        game.install_board(Combatant::Player(p1), board.clone())
            .expect("setup phase");
        game.install_board(Combatant::AutomatedOpponent, board)
            .expect("setup phase");
        game.set_ready(Combatant::Player(p1));
        game.set_ready(Combatant::AutomatedOpponent);
        game.cancel(Combatant::Player(p1)).expect("forfeit");
        block_on(store.save(&game, Some(1))).expect("update");

        assert_eq!(block_on(store.active_match_id(p1)).expect("query ok"), None);
    }

    #[test]
    fn profiles_are_created_lazily_and_persist() {
        let store = MemoryStore::new();
        let player = Uuid::new_v4();
        let mut profile = block_on(store.load_or_create_profile(player)).expect("created");
        assert_eq!(profile.wins(), 0);
        profile.credit_win(100);
        block_on(store.update_profile(&profile)).expect("updated");
        let reloaded = block_on(store.load_or_create_profile(player)).expect("loaded");
        assert_eq!(reloaded.wins(), 1);
        assert_eq!(reloaded.score(), 100);
    }

    #[test]
    fn directory_only_knows_registered_users() {
        let store = MemoryStore::new();
        let known = Uuid::new_v4();
        store.register_user(known);
        assert!(block_on(store.exists(known)).expect("query ok"));
        assert!(!block_on(store.exists(Uuid::new_v4())).expect("query ok"));
    }
}
