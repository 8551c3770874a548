//! Lifetime player records: wins, losses, score, and medals

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Per-player lifetime statistics, created lazily the first time a result
/// is credited. Field names double as the `player_profiles` column names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerProfile {
    user_id: Uuid,
    wins: u32,
    losses: u32,
    score: u32,
    medals: Vec<String>,
    updated_at: DateTime<Utc>,
}

impl PlayerProfile {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            wins: 0,
            losses: 0,
            score: 0,
            medals: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn wins(&self) -> u32 {
        self.wins
    }

    pub fn losses(&self) -> u32 {
        self.losses
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn medals(&self) -> &[String] {
        &self.medals
    }

    pub fn credit_win(&mut self, points: u32) {
        self.wins += 1;
        self.score += points;
        self.touch();
    }

    pub fn credit_loss(&mut self) {
        self.losses += 1;
        self.touch();
    }

    /// Records the medal once; returns whether it was newly earned.
    pub fn award_medal(&mut self, code: &str) -> bool {
        if self.medals.iter().any(|m| m == code) {
            return false;
        }
        self.medals.push(code.to_string());
        self.touch();
        true
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
