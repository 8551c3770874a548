//! Rate limiting utilities

use std::num::NonZeroU32;

use governor::{clock::DefaultClock, state::keyed::DashMapStateStore, Quota, RateLimiter};
use uuid::Uuid;

/// Mutating match actions allowed per player per second
pub const ACTIONS_PER_SECOND: u32 = 10;

/// Keyed rate limiter type alias
pub type KeyedLimiter = RateLimiter<Uuid, DashMapStateStore<Uuid>, DefaultClock>;

/// Per-player rate limiter over match actions
pub struct PlayerRateLimiter {
    limiter: KeyedLimiter,
}

impl PlayerRateLimiter {
    pub fn new(actions_per_second: u32) -> Self {
        let quota =
            Quota::per_second(NonZeroU32::new(actions_per_second).unwrap_or(NonZeroU32::MIN));
        Self {
            limiter: RateLimiter::keyed(quota),
        }
    }

    /// Check if an action is allowed for this player (returns true if allowed)
    pub fn allow(&self, player: Uuid) -> bool {
        self.limiter.check_key(&player).is_ok()
    }
}

impl Default for PlayerRateLimiter {
    fn default() -> Self {
        Self::new(ACTIONS_PER_SECOND)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_beyond_quota_is_rejected() {
        let limiter = PlayerRateLimiter::new(2);
        let player = Uuid::new_v4();

        assert!(limiter.allow(player));
        assert!(limiter.allow(player));
        assert!(!limiter.allow(player));
    }

    #[test]
    fn players_have_independent_quotas() {
        let limiter = PlayerRateLimiter::new(1);

        assert!(limiter.allow(Uuid::new_v4()));
        assert!(limiter.allow(Uuid::new_v4()));
    }
}
