//! Reserved round and match numbers shared by the bracket builders.
//!
//! Championship rounds use sentinel values far above any winners or losers
//! round so they never collide with the round arithmetic in [`crate::rules`].

/// Smallest supported field.
pub const MIN_TEAMS: usize = 4;

/// Largest supported field.
pub const MAX_TEAMS: usize = 32;

/// Round number of the first grand-final match.
pub const CHAMPIONSHIP_ROUND: u32 = 98;

/// Round number of the bracket-reset match.
pub const RESET_ROUND: u32 = 99;

/// Match number carried by both championship matches.
pub const CHAMPIONSHIP_MATCH_NUMBER: u32 = 201;

/// Offset applied to losers-bracket match numbers when displayed (L101, L102, ...).
pub const LOSERS_MATCH_NUMBER_OFFSET: u32 = 100;

/// Returns true for the two reserved championship rounds.
pub fn is_championship_round(round: u32) -> bool {
    round == CHAMPIONSHIP_ROUND || round == RESET_ROUND
}
