//! Bracket error types.

use std::time::Duration;

use thiserror::Error;

use super::models::{MatchId, TeamId, TournamentId, TournamentStatus};
use crate::constants::{MAX_TEAMS, MIN_TEAMS};

/// Bracket errors
#[derive(Debug, Error)]
pub enum BracketError {
    /// Team count outside the supported range
    #[error("Invalid team count: {0} (must be between {min} and {max})", min = MIN_TEAMS, max = MAX_TEAMS)]
    InvalidTeamCount(usize),

    /// Seeds are not a dense permutation of 1..N
    #[error("Seed {seed} is duplicated or missing (seeds must cover 1..={expected})")]
    DuplicateOrMissingSeed { seed: u32, expected: usize },

    /// The same team was submitted twice
    #[error("Team {0} appears more than once")]
    DuplicateTeam(TeamId),

    /// Tournament not found
    #[error("Tournament not found: {0}")]
    TournamentNotFound(TournamentId),

    /// Bracket generation attempted after the tournament left PENDING
    #[error("Tournament {0} already started")]
    TournamentAlreadyStarted(TournamentId),

    /// Tournament is in a state that does not allow the operation
    #[error("Tournament not in correct state: expected {expected:?}, got {actual:?}")]
    InvalidState {
        expected: TournamentStatus,
        actual: TournamentStatus,
    },

    /// Tournament already finished or cancelled
    #[error("Tournament {tournament_id} is {status:?} and can no longer be cancelled")]
    NotCancellable {
        tournament_id: TournamentId,
        status: TournamentStatus,
    },

    /// Match not found
    #[error("Match not found: {0}")]
    MatchNotFound(MatchId),

    /// Winner is not one of the two participants
    #[error("Team {team_id} is not a participant of match {match_id}")]
    InvalidWinner { match_id: MatchId, team_id: TeamId },

    /// Result already recorded for this match
    #[error("Match {0} is already completed")]
    AlreadyCompleted(MatchId),

    /// Stored graph violates its own wiring
    #[error("Corrupt bracket: {0}")]
    CorruptBracket(String),

    /// Transaction did not finish in time
    #[error("Bracket operation timed out after {0:?}")]
    Timeout(Duration),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl BracketError {
    /// Get a client-safe error message that doesn't leak storage details
    pub fn client_message(&self) -> String {
        match self {
            BracketError::Database(_) | BracketError::CorruptBracket(_) => {
                "Internal server error".to_string()
            }
            BracketError::Timeout(_) => "Bracket service is busy, try again".to_string(),
            _ => self.to_string(),
        }
    }

    /// True when the caller can fix the request and resubmit
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            BracketError::Database(_) | BracketError::CorruptBracket(_) | BracketError::Timeout(_)
        )
    }
}

/// Result type for bracket operations
pub type BracketResult<T> = Result<T, BracketError>;
