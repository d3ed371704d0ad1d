//! # Bracket Engine
//!
//! Single- and double-elimination brackets for 4 to 32 seeded teams.
//!
//! The engine builds the whole bracket graph up front (winners bracket,
//! losers bracket and the championship bridge with its conditional reset
//! match) and then advances teams as match results come in.
//!
//! ## Core Modules
//!
//! - [`rules`]: Pure shape rules (byes, pairings, losers-bracket layout)
//! - [`bracket`]: Builders, progression state machine and the [`BracketManager`]
//! - [`db`]: Storage seam with PostgreSQL and in-memory implementations
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use bracket_engine::{BracketFormat, BracketManager, Team, db::MemoryBracketStore};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), bracket_engine::BracketError> {
//! let manager = BracketManager::new(Arc::new(MemoryBracketStore::new()));
//! let id = manager.create_tournament(BracketFormat::SingleElimination).await?;
//! let teams: Vec<Team> = (1..=4).map(|seed| Team::new(seed as i64, id, seed)).collect();
//!
//! let bracket = manager
//!     .generate_bracket(id, &teams, BracketFormat::SingleElimination)
//!     .await?;
//! assert_eq!(bracket.winners().len(), 3);
//! # Ok(())
//! # }
//! ```

/// Bracket generation, progression and the manager façade.
pub mod bracket;
pub use bracket::{
    BracketError, BracketFormat, BracketGraph, BracketManager, BracketMatch, BracketResult,
    BracketView, GrandFinalState, LosersMatch, Match, MatchId, Team, TeamId, Tournament,
    TournamentId, TournamentStatus, UpdatedMatch,
};

/// Reserved round and match numbers.
pub mod constants;

/// Persistence.
pub mod db;

/// Bracket shape rules.
pub mod rules;
