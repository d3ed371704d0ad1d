//! Bracket generation and match progression.

pub mod builder;
pub mod championship;
pub mod errors;
pub mod graph;
pub mod losers;
pub mod manager;
pub mod models;
pub mod progression;
pub mod winners;

pub use builder::{build_bracket, validate_teams};
pub use championship::GrandFinalState;
pub use errors::{BracketError, BracketResult};
pub use graph::{BracketChanges, BracketGraph, BracketView};
pub use manager::BracketManager;
pub use models::{
    BracketFormat, BracketMatch, LosersMatch, Match, MatchId, Slot, Team, TeamId, Tournament,
    TournamentId, TournamentStatus, UpdatedMatch,
};
