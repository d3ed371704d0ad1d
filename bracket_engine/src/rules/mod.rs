//! Bracket shape rules.
//!
//! Pure functions of the team count: no ids, no teams, no I/O.

pub mod losers;
pub mod shape;
pub mod winners;

pub use losers::{LosersSource, LosersTemplate, losers_templates};
pub use shape::{BracketShape, next_pow2};
pub use winners::{MatchRef, SlotSource, WinnersTemplate, round_one_pairings, winners_templates};
