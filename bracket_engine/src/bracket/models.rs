//! Bracket data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::constants::{
    CHAMPIONSHIP_ROUND, LOSERS_MATCH_NUMBER_OFFSET, RESET_ROUND, is_championship_round,
};

/// Tournament ID type
pub type TournamentId = i64;

/// Team ID type (owned by the team service)
pub type TeamId = i64;

/// Match ID type, allocated when the bracket is built
pub type MatchId = Uuid;

/// Elimination format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BracketFormat {
    SingleElimination,
    DoubleElimination,
}

impl BracketFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            BracketFormat::SingleElimination => "single_elimination",
            BracketFormat::DoubleElimination => "double_elimination",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "single_elimination" | "single" => Some(BracketFormat::SingleElimination),
            "double_elimination" | "double" => Some(BracketFormat::DoubleElimination),
            _ => None,
        }
    }
}

impl fmt::Display for BracketFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tournament status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TournamentStatus {
    /// Teams registered, bracket not generated yet
    Pending,
    /// Bracket generated, results being recorded
    Ongoing,
    /// Champion decided
    Completed,
    /// Tournament cancelled
    Cancelled,
}

impl TournamentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TournamentStatus::Pending => "pending",
            TournamentStatus::Ongoing => "ongoing",
            TournamentStatus::Completed => "completed",
            TournamentStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(TournamentStatus::Pending),
            "ongoing" => Some(TournamentStatus::Ongoing),
            "completed" => Some(TournamentStatus::Completed),
            "cancelled" => Some(TournamentStatus::Cancelled),
            _ => None,
        }
    }
}

/// Tournament record as seen by the bracket engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub format: BracketFormat,
    pub status: TournamentStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Tournament {
    /// Create a pending tournament
    pub fn new(id: TournamentId, format: BracketFormat) -> Self {
        Self {
            id,
            format,
            status: TournamentStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }
}

/// Seeded team entering the bracket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub tournament_id: TournamentId,
    /// 1 is the strongest seed
    pub seed: u32,
}

impl Team {
    pub fn new(id: TeamId, tournament_id: TournamentId, seed: u32) -> Self {
        Self {
            id,
            tournament_id,
            seed,
        }
    }
}

/// One of the two team slots of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Slot {
    Team1,
    Team2,
}

/// Winners-bracket or championship match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub tournament_id: TournamentId,
    pub round: u32,
    pub match_number: u32,
    pub team1_id: Option<TeamId>,
    pub team2_id: Option<TeamId>,
    pub winner_id: Option<TeamId>,
    pub loser_id: Option<TeamId>,
    /// Match the winner feeds into
    pub next_match_id: Option<MatchId>,
    pub has_bye: bool,
    pub is_completed: bool,
}

impl Match {
    /// Create an empty match with a fresh id
    pub fn new(tournament_id: TournamentId, round: u32, match_number: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            tournament_id,
            round,
            match_number,
            team1_id: None,
            team2_id: None,
            winner_id: None,
            loser_id: None,
            next_match_id: None,
            has_bye: false,
            is_completed: false,
        }
    }

    /// Both teams known and no result yet
    pub fn is_resolvable(&self) -> bool {
        !self.is_completed && self.team1_id.is_some() && self.team2_id.is_some()
    }

    pub fn is_championship(&self) -> bool {
        is_championship_round(self.round)
    }

    pub fn is_reset(&self) -> bool {
        self.round == RESET_ROUND
    }

    pub fn is_grand_final(&self) -> bool {
        self.round == CHAMPIONSHIP_ROUND
    }

    pub fn team(&self, slot: Slot) -> Option<TeamId> {
        match slot {
            Slot::Team1 => self.team1_id,
            Slot::Team2 => self.team2_id,
        }
    }

    pub fn set_team(&mut self, slot: Slot, team_id: Option<TeamId>) {
        match slot {
            Slot::Team1 => self.team1_id = team_id,
            Slot::Team2 => self.team2_id = team_id,
        }
    }

    /// Returns the other participant if `team_id` is one of the two teams
    pub fn opponent_of(&self, team_id: TeamId) -> Option<TeamId> {
        match (self.team1_id, self.team2_id) {
            (Some(team1), Some(team2)) if team1 == team_id => Some(team2),
            (Some(team1), Some(team2)) if team2 == team_id => Some(team1),
            _ => None,
        }
    }

    /// First empty slot, team1 before team2
    pub fn first_empty_slot(&self) -> Option<Slot> {
        if self.team1_id.is_none() {
            Some(Slot::Team1)
        } else if self.team2_id.is_none() {
            Some(Slot::Team2)
        } else {
            None
        }
    }
}

/// Losers-bracket match with the origin of each slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LosersMatch {
    #[serde(flatten)]
    pub base: Match,
    pub team1_from_winners: bool,
    pub team1_winners_round: Option<u32>,
    pub team1_winners_match_number: Option<u32>,
    pub team2_from_winners: bool,
    pub team2_winners_round: Option<u32>,
    pub team2_winners_match_number: Option<u32>,
    /// Losers match whose winner fills team1 when it is not a drop-in
    pub team1_from_match_id: Option<MatchId>,
    /// Losers match whose winner fills team2 when it is not a drop-in
    pub team2_from_match_id: Option<MatchId>,
    /// Winner goes to the grand final instead of another losers match
    pub is_championship_qualifier: bool,
}

impl LosersMatch {
    pub fn new(tournament_id: TournamentId, round: u32, match_number: u32) -> Self {
        Self {
            base: Match::new(tournament_id, round, match_number),
            team1_from_winners: false,
            team1_winners_round: None,
            team1_winners_match_number: None,
            team2_from_winners: false,
            team2_winners_round: None,
            team2_winners_match_number: None,
            team1_from_match_id: None,
            team2_from_match_id: None,
            is_championship_qualifier: false,
        }
    }

    /// Match number as shown to players (101, 102, ...)
    pub fn display_number(&self) -> u32 {
        LOSERS_MATCH_NUMBER_OFFSET + self.base.match_number
    }

    /// Slot waiting for the loser of winners match `round`/`match_number`
    pub fn drop_slot_for(&self, round: u32, match_number: u32) -> Option<Slot> {
        let matches = |from_winners: bool, r: Option<u32>, m: Option<u32>| {
            from_winners && r == Some(round) && m == Some(match_number)
        };
        if matches(
            self.team1_from_winners,
            self.team1_winners_round,
            self.team1_winners_match_number,
        ) {
            Some(Slot::Team1)
        } else if matches(
            self.team2_from_winners,
            self.team2_winners_round,
            self.team2_winners_match_number,
        ) {
            Some(Slot::Team2)
        } else {
            None
        }
    }

    /// Slot waiting for the winner of losers match `source`
    pub fn advancement_slot_for(&self, source: MatchId) -> Option<Slot> {
        if !self.team1_from_winners && self.team1_from_match_id == Some(source) {
            Some(Slot::Team1)
        } else if !self.team2_from_winners && self.team2_from_match_id == Some(source) {
            Some(Slot::Team2)
        } else {
            None
        }
    }
}

/// Any match in a bracket, tagged with the side it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "bracket", rename_all = "snake_case")]
pub enum BracketMatch {
    Winners(Match),
    Losers(LosersMatch),
    Championship(Match),
}

impl BracketMatch {
    /// Fields shared by every match kind
    pub fn core(&self) -> &Match {
        match self {
            BracketMatch::Winners(m) | BracketMatch::Championship(m) => m,
            BracketMatch::Losers(m) => &m.base,
        }
    }

    pub fn id(&self) -> MatchId {
        self.core().id
    }
}

/// Match returned after a result has been recorded
pub type UpdatedMatch = BracketMatch;
