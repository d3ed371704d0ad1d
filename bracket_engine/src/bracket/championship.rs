//! Grand final and bracket reset.
//!
//! Match A (round 98) puts the winners champion in `team1` and the losers
//! champion in `team2`. Match B (round 99) is only played when the losers
//! champion takes A, so both finalists end up with one loss.

use chrono::Utc;
use log::info;
use serde::{Deserialize, Serialize};

use super::{
    errors::{BracketError, BracketResult},
    graph::BracketGraph,
    models::{Match, TeamId, TournamentId, TournamentStatus},
};
use crate::constants::{CHAMPIONSHIP_MATCH_NUMBER, CHAMPIONSHIP_ROUND, RESET_ROUND};

/// Create the grand final and the reset match, linked A -> B
pub fn build_championship(tournament_id: TournamentId) -> Vec<Match> {
    let reset = Match::new(tournament_id, RESET_ROUND, CHAMPIONSHIP_MATCH_NUMBER);
    let mut grand_final = Match::new(tournament_id, CHAMPIONSHIP_ROUND, CHAMPIONSHIP_MATCH_NUMBER);
    grand_final.next_match_id = Some(reset.id);
    vec![grand_final, reset]
}

/// Progress of the championship bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrandFinalState {
    /// At least one finalist still unknown
    AwaitingChampions,
    /// Both finalists placed in match A
    AReady,
    /// Match A decided, consequences not applied yet
    ADone,
    /// Reset match populated and waiting
    BReady,
    /// Reset match decided, consequences not applied yet
    BDone,
    /// Champion decided
    TournamentComplete,
}

impl GrandFinalState {
    /// Derive the state from the stored championship matches
    pub fn of(graph: &BracketGraph) -> BracketResult<Self> {
        let grand_final = graph
            .grand_final()
            .ok_or_else(|| BracketError::CorruptBracket("grand final missing".to_string()))?;

        if graph.tournament.status == TournamentStatus::Completed {
            return Ok(GrandFinalState::TournamentComplete);
        }

        if !grand_final.is_completed {
            return Ok(if grand_final.is_resolvable() {
                GrandFinalState::AReady
            } else {
                GrandFinalState::AwaitingChampions
            });
        }

        match graph.reset_match() {
            None => Ok(GrandFinalState::ADone),
            Some(reset) if reset.is_completed => Ok(GrandFinalState::BDone),
            Some(reset) if reset.is_resolvable() => Ok(GrandFinalState::BReady),
            Some(_) => Ok(GrandFinalState::ADone),
        }
    }
}

/// Place the winners-bracket champion in the grand final
pub(crate) fn seat_winners_champion(graph: &mut BracketGraph, team_id: TeamId) -> BracketResult<()> {
    let grand_final = graph.championship_mut(CHAMPIONSHIP_ROUND)?;
    grand_final.team1_id = Some(team_id);
    Ok(())
}

/// Place the losers-bracket champion in the grand final
pub(crate) fn seat_losers_champion(graph: &mut BracketGraph, team_id: TeamId) -> BracketResult<()> {
    let grand_final = graph.championship_mut(CHAMPIONSHIP_ROUND)?;
    grand_final.team2_id = Some(team_id);
    Ok(())
}

/// Apply the consequences of a decided championship match
///
/// Called after the match's winner has been written. Returns the state the
/// bridge ends in.
pub(crate) fn settle(graph: &mut BracketGraph) -> BracketResult<GrandFinalState> {
    match GrandFinalState::of(graph)? {
        GrandFinalState::ADone => {
            let grand_final = graph
                .grand_final()
                .ok_or_else(|| BracketError::CorruptBracket("grand final missing".to_string()))?;
            let (winner, winners_champion) = (grand_final.winner_id, grand_final.team1_id);

            if winner.is_some() && winner == winners_champion {
                if let Some(reset_id) = graph.reset_match().map(|m| m.id) {
                    graph.remove_championship_match(reset_id);
                }
                graph.championship_mut(CHAMPIONSHIP_ROUND)?.next_match_id = None;
                complete(graph, winner);
                Ok(GrandFinalState::TournamentComplete)
            } else {
                let reset = graph.championship_mut(RESET_ROUND)?;
                reset.team1_id = winners_champion;
                reset.team2_id = winner;
                info!(
                    "Tournament {}: losers champion took the grand final, reset match scheduled",
                    graph.tournament.id
                );
                Ok(GrandFinalState::BReady)
            }
        }
        GrandFinalState::BDone => {
            let winner = graph.reset_match().and_then(|m| m.winner_id);
            complete(graph, winner);
            Ok(GrandFinalState::TournamentComplete)
        }
        other => Err(BracketError::CorruptBracket(format!(
            "championship settled in state {other:?}"
        ))),
    }
}

/// Mark the tournament completed
pub(crate) fn complete(graph: &mut BracketGraph, champion: Option<TeamId>) {
    graph.tournament.status = TournamentStatus::Completed;
    graph.tournament.finished_at = Some(Utc::now());
    info!(
        "Tournament {} completed, champion: {:?}",
        graph.tournament.id, champion
    );
}
