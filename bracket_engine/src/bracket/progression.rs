//! Applying match results to a bracket.
//!
//! Everything here works on an in-memory [`BracketGraph`]. The store hands
//! the graph in inside its transaction and persists whatever changed, so a
//! failure at any step leaves the stored bracket untouched.

use log::{debug, warn};

use super::{
    championship::{self, GrandFinalState},
    errors::{BracketError, BracketResult},
    graph::{BracketGraph, MatchKind},
    models::{BracketFormat, MatchId, TeamId, TournamentStatus, UpdatedMatch},
};

/// Record `winner_id` as the winner of `match_id` and move both teams on
///
/// # Errors
///
/// * `BracketError::MatchNotFound` - no such match in this bracket
/// * `BracketError::AlreadyCompleted` - a result was already recorded
/// * `BracketError::InvalidState` - tournament is not ongoing
/// * `BracketError::InvalidWinner` - `winner_id` is not playing this match
/// * `BracketError::CorruptBracket` - a link points somewhere it cannot
pub fn record_result(
    graph: &mut BracketGraph,
    match_id: MatchId,
    winner_id: TeamId,
) -> BracketResult<UpdatedMatch> {
    let kind = graph.locate(match_id)?;
    let current = graph.core(match_id)?;

    if current.is_completed {
        warn!("Rejected result for completed match {}", match_id);
        return Err(BracketError::AlreadyCompleted(match_id));
    }

    if graph.tournament.status != TournamentStatus::Ongoing {
        return Err(BracketError::InvalidState {
            expected: TournamentStatus::Ongoing,
            actual: graph.tournament.status,
        });
    }

    let Some(loser_id) = current.opponent_of(winner_id) else {
        warn!(
            "Rejected winner {} for match {}: not a participant",
            winner_id, match_id
        );
        return Err(BracketError::InvalidWinner {
            match_id,
            team_id: winner_id,
        });
    };

    let (round, match_number, next) = (current.round, current.match_number, current.next_match_id);

    let resolved = graph.core_mut(match_id)?;
    resolved.winner_id = Some(winner_id);
    resolved.loser_id = Some(loser_id);
    resolved.is_completed = true;

    debug!(
        "Match {} (round {}, match {}): {} beat {}",
        match_id, round, match_number, winner_id, loser_id
    );

    match kind {
        MatchKind::Winners => {
            advance_winners(graph, match_id, winner_id, next)?;
            if graph.tournament.format == BracketFormat::DoubleElimination {
                drop_loser(graph, round, match_number, loser_id)?;
            }
        }
        MatchKind::Losers => advance_losers(graph, match_id, winner_id, next)?,
        MatchKind::Championship => {
            let state = championship::settle(graph)?;
            debug!("Tournament {} grand final now {:?}", graph.tournament.id, state);
        }
    }

    graph
        .get(match_id)
        .ok_or(BracketError::MatchNotFound(match_id))
}

fn advance_winners(
    graph: &mut BracketGraph,
    match_id: MatchId,
    winner_id: TeamId,
    next: Option<MatchId>,
) -> BracketResult<()> {
    match (next, graph.tournament.format) {
        (Some(next_id), _) => {
            let target = graph.core_mut(next_id)?;
            let slot = target.first_empty_slot().ok_or_else(|| {
                BracketError::CorruptBracket(format!(
                    "match {next_id} has no free slot for the winner of {match_id}"
                ))
            })?;
            target.set_team(slot, Some(winner_id));
            debug!("Team {} advances to match {} {:?}", winner_id, next_id, slot);
        }
        (None, BracketFormat::SingleElimination) => {
            championship::complete(graph, Some(winner_id));
        }
        (None, BracketFormat::DoubleElimination) => {
            championship::seat_winners_champion(graph, winner_id)?;
            debug!("Team {} is the winners-bracket champion", winner_id);
        }
    }
    Ok(())
}

fn drop_loser(
    graph: &mut BracketGraph,
    round: u32,
    match_number: u32,
    loser_id: TeamId,
) -> BracketResult<()> {
    let (target, slot) = graph
        .losers_iter_mut()
        .find_map(|m| m.drop_slot_for(round, match_number).map(|slot| (m, slot)))
        .ok_or_else(|| {
            BracketError::CorruptBracket(format!(
                "no losers slot for the loser of winners round {round} match {match_number}"
            ))
        })?;

    if target.base.team(slot).is_some() {
        return Err(BracketError::CorruptBracket(format!(
            "losers match {} slot {:?} already filled",
            target.base.id, slot
        )));
    }
    target.base.set_team(slot, Some(loser_id));
    debug!(
        "Team {} drops to losers match {} {:?}",
        loser_id,
        target.display_number(),
        slot
    );
    Ok(())
}

fn advance_losers(
    graph: &mut BracketGraph,
    match_id: MatchId,
    winner_id: TeamId,
    next: Option<MatchId>,
) -> BracketResult<()> {
    let Some(next_id) = next else {
        let qualifier = graph.losers_mut(match_id)?;
        if !qualifier.is_championship_qualifier {
            return Err(BracketError::CorruptBracket(format!(
                "losers match {match_id} has no successor"
            )));
        }
        championship::seat_losers_champion(graph, winner_id)?;
        debug!("Team {} is the losers-bracket champion", winner_id);
        return Ok(());
    };

    let target = graph.losers_mut(next_id)?;
    let slot = target
        .advancement_slot_for(match_id)
        .filter(|&slot| target.base.team(slot).is_none())
        .ok_or_else(|| {
            BracketError::CorruptBracket(format!(
                "losers match {next_id} does not wait on {match_id}"
            ))
        })?;
    target.base.set_team(slot, Some(winner_id));
    debug!("Team {} advances to losers match {} {:?}", winner_id, next_id, slot);
    Ok(())
}

/// Current state of the championship bridge, `None` for single elimination
pub fn grand_final_state(graph: &BracketGraph) -> BracketResult<Option<GrandFinalState>> {
    match graph.tournament.format {
        BracketFormat::SingleElimination => Ok(None),
        BracketFormat::DoubleElimination => GrandFinalState::of(graph).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::{
        builder::build_bracket,
        models::{BracketMatch, Team, Tournament},
    };
    use crate::constants::{CHAMPIONSHIP_ROUND, RESET_ROUND};

    fn generated(n: usize, format: BracketFormat) -> BracketGraph {
        let teams: Vec<Team> = (1..=n as u32)
            .map(|seed| Team::new(seed as i64, 1, seed))
            .collect();
        build_bracket(Tournament::new(1, format), &teams, format).unwrap()
    }

    fn id_at(graph: &BracketGraph, round: u32, number: u32) -> MatchId {
        graph.winners_match(round, number).unwrap().id
    }

    #[test]
    fn test_four_team_single_elimination() {
        let mut graph = generated(4, BracketFormat::SingleElimination);
        let m1 = id_at(&graph, 1, 1);
        let m2 = id_at(&graph, 1, 2);
        let final_id = id_at(&graph, 2, 1);

        record_result(&mut graph, m1, 1).unwrap();
        record_result(&mut graph, m2, 3).unwrap();
        let final_match = graph.core(final_id).unwrap();
        assert_eq!((final_match.team1_id, final_match.team2_id), (Some(1), Some(3)));

        let updated = record_result(&mut graph, final_id, 3).unwrap();
        assert!(matches!(updated, BracketMatch::Winners(ref m) if m.winner_id == Some(3)));
        assert_eq!(graph.tournament.status, TournamentStatus::Completed);
        assert_eq!(graph.champion(), Some(3));
    }

    #[test]
    fn test_rejections_leave_graph_unchanged() {
        let mut graph = generated(4, BracketFormat::SingleElimination);
        let m1 = id_at(&graph, 1, 1);
        let final_id = id_at(&graph, 2, 1);

        let before = graph.clone();
        assert!(matches!(
            record_result(&mut graph, m1, 2),
            Err(BracketError::InvalidWinner { team_id: 2, .. })
        ));
        assert!(matches!(
            record_result(&mut graph, final_id, 1),
            Err(BracketError::InvalidWinner { .. })
        ));
        assert!(matches!(
            record_result(&mut graph, uuid::Uuid::new_v4(), 1),
            Err(BracketError::MatchNotFound(_))
        ));
        assert!(graph.diff(&before).is_empty());

        record_result(&mut graph, m1, 4).unwrap();
        let after_first = graph.clone();
        assert!(matches!(
            record_result(&mut graph, m1, 4),
            Err(BracketError::AlreadyCompleted(id)) if id == m1
        ));
        assert!(graph.diff(&after_first).is_empty());
    }

    #[test]
    fn test_cancelled_tournament_rejects_results() {
        let mut graph = generated(4, BracketFormat::SingleElimination);
        graph.tournament.status = TournamentStatus::Cancelled;
        let m1 = id_at(&graph, 1, 1);
        assert!(matches!(
            record_result(&mut graph, m1, 1),
            Err(BracketError::InvalidState {
                actual: TournamentStatus::Cancelled,
                ..
            })
        ));
    }

    #[test]
    fn test_five_team_bye_seed_waits_for_play_in() {
        let mut graph = generated(5, BracketFormat::SingleElimination);
        let play_in = id_at(&graph, 1, 1);
        let waiting = id_at(&graph, 2, 1);
        assert!(!graph.core(waiting).unwrap().is_resolvable());

        record_result(&mut graph, play_in, 5).unwrap();
        let filled = graph.core(waiting).unwrap();
        assert_eq!((filled.team1_id, filled.team2_id), (Some(1), Some(5)));
    }

    #[test]
    fn test_double_elimination_drops_and_reset() {
        let mut graph = generated(8, BracketFormat::DoubleElimination);

        // Favourites win every winners match
        for round in 1..=3 {
            for number in 1..=(8u32 >> round) {
                let m = graph.winners_match(round, number).unwrap().clone();
                let winner = m.team1_id.unwrap().min(m.team2_id.unwrap());
                record_result(&mut graph, m.id, winner).unwrap();
            }
        }

        // Loser of 1v8 meets loser of 2v7 ... first losers match holds 8 and 5
        let first = graph.losers_match(1, 1).unwrap();
        assert_eq!((first.base.team1_id, first.base.team2_id), (Some(8), Some(5)));

        // Winners final loser waits as team2 of the qualifier
        let qualifier = graph.championship_qualifier().unwrap();
        assert_eq!(qualifier.base.team2_id, Some(2));
        assert_eq!(graph.grand_final().unwrap().team1_id, Some(1));

        // Underdogs win every losers match
        while let Some(m) = graph
            .playable()
            .into_iter()
            .find(|m| matches!(m, BracketMatch::Losers(_)))
        {
            let core = m.core();
            let winner = core.team1_id.unwrap().max(core.team2_id.unwrap());
            record_result(&mut graph, core.id, winner).unwrap();
        }
        let grand_final = graph.grand_final().unwrap().clone();
        assert_eq!(grand_final.team1_id, Some(1));
        let challenger = grand_final.team2_id.unwrap();
        assert_eq!(
            grand_final_state(&graph).unwrap(),
            Some(GrandFinalState::AReady)
        );

        record_result(&mut graph, grand_final.id, challenger).unwrap();
        let reset = graph.reset_match().unwrap().clone();
        assert_eq!(reset.round, RESET_ROUND);
        assert_eq!((reset.team1_id, reset.team2_id), (Some(1), Some(challenger)));
        assert_eq!(graph.tournament.status, TournamentStatus::Ongoing);

        record_result(&mut graph, reset.id, challenger).unwrap();
        assert_eq!(graph.tournament.status, TournamentStatus::Completed);
        assert_eq!(graph.champion(), Some(challenger));
        assert_eq!(
            grand_final_state(&graph).unwrap(),
            Some(GrandFinalState::TournamentComplete)
        );
    }

    #[test]
    fn test_winners_champion_skips_reset() {
        let mut graph = generated(4, BracketFormat::DoubleElimination);
        while graph.tournament.status == TournamentStatus::Ongoing {
            let m = graph.playable().into_iter().next().unwrap();
            let core = m.core();
            let winner = core.team1_id.unwrap().min(core.team2_id.unwrap());
            record_result(&mut graph, core.id, winner).unwrap();
        }
        assert_eq!(graph.champion(), Some(1));
        assert!(graph.reset_match().is_none());
        assert!(graph.grand_final().unwrap().round == CHAMPIONSHIP_ROUND);
        assert_eq!(graph.grand_final().unwrap().next_match_id, None);
    }
}
