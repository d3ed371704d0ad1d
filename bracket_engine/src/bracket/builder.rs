//! Full bracket generation.

use chrono::Utc;
use std::collections::HashSet;

use super::{
    championship::build_championship,
    errors::{BracketError, BracketResult},
    graph::BracketGraph,
    losers::build_losers,
    models::{BracketFormat, Team, TeamId, Tournament, TournamentStatus},
    winners::build_winners,
};
use crate::rules::BracketShape;

/// Check the team list and return team ids ordered by seed
///
/// # Errors
///
/// * `BracketError::InvalidTeamCount` - fewer than 4 or more than 32 teams
/// * `BracketError::DuplicateTeam` - a team id appears twice
/// * `BracketError::DuplicateOrMissingSeed` - seeds are not exactly `1..=N`
pub fn validate_teams(teams: &[Team]) -> BracketResult<(BracketShape, Vec<TeamId>)> {
    let shape = BracketShape::new(teams.len())?;

    let mut ids = HashSet::with_capacity(teams.len());
    let mut by_seed: Vec<Option<TeamId>> = vec![None; teams.len()];

    for team in teams {
        if !ids.insert(team.id) {
            return Err(BracketError::DuplicateTeam(team.id));
        }

        let slot = (team.seed as usize)
            .checked_sub(1)
            .and_then(|index| by_seed.get_mut(index))
            .filter(|slot| slot.is_none())
            .ok_or(BracketError::DuplicateOrMissingSeed {
                seed: team.seed,
                expected: teams.len(),
            })?;
        *slot = Some(team.id);
    }

    // With N teams and no duplicates every seed 1..=N is now filled
    let ordered = by_seed.into_iter().flatten().collect();
    Ok((shape, ordered))
}

/// Build the whole bracket for `tournament` and mark it started
///
/// The tournament's format is overwritten with `format`. Single elimination
/// produces only the winners bracket.
pub fn build_bracket(
    mut tournament: Tournament,
    teams: &[Team],
    format: BracketFormat,
) -> BracketResult<BracketGraph> {
    let (shape, teams_by_seed) = validate_teams(teams)?;

    let winners = build_winners(tournament.id, &shape, &teams_by_seed)?;
    let (losers, championship) = match format {
        BracketFormat::SingleElimination => (Vec::new(), Vec::new()),
        BracketFormat::DoubleElimination => (
            build_losers(tournament.id, &shape)?,
            build_championship(tournament.id),
        ),
    };

    tournament.format = format;
    tournament.status = TournamentStatus::Ongoing;
    tournament.started_at = Some(Utc::now());

    Ok(BracketGraph::new(
        tournament,
        winners.matches,
        losers,
        championship,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(n: usize) -> Vec<Team> {
        (1..=n as u32)
            .map(|seed| Team::new(100 + seed as i64, 1, seed))
            .collect()
    }

    #[test]
    fn test_validate_orders_by_seed() {
        let mut teams = seeded(4);
        teams.reverse();
        let (shape, ordered) = validate_teams(&teams).unwrap();
        assert_eq!(shape.num_teams(), 4);
        assert_eq!(ordered, vec![101, 102, 103, 104]);
    }

    #[test]
    fn test_validate_rejects_bad_seeds() {
        let mut teams = seeded(5);
        teams[4].seed = 2;
        assert!(matches!(
            validate_teams(&teams),
            Err(BracketError::DuplicateOrMissingSeed { seed: 2, expected: 5 })
        ));

        let mut teams = seeded(5);
        teams[0].seed = 0;
        assert!(matches!(
            validate_teams(&teams),
            Err(BracketError::DuplicateOrMissingSeed { seed: 0, .. })
        ));

        let mut teams = seeded(5);
        teams[2].seed = 6;
        assert!(matches!(
            validate_teams(&teams),
            Err(BracketError::DuplicateOrMissingSeed { seed: 6, .. })
        ));
    }

    #[test]
    fn test_validate_rejects_duplicate_team_and_bad_count() {
        let mut teams = seeded(4);
        teams[3].id = teams[0].id;
        assert!(matches!(
            validate_teams(&teams),
            Err(BracketError::DuplicateTeam(101))
        ));
        assert!(matches!(
            validate_teams(&seeded(3)),
            Err(BracketError::InvalidTeamCount(3))
        ));
        assert!(matches!(
            validate_teams(&seeded(33)),
            Err(BracketError::InvalidTeamCount(33))
        ));
    }

    #[test]
    fn test_double_elimination_match_counts() {
        for n in 4..=32 {
            let tournament = Tournament::new(1, BracketFormat::SingleElimination);
            let graph =
                build_bracket(tournament, &seeded(n), BracketFormat::DoubleElimination).unwrap();
            assert_eq!(graph.winners().len(), n - 1);
            assert_eq!(graph.losers().len(), n - 2);
            assert_eq!(graph.championship().len(), 2);
            assert_eq!(graph.tournament.format, BracketFormat::DoubleElimination);
            assert_eq!(graph.tournament.status, TournamentStatus::Ongoing);
            assert!(graph.tournament.started_at.is_some());
        }
    }

    #[test]
    fn test_single_elimination_has_no_losers_side() {
        let tournament = Tournament::new(1, BracketFormat::DoubleElimination);
        let graph = build_bracket(tournament, &seeded(8), BracketFormat::SingleElimination).unwrap();
        assert_eq!(graph.winners().len(), 7);
        assert!(graph.losers().is_empty());
        assert!(graph.championship().is_empty());
    }
}
