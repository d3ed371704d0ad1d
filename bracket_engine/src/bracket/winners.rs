//! Winners-bracket builder.

use std::collections::HashMap;

use super::{
    errors::{BracketError, BracketResult},
    models::{Match, MatchId, TeamId, TournamentId},
};
use crate::rules::{BracketShape, MatchRef, SlotSource, winners_templates};

/// Winners matches plus the id allocated to each bracket position
#[derive(Debug)]
pub struct WinnersBracket {
    pub matches: Vec<Match>,
    pub ids: HashMap<MatchRef, MatchId>,
}

/// Build the winners bracket
///
/// `teams_by_seed[i]` holds the team seeded `i + 1`. Slots fed by an earlier
/// match stay empty until progression fills them.
pub fn build_winners(
    tournament_id: TournamentId,
    shape: &BracketShape,
    teams_by_seed: &[TeamId],
) -> BracketResult<WinnersBracket> {
    let templates = winners_templates(shape);

    let mut matches: Vec<Match> = templates
        .iter()
        .map(|t| Match::new(tournament_id, t.at.round, t.at.match_number))
        .collect();
    let ids: HashMap<MatchRef, MatchId> = templates
        .iter()
        .zip(&matches)
        .map(|(t, m)| (t.at, m.id))
        .collect();

    let resolve = |source: SlotSource| -> BracketResult<Option<TeamId>> {
        match source {
            SlotSource::Seed(seed) => teams_by_seed
                .get(seed as usize - 1)
                .copied()
                .map(Some)
                .ok_or(BracketError::DuplicateOrMissingSeed {
                    seed,
                    expected: shape.num_teams(),
                }),
            SlotSource::WinnerOf(_) => Ok(None),
        }
    };

    for (template, m) in templates.iter().zip(matches.iter_mut()) {
        m.team1_id = resolve(template.team1)?;
        m.team2_id = resolve(template.team2)?;
        m.has_bye = m.team1_id.is_some() && m.team2_id.is_none();
        m.next_match_id = match template.next {
            Some(next) => Some(*ids.get(&next).ok_or_else(|| {
                BracketError::CorruptBracket(format!("winners link to missing match {next:?}"))
            })?),
            None => None,
        };
    }

    Ok(WinnersBracket { matches, ids })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn teams(n: usize) -> Vec<TeamId> {
        (1..=n as i64).map(|seed| seed * 10).collect()
    }

    #[test]
    fn test_four_teams_resolved() {
        let shape = BracketShape::new(4).unwrap();
        let bracket = build_winners(1, &shape, &teams(4)).unwrap();
        assert_eq!(bracket.matches.len(), 3);

        let m1 = &bracket.matches[0];
        assert_eq!((m1.team1_id, m1.team2_id), (Some(10), Some(40)));
        let m2 = &bracket.matches[1];
        assert_eq!((m2.team1_id, m2.team2_id), (Some(20), Some(30)));

        let final_match = &bracket.matches[2];
        assert_eq!(m1.next_match_id, Some(final_match.id));
        assert_eq!(m2.next_match_id, Some(final_match.id));
        assert_eq!(final_match.next_match_id, None);
        assert!(bracket.matches.iter().all(|m| !m.has_bye));
    }

    #[test]
    fn test_five_teams_marks_bye() {
        let shape = BracketShape::new(5).unwrap();
        let bracket = build_winners(1, &shape, &teams(5)).unwrap();

        let waiting = &bracket.matches[1];
        assert_eq!((waiting.round, waiting.match_number), (2, 1));
        assert_eq!(waiting.team1_id, Some(10));
        assert_eq!(waiting.team2_id, None);
        assert!(waiting.has_bye);

        let full = &bracket.matches[2];
        assert_eq!((full.team1_id, full.team2_id), (Some(20), Some(30)));
        assert!(!full.has_bye);
    }

    #[test]
    fn test_short_team_list_is_rejected() {
        let shape = BracketShape::new(6).unwrap();
        assert!(matches!(
            build_winners(1, &shape, &teams(5)),
            Err(BracketError::DuplicateOrMissingSeed { seed: 6, .. })
        ));
    }
}
