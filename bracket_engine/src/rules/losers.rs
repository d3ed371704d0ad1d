//! Losers-bracket layout.
//!
//! The layout is first laid out positionally as if the field were a full
//! power of two, then every position that would be fed by fewer than two real
//! teams is collapsed: its only source (if any) moves straight into the slot
//! it would have fed. What remains is a bracket where each match has two real
//! sources, so no slot ever waits on a team that cannot arrive.

use serde::{Deserialize, Serialize};

use super::{shape::BracketShape, winners::MatchRef};

/// What fills a losers-bracket slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LosersSource {
    /// Loser of the given winners-bracket match drops in
    Drop(MatchRef),
    /// Winner of the given losers-bracket match advances
    Advance(MatchRef),
}

/// Losers-bracket match before ids are assigned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LosersTemplate {
    pub at: MatchRef,
    pub team1: LosersSource,
    pub team2: LosersSource,
    /// Next losers match; `None` only for the championship qualifier
    pub next: Option<MatchRef>,
    pub championship_qualifier: bool,
}

#[derive(Debug)]
struct Position {
    at: MatchRef,
    team1: Option<LosersSource>,
    team2: Option<LosersSource>,
}

/// Position in the following round fed by the winner at `at`
///
/// Odd rounds keep the match number so the winner meets a fresh drop-in;
/// even rounds fold the lowest-numbered match onto the highest.
fn advance_target(shape: &BracketShape, at: MatchRef) -> Option<MatchRef> {
    if at.round >= shape.losers_rounds() {
        return None;
    }
    let size = shape.losers_round_positions(at.round) as u32;
    let match_number = if at.round % 2 == 1 {
        at.match_number
    } else {
        at.match_number.min(size + 1 - at.match_number)
    };
    Some(MatchRef::new(at.round + 1, match_number))
}

/// Winners round-1 match played by the team ranked `rank`, if any
fn round_one_match_for_rank(shape: &BracketShape, rank: u32) -> Option<MatchRef> {
    if shape.has_bye(rank) {
        return None;
    }
    let match_number = if shape.num_teams() <= 16 {
        rank - shape.byes() as u32
    } else {
        17 - rank
    };
    Some(MatchRef::new(1, match_number))
}

fn positional_layout(shape: &BracketShape) -> Vec<Vec<Position>> {
    let mut rounds = Vec::with_capacity(shape.losers_rounds() as usize);
    let half = shape.bracket_size() as u32 / 2;

    // Round 1: losers of winners round 1, paired by index and by count - index + 1
    let mut first = Vec::new();
    for i in 1..=shape.losers_round_positions(1) as u32 {
        let mut sources: Vec<MatchRef> = [i, half + 1 - i]
            .into_iter()
            .filter_map(|rank| round_one_match_for_rank(shape, rank))
            .collect();
        sources.sort();
        let mut sources = sources.into_iter().map(LosersSource::Drop);
        first.push(Position {
            at: MatchRef::new(1, i),
            team1: sources.next(),
            team2: sources.next(),
        });
    }
    rounds.push(first);

    for round in 2..=shape.losers_rounds() {
        let previous = shape.losers_round_positions(round - 1) as u32;
        let positions = (1..=shape.losers_round_positions(round) as u32)
            .map(|i| {
                let team1 = Some(LosersSource::Advance(MatchRef::new(round - 1, i)));
                let team2 = if round % 2 == 0 {
                    // Drop-in round: losers of winners round round/2 + 1
                    Some(LosersSource::Drop(MatchRef::new(round / 2 + 1, i)))
                } else {
                    Some(LosersSource::Advance(MatchRef::new(
                        round - 1,
                        previous + 1 - i,
                    )))
                };
                Position {
                    at: MatchRef::new(round, i),
                    team1,
                    team2,
                }
            })
            .collect();
        rounds.push(positions);
    }

    rounds
}

/// Build every losers-bracket match for `shape`, ordered by round then match number
pub fn losers_templates(shape: &BracketShape) -> Vec<LosersTemplate> {
    let mut rounds = positional_layout(shape);
    let mut templates = Vec::with_capacity(shape.losers_match_count());

    for round_index in 0..rounds.len() {
        let mut collapsed = Vec::new();

        for position in &rounds[round_index] {
            match (position.team1, position.team2) {
                (Some(team1), Some(team2)) => {
                    let next = advance_target(shape, position.at);
                    templates.push(LosersTemplate {
                        at: position.at,
                        team1,
                        team2,
                        next,
                        championship_qualifier: next.is_none(),
                    });
                }
                (only, None) | (None, only) => collapsed.push((position.at, only)),
            }
        }

        // Hand each collapsed position's lone source (or nothing) to the slot it fed
        for (at, replacement) in collapsed {
            let Some(target) = advance_target(shape, at) else {
                continue;
            };
            let fed = Some(LosersSource::Advance(at));
            if let Some(position) = rounds
                .get_mut(round_index + 1)
                .and_then(|next| next.iter_mut().find(|p| p.at == target))
            {
                if position.team1 == fed {
                    position.team1 = replacement;
                } else if position.team2 == fed {
                    position.team2 = replacement;
                }
            }
        }
    }

    templates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{MAX_TEAMS, MIN_TEAMS};
    use crate::rules::winners::winners_templates;
    use std::collections::HashMap;

    fn templates_for(n: usize) -> Vec<LosersTemplate> {
        losers_templates(&BracketShape::new(n).unwrap())
    }

    fn round_sizes(templates: &[LosersTemplate], rounds: u32) -> Vec<usize> {
        (1..=rounds)
            .map(|r| templates.iter().filter(|t| t.at.round == r).count())
            .collect()
    }

    #[test]
    fn test_eight_teams_layout() {
        let t = templates_for(8);
        assert_eq!(round_sizes(&t, 4), vec![2, 2, 1, 1]);

        // Round 1: loser of match 1 against loser of match 4
        assert_eq!(t[0].team1, LosersSource::Drop(MatchRef::new(1, 1)));
        assert_eq!(t[0].team2, LosersSource::Drop(MatchRef::new(1, 4)));
        assert_eq!(t[1].team1, LosersSource::Drop(MatchRef::new(1, 2)));
        assert_eq!(t[1].team2, LosersSource::Drop(MatchRef::new(1, 3)));

        // Round 2 keeps the match number and takes winners round 2 losers
        assert_eq!(t[2].team1, LosersSource::Advance(MatchRef::new(1, 1)));
        assert_eq!(t[2].team2, LosersSource::Drop(MatchRef::new(2, 1)));

        // Losers final takes the winners-final loser as team2
        let last = t.last().unwrap();
        assert_eq!(last.at, MatchRef::new(4, 1));
        assert!(last.championship_qualifier);
        assert_eq!(last.team1, LosersSource::Advance(MatchRef::new(3, 1)));
        assert_eq!(last.team2, LosersSource::Drop(MatchRef::new(3, 1)));
        assert_eq!(last.next, None);
    }

    #[test]
    fn test_five_teams_collapses_byes() {
        let t = templates_for(5);
        assert_eq!(t.len(), 3);
        assert_eq!(round_sizes(&t, 4), vec![0, 1, 1, 1]);

        assert_eq!(t[0].at, MatchRef::new(2, 1));
        assert_eq!(t[0].team1, LosersSource::Drop(MatchRef::new(1, 1)));
        assert_eq!(t[0].team2, LosersSource::Drop(MatchRef::new(2, 1)));

        assert_eq!(t[1].at, MatchRef::new(3, 1));
        assert_eq!(t[1].team1, LosersSource::Advance(MatchRef::new(2, 1)));
        assert_eq!(t[1].team2, LosersSource::Drop(MatchRef::new(2, 2)));
    }

    #[test]
    fn test_full_field_layout() {
        let t = templates_for(32);
        assert_eq!(round_sizes(&t, 8), vec![8, 8, 4, 4, 2, 2, 1, 1]);
    }

    #[test]
    fn test_match_count_is_field_minus_two() {
        for n in MIN_TEAMS..=MAX_TEAMS {
            let shape = BracketShape::new(n).unwrap();
            let t = losers_templates(&shape);
            assert_eq!(t.len(), n - 2, "n={n}");
            assert_eq!(t.iter().filter(|t| t.championship_qualifier).count(), 1);
        }
    }

    #[test]
    fn test_every_winners_loser_drops_exactly_once() {
        for n in MIN_TEAMS..=MAX_TEAMS {
            let shape = BracketShape::new(n).unwrap();
            let losers = losers_templates(&shape);
            let mut drops: HashMap<MatchRef, usize> = HashMap::new();
            for template in &losers {
                for source in [template.team1, template.team2] {
                    if let LosersSource::Drop(at) = source {
                        *drops.entry(at).or_default() += 1;
                    }
                }
            }
            for winners in winners_templates(&shape) {
                assert_eq!(drops.get(&winners.at), Some(&1), "n={n} {:?}", winners.at);
            }
            assert_eq!(drops.len(), n - 1);
        }
    }

    #[test]
    fn test_links_point_at_existing_matches() {
        for n in MIN_TEAMS..=MAX_TEAMS {
            let t = templates_for(n);
            let mut fed: HashMap<MatchRef, usize> = HashMap::new();
            for template in &t {
                for source in [template.team1, template.team2] {
                    if let LosersSource::Advance(at) = source {
                        *fed.entry(at).or_default() += 1;
                    }
                }
            }
            for template in &t {
                match template.next {
                    Some(next) => {
                        let target = t.iter().find(|c| c.at == next);
                        assert!(target.is_some(), "n={n} {:?} -> {:?}", template.at, next);
                        assert_eq!(fed.get(&template.at), Some(&1));
                        let target = target.unwrap();
                        assert!(
                            target.team1 == LosersSource::Advance(template.at)
                                || target.team2 == LosersSource::Advance(template.at)
                        );
                    }
                    None => assert!(template.championship_qualifier),
                }
            }
        }
    }
}
