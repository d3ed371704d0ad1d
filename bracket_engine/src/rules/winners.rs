//! Winners-bracket pairings and round linkage.

use serde::{Deserialize, Serialize};

use super::shape::BracketShape;

/// Position of a match inside one bracket side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MatchRef {
    pub round: u32,
    pub match_number: u32,
}

impl MatchRef {
    pub fn new(round: u32, match_number: u32) -> Self {
        Self {
            round,
            match_number,
        }
    }
}

/// What fills a winners-bracket slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotSource {
    /// Team holding this seed, known at generation time
    Seed(u32),
    /// Winner of an earlier winners-bracket match
    WinnerOf(MatchRef),
}

/// Winners-bracket match before team ids are resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnersTemplate {
    pub at: MatchRef,
    pub team1: SlotSource,
    pub team2: SlotSource,
    /// Match the winner advances to; `None` for the final
    pub next: Option<MatchRef>,
}

/// Round-1 seed pairings, indexed by match number - 1
///
/// The stronger seed of each pair comes first.
pub fn round_one_pairings(shape: &BracketShape) -> Vec<(u32, u32)> {
    let n = shape.num_teams() as u32;
    let size = shape.bracket_size() as u32;

    if n <= 16 {
        // Lowest surviving seed against the highest
        (shape.byes() as u32 + 1..=size / 2)
            .map(|seed| (seed, size + 1 - seed))
            .collect()
    } else {
        // Only seeds beyond 16 play in; round 2 is always 8 matches
        (1..=n - 16).map(|m| (17 - m, n - m + 1)).collect()
    }
}

/// Source of each round-2 entrant, ranked from strongest (index 0) to weakest
///
/// Bye seeds keep their own rank. A round-1 winner takes the rank of the
/// stronger seed in that match.
fn round_two_entrants(shape: &BracketShape, pairings: &[(u32, u32)]) -> Vec<SlotSource> {
    let entrants = shape.bracket_size() as u32 / 2;

    (1..=entrants)
        .map(|rank| {
            if shape.has_bye(rank) {
                SlotSource::Seed(rank)
            } else {
                let position = pairings
                    .iter()
                    .position(|&(stronger, _)| stronger == rank)
                    .unwrap_or_default();
                SlotSource::WinnerOf(MatchRef::new(1, position as u32 + 1))
            }
        })
        .collect()
}

/// Build every winners-bracket match for `shape`, ordered by round then match number
pub fn winners_templates(shape: &BracketShape) -> Vec<WinnersTemplate> {
    let pairings = round_one_pairings(shape);
    let mut templates: Vec<WinnersTemplate> = pairings
        .iter()
        .enumerate()
        .map(|(i, &(stronger, weaker))| WinnersTemplate {
            at: MatchRef::new(1, i as u32 + 1),
            team1: SlotSource::Seed(stronger),
            team2: SlotSource::Seed(weaker),
            next: None,
        })
        .collect();

    let entrants = round_two_entrants(shape, &pairings);
    let round_two = entrants.len() / 2;
    for j in 0..round_two {
        templates.push(WinnersTemplate {
            at: MatchRef::new(2, j as u32 + 1),
            team1: entrants[j],
            team2: entrants[entrants.len() - 1 - j],
            next: None,
        });
    }

    // Round 3 onwards: lowest-numbered match of the previous round against the highest
    for round in 3..=shape.winners_rounds() {
        let previous = shape.winners_round_size(round - 1) as u32;
        for j in 1..=shape.winners_round_size(round) as u32 {
            templates.push(WinnersTemplate {
                at: MatchRef::new(round, j),
                team1: SlotSource::WinnerOf(MatchRef::new(round - 1, j)),
                team2: SlotSource::WinnerOf(MatchRef::new(round - 1, previous + 1 - j)),
                next: None,
            });
        }
    }

    link_next(&mut templates);
    templates
}

fn link_next(templates: &mut [WinnersTemplate]) {
    let links: Vec<(MatchRef, MatchRef)> = templates
        .iter()
        .flat_map(|t| {
            [t.team1, t.team2].into_iter().filter_map(move |slot| match slot {
                SlotSource::WinnerOf(source) => Some((source, t.at)),
                SlotSource::Seed(_) => None,
            })
        })
        .collect();

    for (source, target) in links {
        if let Some(template) = templates.iter_mut().find(|t| t.at == source) {
            template.next = Some(target);
        }
    }
}
