//! Losers-bracket builder (double elimination only).

use std::collections::HashMap;

use super::{
    errors::{BracketError, BracketResult},
    models::{LosersMatch, MatchId, Slot, TournamentId},
};
use crate::rules::{BracketShape, LosersSource, MatchRef, losers_templates};

/// Build the losers bracket
///
/// Drop-in slots record the winners round and match number they wait on;
/// advancement slots record the id of the losers match that feeds them.
/// Every slot starts empty.
pub fn build_losers(
    tournament_id: TournamentId,
    shape: &BracketShape,
) -> BracketResult<Vec<LosersMatch>> {
    let templates = losers_templates(shape);

    let mut matches: Vec<LosersMatch> = templates
        .iter()
        .map(|t| LosersMatch::new(tournament_id, t.at.round, t.at.match_number))
        .collect();
    let ids: HashMap<MatchRef, MatchId> = templates
        .iter()
        .zip(&matches)
        .map(|(t, m)| (t.at, m.base.id))
        .collect();

    let lookup = |at: MatchRef| -> BracketResult<MatchId> {
        ids.get(&at).copied().ok_or_else(|| {
            BracketError::CorruptBracket(format!("losers link to missing match {at:?}"))
        })
    };

    for (template, m) in templates.iter().zip(matches.iter_mut()) {
        for (slot, source) in [(Slot::Team1, template.team1), (Slot::Team2, template.team2)] {
            match source {
                LosersSource::Drop(from) => set_drop(m, slot, from),
                LosersSource::Advance(from) => {
                    let id = lookup(from)?;
                    match slot {
                        Slot::Team1 => m.team1_from_match_id = Some(id),
                        Slot::Team2 => m.team2_from_match_id = Some(id),
                    }
                }
            }
        }
        m.base.next_match_id = template.next.map(lookup).transpose()?;
        m.is_championship_qualifier = template.championship_qualifier;
    }

    Ok(matches)
}

fn set_drop(m: &mut LosersMatch, slot: Slot, from: MatchRef) {
    match slot {
        Slot::Team1 => {
            m.team1_from_winners = true;
            m.team1_winners_round = Some(from.round);
            m.team1_winners_match_number = Some(from.match_number);
        }
        Slot::Team2 => {
            m.team2_from_winners = true;
            m.team2_winners_round = Some(from.round);
            m.team2_winners_match_number = Some(from.match_number);
        }
    }
}
