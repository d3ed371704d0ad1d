//! In-memory arena holding one tournament's bracket.
//!
//! Matches live in three vectors (winners, losers, championship) and are
//! addressed through an id index; links between matches are `MatchId`
//! handles, never references.

use serde::Serialize;
use std::collections::HashMap;

use super::{
    errors::{BracketError, BracketResult},
    models::{BracketMatch, LosersMatch, Match, MatchId, TeamId, Tournament},
};
use crate::constants::{CHAMPIONSHIP_ROUND, RESET_ROUND};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Location {
    Winners(usize),
    Losers(usize),
    Championship(usize),
}

/// Full bracket of a tournament
#[derive(Debug, Clone, Serialize)]
pub struct BracketGraph {
    pub tournament: Tournament,
    winners: Vec<Match>,
    losers: Vec<LosersMatch>,
    championship: Vec<Match>,
    #[serde(skip)]
    index: HashMap<MatchId, Location>,
}

/// Read-only snapshot handed to callers, each side ordered by `(round, match_number)`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BracketView {
    pub tournament: Tournament,
    pub winners: Vec<Match>,
    pub losers: Vec<LosersMatch>,
    pub championship: Vec<Match>,
    pub champion: Option<TeamId>,
}

/// Rows that differ between two snapshots of the same bracket
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BracketChanges {
    pub inserted: Vec<BracketMatch>,
    pub updated: Vec<BracketMatch>,
    pub removed: Vec<MatchId>,
    pub tournament: Option<Tournament>,
}

impl BracketChanges {
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty()
            && self.updated.is_empty()
            && self.removed.is_empty()
            && self.tournament.is_none()
    }
}

impl BracketGraph {
    /// Assemble a graph; each side is sorted by `(round, match_number)`
    pub fn new(
        tournament: Tournament,
        mut winners: Vec<Match>,
        mut losers: Vec<LosersMatch>,
        mut championship: Vec<Match>,
    ) -> Self {
        winners.sort_by_key(|m| (m.round, m.match_number));
        losers.sort_by_key(|m| (m.base.round, m.base.match_number));
        championship.sort_by_key(|m| (m.round, m.match_number));

        let mut graph = Self {
            tournament,
            winners,
            losers,
            championship,
            index: HashMap::new(),
        };
        graph.reindex();
        graph
    }

    /// Graph of a tournament with no bracket yet
    pub fn empty(tournament: Tournament) -> Self {
        Self::new(tournament, Vec::new(), Vec::new(), Vec::new())
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (i, m) in self.winners.iter().enumerate() {
            self.index.insert(m.id, Location::Winners(i));
        }
        for (i, m) in self.losers.iter().enumerate() {
            self.index.insert(m.base.id, Location::Losers(i));
        }
        for (i, m) in self.championship.iter().enumerate() {
            self.index.insert(m.id, Location::Championship(i));
        }
    }

    pub fn winners(&self) -> &[Match] {
        &self.winners
    }

    pub fn losers(&self) -> &[LosersMatch] {
        &self.losers
    }

    pub fn championship(&self) -> &[Match] {
        &self.championship
    }

    /// Owned snapshot of the whole bracket
    pub fn view(&self) -> BracketView {
        BracketView {
            tournament: self.tournament.clone(),
            winners: self.winners.clone(),
            losers: self.losers.clone(),
            championship: self.championship.clone(),
            champion: self.champion(),
        }
    }

    pub fn is_generated(&self) -> bool {
        !self.winners.is_empty()
    }

    pub fn match_count(&self) -> usize {
        self.index.len()
    }

    pub fn contains(&self, id: MatchId) -> bool {
        self.index.contains_key(&id)
    }

    /// Look up any match by id
    pub fn get(&self, id: MatchId) -> Option<BracketMatch> {
        Some(match *self.index.get(&id)? {
            Location::Winners(i) => BracketMatch::Winners(self.winners[i].clone()),
            Location::Losers(i) => BracketMatch::Losers(self.losers[i].clone()),
            Location::Championship(i) => BracketMatch::Championship(self.championship[i].clone()),
        })
    }

    /// Winners-bracket match at `round`/`match_number`
    pub fn winners_match(&self, round: u32, match_number: u32) -> Option<&Match> {
        self.winners
            .iter()
            .find(|m| m.round == round && m.match_number == match_number)
    }

    /// Losers-bracket match at `round`/`match_number`
    pub fn losers_match(&self, round: u32, match_number: u32) -> Option<&LosersMatch> {
        self.losers
            .iter()
            .find(|m| m.base.round == round && m.base.match_number == match_number)
    }

    /// Winners-bracket final (the only winners match without a successor)
    pub fn winners_final(&self) -> Option<&Match> {
        self.winners.iter().find(|m| m.next_match_id.is_none())
    }

    /// Last losers match, whose winner reaches the grand final
    pub fn championship_qualifier(&self) -> Option<&LosersMatch> {
        self.losers.iter().find(|m| m.is_championship_qualifier)
    }

    /// First grand-final match (round 98)
    pub fn grand_final(&self) -> Option<&Match> {
        self.championship.iter().find(|m| m.round == CHAMPIONSHIP_ROUND)
    }

    /// Bracket-reset match (round 99), absent once it is no longer needed
    pub fn reset_match(&self) -> Option<&Match> {
        self.championship.iter().find(|m| m.round == RESET_ROUND)
    }

    /// Winner of the deciding match, once the tournament is over
    pub fn champion(&self) -> Option<TeamId> {
        if let Some(reset) = self.reset_match().filter(|m| m.is_completed) {
            return reset.winner_id;
        }
        if let Some(grand_final) = self.grand_final() {
            let deciding = grand_final.is_completed && self.reset_match().is_none();
            return grand_final.winner_id.filter(|_| deciding);
        }
        self.winners_final().and_then(|m| m.winner_id)
    }

    /// Matches that can be played right now
    pub fn playable(&self) -> Vec<BracketMatch> {
        let mut playable: Vec<BracketMatch> = self
            .winners
            .iter()
            .filter(|m| m.is_resolvable())
            .cloned()
            .map(BracketMatch::Winners)
            .collect();
        playable.extend(
            self.losers
                .iter()
                .filter(|m| m.base.is_resolvable())
                .cloned()
                .map(BracketMatch::Losers),
        );
        playable.extend(
            self.championship
                .iter()
                .filter(|m| m.is_resolvable())
                .cloned()
                .map(BracketMatch::Championship),
        );
        playable
    }

    /// Every loss recorded so far, one entry per completed match
    pub fn losses(&self) -> Vec<TeamId> {
        self.winners
            .iter()
            .chain(self.losers.iter().map(|m| &m.base))
            .chain(self.championship.iter())
            .filter_map(|m| m.loser_id)
            .collect()
    }

    pub(crate) fn locate(&self, id: MatchId) -> BracketResult<MatchKind> {
        match self.index.get(&id) {
            Some(Location::Winners(_)) => Ok(MatchKind::Winners),
            Some(Location::Losers(_)) => Ok(MatchKind::Losers),
            Some(Location::Championship(_)) => Ok(MatchKind::Championship),
            None => Err(BracketError::MatchNotFound(id)),
        }
    }

    /// Shared fields of any match, mutable
    pub(crate) fn core_mut(&mut self, id: MatchId) -> BracketResult<&mut Match> {
        match self.index.get(&id).copied() {
            Some(Location::Winners(i)) => Ok(&mut self.winners[i]),
            Some(Location::Losers(i)) => Ok(&mut self.losers[i].base),
            Some(Location::Championship(i)) => Ok(&mut self.championship[i]),
            None => Err(BracketError::MatchNotFound(id)),
        }
    }

    pub(crate) fn core(&self, id: MatchId) -> BracketResult<&Match> {
        match self.index.get(&id).copied() {
            Some(Location::Winners(i)) => Ok(&self.winners[i]),
            Some(Location::Losers(i)) => Ok(&self.losers[i].base),
            Some(Location::Championship(i)) => Ok(&self.championship[i]),
            None => Err(BracketError::MatchNotFound(id)),
        }
    }

    pub(crate) fn losers_mut(&mut self, id: MatchId) -> BracketResult<&mut LosersMatch> {
        match self.index.get(&id).copied() {
            Some(Location::Losers(i)) => Ok(&mut self.losers[i]),
            _ => Err(BracketError::CorruptBracket(format!(
                "match {id} is not a losers-bracket match"
            ))),
        }
    }

    pub(crate) fn losers_iter_mut(&mut self) -> impl Iterator<Item = &mut LosersMatch> {
        self.losers.iter_mut()
    }

    pub(crate) fn championship_mut(&mut self, round: u32) -> BracketResult<&mut Match> {
        self.championship
            .iter_mut()
            .find(|m| m.round == round)
            .ok_or_else(|| {
                BracketError::CorruptBracket(format!("championship round {round} missing"))
            })
    }

    pub(crate) fn remove_championship_match(&mut self, id: MatchId) {
        self.championship.retain(|m| m.id != id);
        self.reindex();
    }

    /// Rows of `self` that differ from the earlier snapshot `before`
    pub fn diff(&self, before: &BracketGraph) -> BracketChanges {
        let mut changes = BracketChanges::default();

        let all_after = self
            .winners
            .iter()
            .cloned()
            .map(BracketMatch::Winners)
            .chain(self.losers.iter().cloned().map(BracketMatch::Losers))
            .chain(
                self.championship
                    .iter()
                    .cloned()
                    .map(BracketMatch::Championship),
            );

        for after in all_after {
            match before.get(after.id()) {
                None => changes.inserted.push(after),
                Some(previous) if previous != after => changes.updated.push(after),
                Some(_) => {}
            }
        }

        changes.removed = before
            .index
            .keys()
            .filter(|id| !self.index.contains_key(id))
            .copied()
            .collect();

        if self.tournament != before.tournament {
            changes.tournament = Some(self.tournament.clone());
        }

        changes
    }
}

/// Which side of the bracket a match sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MatchKind {
    Winners,
    Losers,
    Championship,
}
