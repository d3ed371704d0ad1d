//! Bracket dimensions derived from the team count alone.

use serde::{Deserialize, Serialize};

use crate::bracket::{BracketError, BracketResult};
use crate::constants::{MAX_TEAMS, MIN_TEAMS};

/// Smallest power of two greater than or equal to `n`
pub fn next_pow2(n: usize) -> usize {
    n.next_power_of_two()
}

/// Shape of a bracket for a given number of teams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketShape {
    num_teams: usize,
    bracket_size: usize,
    byes: usize,
}

impl BracketShape {
    /// Compute the shape for `num_teams`
    ///
    /// # Errors
    ///
    /// * `BracketError::InvalidTeamCount` - `num_teams` outside `[4, 32]`
    pub fn new(num_teams: usize) -> BracketResult<Self> {
        if !(MIN_TEAMS..=MAX_TEAMS).contains(&num_teams) {
            return Err(BracketError::InvalidTeamCount(num_teams));
        }

        let bracket_size = next_pow2(num_teams);

        Ok(Self {
            num_teams,
            bracket_size,
            byes: bracket_size - num_teams,
        })
    }

    pub fn num_teams(&self) -> usize {
        self.num_teams
    }

    /// Field size rounded up to a power of two
    pub fn bracket_size(&self) -> usize {
        self.bracket_size
    }

    /// Number of round-1 byes; they go to seeds `1..=byes`
    pub fn byes(&self) -> usize {
        self.byes
    }

    /// True if `seed` skips round 1
    pub fn has_bye(&self, seed: u32) -> bool {
        seed >= 1 && (seed as usize) <= self.byes
    }

    /// Number of matches actually played in winners round 1
    pub fn round_one_matches(&self) -> usize {
        self.num_teams - self.bracket_size / 2
    }

    /// Number of teams that play in round 1
    pub fn teams_playing_round_one(&self) -> usize {
        self.round_one_matches() * 2
    }

    /// Winners-bracket rounds, including the final
    pub fn winners_rounds(&self) -> u32 {
        self.bracket_size.trailing_zeros()
    }

    /// Number of matches in winners round `round` (1-based)
    pub fn winners_round_size(&self, round: u32) -> usize {
        match round {
            0 => 0,
            1 => self.round_one_matches(),
            r if r <= self.winners_rounds() => self.bracket_size >> r,
            _ => 0,
        }
    }

    /// Total winners-bracket matches (always `num_teams - 1`)
    pub fn winners_match_count(&self) -> usize {
        (1..=self.winners_rounds())
            .map(|round| self.winners_round_size(round))
            .sum()
    }

    /// Losers-bracket rounds; the last one holds the championship qualifier
    pub fn losers_rounds(&self) -> u32 {
        2 * (self.winners_rounds() - 1)
    }

    /// Positional slots in losers round `round` before byes are collapsed
    ///
    /// Rounds come in pairs of equal size: `2j - 1` and `2j` both have
    /// `bracket_size / 2^(j + 1)` positions.
    pub fn losers_round_positions(&self, round: u32) -> usize {
        if round == 0 || round > self.losers_rounds() {
            return 0;
        }
        let pair = round.div_ceil(2);
        self.bracket_size >> (pair + 1)
    }

    /// Losers round that receives the losers of winners round `winners_round`
    pub fn drop_round_for(&self, winners_round: u32) -> Option<u32> {
        match winners_round {
            0 => None,
            1 => Some(1),
            r if r <= self.winners_rounds() => Some(2 * (r - 1)),
            _ => None,
        }
    }

    /// Losers-bracket match count once byes are collapsed
    pub fn losers_match_count(&self) -> usize {
        self.num_teams - 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_out_of_range_counts() {
        for n in [0, 1, 2, 3, 33, 64] {
            assert!(matches!(
                BracketShape::new(n),
                Err(BracketError::InvalidTeamCount(count)) if count == n
            ));
        }
    }

    #[test]
    fn test_five_teams() {
        let shape = BracketShape::new(5).unwrap();
        assert_eq!(shape.bracket_size(), 8);
        assert_eq!(shape.byes(), 3);
        assert!(shape.has_bye(1) && shape.has_bye(2) && shape.has_bye(3));
        assert!(!shape.has_bye(4));
        assert_eq!(shape.round_one_matches(), 1);
        assert_eq!(shape.winners_rounds(), 3);
    }

    #[test]
    fn test_byes_plus_round_one_players_cover_field() {
        for n in MIN_TEAMS..=MAX_TEAMS {
            let shape = BracketShape::new(n).unwrap();
            assert_eq!(shape.byes() + shape.teams_playing_round_one(), n);
            let expected_rounds = (shape.bracket_size() as f64).log2().ceil() as u32;
            assert_eq!(shape.winners_rounds(), expected_rounds);
            assert_eq!(shape.winners_match_count(), n - 1);
        }
    }

    #[test]
    fn test_losers_round_positions_for_eight() {
        let shape = BracketShape::new(8).unwrap();
        let sizes: Vec<usize> = (1..=shape.losers_rounds())
            .map(|r| shape.losers_round_positions(r))
            .collect();
        assert_eq!(sizes, vec![2, 2, 1, 1]);
    }

    #[test]
    fn test_drop_rounds_for_thirty_two() {
        let shape = BracketShape::new(32).unwrap();
        assert_eq!(shape.losers_rounds(), 8);
        assert_eq!(shape.drop_round_for(1), Some(1));
        assert_eq!(shape.drop_round_for(2), Some(2));
        assert_eq!(shape.drop_round_for(3), Some(4));
        assert_eq!(shape.drop_round_for(4), Some(6));
        assert_eq!(shape.drop_round_for(5), Some(8));
        assert_eq!(shape.drop_round_for(6), None);
    }
}
