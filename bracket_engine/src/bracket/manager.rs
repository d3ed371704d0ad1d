//! Bracket manager: the entry point collaborators call.

use log::{info, warn};
use std::sync::Arc;

use super::{
    builder::build_bracket,
    championship::GrandFinalState,
    errors::{BracketError, BracketResult},
    graph::{BracketGraph, BracketView},
    models::{
        BracketFormat, BracketMatch, MatchId, Team, TeamId, Tournament, TournamentId,
        TournamentStatus, UpdatedMatch,
    },
    progression,
};
use crate::db::BracketStore;

/// Bracket manager
pub struct BracketManager<S: BracketStore> {
    store: Arc<S>,
}

impl<S: BracketStore> Clone for BracketManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: BracketStore> BracketManager<S> {
    /// Create a new bracket manager
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Create a pending tournament
    pub async fn create_tournament(&self, format: BracketFormat) -> BracketResult<TournamentId> {
        let tournament = self.store.create_tournament(format).await?;
        info!("Created {} tournament {}", format, tournament.id);
        Ok(tournament.id)
    }

    /// Get tournament record
    pub async fn get_tournament(&self, tournament_id: TournamentId) -> BracketResult<Tournament> {
        self.store.get_tournament(tournament_id).await
    }

    /// Cancel a tournament that has not finished
    ///
    /// Pending and ongoing tournaments can be cancelled. Matches are kept so
    /// the bracket can still be inspected; recording results is refused from
    /// now on.
    ///
    /// # Errors
    ///
    /// * `BracketError::TournamentNotFound` - unknown tournament
    /// * `BracketError::NotCancellable` - tournament is completed or already
    ///   cancelled
    pub async fn cancel_tournament(&self, tournament_id: TournamentId) -> BracketResult<Tournament> {
        let tournament = self
            .store
            .update_bracket(tournament_id, |graph| {
                match graph.tournament.status {
                    TournamentStatus::Pending | TournamentStatus::Ongoing => {}
                    status => {
                        return Err(BracketError::NotCancellable {
                            tournament_id,
                            status,
                        });
                    }
                }
                graph.tournament.status = TournamentStatus::Cancelled;
                Ok(graph.tournament.clone())
            })
            .await?;

        info!("Cancelled tournament {}", tournament_id);
        Ok(tournament)
    }

    /// Generate the full bracket and start the tournament
    ///
    /// The tournament is locked for the whole build, so of two concurrent
    /// calls exactly one succeeds and the other sees
    /// `TournamentAlreadyStarted`.
    ///
    /// # Errors
    ///
    /// * `BracketError::TournamentNotFound` - unknown tournament
    /// * `BracketError::TournamentAlreadyStarted` - bracket already generated
    /// * `BracketError::InvalidState` - tournament was cancelled
    /// * `BracketError::InvalidTeamCount`, `DuplicateOrMissingSeed`,
    ///   `DuplicateTeam` - unusable team list
    pub async fn generate_bracket(
        &self,
        tournament_id: TournamentId,
        teams: &[Team],
        format: BracketFormat,
    ) -> BracketResult<BracketGraph> {
        let result = self
            .store
            .update_bracket(tournament_id, |graph| {
                match graph.tournament.status {
                    TournamentStatus::Pending => {}
                    TournamentStatus::Cancelled => {
                        return Err(BracketError::InvalidState {
                            expected: TournamentStatus::Pending,
                            actual: TournamentStatus::Cancelled,
                        });
                    }
                    TournamentStatus::Ongoing | TournamentStatus::Completed => {
                        return Err(BracketError::TournamentAlreadyStarted(tournament_id));
                    }
                }

                *graph = build_bracket(graph.tournament.clone(), teams, format)?;
                Ok(graph.clone())
            })
            .await;

        match &result {
            Ok(graph) => info!(
                "Generated {} bracket for tournament {}: {} teams, {} matches",
                format,
                tournament_id,
                teams.len(),
                graph.match_count()
            ),
            Err(e) => warn!(
                "Bracket generation for tournament {} failed: {}",
                tournament_id, e
            ),
        }

        result
    }

    /// Record the winner of a match and advance the bracket
    ///
    /// # Errors
    ///
    /// * `BracketError::MatchNotFound` - unknown match
    /// * `BracketError::AlreadyCompleted` - result already recorded
    /// * `BracketError::InvalidState` - tournament not ongoing
    /// * `BracketError::InvalidWinner` - winner is not playing this match
    pub async fn record_result(
        &self,
        match_id: MatchId,
        winner_id: TeamId,
    ) -> BracketResult<UpdatedMatch> {
        let tournament_id = self
            .store
            .tournament_of_match(match_id)
            .await?
            .ok_or(BracketError::MatchNotFound(match_id))?;

        self.store
            .update_bracket(tournament_id, move |graph| {
                progression::record_result(graph, match_id, winner_id)
            })
            .await
    }

    /// Get any match by id
    pub async fn get_match(&self, match_id: MatchId) -> BracketResult<BracketMatch> {
        let tournament_id = self
            .store
            .tournament_of_match(match_id)
            .await?
            .ok_or(BracketError::MatchNotFound(match_id))?;

        self.store
            .load_bracket(tournament_id)
            .await?
            .get(match_id)
            .ok_or(BracketError::MatchNotFound(match_id))
    }

    /// Whole bracket of a tournament
    pub async fn get_bracket_by_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> BracketResult<BracketView> {
        Ok(self.store.load_bracket(tournament_id).await?.view())
    }

    /// Matches that can be played right now
    pub async fn playable_matches(
        &self,
        tournament_id: TournamentId,
    ) -> BracketResult<Vec<BracketMatch>> {
        Ok(self.store.load_bracket(tournament_id).await?.playable())
    }

    /// Championship bridge state, `None` for single elimination
    pub async fn grand_final_state(
        &self,
        tournament_id: TournamentId,
    ) -> BracketResult<Option<GrandFinalState>> {
        let graph = self.store.load_bracket(tournament_id).await?;
        if !graph.is_generated() {
            return Ok(None);
        }
        progression::grand_final_state(&graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryBracketStore;

    fn manager() -> BracketManager<MemoryBracketStore> {
        BracketManager::new(Arc::new(MemoryBracketStore::new()))
    }

    fn teams(tournament_id: TournamentId, n: usize) -> Vec<Team> {
        (1..=n as u32)
            .map(|seed| Team::new(seed as i64, tournament_id, seed))
            .collect()
    }

    #[tokio::test]
    async fn test_generate_starts_tournament() {
        let manager = manager();
        let id = manager
            .create_tournament(BracketFormat::SingleElimination)
            .await
            .unwrap();
        let graph = manager
            .generate_bracket(id, &teams(id, 6), BracketFormat::DoubleElimination)
            .await
            .unwrap();
        assert_eq!(graph.match_count(), 5 + 4 + 2);

        let tournament = manager.get_tournament(id).await.unwrap();
        assert_eq!(tournament.status, TournamentStatus::Ongoing);
        assert_eq!(tournament.format, BracketFormat::DoubleElimination);
        assert_eq!(
            manager.grand_final_state(id).await.unwrap(),
            Some(GrandFinalState::AwaitingChampions)
        );
    }

    #[tokio::test]
    async fn test_invalid_team_list_leaves_tournament_pending() {
        let manager = manager();
        let id = manager
            .create_tournament(BracketFormat::SingleElimination)
            .await
            .unwrap();
        let result = manager
            .generate_bracket(id, &teams(id, 3), BracketFormat::SingleElimination)
            .await;
        assert!(matches!(result, Err(BracketError::InvalidTeamCount(3))));
        assert_eq!(
            manager.get_tournament(id).await.unwrap().status,
            TournamentStatus::Pending
        );
        assert!(manager.get_bracket_by_tournament(id).await.unwrap().winners.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_blocks_generation_and_results() {
        let manager = manager();
        let id = manager
            .create_tournament(BracketFormat::SingleElimination)
            .await
            .unwrap();
        let cancelled = manager.cancel_tournament(id).await.unwrap();
        assert_eq!(cancelled.status, TournamentStatus::Cancelled);

        assert!(matches!(
            manager
                .generate_bracket(id, &teams(id, 4), BracketFormat::SingleElimination)
                .await,
            Err(BracketError::InvalidState {
                actual: TournamentStatus::Cancelled,
                ..
            })
        ));
        assert!(matches!(
            manager.cancel_tournament(id).await,
            Err(BracketError::NotCancellable {
                status: TournamentStatus::Cancelled,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_completed_tournament_cannot_be_cancelled() {
        let manager = manager();
        let id = manager
            .create_tournament(BracketFormat::SingleElimination)
            .await
            .unwrap();
        manager
            .generate_bracket(id, &teams(id, 4), BracketFormat::SingleElimination)
            .await
            .unwrap();
        while let Some(m) = manager.playable_matches(id).await.unwrap().into_iter().next() {
            let core = m.core();
            let winner = core.team1_id.unwrap().min(core.team2_id.unwrap());
            manager.record_result(core.id, winner).await.unwrap();
        }

        assert!(matches!(
            manager.cancel_tournament(id).await,
            Err(BracketError::NotCancellable { tournament_id, status: TournamentStatus::Completed })
                if tournament_id == id
        ));
        assert_eq!(
            manager.get_tournament(id).await.unwrap().status,
            TournamentStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_unknown_ids() {
        let manager = manager();
        let missing = uuid::Uuid::new_v4();
        assert!(matches!(
            manager.record_result(missing, 1).await,
            Err(BracketError::MatchNotFound(id)) if id == missing
        ));
        assert!(matches!(
            manager.get_match(missing).await,
            Err(BracketError::MatchNotFound(_))
        ));
        assert!(matches!(
            manager.get_tournament(99).await,
            Err(BracketError::TournamentNotFound(99))
        ));
    }
}
