//! In-memory bracket store for tests, previews and simulations.

use async_trait::async_trait;
use std::{collections::HashMap, time::Duration};
use tokio::sync::Mutex;

use super::{
    repository::BracketStore,
    timeouts::{DEFAULT_TRANSACTION_TIMEOUT, with_bracket_timeout},
};
use crate::bracket::{
    BracketError, BracketResult,
    graph::BracketGraph,
    models::{BracketFormat, MatchId, Tournament, TournamentId},
};

#[derive(Debug, Default)]
struct MemoryState {
    last_id: TournamentId,
    brackets: HashMap<TournamentId, BracketGraph>,
    fail_next_commit: bool,
}

/// [`BracketStore`] backed by a mutex-guarded map
///
/// Writers work on a clone of the bracket and swap it in only when the whole
/// update succeeds.
#[derive(Debug)]
pub struct MemoryBracketStore {
    state: Mutex<MemoryState>,
    transaction_timeout: Duration,
}

impl Default for MemoryBracketStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBracketStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            transaction_timeout: DEFAULT_TRANSACTION_TIMEOUT,
        }
    }

    /// Override the bound on waiting for and running an update
    pub fn with_transaction_timeout(mut self, timeout: Duration) -> Self {
        self.transaction_timeout = timeout;
        self
    }

    /// Make the next successful update fail at commit time
    ///
    /// The failure surfaces as `BracketError::Database` and nothing is kept.
    pub async fn fail_next_commit(&self) {
        self.state.lock().await.fail_next_commit = true;
    }
}

#[async_trait]
impl BracketStore for MemoryBracketStore {
    async fn create_tournament(&self, format: BracketFormat) -> BracketResult<Tournament> {
        let mut state = self.state.lock().await;
        state.last_id += 1;
        let tournament = Tournament::new(state.last_id, format);
        state
            .brackets
            .insert(tournament.id, BracketGraph::empty(tournament.clone()));
        Ok(tournament)
    }

    async fn get_tournament(&self, tournament_id: TournamentId) -> BracketResult<Tournament> {
        self.state
            .lock()
            .await
            .brackets
            .get(&tournament_id)
            .map(|graph| graph.tournament.clone())
            .ok_or(BracketError::TournamentNotFound(tournament_id))
    }

    async fn load_bracket(&self, tournament_id: TournamentId) -> BracketResult<BracketGraph> {
        self.state
            .lock()
            .await
            .brackets
            .get(&tournament_id)
            .cloned()
            .ok_or(BracketError::TournamentNotFound(tournament_id))
    }

    async fn tournament_of_match(&self, match_id: MatchId) -> BracketResult<Option<TournamentId>> {
        Ok(self
            .state
            .lock()
            .await
            .brackets
            .iter()
            .find(|(_, graph)| graph.contains(match_id))
            .map(|(&id, _)| id))
    }

    async fn update_bracket<F, T>(&self, tournament_id: TournamentId, apply: F) -> BracketResult<T>
    where
        F: FnOnce(&mut BracketGraph) -> BracketResult<T> + Send,
        T: Send,
    {
        with_bracket_timeout(self.transaction_timeout, async move {
            let mut state = self.state.lock().await;

            let mut working = state
                .brackets
                .get(&tournament_id)
                .cloned()
                .ok_or(BracketError::TournamentNotFound(tournament_id))?;
            let result = apply(&mut working)?;

            if std::mem::take(&mut state.fail_next_commit) {
                return Err(BracketError::Database(sqlx::Error::PoolClosed));
            }

            state.brackets.insert(tournament_id, working);
            Ok(result)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bracket::models::TournamentStatus;

    #[tokio::test]
    async fn test_create_assigns_increasing_ids() {
        let store = MemoryBracketStore::new();
        let first = store.create_tournament(BracketFormat::SingleElimination).await.unwrap();
        let second = store.create_tournament(BracketFormat::DoubleElimination).await.unwrap();
        assert_eq!((first.id, second.id), (1, 2));
        assert_eq!(second.status, TournamentStatus::Pending);
        assert_eq!(
            store.get_tournament(2).await.unwrap().format,
            BracketFormat::DoubleElimination
        );
    }

    #[tokio::test]
    async fn test_failed_update_keeps_previous_state() {
        let store = MemoryBracketStore::new();
        let tournament = store.create_tournament(BracketFormat::SingleElimination).await.unwrap();

        let result: BracketResult<()> = store
            .update_bracket(tournament.id, |graph| {
                graph.tournament.status = TournamentStatus::Cancelled;
                Err(BracketError::CorruptBracket("abort".to_string()))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(
            store.get_tournament(tournament.id).await.unwrap().status,
            TournamentStatus::Pending
        );

        store.fail_next_commit().await;
        let result = store
            .update_bracket(tournament.id, |graph| {
                graph.tournament.status = TournamentStatus::Cancelled;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(BracketError::Database(_))));
        assert_eq!(
            store.get_tournament(tournament.id).await.unwrap().status,
            TournamentStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_unknown_tournament() {
        let store = MemoryBracketStore::new();
        assert!(matches!(
            store.load_bracket(42).await,
            Err(BracketError::TournamentNotFound(42))
        ));
        let result = store.update_bracket(42, |_| Ok(())).await;
        assert!(matches!(result, Err(BracketError::TournamentNotFound(42))));
        assert_eq!(store.tournament_of_match(uuid::Uuid::new_v4()).await.unwrap(), None);
    }
}
