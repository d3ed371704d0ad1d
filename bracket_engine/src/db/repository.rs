//! Bracket storage seam and its PostgreSQL implementation.
//!
//! All mutations go through [`BracketStore::update_bracket`]: the store
//! locks the tournament, hands a working copy of the bracket to a closure,
//! and persists only what the closure changed. A closure error, a database
//! error or a timeout discards the working copy.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::{PgConnection, PgPool, Postgres, Row, Transaction, postgres::PgRow};
use std::{sync::Arc, time::Duration};

use super::timeouts::{
    DEFAULT_QUERY_TIMEOUT, DEFAULT_TRANSACTION_TIMEOUT, with_bracket_timeout, with_timeout,
};
use crate::bracket::{
    BracketError, BracketResult,
    graph::{BracketChanges, BracketGraph},
    models::{
        BracketFormat, BracketMatch, LosersMatch, Match, MatchId, Tournament, TournamentId,
        TournamentStatus,
    },
};

/// Schema applied by [`PgBracketStore::run_migrations`]
pub const SCHEMA: &str = include_str!("../../migrations/001_brackets.sql");

/// Trait for bracket persistence
#[async_trait]
pub trait BracketStore: Send + Sync {
    /// Create a pending tournament
    async fn create_tournament(&self, format: BracketFormat) -> BracketResult<Tournament>;

    /// Get a tournament record
    async fn get_tournament(&self, tournament_id: TournamentId) -> BracketResult<Tournament>;

    /// Load a tournament with every match of its bracket
    async fn load_bracket(&self, tournament_id: TournamentId) -> BracketResult<BracketGraph>;

    /// Tournament owning `match_id`, if the match exists
    async fn tournament_of_match(&self, match_id: MatchId) -> BracketResult<Option<TournamentId>>;

    /// Run `apply` against a locked working copy of the bracket and persist
    /// its changes atomically
    async fn update_bracket<F, T>(&self, tournament_id: TournamentId, apply: F) -> BracketResult<T>
    where
        F: FnOnce(&mut BracketGraph) -> BracketResult<T> + Send,
        T: Send;
}

/// PostgreSQL implementation of [`BracketStore`]
#[derive(Clone)]
pub struct PgBracketStore {
    pool: Arc<PgPool>,
    transaction_timeout: Duration,
}

impl PgBracketStore {
    /// Create a new store
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self {
            pool,
            transaction_timeout: DEFAULT_TRANSACTION_TIMEOUT,
        }
    }

    /// Override the bound on each bracket transaction
    pub fn with_transaction_timeout(mut self, timeout: Duration) -> Self {
        self.transaction_timeout = timeout;
        self
    }

    /// Create the bracket tables if they do not exist
    pub async fn run_migrations(&self) -> BracketResult<()> {
        sqlx::raw_sql(SCHEMA).execute(self.pool.as_ref()).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl BracketStore for PgBracketStore {
    async fn create_tournament(&self, format: BracketFormat) -> BracketResult<Tournament> {
        let row = with_timeout(
            DEFAULT_QUERY_TIMEOUT,
            sqlx::query(
                r#"
                INSERT INTO bracket_tournaments (format, status)
                VALUES ($1, $2)
                RETURNING id, format, status, created_at, started_at, finished_at
                "#,
            )
            .bind(format.as_str())
            .bind(TournamentStatus::Pending.as_str())
            .fetch_one(self.pool.as_ref()),
        )
        .await?;

        tournament_from_row(&row)
    }

    async fn get_tournament(&self, tournament_id: TournamentId) -> BracketResult<Tournament> {
        let row = with_timeout(
            DEFAULT_QUERY_TIMEOUT,
            sqlx::query(
                "SELECT id, format, status, created_at, started_at, finished_at
                 FROM bracket_tournaments WHERE id = $1",
            )
            .bind(tournament_id)
            .fetch_optional(self.pool.as_ref()),
        )
        .await?
        .ok_or(BracketError::TournamentNotFound(tournament_id))?;

        tournament_from_row(&row)
    }

    async fn load_bracket(&self, tournament_id: TournamentId) -> BracketResult<BracketGraph> {
        let tournament = self.get_tournament(tournament_id).await?;
        let mut conn = self.pool.acquire().await?;
        with_bracket_timeout(DEFAULT_QUERY_TIMEOUT, load_graph(&mut conn, tournament)).await
    }

    async fn tournament_of_match(&self, match_id: MatchId) -> BracketResult<Option<TournamentId>> {
        let row = with_timeout(
            DEFAULT_QUERY_TIMEOUT,
            sqlx::query(
                "SELECT tournament_id FROM bracket_matches WHERE id = $1
                 UNION ALL
                 SELECT tournament_id FROM bracket_losers_matches WHERE id = $1",
            )
            .bind(match_id)
            .fetch_optional(self.pool.as_ref()),
        )
        .await?;

        Ok(row.map(|row| row.get("tournament_id")))
    }

    async fn update_bracket<F, T>(&self, tournament_id: TournamentId, apply: F) -> BracketResult<T>
    where
        F: FnOnce(&mut BracketGraph) -> BracketResult<T> + Send,
        T: Send,
    {
        with_bracket_timeout(self.transaction_timeout, async move {
            let mut tx = self.pool.begin().await?;

            // Row lock serialises every writer of this tournament
            let row = sqlx::query(
                "SELECT id, format, status, created_at, started_at, finished_at
                 FROM bracket_tournaments WHERE id = $1 FOR UPDATE",
            )
            .bind(tournament_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(BracketError::TournamentNotFound(tournament_id))?;
            let tournament = tournament_from_row(&row)?;

            let before = load_graph(&mut tx, tournament).await?;
            let mut after = before.clone();
            let result = apply(&mut after)?;

            let changes = after.diff(&before);
            write_changes(&mut tx, &changes).await?;
            tx.commit().await?;

            Ok(result)
        })
        .await
    }
}

fn tournament_from_row(row: &PgRow) -> BracketResult<Tournament> {
    let format: String = row.get("format");
    let status: String = row.get("status");

    Ok(Tournament {
        id: row.get("id"),
        format: BracketFormat::parse(&format)
            .ok_or_else(|| BracketError::CorruptBracket(format!("unknown format {format}")))?,
        status: TournamentStatus::parse(&status)
            .ok_or_else(|| BracketError::CorruptBracket(format!("unknown status {status}")))?,
        created_at: row.get::<NaiveDateTime, _>("created_at").and_utc(),
        started_at: row
            .get::<Option<NaiveDateTime>, _>("started_at")
            .map(|dt| dt.and_utc()),
        finished_at: row
            .get::<Option<NaiveDateTime>, _>("finished_at")
            .map(|dt| dt.and_utc()),
    })
}

fn match_from_row(row: &PgRow) -> Match {
    Match {
        id: row.get("id"),
        tournament_id: row.get("tournament_id"),
        round: row.get::<i32, _>("round") as u32,
        match_number: row.get::<i32, _>("match_number") as u32,
        team1_id: row.get("team1_id"),
        team2_id: row.get("team2_id"),
        winner_id: row.get("winner_id"),
        loser_id: row.get("loser_id"),
        next_match_id: row.get("next_match_id"),
        has_bye: row.get("has_bye"),
        is_completed: row.get("is_completed"),
    }
}

fn losers_match_from_row(row: &PgRow) -> LosersMatch {
    let as_round = |column: &str| row.get::<Option<i32>, _>(column).map(|v| v as u32);

    LosersMatch {
        base: match_from_row(row),
        team1_from_winners: row.get("team1_from_winners"),
        team1_winners_round: as_round("team1_winners_round"),
        team1_winners_match_number: as_round("team1_winners_match_number"),
        team2_from_winners: row.get("team2_from_winners"),
        team2_winners_round: as_round("team2_winners_round"),
        team2_winners_match_number: as_round("team2_winners_match_number"),
        team1_from_match_id: row.get("team1_from_match_id"),
        team2_from_match_id: row.get("team2_from_match_id"),
        is_championship_qualifier: row.get("is_championship_qualifier"),
    }
}

async fn load_graph(conn: &mut PgConnection, tournament: Tournament) -> BracketResult<BracketGraph> {
    let rows = sqlx::query(
        "SELECT id, tournament_id, round, match_number, team1_id, team2_id, winner_id,
                loser_id, next_match_id, has_bye, is_completed
         FROM bracket_matches WHERE tournament_id = $1
         ORDER BY round, match_number",
    )
    .bind(tournament.id)
    .fetch_all(&mut *conn)
    .await?;

    let (championship, winners): (Vec<Match>, Vec<Match>) = rows
        .iter()
        .map(match_from_row)
        .partition(|m| m.is_championship());

    let losers: Vec<LosersMatch> = sqlx::query(
        "SELECT id, tournament_id, round, match_number, team1_id, team2_id, winner_id,
                loser_id, next_match_id, has_bye, is_completed,
                team1_from_winners, team1_winners_round, team1_winners_match_number,
                team2_from_winners, team2_winners_round, team2_winners_match_number,
                team1_from_match_id, team2_from_match_id, is_championship_qualifier
         FROM bracket_losers_matches WHERE tournament_id = $1
         ORDER BY round, match_number",
    )
    .bind(tournament.id)
    .fetch_all(&mut *conn)
    .await?
    .iter()
    .map(losers_match_from_row)
    .collect();

    Ok(BracketGraph::new(tournament, winners, losers, championship))
}

async fn write_changes(
    tx: &mut Transaction<'_, Postgres>,
    changes: &BracketChanges,
) -> BracketResult<()> {
    for m in &changes.inserted {
        match m {
            BracketMatch::Winners(m) | BracketMatch::Championship(m) => insert_match(tx, m).await?,
            BracketMatch::Losers(m) => insert_losers_match(tx, m).await?,
        }
    }

    for m in &changes.updated {
        match m {
            BracketMatch::Winners(m) | BracketMatch::Championship(m) => update_match(tx, m).await?,
            BracketMatch::Losers(m) => update_match_in(tx, "bracket_losers_matches", &m.base).await?,
        }
    }

    for id in &changes.removed {
        sqlx::query("DELETE FROM bracket_matches WHERE id = $1")
            .bind(*id)
            .execute(&mut **tx)
            .await?;
    }

    if let Some(tournament) = &changes.tournament {
        sqlx::query(
            r#"
            UPDATE bracket_tournaments
            SET format = $2, status = $3, started_at = $4, finished_at = $5
            WHERE id = $1
            "#,
        )
        .bind(tournament.id)
        .bind(tournament.format.as_str())
        .bind(tournament.status.as_str())
        .bind(tournament.started_at.map(|dt| dt.naive_utc()))
        .bind(tournament.finished_at.map(|dt| dt.naive_utc()))
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

async fn insert_match(tx: &mut Transaction<'_, Postgres>, m: &Match) -> BracketResult<()> {
    sqlx::query(
        r#"
        INSERT INTO bracket_matches
            (id, tournament_id, round, match_number, team1_id, team2_id, winner_id,
             loser_id, next_match_id, has_bye, is_completed)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(m.id)
    .bind(m.tournament_id)
    .bind(m.round as i32)
    .bind(m.match_number as i32)
    .bind(m.team1_id)
    .bind(m.team2_id)
    .bind(m.winner_id)
    .bind(m.loser_id)
    .bind(m.next_match_id)
    .bind(m.has_bye)
    .bind(m.is_completed)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn insert_losers_match(
    tx: &mut Transaction<'_, Postgres>,
    m: &LosersMatch,
) -> BracketResult<()> {
    let as_column = |value: Option<u32>| value.map(|v| v as i32);

    sqlx::query(
        r#"
        INSERT INTO bracket_losers_matches
            (id, tournament_id, round, match_number, team1_id, team2_id, winner_id,
             loser_id, next_match_id, has_bye, is_completed,
             team1_from_winners, team1_winners_round, team1_winners_match_number,
             team2_from_winners, team2_winners_round, team2_winners_match_number,
             team1_from_match_id, team2_from_match_id, is_championship_qualifier)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                $12, $13, $14, $15, $16, $17, $18, $19, $20)
        "#,
    )
    .bind(m.base.id)
    .bind(m.base.tournament_id)
    .bind(m.base.round as i32)
    .bind(m.base.match_number as i32)
    .bind(m.base.team1_id)
    .bind(m.base.team2_id)
    .bind(m.base.winner_id)
    .bind(m.base.loser_id)
    .bind(m.base.next_match_id)
    .bind(m.base.has_bye)
    .bind(m.base.is_completed)
    .bind(m.team1_from_winners)
    .bind(as_column(m.team1_winners_round))
    .bind(as_column(m.team1_winners_match_number))
    .bind(m.team2_from_winners)
    .bind(as_column(m.team2_winners_round))
    .bind(as_column(m.team2_winners_match_number))
    .bind(m.team1_from_match_id)
    .bind(m.team2_from_match_id)
    .bind(m.is_championship_qualifier)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn update_match(tx: &mut Transaction<'_, Postgres>, m: &Match) -> BracketResult<()> {
    update_match_in(tx, "bracket_matches", m).await
}

/// Only slot, result and link columns change after generation
async fn update_match_in(
    tx: &mut Transaction<'_, Postgres>,
    table: &str,
    m: &Match,
) -> BracketResult<()> {
    let query = format!(
        "UPDATE {table}
         SET team1_id = $2, team2_id = $3, winner_id = $4, loser_id = $5,
             next_match_id = $6, is_completed = $7
         WHERE id = $1"
    );

    let result = sqlx::query(&query)
        .bind(m.id)
        .bind(m.team1_id)
        .bind(m.team2_id)
        .bind(m.winner_id)
        .bind(m.loser_id)
        .bind(m.next_match_id)
        .bind(m.is_completed)
        .execute(&mut **tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(BracketError::MatchNotFound(m.id));
    }

    Ok(())
}
