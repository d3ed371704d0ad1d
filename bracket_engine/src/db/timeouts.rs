//! Time bounds on queries and bracket transactions.
//!
//! Every helper reports expiry as `BracketError::Timeout` so callers deal with
//! a single error type.

use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

use crate::bracket::{BracketError, BracketResult};

/// Default timeout for database queries (5 seconds)
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Default timeout for bracket transactions (10 seconds)
pub const DEFAULT_TRANSACTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Run one query, giving up after `duration`
///
/// Query failures surface as `BracketError::Database`, expiry as
/// `BracketError::Timeout`.
///
/// # Example
///
/// ```no_run
/// use bracket_engine::db::timeouts::{with_timeout, DEFAULT_QUERY_TIMEOUT};
/// # use sqlx::PgPool;
/// # async fn example(pool: &PgPool) -> bracket_engine::BracketResult<()> {
///
/// let row = with_timeout(
///     DEFAULT_QUERY_TIMEOUT,
///     sqlx::query("SELECT id FROM bracket_tournaments WHERE id = $1")
///         .bind(1_i64)
///         .fetch_optional(pool),
/// )
/// .await?;
///
/// # Ok(())
/// # }
/// ```
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> BracketResult<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    with_bracket_timeout(duration, async move { future.await.map_err(BracketError::from) }).await
}

/// [`with_timeout`] bounded by [`DEFAULT_QUERY_TIMEOUT`]
pub async fn with_default_timeout<F, T>(future: F) -> BracketResult<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    with_timeout(DEFAULT_QUERY_TIMEOUT, future).await
}

/// Bound a whole bracket operation
///
/// Dropping the future on expiry drops any open transaction with it, which
/// rolls it back.
pub async fn with_bracket_timeout<F, T>(duration: Duration, future: F) -> BracketResult<T>
where
    F: Future<Output = BracketResult<T>>,
{
    timeout(duration, future)
        .await
        .unwrap_or(Err(BracketError::Timeout(duration)))
}
