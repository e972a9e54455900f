//! Database operation timeout helpers
//!
//! Bounds every storage call so a stalled connection surfaces as an error
//! instead of hanging a bracket mutation indefinitely.

use std::time::Duration;
use tokio::time::timeout;

use crate::bracket::errors::{BracketError, BracketResult};

/// Default timeout for single queries (5 seconds)
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Default timeout for whole transactions (10 seconds)
pub const DEFAULT_TRANSACTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Execute a storage operation with a timeout
///
/// # Arguments
///
/// * `duration` - Timeout duration
/// * `future` - Async operation to execute
///
/// # Returns
///
/// * `BracketResult<T>` - Result, or `BracketError::Timeout` on expiry
///
/// # Example
///
/// ```no_run
/// use knockout::db::timeouts::{with_timeout, DEFAULT_QUERY_TIMEOUT};
/// # use knockout::db::BracketStore;
/// # async fn example(store: &dyn BracketStore) -> Result<(), Box<dyn std::error::Error>> {
///
/// let event = with_timeout(DEFAULT_QUERY_TIMEOUT, store.fetch_event(1)).await?;
///
/// # Ok(())
/// # }
/// ```
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> BracketResult<T>
where
    F: std::future::Future<Output = BracketResult<T>>,
{
    match timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(BracketError::Timeout(duration)),
    }
}
