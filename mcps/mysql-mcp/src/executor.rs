//! Query execution
//!
//! Opens a session, runs one statement, commits if the statement looks like
//! a write, fetches up to the row cap plus one probe row, and always closes
//! the session before returning.

use tracing::{debug, info, instrument, warn, Span};

use crate::config::ConnectionParams;
use crate::db::{Connector, Session};
use crate::types::{MysqlResult, ResultBatch};

/// Statement prefixes that trigger a commit after execution
pub const MUTATING_KEYWORDS: [&str; 6] =
    ["INSERT", "UPDATE", "DELETE", "CREATE", "DROP", "ALTER"];

/// Whether a statement should be committed.
///
/// Prefix match on the trimmed, upper-cased text, nothing more. A write
/// behind a leading comment or a CTE is not detected, and `REPLACE INTO`
/// is never committed.
pub fn is_mutating(query: &str) -> bool {
    let normalized = query.trim().to_uppercase();
    MUTATING_KEYWORDS
        .iter()
        .any(|keyword| normalized.starts_with(keyword))
}

/// Run `query` and return at most `max_rows` rows.
#[instrument(skip_all, fields(max_rows = max_rows, mutating = tracing::field::Empty))]
pub async fn execute(
    connector: &dyn Connector,
    params: &ConnectionParams,
    query: &str,
    max_rows: usize,
) -> MysqlResult<ResultBatch> {
    let credentials = params.validate()?;
    let mut session = connector.connect(&credentials).await?;

    let outcome = run(session.as_mut(), query, max_rows).await;
    let closed = session.close().await;

    match (outcome, closed) {
        (Ok(batch), Ok(())) => {
            info!(rows = batch.rows.len(), more_rows = batch.more_rows, "Query complete");
            Ok(batch)
        }
        (Ok(_), Err(e)) => Err(e),
        (Err(e), closed) => {
            if let Err(close_err) = closed {
                warn!(error = %close_err, "Failed to close session after query error");
            }
            Err(e)
        }
    }
}

async fn run(
    session: &mut dyn Session,
    query: &str,
    max_rows: usize,
) -> MysqlResult<ResultBatch> {
    let mutating = is_mutating(query);
    Span::current().record("mutating", mutating);

    session.execute(query).await?;

    if mutating {
        session.commit().await?;
        debug!("Committed");
    }

    let rows = session.fetch_many(max_rows).await?;
    // The probed row is only a signal and is dropped.
    let more_rows = session.fetch_one().await?.is_some();

    Ok(ResultBatch { rows, more_rows })
}
