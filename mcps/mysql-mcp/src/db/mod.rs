//! Database access
//!
//! A [`Connector`] opens one [`Session`] per request. The session wraps a
//! single connection plus the cursor of the statement last executed on it;
//! nothing is pooled or shared between requests.

pub mod mysql;

#[cfg(test)]
pub(crate) mod fake;

use async_trait::async_trait;

use crate::config::Credentials;
use crate::types::{MysqlResult, Row};

pub use mysql::MySqlConnector;

/// Opens database sessions
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a new connection. One attempt, no retry.
    async fn connect(&self, credentials: &Credentials) -> MysqlResult<Box<dyn Session>>;
}

/// A live connection and its cursor
///
/// The owner must call [`close`](Session::close) once done, on every path.
#[async_trait]
pub trait Session: Send {
    /// Send a statement and leave its rows ready for fetching
    async fn execute(&mut self, query: &str) -> MysqlResult<()>;

    /// Commit the current transaction
    async fn commit(&mut self) -> MysqlResult<()>;

    /// Next row of the current result, if any
    async fn next_row(&mut self) -> MysqlResult<Option<Row>>;

    /// Close the cursor, then the connection
    async fn close(self: Box<Self>) -> MysqlResult<()>;

    /// Up to `size` rows of the current result
    async fn fetch_many(&mut self, size: usize) -> MysqlResult<Vec<Row>> {
        let mut rows = Vec::with_capacity(size.min(1024));
        while rows.len() < size {
            match self.next_row().await? {
                Some(row) => rows.push(row),
                None => break,
            }
        }
        Ok(rows)
    }

    async fn fetch_one(&mut self) -> MysqlResult<Option<Row>> {
        self.next_row().await
    }
}
