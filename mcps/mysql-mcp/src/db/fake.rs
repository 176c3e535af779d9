//! In-memory connector for tests
//!
//! Serves a fixed result set and records every call so tests can assert on
//! commits and closes.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{Connector, Session};
use crate::config::Credentials;
use crate::types::{MysqlError, MysqlResult, Row, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Connect,
    Execute(String),
    Commit,
    Close,
}

#[derive(Clone, Default)]
pub struct FakeConnector {
    rows: Vec<Row>,
    fail_connect: Option<String>,
    fail_execute: Option<String>,
    fail_commit: Option<String>,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl FakeConnector {
    pub fn with_rows(rows: Vec<Row>) -> Self {
        Self {
            rows,
            ..Default::default()
        }
    }

    /// `count` rows of the form `{id: i, name: "row-i"}`
    pub fn numbered(count: usize) -> Self {
        Self::with_rows(
            (0..count)
                .map(|i| {
                    [
                        ("id", Value::Int(i as i64)),
                        ("name", Value::Text(format!("row-{}", i))),
                    ]
                    .into_iter()
                    .collect()
                })
                .collect(),
        )
    }

    pub fn failing_connect(mut self, message: &str) -> Self {
        self.fail_connect = Some(message.to_string());
        self
    }

    pub fn failing_execute(mut self, message: &str) -> Self {
        self.fail_execute = Some(message.to_string());
        self
    }

    pub fn failing_commit(mut self, message: &str) -> Self {
        self.fail_commit = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, _credentials: &Credentials) -> MysqlResult<Box<dyn Session>> {
        self.record(Call::Connect);
        if let Some(message) = &self.fail_connect {
            return Err(MysqlError::Connection(message.clone()));
        }
        Ok(Box::new(FakeSession {
            connector: self.clone(),
            cursor: VecDeque::new(),
        }))
    }
}

struct FakeSession {
    connector: FakeConnector,
    cursor: VecDeque<Row>,
}

#[async_trait]
impl Session for FakeSession {
    async fn execute(&mut self, query: &str) -> MysqlResult<()> {
        self.connector.record(Call::Execute(query.to_string()));
        if let Some(message) = &self.connector.fail_execute {
            return Err(MysqlError::Query(message.clone()));
        }
        self.cursor = self.connector.rows.iter().cloned().collect();
        Ok(())
    }

    async fn commit(&mut self) -> MysqlResult<()> {
        self.connector.record(Call::Commit);
        match &self.connector.fail_commit {
            Some(message) => Err(MysqlError::Query(message.clone())),
            None => Ok(()),
        }
    }

    async fn next_row(&mut self) -> MysqlResult<Option<Row>> {
        Ok(self.cursor.pop_front())
    }

    async fn close(self: Box<Self>) -> MysqlResult<()> {
        self.connector.record(Call::Close);
        Ok(())
    }
}
