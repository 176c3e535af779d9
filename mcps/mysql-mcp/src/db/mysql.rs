//! MySQL sessions over sqlx
//!
//! Statements go through the text protocol (`sqlx::raw_sql`), so every value
//! arrives as the server's textual rendering and is typed from the column
//! metadata here.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future;
use futures_util::pin_mut;
use futures_util::stream::{BoxStream, Stream, TryStreamExt};
use sqlx::mysql::{MySqlColumn, MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{Column, Connection, Either, Executor, Row as _, TypeInfo, ValueRef};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use super::{Connector, Session};
use crate::config::Credentials;
use crate::types::{MysqlError, MysqlResult, Row, Value};

type RowStream = BoxStream<'static, Result<Row, sqlx::Error>>;

fn query_error(err: sqlx::Error) -> MysqlError {
    MysqlError::Query(err.to_string())
}

/// Connects to MySQL with a fresh connection per request
#[derive(Debug, Clone, Default)]
pub struct MySqlConnector;

#[async_trait]
impl Connector for MySqlConnector {
    #[instrument(skip_all, fields(host = %credentials.host, port = credentials.port, database = %credentials.database))]
    async fn connect(&self, credentials: &Credentials) -> MysqlResult<Box<dyn Session>> {
        let options = MySqlConnectOptions::new()
            .host(&credentials.host)
            .port(credentials.port)
            .username(&credentials.user)
            .password(&credentials.password)
            .database(&credentials.database);

        let mut conn = MySqlConnection::connect_with(&options)
            .await
            .map_err(|e| MysqlError::Connection(e.to_string()))?;

        // Writes only persist through an explicit commit.
        conn.execute(sqlx::raw_sql("SET autocommit = 0"))
            .await
            .map_err(|e| MysqlError::Connection(e.to_string()))?;

        debug!("Connected");
        Ok(Box::new(MySqlSession::new(conn)))
    }
}

/// One connection and the rows of its current statement
pub struct MySqlSession {
    conn: Arc<Mutex<MySqlConnection>>,
    rows: ResultCursor,
}

impl MySqlSession {
    fn new(conn: MySqlConnection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            rows: ResultCursor::default(),
        }
    }
}

/// Rows of one statement: a buffer of rows already pulled off the stream,
/// served ahead of the live stream itself
#[derive(Default)]
struct ResultCursor {
    /// Holds the connection lock until the result is exhausted or dropped
    live: Option<RowStream>,
    pending: VecDeque<Row>,
}

impl ResultCursor {
    /// Poll `stream` once so its statement reaches the server.
    ///
    /// An empty result leaves no live stream, which releases the connection.
    async fn open(mut stream: RowStream) -> MysqlResult<Self> {
        let mut cursor = Self::default();
        if let Some(first) = stream.try_next().await.map_err(query_error)? {
            cursor.pending.push_back(first);
            cursor.live = Some(stream);
        }
        Ok(cursor)
    }

    /// Pull whatever is left on the stream into `pending`
    async fn drain(&mut self) -> MysqlResult<()> {
        if let Some(mut live) = self.live.take() {
            while let Some(row) = live.try_next().await.map_err(query_error)? {
                self.pending.push_back(row);
            }
        }
        Ok(())
    }

    async fn next(&mut self) -> MysqlResult<Option<Row>> {
        if let Some(row) = self.pending.pop_front() {
            return Ok(Some(row));
        }
        let Some(live) = self.live.as_mut() else {
            return Ok(None);
        };
        match live.try_next().await.map_err(query_error)? {
            Some(row) => Ok(Some(row)),
            None => {
                self.live = None;
                Ok(None)
            }
        }
    }
}

const MULTIPLE_RESULT_SETS: &str =
    "query returned more than one result set; send one statement per call";

/// Rows of the first result set only.
///
/// A row arriving after a statement has completed means the text held more
/// than one statement, which is an error rather than a mixed batch.
fn first_result_set<Q, R, S>(results: S) -> impl Stream<Item = Result<R, sqlx::Error>>
where
    S: Stream<Item = Result<Either<Q, R>, sqlx::Error>>,
{
    let mut completed = false;
    results.try_filter_map(move |item| {
        let next = match item {
            Either::Left(_) => {
                completed = true;
                Ok(None)
            }
            Either::Right(_) if completed => {
                Err(sqlx::Error::Protocol(MULTIPLE_RESULT_SETS.to_string()))
            }
            Either::Right(row) => Ok(Some(row)),
        };
        future::ready(next)
    })
}

/// Lazily run `sql` and decode its rows, holding the connection while unfinished
fn row_stream(
    conn: Arc<Mutex<MySqlConnection>>,
    sql: String,
) -> impl Stream<Item = Result<Row, sqlx::Error>> + Send + 'static {
    async_stream::try_stream! {
        let mut conn = conn.lock_owned().await;
        let rows = first_result_set(sqlx::raw_sql(&sql).fetch_many(&mut *conn));
        pin_mut!(rows);
        while let Some(row) = rows.try_next().await? {
            yield decode_row(&row);
        }
    }
}

#[async_trait]
impl Session for MySqlSession {
    async fn execute(&mut self, query: &str) -> MysqlResult<()> {
        // Release the previous result before the new statement takes the lock.
        self.rows = ResultCursor::default();
        let stream: RowStream = Box::pin(row_stream(Arc::clone(&self.conn), query.to_owned()));
        self.rows = ResultCursor::open(stream).await?;
        Ok(())
    }

    async fn commit(&mut self) -> MysqlResult<()> {
        self.rows.drain().await?;
        let mut conn = self.conn.lock().await;
        conn.execute(sqlx::raw_sql("COMMIT"))
            .await
            .map_err(query_error)?;
        Ok(())
    }

    async fn next_row(&mut self) -> MysqlResult<Option<Row>> {
        self.rows.next().await
    }

    async fn close(self: Box<Self>) -> MysqlResult<()> {
        let MySqlSession { conn, rows } = *self;
        drop(rows);

        match Arc::try_unwrap(conn) {
            Ok(conn) => conn
                .into_inner()
                .close()
                .await
                .map_err(|e| MysqlError::Connection(e.to_string())),
            // Unreachable once the stream is gone; dropping closes the socket.
            Err(_) => Ok(()),
        }
    }
}

// ============================================================================
// Value Decoding
// ============================================================================

/// How a column's text should be interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Signed,
    Unsigned,
    Float,
    Binary,
    Text,
}

fn column_kind(type_name: &str) -> ColumnKind {
    match type_name {
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "BOOLEAN" | "YEAR" => {
            ColumnKind::Signed
        }
        "FLOAT" | "DOUBLE" => ColumnKind::Float,
        "BINARY" | "VARBINARY" | "TINYBLOB" | "BLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT"
        | "GEOMETRY" => ColumnKind::Binary,
        name if name.ends_with(" UNSIGNED") => ColumnKind::Unsigned,
        _ => ColumnKind::Text,
    }
}

/// Type raw column bytes according to the column kind
fn decode_bytes(kind: ColumnKind, bytes: Vec<u8>) -> Value {
    if kind == ColumnKind::Binary {
        return Value::Binary(bytes);
    }
    let text = match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => return Value::Binary(e.into_bytes()),
    };
    match kind {
        ColumnKind::Signed => text.parse().map(Value::Int).unwrap_or(Value::Text(text)),
        ColumnKind::Unsigned => text.parse().map(Value::UInt).unwrap_or(Value::Text(text)),
        ColumnKind::Float => text.parse().map(Value::Float).unwrap_or(Value::Text(text)),
        ColumnKind::Binary | ColumnKind::Text => Value::Text(text),
    }
}

fn decode_value(row: &MySqlRow, column: &MySqlColumn) -> Value {
    let idx = column.ordinal();
    match row.try_get_raw(idx) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(_) => {}
        Err(e) => return Value::Text(format!("<read error: {}>", e)),
    }

    // The text protocol carries every value as bytes; skip sqlx's type check.
    match row.try_get_unchecked::<Vec<u8>, _>(idx) {
        Ok(bytes) => decode_bytes(column_kind(column.type_info().name()), bytes),
        Err(e) => Value::Text(format!("<read error: {}>", e)),
    }
}

fn decode_row(row: &MySqlRow) -> Row {
    row.columns()
        .iter()
        .map(|column| (column.name().to_string(), decode_value(row, column)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream::{self, StreamExt};

    fn numbered(n: i64) -> Vec<Row> {
        (0..n)
            .map(|i| [("id", Value::Int(i))].into_iter().collect())
            .collect()
    }

    fn ids(rows: &[Row]) -> Vec<i64> {
        rows.iter()
            .map(|row| match row.get("id") {
                Some(Value::Int(id)) => *id,
                other => panic!("unexpected id {:?}", other),
            })
            .collect()
    }

    fn stream_of(rows: Vec<Row>) -> RowStream {
        stream::iter(rows.into_iter().map(Ok)).boxed()
    }

    /// Session over an in-memory stream, delegating like `MySqlSession`
    #[derive(Default)]
    struct StreamSession {
        source: Vec<Row>,
        rows: ResultCursor,
    }

    #[async_trait]
    impl Session for StreamSession {
        async fn execute(&mut self, _query: &str) -> MysqlResult<()> {
            self.rows = ResultCursor::open(stream_of(std::mem::take(&mut self.source))).await?;
            Ok(())
        }

        async fn commit(&mut self) -> MysqlResult<()> {
            self.rows.drain().await
        }

        async fn next_row(&mut self) -> MysqlResult<Option<Row>> {
            self.rows.next().await
        }

        async fn close(self: Box<Self>) -> MysqlResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_open_prefetches_first_row_once() {
        let mut cursor = ResultCursor::open(stream_of(numbered(3))).await.unwrap();
        assert_eq!(cursor.pending.len(), 1);
        assert!(cursor.live.is_some());

        let mut seen = Vec::new();
        while let Some(row) = cursor.next().await.unwrap() {
            seen.push(row);
        }
        assert_eq!(ids(&seen), vec![0, 1, 2]);
        assert!(cursor.live.is_none());
    }

    #[tokio::test]
    async fn test_empty_result_releases_stream() {
        let mut cursor = ResultCursor::open(stream_of(Vec::new())).await.unwrap();
        assert!(cursor.live.is_none());
        assert!(cursor.pending.is_empty());
        assert_eq!(cursor.next().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_cap_and_extra_row_over_stream() {
        let mut session = StreamSession {
            source: numbered(5),
            ..Default::default()
        };
        session.execute("SELECT id FROM t").await.unwrap();

        let rows = session.fetch_many(2).await.unwrap();
        assert_eq!(ids(&rows), vec![0, 1]);
        assert_eq!(ids(&[session.fetch_one().await.unwrap().unwrap()]), vec![2]);
    }

    #[tokio::test]
    async fn test_drain_keeps_row_order() {
        let mut session = StreamSession {
            source: numbered(4),
            ..Default::default()
        };
        session.execute("INSERT INTO t SELECT id FROM s").await.unwrap();
        session.commit().await.unwrap();
        assert!(session.rows.live.is_none());

        let rows = session.fetch_many(10).await.unwrap();
        assert_eq!(ids(&rows), vec![0, 1, 2, 3]);
        assert_eq!(session.fetch_one().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_stream_error_is_query_error() {
        let items: Vec<Result<Row, sqlx::Error>> = vec![
            Ok(numbered(1).remove(0)),
            Err(sqlx::Error::Protocol("connection reset".to_string())),
        ];
        let mut cursor = ResultCursor::open(stream::iter(items).boxed()).await.unwrap();

        assert!(cursor.next().await.unwrap().is_some());
        let err = cursor.next().await.unwrap_err();
        assert!(matches!(&err, MysqlError::Query(msg) if msg.contains("connection reset")));
    }

    #[tokio::test]
    async fn test_error_on_first_row_fails_open() {
        let items: Vec<Result<Row, sqlx::Error>> =
            vec![Err(sqlx::Error::Protocol("syntax".to_string()))];
        let result = ResultCursor::open(stream::iter(items).boxed()).await;
        assert!(matches!(result, Err(MysqlError::Query(_))));
    }

    #[tokio::test]
    async fn test_first_result_set_passes_single_statement() {
        let items: Vec<Result<Either<(), i32>, sqlx::Error>> =
            vec![Ok(Either::Right(1)), Ok(Either::Right(2)), Ok(Either::Left(()))];
        let rows: Vec<i32> = first_result_set(stream::iter(items))
            .try_collect()
            .await
            .unwrap();
        assert_eq!(rows, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_first_result_set_rejects_second_result() {
        let items: Vec<Result<Either<(), i32>, sqlx::Error>> = vec![
            Ok(Either::Right(1)),
            Ok(Either::Left(())),
            Ok(Either::Right(2)),
        ];
        let err = first_result_set(stream::iter(items))
            .try_collect::<Vec<i32>>()
            .await
            .unwrap_err();
        assert!(err.to_string().contains(MULTIPLE_RESULT_SETS));
    }

    #[tokio::test]
    async fn test_first_result_set_allows_trailing_statement_without_rows() {
        // A statement with no result set after the first only reports completion.
        let items: Vec<Result<Either<(), i32>, sqlx::Error>> =
            vec![Ok(Either::Right(1)), Ok(Either::Left(())), Ok(Either::Left(()))];
        let rows: Vec<i32> = first_result_set(stream::iter(items))
            .try_collect()
            .await
            .unwrap();
        assert_eq!(rows, vec![1]);
    }

    #[test]
    fn test_column_kind() {
        assert_eq!(column_kind("INT"), ColumnKind::Signed);
        assert_eq!(column_kind("BOOLEAN"), ColumnKind::Signed);
        assert_eq!(column_kind("BIGINT UNSIGNED"), ColumnKind::Unsigned);
        assert_eq!(column_kind("DOUBLE"), ColumnKind::Float);
        assert_eq!(column_kind("VARBINARY"), ColumnKind::Binary);
        assert_eq!(column_kind("LONGBLOB"), ColumnKind::Binary);
        assert_eq!(column_kind("DECIMAL"), ColumnKind::Text);
        assert_eq!(column_kind("DATETIME"), ColumnKind::Text);
        assert_eq!(column_kind("VARCHAR"), ColumnKind::Text);
    }

    #[test]
    fn test_decode_numbers() {
        assert_eq!(decode_bytes(ColumnKind::Signed, b"-42".to_vec()), Value::Int(-42));
        assert_eq!(
            decode_bytes(ColumnKind::Unsigned, b"18446744073709551615".to_vec()),
            Value::UInt(u64::MAX)
        );
        assert_eq!(decode_bytes(ColumnKind::Float, b"1.5".to_vec()), Value::Float(1.5));
    }

    #[test]
    fn test_decode_keeps_decimal_and_dates_as_text() {
        assert_eq!(
            decode_bytes(ColumnKind::Text, b"12.50".to_vec()),
            Value::Text("12.50".to_string())
        );
        assert_eq!(
            decode_bytes(ColumnKind::Text, b"2024-01-31 08:00:00".to_vec()),
            Value::Text("2024-01-31 08:00:00".to_string())
        );
    }

    #[test]
    fn test_decode_unparseable_number_falls_back_to_text() {
        assert_eq!(
            decode_bytes(ColumnKind::Signed, b"n/a".to_vec()),
            Value::Text("n/a".to_string())
        );
    }

    #[test]
    fn test_decode_binary_and_invalid_utf8() {
        assert_eq!(
            decode_bytes(ColumnKind::Binary, b"abc".to_vec()),
            Value::Binary(b"abc".to_vec())
        );
        assert_eq!(
            decode_bytes(ColumnKind::Text, vec![0xff, 0xfe]),
            Value::Binary(vec![0xff, 0xfe])
        );
    }
}
