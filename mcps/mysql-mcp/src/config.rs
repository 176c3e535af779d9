//! Configuration for the MySQL MCP server

use crate::types::{MysqlError, MysqlResult};

/// Port used when `MYSQL_PORT` is not set
pub const DEFAULT_PORT: u16 = 13306;

/// Row cap applied when a request omits `max_rows`
pub const DEFAULT_MAX_ROWS: u32 = 100;

/// Character cap on the rendered report
pub const DEFAULT_MAX_LENGTH: usize = 20_000;

/// Connection settings as supplied by the environment or CLI
///
/// Fields stay optional here; a missing value is only an error once a
/// request needs a connection.
#[derive(Debug, Clone, Default)]
pub struct ConnectionParams {
    pub user: Option<String>,
    pub password: Option<String>,
    pub host: Option<String>,
    pub database: Option<String>,
    pub port: Option<u16>,
}

/// Validated connection settings, ready for a connect attempt
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
    pub host: String,
    pub database: String,
    pub port: u16,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"***")
            .field("host", &self.host)
            .field("database", &self.database)
            .field("port", &self.port)
            .finish()
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl ConnectionParams {
    /// Check that every required field is set and non-empty.
    ///
    /// All missing variables are reported together, in a fixed order.
    pub fn validate(&self) -> MysqlResult<Credentials> {
        let required = [
            ("MYSQL_USER", present(&self.user)),
            ("MYSQL_PASSWORD", present(&self.password)),
            ("MYSQL_HOST", present(&self.host)),
            ("MYSQL_DATABASE", present(&self.database)),
        ];

        let missing: Vec<&'static str> = required
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| *name)
            .collect();

        match required {
            [(_, Some(user)), (_, Some(password)), (_, Some(host)), (_, Some(database))] => {
                Ok(Credentials {
                    user: user.to_string(),
                    password: password.to_string(),
                    host: host.to_string(),
                    database: database.to_string(),
                    port: self.port.unwrap_or(DEFAULT_PORT),
                })
            }
            _ => Err(MysqlError::Configuration { missing }),
        }
    }
}

/// Everything the server needs, built once at startup
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub connection: ConnectionParams,
    /// Character cap on each report
    pub max_chars: usize,
}

impl ServerConfig {
    pub fn new(connection: ConnectionParams) -> Self {
        Self {
            connection,
            max_chars: DEFAULT_MAX_LENGTH,
        }
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }
}
