//! Command-line and environment configuration
//!
//! Every flag can also come from the environment; the `MYSQL_*` variables
//! are the usual way to supply connection settings.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use clap::{ArgAction, Parser, ValueEnum};
use mcp_common::Transport;

use crate::config::{ConnectionParams, ServerConfig, DEFAULT_MAX_LENGTH};

/// Default port for the streamable HTTP transport
pub const DEFAULT_HTTP_PORT: u16 = 8888;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransportKind {
    /// JSON-RPC over stdin/stdout
    Stdio,
    /// Streamable HTTP with server-sent events
    Http,
}

#[derive(Debug, Parser)]
#[command(name = "mysql-mcp")]
#[command(about = "MCP server exposing a bounded MySQL query tool")]
pub struct Cli {
    /// MySQL user name
    #[arg(long, env = "MYSQL_USER")]
    pub mysql_user: Option<String>,

    /// MySQL password
    #[arg(long, env = "MYSQL_PASSWORD", hide_env_values = true)]
    pub mysql_password: Option<String>,

    /// MySQL host
    #[arg(long, env = "MYSQL_HOST")]
    pub mysql_host: Option<String>,

    /// Database to connect to
    #[arg(long, env = "MYSQL_DATABASE")]
    pub mysql_database: Option<String>,

    /// MySQL port (default 13306)
    #[arg(long, env = "MYSQL_PORT")]
    pub mysql_port: Option<u16>,

    /// Maximum characters in a query report
    #[arg(long, env = "MYSQL_MAX_LENGTH", default_value_t = DEFAULT_MAX_LENGTH)]
    pub max_chars: usize,

    /// Transport to serve on
    #[arg(long, env = "MCP_TRANSPORT", value_enum, default_value_t = TransportKind::Stdio)]
    pub transport: TransportKind,

    /// Port for the HTTP transport
    #[arg(long, env = "MCP_PORT", default_value_t = DEFAULT_HTTP_PORT)]
    pub port: u16,

    /// Address for the HTTP transport to bind
    #[arg(long, env = "MCP_BIND", default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub bind: IpAddr,

    /// Increase verbosity (-v debug, -vv trace). Default is info.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig::new(ConnectionParams {
            user: self.mysql_user.clone(),
            password: self.mysql_password.clone(),
            host: self.mysql_host.clone(),
            database: self.mysql_database.clone(),
            port: self.mysql_port,
        })
        .with_max_chars(self.max_chars)
    }

    pub fn transport(&self) -> Transport {
        match self.transport {
            TransportKind::Stdio => Transport::Stdio,
            TransportKind::Http => Transport::Http(SocketAddr::new(self.bind, self.port)),
        }
    }
}
