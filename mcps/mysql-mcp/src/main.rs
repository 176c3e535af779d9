//! MySQL MCP Server
//!
//! Serves the `execute_mysql` tool over stdio (default) or streamable HTTP.

use clap::Parser;
use mysql_mcp::{cli::Cli, MysqlMcpServer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A .env file may supply the MYSQL_* variables read by the CLI.
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();
    mcp_common::init_tracing("mysql_mcp", mcp_common::level_for_verbosity(cli.verbose))?;

    match dotenv {
        Ok(path) => tracing::info!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!("Failed to load .env: {}", e),
    }

    tracing::info!("Starting mysql_mcp MCP Server");

    let server = MysqlMcpServer::new(cli.server_config());
    mcp_common::serve(move || server.clone(), cli.transport()).await
}
