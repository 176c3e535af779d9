//! Tracing initialization
//!
//! MCP servers speaking over stdio own stdout for the protocol, so every log
//! line goes to stderr regardless of transport.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Map a `-v` count onto a default level for the server crate.
///
/// `RUST_LOG` directives still apply on top of this.
pub fn level_for_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Initialize tracing/logging for an MCP server
///
/// Sets up logging to stderr with:
/// - Environment-based filtering via RUST_LOG
/// - A default directive of `<crate_name>=<level>`
///
/// Set `LOG_FORMAT=json` for structured JSON output. Default is
/// human-readable text without ANSI colors.
///
/// # Example
///
/// ```rust,ignore
/// mcp_common::init_tracing("mysql_mcp", "info")?;
/// ```
pub fn init_tracing(crate_name: &str, level: &str) -> anyhow::Result<()> {
    let directive = format!("{}={}", crate_name, level);
    let filter = EnvFilter::from_default_env()
        .add_directive(directive.parse()?)
        .add_directive("mcp_common=info".parse()?);

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);

    if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(false),
            )
            .try_init()?;
    }

    Ok(())
}
