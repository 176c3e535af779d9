//! Transport selection and serving
//!
//! Servers run either over stdio (the default, for clients that spawn the
//! server as a child process) or over rmcp's streamable HTTP transport, which
//! frames responses as server-sent events.

use std::net::SocketAddr;

use rmcp::{
    transport::streamable_http_server::{
        session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
    },
    ServerHandler, ServiceExt,
};

/// Path the streamable HTTP endpoint is mounted on
pub const HTTP_ENDPOINT: &str = "/mcp";

/// Where an MCP server listens for requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    /// Framed JSON-RPC over stdin/stdout
    Stdio,
    /// Streamable HTTP on the given address
    Http(SocketAddr),
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transport::Stdio => write!(f, "stdio"),
            Transport::Http(addr) => write!(f, "http://{}{}", addr, HTTP_ENDPOINT),
        }
    }
}

/// Serve an MCP server until the client disconnects (stdio) or Ctrl-C (HTTP).
///
/// `make_server` is called once for stdio and once per HTTP session, so it
/// should be cheap; servers holding shared state clone an `Arc`.
pub async fn serve<S, F>(make_server: F, transport: Transport) -> anyhow::Result<()>
where
    S: ServerHandler,
    F: Fn() -> S + Send + Sync + 'static,
{
    tracing::info!(%transport, "Serving MCP");

    match transport {
        Transport::Stdio => {
            let service = make_server().serve(rmcp::transport::stdio()).await?;
            tracing::info!("Server running, waiting for requests...");
            service.waiting().await?;
        }
        Transport::Http(addr) => {
            let service = StreamableHttpService::new(
                move || Ok(make_server()),
                LocalSessionManager::default().into(),
                StreamableHttpServerConfig::default(),
            );
            let router = axum::Router::new().nest_service(HTTP_ENDPOINT, service);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            tracing::info!("Server running, waiting for requests...");

            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
                    }
                })
                .await?;
        }
    }

    tracing::info!("Server shutting down");
    Ok(())
}
