//! MCP server transports.
//!
//! The server owns the [`Dispatcher`] and binds sessions to a transport:
//!
//! 1. **stdio**: one session on stdin/stdout for the process lifetime
//! 2. **TCP**: one session task per accepted connection, unbounded
//!
//! Sessions share nothing but the dispatcher (and through it, the store).
//! Both modes stop on SIGINT/SIGTERM (Ctrl+C on Windows).

use std::future::Future;
use std::net::SocketAddr;

use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::Instrument;

use crate::config::TransportMode;
use crate::mcp::dispatch::Dispatcher;
use crate::mcp::session::Session;
use crate::mcp::transport::{StdioTransport, TcpTransport};

/// The MCP server for student records.
#[derive(Clone)]
pub struct McpServer {
    dispatcher: Dispatcher,
}

impl McpServer {
    /// Creates a server dispatching to `dispatcher`.
    #[must_use]
    pub const fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Runs the selected transport until shutdown.
    ///
    /// `mode` must already be resolved; [`TransportMode::Auto`] is treated as
    /// stdio.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound, or if stdin fails.
    pub async fn run(&self, mode: TransportMode, addr: SocketAddr) -> std::io::Result<()> {
        match mode {
            TransportMode::Tcp => {
                let listener = TcpListener::bind(addr).await?;
                tracing::info!(
                    addr = %listener.local_addr()?,
                    "Listening for TCP connections"
                );
                self.serve_tcp(listener, shutdown_signal()).await
            }
            TransportMode::Stdio | TransportMode::Auto => self.serve_stdio(shutdown_signal()).await,
        }
    }

    /// Serves one session on stdin/stdout until input ends or `shutdown`
    /// completes.
    ///
    /// # Errors
    ///
    /// Returns an error if reading stdin or writing stdout fails.
    pub async fn serve_stdio(&self, shutdown: impl Future<Output = ()>) -> std::io::Result<()> {
        let mut session = Session::new(StdioTransport::stdio(), self.dispatcher.clone());

        tokio::select! {
            result = session.run() => result,
            () = shutdown => {
                tracing::info!("Shutdown requested, closing stdio session");
                Ok(())
            }
        }
    }

    /// Accepts connections on `listener` until `shutdown` completes.
    ///
    /// Each connection runs its own session task. Accept errors are logged
    /// and skipped. On shutdown, open connections are aborted.
    ///
    /// # Errors
    ///
    /// Currently infallible once the listener is bound; the `Result` mirrors
    /// [`Self::serve_stdio`].
    pub async fn serve_tcp(
        &self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()>,
    ) -> std::io::Result<()> {
        let mut connections = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    tracing::info!(
                        open_connections = connections.len(),
                        "Shutdown requested, closing listener"
                    );
                    break;
                }

                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        tracing::info!(peer = %peer, "Accepted connection");
                        let session = Session::new(
                            TcpTransport::tcp(stream),
                            self.dispatcher.clone(),
                        );
                        let span = tracing::info_span!("session", %peer);
                        connections.spawn(run_connection(session).instrument(span));
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to accept TCP connection");
                    }
                },

                Some(finished) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = finished {
                        if e.is_panic() {
                            tracing::error!(error = %e, "Connection task panicked");
                        }
                    }
                }
            }
        }

        connections.shutdown().await;
        Ok(())
    }
}

async fn run_connection(mut session: Session<OwnedReadHalf, OwnedWriteHalf>) {
    match session.run().await {
        Ok(()) => tracing::info!("Connection closed"),
        Err(e) => tracing::warn!(error = %e, "Connection failed"),
    }
}

/// Completes when the process is asked to stop.
#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let (Ok(mut sigint), Ok(mut sigterm)) = (
        signal(SignalKind::interrupt()),
        signal(SignalKind::terminate()),
    ) else {
        tracing::warn!("Failed to install signal handlers, graceful shutdown disabled");
        return std::future::pending().await;
    };

    tokio::select! {
        _ = sigint.recv() => tracing::info!("Received SIGINT, initiating graceful shutdown"),
        _ = sigterm.recv() => tracing::info!("Received SIGTERM, initiating graceful shutdown"),
    }
}

/// Completes when the process is asked to stop.
#[cfg(windows)]
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("Received Ctrl+C, initiating graceful shutdown");
    } else {
        tracing::warn!("Failed to listen for Ctrl+C, graceful shutdown disabled");
        std::future::pending::<()>().await;
    }
}
