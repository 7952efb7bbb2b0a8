//! [`RoverServer`] – WebSocket server for the Control and Backend peers.
//!
//! Listens on `0.0.0.0:3001` (configurable via [`RoverServer::with_bind_address`]
//! and [`RoverServer::with_port`]).

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use telerover_middleware::Session;
use telerover_types::{Channel, RoverError};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::error::RecvError;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tracing::{debug, error, info, warn};

/// Default TCP port.
pub const DEFAULT_PORT: u16 = 3001;

/// Default bind address (all interfaces).
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

// ---------------------------------------------------------------------------
// RoverServer
// ---------------------------------------------------------------------------

pub struct RoverServer {
    session: Session,
    bind_address: String,
    port: u16,
}

impl RoverServer {
    /// Create a server for `session` on [`DEFAULT_BIND_ADDRESS`]:[`DEFAULT_PORT`].
    pub fn new(session: Session) -> Self {
        Self {
            session,
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            port: DEFAULT_PORT,
        }
    }

    /// Override the bind address (builder-style).
    pub fn with_bind_address(mut self, address: impl Into<String>) -> Self {
        self.bind_address = address.into();
        self
    }

    /// Override the listening port (builder-style).
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn bind_address(&self) -> &str {
        &self.bind_address
    }

    /// Bind the configured address and serve until the task is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`RoverError::Transport`] if the listener cannot bind.
    pub async fn run(self) -> Result<(), RoverError> {
        let addr = format!("{}:{}", self.bind_address, self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| RoverError::Transport(format!("bind error on {addr}: {e}")))?;
        self.serve(listener).await
    }

    /// Serve connections accepted on an already bound `listener`.
    pub async fn serve(self, listener: TcpListener) -> Result<(), RoverError> {
        match listener.local_addr() {
            Ok(local) => info!(%local, "rover server listening"),
            Err(e) => warn!(error = %e, "rover server listening on unknown address"),
        }

        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    let session = self.session.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, peer, session).await {
                            warn!(%peer, error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => error!(error = %e, "accept error"),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Per-connection handler
// ---------------------------------------------------------------------------

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    session: Session,
) -> Result<(), RoverError> {
    let mut channel = None;
    let ws_stream = accept_hdr_async(stream, |request: &Request, response: Response| {
        match Channel::from_path(request.uri().path()) {
            Some(found) => {
                channel = Some(found);
                Ok(response)
            }
            None => {
                debug!(%peer, path = request.uri().path(), "refusing unknown path");
                let mut refusal = ErrorResponse::new(Some("not found".to_string()));
                *refusal.status_mut() = StatusCode::NOT_FOUND;
                Err(refusal)
            }
        }
    })
    .await
    .map_err(|e| RoverError::Transport(format!("handshake from {peer}: {e}")))?;

    let Some(channel) = channel else {
        return Err(RoverError::Transport(format!("handshake from {peer}: no channel")));
    };

    // Subscribe before the connect hook so resync output reaches this peer.
    let mut relay_rx = session.relay().subscribe(channel);
    session.on_connect(channel).await;

    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    loop {
        tokio::select! {
            // ── Downstream: relay → peer ──────────────────────────────────
            result = relay_rx.recv() => {
                match result {
                    Ok(text) => {
                        if ws_tx.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        warn!(%peer, %channel, dropped = n, "peer lagged; frames dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            // ── Upstream: peer → session ──────────────────────────────────
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        session.on_message(channel, text.as_str()).await;
                    }
                    Some(Ok(Message::Binary(_))) => {
                        warn!(%peer, %channel, "binary frame ignored");
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!(%peer, %channel, error = %e, "socket error");
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    drop(relay_rx);
    session.on_disconnect(channel).await;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
