//! One reset connection, start to finish.
//!
//! # Responsibilities
//! - Bound the read by a deadline and a byte cap
//! - Parse the command and act on the countdown
//! - Write exactly one response line, then close

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::observability::metrics;
use crate::switch::countdown::{Countdown, ResetOutcome};
use crate::switch::protocol::{read_command, Command, Response};

/// Relaxed ordering is enough: IDs only need to be unique.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection, for log correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn next() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Per-connection bounds.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionLimits {
    pub read_timeout: Duration,
    pub max_command_bytes: usize,
}

/// Serve one connection: read, act, answer, close.
pub async fn handle_connection<S>(
    mut stream: S,
    peer: SocketAddr,
    countdown: Arc<Countdown>,
    limits: ConnectionLimits,
) -> Response
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let id = ConnectionId::next();
    metrics::record_connection();

    let read = tokio::time::timeout(
        limits.read_timeout,
        read_command(&mut stream, limits.max_command_bytes),
    )
    .await;

    let response = match read {
        Ok(Ok(Command::Reset)) => {
            let outcome = countdown.reset().await;
            metrics::record_reset(outcome.as_str());
            match outcome {
                ResetOutcome::Reset { .. } => {
                    tracing::info!(connection_id = %id, peer_addr = %peer, "Timer reset by peer")
                }
                ResetOutcome::AlreadyExpired => {
                    tracing::warn!(connection_id = %id, peer_addr = %peer, "Reset arrived after expiry")
                }
                ResetOutcome::NoTimer => {
                    tracing::warn!(connection_id = %id, peer_addr = %peer, "Reset with no timer armed")
                }
            }
            Response::from(outcome)
        }
        Ok(Ok(command)) => {
            let response = Response::for_command(&command).unwrap_or(Response::ReadError);
            tracing::debug!(connection_id = %id, peer_addr = %peer, command = ?command, "Rejected command");
            response
        }
        Ok(Err(e)) => {
            tracing::warn!(connection_id = %id, peer_addr = %peer, error = %e, "Error reading command");
            Response::ReadError
        }
        Err(_) => {
            tracing::warn!(
                connection_id = %id,
                peer_addr = %peer,
                timeout_ms = limits.read_timeout.as_millis() as u64,
                "Read deadline elapsed"
            );
            Response::ReadError
        }
    };

    if let Some(kind) = response.error_kind() {
        metrics::record_protocol_error(kind);
    }

    if let Err(e) = stream.write_all(response.to_string().as_bytes()).await {
        tracing::warn!(connection_id = %id, error = %e, "Failed to write response");
    } else if let Err(e) = stream.shutdown().await {
        tracing::debug!(connection_id = %id, error = %e, "Failed to close connection");
    }

    response
}
