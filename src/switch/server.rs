//! The switch: countdown plus the TCP reset server.
//!
//! # Responsibilities
//! - Bind the listener and own it behind its own lock
//! - Arm the countdown
//! - Accept connections until shutdown, cancellation or expiry
//! - Stop the timer and close the listener on shutdown

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

use crate::config::ListenerConfig;
use crate::engine::{RunOutcome, Trigger};
use crate::lifecycle::{Shutdown, ShutdownSignal};
use crate::net::backoff::{calculate_backoff, ACCEPT_BACKOFF_BASE_MS, ACCEPT_BACKOFF_MAX_MS};
use crate::net::connection::{handle_connection, ConnectionLimits};
use crate::net::listener::{ConnectionPermit, Listener, ListenerError};

use super::countdown::{Countdown, ResetOutcome};

#[derive(Debug, Error)]
pub enum SwitchError {
    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("switch is not bound")]
    NotBound,
}

/// Why `serve` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchExit {
    /// The countdown fired and the engine finished.
    Triggered(RunOutcome),
    /// `Switch::shutdown` was called.
    Shutdown,
    /// The external cancellation signal fired (e.g. SIGTERM).
    Cancelled,
}

/// Dead-man's switch: one countdown, one reset listener.
pub struct Switch {
    config: ListenerConfig,
    countdown: Arc<Countdown>,
    listener: Mutex<Option<Arc<Listener>>>,
    shutdown: Shutdown,
}

impl Switch {
    pub fn new(config: ListenerConfig, duration: Duration, engine: Arc<dyn Trigger>) -> Self {
        Self {
            config,
            countdown: Countdown::new(duration, engine),
            listener: Mutex::new(None),
            shutdown: Shutdown::new(),
        }
    }

    pub fn countdown(&self) -> &Arc<Countdown> {
        &self.countdown
    }

    /// Bind the reset listener. Must happen before arming so a bind
    /// failure never leaves an armed countdown behind.
    pub async fn bind(&self) -> Result<SocketAddr, SwitchError> {
        let listener = Listener::bind(&self.config).await?;
        let addr = listener.local_addr();
        self.swap_listener(Some(Arc::new(listener)));
        Ok(addr)
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.current_listener().map(|l| l.local_addr())
    }

    /// Start the countdown.
    pub async fn arm(&self) -> Option<Instant> {
        self.countdown.arm().await
    }

    /// Reset the countdown directly, bypassing the network.
    pub async fn reset(&self) -> ResetOutcome {
        self.countdown.reset().await
    }

    /// Accept reset connections until the switch is shut down, `cancel`
    /// fires, or the countdown fires and the engine completes.
    pub async fn serve(&self, mut cancel: ShutdownSignal) -> Result<SwitchExit, SwitchError> {
        let mut internal = self.shutdown.subscribe();
        let listener = self.current_listener().ok_or(SwitchError::NotBound)?;
        let limits = ConnectionLimits {
            read_timeout: Duration::from_millis(self.config.read_timeout_ms),
            max_command_bytes: self.config.max_command_bytes,
        };
        let mut accept_failures = 0u32;

        loop {
            let delay = calculate_backoff(accept_failures, ACCEPT_BACKOFF_BASE_MS, ACCEPT_BACKOFF_MAX_MS);
            tokio::select! {
                _ = cancel.recv() => {
                    tracing::info!("Cancellation received, leaving accept loop");
                    return Ok(SwitchExit::Cancelled);
                }
                _ = internal.recv() => {
                    tracing::info!("Shutdown requested, leaving accept loop");
                    return Ok(SwitchExit::Shutdown);
                }
                outcome = self.countdown.finished() => {
                    tracing::info!(outcome = outcome.as_str(), "Engine run finished");
                    return Ok(SwitchExit::Triggered(outcome));
                }
                accepted = accept_after(&listener, delay) => match accepted {
                    Ok((stream, peer, permit)) => {
                        accept_failures = 0;
                        let countdown = Arc::clone(&self.countdown);
                        tokio::spawn(async move {
                            let _permit = permit;
                            handle_connection(stream, peer, countdown, limits).await;
                        });
                    }
                    Err(ListenerError::Closed) => return Ok(SwitchExit::Shutdown),
                    Err(e) => {
                        accept_failures = accept_failures.saturating_add(1);
                        tracing::warn!(error = %e, failures = accept_failures, "Error accepting connection");
                    }
                },
            }
        }
    }

    /// Stop the timer and close the listener. An engine run already in
    /// progress is not interrupted; nothing the engine did is rolled back.
    pub async fn shutdown(&self) {
        self.shutdown.trigger();
        self.swap_listener(None);
        self.countdown.cancel().await;
        tracing::info!("Switch shutdown complete");
    }

    fn current_listener(&self) -> Option<Arc<Listener>> {
        match self.listener.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn swap_listener(&self, next: Option<Arc<Listener>>) -> Option<Arc<Listener>> {
        let mut guard = match self.listener.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::replace(&mut *guard, next)
    }
}

/// Wait out the backoff, then accept. Cancellable at either step.
async fn accept_after(
    listener: &Listener,
    delay: Duration,
) -> Result<(tokio::net::TcpStream, SocketAddr, ConnectionPermit), ListenerError> {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    listener.accept().await
}
