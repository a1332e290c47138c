//! The single countdown and its reset/fire race.
//!
//! # States
//! ```text
//! Idle ──arm──▶ Armed(gen, deadline) ──reset──▶ Armed(gen+1, now+duration)
//!                    │                    │
//!                    │ timer task wins    │ cancel
//!                    ▼ the lock           ▼
//!                  Fired ──engine──▶ outcome published     Cancelled
//! ```
//!
//! Reset and fire serialize on one mutex. A timer task that wakes up only
//! fires if, holding the lock, it still owns the current generation. A reset
//! that holds the lock aborts the task and bumps the generation, so a late
//! wake-up finds itself stale and returns. Exactly one of them wins.

use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::duration::MAX_DURATION;
use crate::engine::{RunOutcome, Trigger};

/// Result of a reset attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetOutcome {
    /// The pending fire was halted and the countdown rearmed.
    Reset { remaining: Duration },
    /// The countdown already fired (or is firing).
    AlreadyExpired,
    /// Nothing is armed.
    NoTimer,
}

impl ResetOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResetOutcome::Reset { .. } => "reset",
            ResetOutcome::AlreadyExpired => "already_expired",
            ResetOutcome::NoTimer => "no_timer",
        }
    }
}

/// Observable state of the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownState {
    Idle,
    Armed { deadline: Instant },
    Fired,
    Cancelled,
}

enum TimerState {
    Idle,
    Armed {
        generation: u64,
        deadline: Instant,
        task: JoinHandle<()>,
    },
    Fired,
    Cancelled,
}

/// Owns the deadline and the scheduled fire.
pub struct Countdown {
    duration: Duration,
    engine: Arc<dyn Trigger>,
    state: Mutex<TimerState>,
    outcome: watch::Sender<Option<RunOutcome>>,
}

impl Countdown {
    /// Spans beyond [`MAX_DURATION`] are clamped to it.
    pub fn new(duration: Duration, engine: Arc<dyn Trigger>) -> Arc<Self> {
        let (outcome, _) = watch::channel(None);
        Arc::new(Self {
            duration: duration.min(MAX_DURATION),
            engine,
            state: Mutex::new(TimerState::Idle),
            outcome,
        })
    }

    /// The span every (re)arm counts down from.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Start the countdown, replacing any pending one. Returns the deadline.
    ///
    /// Arming after the countdown fired or was cancelled is a no-op that
    /// returns `None`.
    pub async fn arm(self: &Arc<Self>) -> Option<Instant> {
        let mut state = self.state.lock().await;
        let generation = match &*state {
            TimerState::Idle => 0,
            TimerState::Armed {
                generation, task, ..
            } => {
                task.abort();
                generation + 1
            }
            TimerState::Fired | TimerState::Cancelled => return None,
        };

        let deadline = deadline_after(Instant::now(), self.duration);
        *state = self.schedule(generation, deadline);
        log_deadline("Timer started", self.duration);
        Some(deadline)
    }

    /// Halt the pending fire and rearm with the full duration.
    pub async fn reset(self: &Arc<Self>) -> ResetOutcome {
        let mut state = self.state.lock().await;
        let generation = match &*state {
            TimerState::Armed {
                generation, task, ..
            } => {
                task.abort();
                generation + 1
            }
            TimerState::Fired => return ResetOutcome::AlreadyExpired,
            TimerState::Idle | TimerState::Cancelled => return ResetOutcome::NoTimer,
        };

        let deadline = deadline_after(Instant::now(), self.duration);
        *state = self.schedule(generation, deadline);
        log_deadline("Timer reset", self.duration);
        ResetOutcome::Reset {
            remaining: self.duration,
        }
    }

    /// Stop the countdown without firing. Returns true if a pending fire
    /// was halted. A run already in progress is left alone.
    pub async fn cancel(&self) -> bool {
        let mut state = self.state.lock().await;
        match &*state {
            TimerState::Armed { task, .. } => {
                task.abort();
                *state = TimerState::Cancelled;
                tracing::info!("Timer stopped");
                true
            }
            TimerState::Idle => {
                *state = TimerState::Cancelled;
                false
            }
            TimerState::Fired | TimerState::Cancelled => false,
        }
    }

    pub async fn state(&self) -> CountdownState {
        match &*self.state.lock().await {
            TimerState::Idle => CountdownState::Idle,
            TimerState::Armed { deadline, .. } => CountdownState::Armed {
                deadline: *deadline,
            },
            TimerState::Fired => CountdownState::Fired,
            TimerState::Cancelled => CountdownState::Cancelled,
        }
    }

    /// Time left before the fire, if armed.
    pub async fn remaining(&self) -> Option<Duration> {
        match self.state().await {
            CountdownState::Armed { deadline } => {
                Some(deadline.saturating_duration_since(Instant::now()))
            }
            _ => None,
        }
    }

    /// Outcome of the engine run, once it has finished.
    pub fn outcome(&self) -> Option<RunOutcome> {
        *self.outcome.borrow()
    }

    /// Wait for the engine run to finish.
    ///
    /// Pending forever if the countdown never fires.
    pub async fn finished(&self) -> RunOutcome {
        let mut rx = self.outcome.subscribe();
        loop {
            if let Some(outcome) = *rx.borrow_and_update() {
                return outcome;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }

    /// Wait for the engine if the countdown has fired; `None` otherwise.
    pub async fn wait_if_fired(&self) -> Option<RunOutcome> {
        match self.state().await {
            CountdownState::Fired => Some(self.finished().await),
            _ => None,
        }
    }

    fn schedule(self: &Arc<Self>, generation: u64, deadline: Instant) -> TimerState {
        let this = Arc::clone(self);
        let task = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            this.fire(generation).await;
        });
        TimerState::Armed {
            generation,
            deadline,
            task,
        }
    }

    async fn fire(&self, generation: u64) {
        {
            let mut state = self.state.lock().await;
            match &*state {
                TimerState::Armed {
                    generation: current,
                    ..
                } if *current == generation => {}
                _ => {
                    tracing::debug!(generation, "Stale timer wake-up ignored");
                    return;
                }
            }
            *state = TimerState::Fired;
        }

        tracing::warn!(generation, "Countdown expired");
        // Run on its own task so a panicking capability still yields an outcome.
        let engine = Arc::clone(&self.engine);
        let outcome = match tokio::spawn(async move { engine.run().await }).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, "Engine run aborted");
                RunOutcome::Aborted
            }
        };
        self.outcome.send_replace(Some(outcome));
    }
}

/// `now + duration`, saturating instead of overflowing the clock.
fn deadline_after(now: Instant, duration: Duration) -> Instant {
    let mut span = duration;
    loop {
        if let Some(deadline) = now.checked_add(span) {
            return deadline;
        }
        span /= 2;
    }
}

fn log_deadline(message: &'static str, duration: Duration) {
    match SystemTime::now().checked_add(duration) {
        Some(wall) => tracing::info!(
            duration = %format_remaining(duration),
            deadline = %humantime::format_rfc3339_seconds(wall),
            "{message}"
        ),
        None => tracing::info!(duration = %format_remaining(duration), "{message}"),
    }
}

/// Render a span the way the reset response reports it, at millisecond
/// precision (`200ms`, `5s`, `7days`).
pub fn format_remaining(duration: Duration) -> String {
    let millis = Duration::from_millis(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX));
    if millis.is_zero() {
        return "0s".to_string();
    }
    humantime::format_duration(millis).to_string()
}
