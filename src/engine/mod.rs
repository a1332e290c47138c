//! Trigger engine.
//!
//! # Data Flow
//! ```text
//! countdown fires
//!     → Failsafes → Savers → Disablers → Destructors
//!     → RunOutcome returned to the entry point, which exits
//! ```
//!
//! # Design Decisions
//! - Phases are strictly sequential; members run in list order
//! - Best effort: a failing member is logged, nothing is aborted
//! - No destructors configured: stop after the earlier phases
//! - Process exit is the caller's job, so runs are testable

pub mod phase;

use async_trait::async_trait;
use std::future::Future;

use crate::capability::{Capabilities, CapabilityError, Destructor, Disabler, Failsafe, Saver};
use crate::observability::metrics;

pub use phase::Phase;

/// Terminal state of a triggered run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every phase ran, destructors included.
    Completed,
    /// No destructors were configured; the run stopped after disablers.
    NoDestructors,
    /// The run panicked before finishing.
    Aborted,
}

impl RunOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunOutcome::Completed => "completed",
            RunOutcome::NoDestructors => "no_destructors",
            RunOutcome::Aborted => "aborted",
        }
    }
}

/// What the countdown fires on expiry.
#[async_trait]
pub trait Trigger: Send + Sync {
    async fn run(&self) -> RunOutcome;
}

/// Executes the capability collections in fixed phase order.
#[derive(Debug)]
pub struct Engine {
    capabilities: Capabilities,
}

impl Engine {
    pub fn new(capabilities: Capabilities) -> Self {
        Self { capabilities }
    }

    async fn run_phases(&self) -> RunOutcome {
        tracing::warn!("Timer expired, running engine");
        let caps = &self.capabilities;

        run_phase(Phase::Failsafes, caps.failsafes.as_slice(), |f| f.name(), |f| f.trigger()).await;
        run_phase(Phase::Savers, caps.savers.as_slice(), |s| s.name(), |s| s.save()).await;
        run_phase(Phase::Disablers, caps.disablers.as_slice(), |d| d.name(), |d| d.disable()).await;

        if caps.destructors.is_empty() {
            tracing::info!("No destructors configured, stopping");
            return RunOutcome::NoDestructors;
        }
        run_phase(Phase::Destructors, caps.destructors.as_slice(), |d| d.name(), |d| d.destroy()).await;

        tracing::warn!("All destructors have been called");
        RunOutcome::Completed
    }
}

#[async_trait]
impl Trigger for Engine {
    async fn run(&self) -> RunOutcome {
        let outcome = self.run_phases().await;
        metrics::record_engine_run(outcome.as_str());
        outcome
    }
}

async fn run_phase<'a, T, N, F, Fut>(phase: Phase, members: &'a [Box<T>], name: N, call: F)
where
    T: ?Sized + 'a,
    N: Fn(&'a T) -> &'a str,
    F: Fn(&'a T) -> Fut,
    Fut: Future<Output = Result<(), CapabilityError>> + 'a,
{
    if members.is_empty() {
        tracing::debug!(phase = %phase, "Phase has no members, skipping");
        return;
    }

    tracing::info!(phase = %phase, members = members.len(), "Phase starting");
    let mut failures = 0usize;
    for member in members {
        let member: &'a T = member.as_ref();
        if let Err(e) = call(member).await {
            failures += 1;
            metrics::record_capability_failure(phase.as_str());
            tracing::error!(
                phase = %phase,
                capability = %name(member),
                error = %e,
                "Capability failed, continuing"
            );
        }
    }
    tracing::info!(phase = %phase, failures, "Phase finished");
}
