//! Capability subsystem.
//!
//! # Data Flow
//! ```text
//! config actions
//!     → staging.rs (destructor programs copied to RAM-backed dir)
//!     → command.rs / fanout.rs (concrete capabilities)
//!     → Capabilities (four ordered collections)
//!     → engine runs them phase by phase
//! ```
//!
//! # Design Decisions
//! - One single-method async contract per phase kind
//! - Collections are plain ordered lists of boxed trait objects
//! - Concrete capabilities simulate unless `ExecutionMode::Enabled`
//! - Platform mechanics stay behind the contracts

pub mod command;
pub mod fanout;
pub mod staging;

use async_trait::async_trait;
use thiserror::Error;

pub use command::CommandAction;
pub use fanout::{FanOutDestructor, StaticTargets, TargetSource};
pub use staging::{StagedTool, StagingCopier, StagingError};

/// Error returned by a single capability invocation.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("`{program}` exited with {status}")]
    CommandFailed { program: String, status: String },

    #[error("{failed} of {total} targets failed")]
    PartialFailure { failed: usize, total: usize },

    #[error("target enumeration failed: {0}")]
    Enumeration(String),

    #[error("{0}")]
    Other(String),
}

/// Whether capabilities act or only describe what they would do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Log the intended action, perform none.
    #[default]
    Simulate,
    /// Perform the action.
    Enabled,
}

impl ExecutionMode {
    pub fn from_enable_flag(enable: bool) -> Self {
        if enable {
            Self::Enabled
        } else {
            Self::Simulate
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Enabled)
    }
}

/// Runs first, before anything observable happens (e.g. hiding the process).
#[async_trait]
pub trait Failsafe: Send + Sync {
    async fn trigger(&self) -> Result<(), CapabilityError>;

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Moves data off the host before it is destroyed.
#[async_trait]
pub trait Saver: Send + Sync {
    async fn save(&self) -> Result<(), CapabilityError>;

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Switches off a host control that would interfere with destruction.
#[async_trait]
pub trait Disabler: Send + Sync {
    async fn disable(&self) -> Result<(), CapabilityError>;

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Irreversible action: wipe storage, power off.
#[async_trait]
pub trait Destructor: Send + Sync {
    async fn destroy(&self) -> Result<(), CapabilityError>;

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// The four ordered capability collections handed to the engine.
///
/// Immutable once the engine is built; list order is execution order
/// within a phase.
#[derive(Default)]
pub struct Capabilities {
    pub failsafes: Vec<Box<dyn Failsafe>>,
    pub savers: Vec<Box<dyn Saver>>,
    pub disablers: Vec<Box<dyn Disabler>>,
    pub destructors: Vec<Box<dyn Destructor>>,
}

impl Capabilities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failsafe(mut self, failsafe: impl Failsafe + 'static) -> Self {
        self.failsafes.push(Box::new(failsafe));
        self
    }

    pub fn with_saver(mut self, saver: impl Saver + 'static) -> Self {
        self.savers.push(Box::new(saver));
        self
    }

    pub fn with_disabler(mut self, disabler: impl Disabler + 'static) -> Self {
        self.disablers.push(Box::new(disabler));
        self
    }

    pub fn with_destructor(mut self, destructor: impl Destructor + 'static) -> Self {
        self.destructors.push(Box::new(destructor));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.failsafes.is_empty()
            && self.savers.is_empty()
            && self.disablers.is_empty()
            && self.destructors.is_empty()
    }
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities")
            .field("failsafes", &self.failsafes.len())
            .field("savers", &self.savers.len())
            .field("disablers", &self.disablers.len())
            .field("destructors", &self.destructors.len())
            .finish()
    }
}
