//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Privilege check → Validate config → Stage helpers → Build engine
//!     → Bind listener → Arm countdown
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Stop timer → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → external cancellation of the accept loop
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal and happens before arming
//! - The listener binds before the countdown is armed
//! - Shutdown never interrupts an engine run in progress

pub mod privilege;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{Shutdown, ShutdownSignal};
