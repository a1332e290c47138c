//! Switch subsystem: the countdown and its reset protocol.
//!
//! # Data Flow
//! ```text
//! arm → countdown.rs (deadline, scheduled fire)
//!
//! TCP "RESET\n"
//!     → net::connection (bounded read)
//!     → protocol.rs (parse)
//!     → countdown.rs (halt + rearm under one lock)
//!     → protocol.rs (one response line)
//!
//! deadline reached → engine run → server.rs returns Triggered(outcome)
//! ```
//!
//! # Design Decisions
//! - One lock guards halt-and-rearm and the fire path: at most one run per arm
//! - A reset rearms with the full original duration, not what was left
//! - The listener sits behind a second, independent lock used only to swap it out
//! - Shutdown never interrupts a run already in progress

pub mod countdown;
pub mod protocol;
pub mod server;

pub use countdown::{format_remaining, Countdown, CountdownState, ResetOutcome};
pub use protocol::{Command, Response, RESET_COMMAND};
pub use server::{Switch, SwitchError, SwitchExit};
