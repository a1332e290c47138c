//! Remote-resettable dead-man's switch.
//!
//! A countdown is armed at startup and rearmed by `RESET\n` over TCP. If it
//! ever reaches zero, the engine runs the configured capabilities in fixed
//! phase order: failsafes, savers, disablers, destructors.

// Core
pub mod duration;
pub mod engine;
pub mod switch;

// Pluggable behaviour
pub mod capability;

// Outer surfaces
pub mod client;
pub mod net;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use capability::{Capabilities, Destructor, Disabler, ExecutionMode, Failsafe, Saver};
pub use client::ResetClient;
pub use config::SwitchConfig;
pub use engine::{Engine, RunOutcome, Trigger};
pub use switch::{Countdown, ResetOutcome, Switch, SwitchExit};
