//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept, connection cap)
//!     → connection.rs (read deadline, bounded read, one response line)
//!     → countdown reset
//! ```
//!
//! # Design Decisions
//! - Bounded concurrency prevents idle connections piling up
//! - Every connection gets an ID for log correlation
//! - Protocol errors go to the peer only; the server keeps serving
//! - Repeated accept failures back off instead of spinning

pub mod backoff;
pub mod connection;
pub mod listener;
