//! Reset line protocol.
//!
//! One newline-terminated ASCII command per connection, one response line
//! back, then close.
//!
//! | Input | Response |
//! |---|---|
//! | `RESET` (halted) | `Timer reset successfully. Remaining: <duration>` |
//! | `RESET` (fired) | `Timer already expired` |
//! | `RESET` (idle) | `No timer is running` |
//! | empty line | `Empty command` |
//! | anything else | `Unknown command: <token>` |
//! | no newline within the cap | `Command too long` |

use std::fmt;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

use super::countdown::{format_remaining, ResetOutcome};

/// Command token that rearms the countdown.
pub const RESET_COMMAND: &str = "RESET";

/// Default cap on command length, newline included.
pub const DEFAULT_MAX_COMMAND_BYTES: usize = 256;

/// A parsed inbound line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Reset,
    Empty,
    Unknown(String),
    TooLong,
}

impl Command {
    /// Classify a complete line (trailing newline optional).
    pub fn parse(line: &[u8]) -> Self {
        let text = String::from_utf8_lossy(line);
        match text.trim() {
            "" => Command::Empty,
            RESET_COMMAND => Command::Reset,
            other => Command::Unknown(other.to_string()),
        }
    }
}

/// Read one command, never buffering more than `max_len + 1` bytes.
///
/// A peer that closes without a newline still has its bytes parsed; a peer
/// that sends more than `max_len` bytes without one gets `TooLong`.
pub async fn read_command<R>(reader: R, max_len: usize) -> std::io::Result<Command>
where
    R: AsyncRead + Unpin,
{
    let mut limited = BufReader::new(reader.take(max_len as u64 + 1));
    let mut line = Vec::with_capacity(64);
    limited.read_until(b'\n', &mut line).await?;

    if line.len() > max_len {
        return Ok(Command::TooLong);
    }
    Ok(Command::parse(&line))
}

/// The single line written back to the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    ResetOk { remaining: Duration },
    AlreadyExpired,
    NoTimer,
    Empty,
    Unknown(String),
    TooLong,
    ReadError,
}

impl Response {
    pub fn for_command(command: &Command) -> Option<Self> {
        match command {
            Command::Reset => None,
            Command::Empty => Some(Response::Empty),
            Command::Unknown(token) => Some(Response::Unknown(token.clone())),
            Command::TooLong => Some(Response::TooLong),
        }
    }

    /// Label for metrics on rejected input.
    pub fn error_kind(&self) -> Option<&'static str> {
        match self {
            Response::Empty => Some("empty"),
            Response::Unknown(_) => Some("unknown"),
            Response::TooLong => Some("too_long"),
            Response::ReadError => Some("read_error"),
            _ => None,
        }
    }
}

impl From<ResetOutcome> for Response {
    fn from(outcome: ResetOutcome) -> Self {
        match outcome {
            ResetOutcome::Reset { remaining } => Response::ResetOk { remaining },
            ResetOutcome::AlreadyExpired => Response::AlreadyExpired,
            ResetOutcome::NoTimer => Response::NoTimer,
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::ResetOk { remaining } => writeln!(
                f,
                "Timer reset successfully. Remaining: {}",
                format_remaining(*remaining)
            ),
            Response::AlreadyExpired => writeln!(f, "Timer already expired"),
            Response::NoTimer => writeln!(f, "No timer is running"),
            Response::Empty => writeln!(f, "Empty command"),
            Response::Unknown(token) => writeln!(f, "Unknown command: {token}"),
            Response::TooLong => writeln!(f, "Command too long"),
            Response::ReadError => writeln!(f, "Error reading command"),
        }
    }
}
