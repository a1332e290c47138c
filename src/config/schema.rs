//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML.

use serde::{Deserialize, Serialize};

use crate::switch::protocol::DEFAULT_MAX_COMMAND_BYTES;

/// Root configuration for the switch.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SwitchConfig {
    /// Countdown duration (e.g. "1w", "36h"). Required to arm.
    pub duration: Option<String>,

    /// Perform actions instead of simulating them.
    pub enable: bool,

    /// Reset listener settings.
    pub listener: ListenerConfig,

    /// Where destructor helpers are staged.
    pub staging: StagingConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,

    pub failsafes: Vec<ActionConfig>,
    pub savers: Vec<ActionConfig>,
    pub disablers: Vec<ActionConfig>,
    pub destructors: Vec<ActionConfig>,
}

/// Reset listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address; host names are resolved (e.g. "localhost:11234").
    pub bind_address: String,

    /// Maximum concurrent connections.
    pub max_connections: usize,

    /// Read deadline per connection, in milliseconds.
    pub read_timeout_ms: u64,

    /// Longest accepted command, newline included.
    pub max_command_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "localhost:11234".to_string(),
            max_connections: 64,
            read_timeout_ms: 5000,
            max_command_bytes: DEFAULT_MAX_COMMAND_BYTES,
        }
    }
}

/// Staging directory for destructor helpers.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct StagingConfig {
    /// Defaults to `/dev/shm`, or the OS temp dir where that is missing.
    pub dir: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// One configured capability.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionConfig {
    /// Run a program once.
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
    /// Run a program once per target, concurrently. `{target}` in `args`
    /// is replaced by each target.
    FanOut {
        program: String,
        #[serde(default)]
        args: Vec<String>,
        targets: Vec<String>,
    },
}

impl ActionConfig {
    pub fn program(&self) -> &str {
        match self {
            ActionConfig::Command { program, .. } | ActionConfig::FanOut { program, .. } => program,
        }
    }
}
