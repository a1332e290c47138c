//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → CLI overrides (duration, address, enable flag)
//!     → validation.rs (semantic checks)
//!     → SwitchConfig (validated, immutable)
//!     → lifecycle::startup builds capabilities and the switch
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup; there is no reload
//! - All sections have defaults so a file may be omitted entirely
//! - Validation reports every problem, not only the first

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    ActionConfig, ListenerConfig, LogFormat, ObservabilityConfig, StagingConfig, SwitchConfig,
};
pub use validation::{validate_config, ValidationError};
