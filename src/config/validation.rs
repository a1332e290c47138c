//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Duration must be present and parse
//! - Value ranges (timeouts > 0, caps > 0)
//! - Actions name a program; fan-outs name targets and only destroy
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Pure function: &SwitchConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::{ActionConfig, SwitchConfig};
use crate::duration::{parse_duration, DurationError};
use crate::engine::Phase;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("a countdown duration is required")]
    MissingDuration,

    #[error(transparent)]
    InvalidDuration(#[from] DurationError),

    #[error("listener.bind_address must not be empty")]
    EmptyBindAddress,

    #[error("listener.{field} must be greater than zero")]
    ZeroLimit { field: &'static str },

    #[error("observability.metrics_address {0:?} is not a socket address")]
    InvalidMetricsAddress(String),

    #[error("{phase}[{index}]: program must not be empty")]
    EmptyProgram { phase: Phase, index: usize },

    #[error("{phase}[{index}]: fan_out needs at least one target")]
    NoTargets { phase: Phase, index: usize },

    #[error("{phase}[{index}]: fan_out is only valid for destructors")]
    FanOutOutsideDestructors { phase: Phase, index: usize },
}

pub fn validate_config(config: &SwitchConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match config.duration.as_deref() {
        None => errors.push(ValidationError::MissingDuration),
        Some(raw) => {
            if let Err(e) = parse_duration(raw) {
                errors.push(e.into());
            }
        }
    }

    let listener = &config.listener;
    if listener.bind_address.trim().is_empty() {
        errors.push(ValidationError::EmptyBindAddress);
    }
    if listener.max_connections == 0 {
        errors.push(ValidationError::ZeroLimit {
            field: "max_connections",
        });
    }
    if listener.read_timeout_ms == 0 {
        errors.push(ValidationError::ZeroLimit {
            field: "read_timeout_ms",
        });
    }
    if listener.max_command_bytes == 0 {
        errors.push(ValidationError::ZeroLimit {
            field: "max_command_bytes",
        });
    }

    let observability = &config.observability;
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            observability.metrics_address.clone(),
        ));
    }

    let phases = [
        (Phase::Failsafes, &config.failsafes),
        (Phase::Savers, &config.savers),
        (Phase::Disablers, &config.disablers),
        (Phase::Destructors, &config.destructors),
    ];
    for (phase, actions) in phases {
        for (index, action) in actions.iter().enumerate() {
            if action.program().trim().is_empty() {
                errors.push(ValidationError::EmptyProgram { phase, index });
            }
            if let ActionConfig::FanOut { targets, .. } = action {
                if phase != Phase::Destructors {
                    errors.push(ValidationError::FanOutOutsideDestructors { phase, index });
                }
                if targets.is_empty() {
                    errors.push(ValidationError::NoTargets { phase, index });
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
