//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::SwitchConfig;
use crate::config::validation::ValidationError;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse configuration from a TOML file.
///
/// Validation is left to the caller, after command-line overrides apply.
pub fn load_config(path: &Path) -> Result<SwitchConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<SwitchConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{ActionConfig, LogFormat};

    const SAMPLE: &str = r#"
duration = "1w"
enable = true

[listener]
bind_address = "0.0.0.0:11234"
read_timeout_ms = 2000

[staging]
dir = "/run/deadswitch"

[observability]
log_format = "json"

[[savers]]
kind = "command"
program = "/usr/local/bin/offload.sh"

[[destructors]]
kind = "fan_out"
program = "dd"
args = ["if=/dev/urandom", "of={target}", "bs=1M"]
targets = ["/dev/sdb1", "/dev/sdb2"]

[[destructors]]
kind = "command"
program = "poweroff"
"#;

    #[test]
    fn parses_full_sample() {
        let config = parse_config(SAMPLE).unwrap();
        assert_eq!(config.duration.as_deref(), Some("1w"));
        assert!(config.enable);
        assert_eq!(config.listener.bind_address, "0.0.0.0:11234");
        assert_eq!(config.listener.read_timeout_ms, 2000);
        assert_eq!(config.listener.max_command_bytes, 256);
        assert_eq!(config.staging.dir.as_deref(), Some("/run/deadswitch"));
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.savers.len(), 1);
        assert_eq!(config.destructors.len(), 2);
        assert!(matches!(
            &config.destructors[0],
            ActionConfig::FanOut { targets, .. } if targets.len() == 2
        ));
        assert_eq!(
            config.destructors[1],
            ActionConfig::Command {
                program: "poweroff".into(),
                args: Vec::new()
            }
        );
    }

    #[test]
    fn empty_file_gives_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.duration, None);
        assert!(!config.enable);
        assert_eq!(config.listener.bind_address, "localhost:11234");
        assert!(config.destructors.is_empty());
    }

    #[test]
    fn unknown_action_kind_is_a_parse_error() {
        let err = parse_config("[[destructors]]\nkind = \"magic\"\nprogram = \"x\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config(Path::new("/nonexistent/deadswitch.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
