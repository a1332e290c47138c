//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate the assembled configuration
//! - Stage destructor helpers into the volatile directory
//! - Build the capability collections and the engine
//! - Bind the listener, then arm the countdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal and precedes arming
//! - A destructor whose helper cannot be staged is an error, never a no-op

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::capability::{
    Capabilities, CommandAction, ExecutionMode, FanOutDestructor, StagingCopier, StagingError,
    StaticTargets,
};
use crate::config::{validate_config, ActionConfig, ConfigError, SwitchConfig};
use crate::duration::parse_duration;
use crate::engine::Engine;
use crate::switch::{Switch, SwitchError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("server mode must be run as root")]
    NotPrivileged,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("destructors[{index}]: {source}")]
    Staging { index: usize, source: StagingError },

    #[error(transparent)]
    Switch(#[from] SwitchError),
}

/// Build the four capability collections from configuration.
///
/// Destructor programs are staged; other phases run their program from
/// wherever it is installed.
pub fn build_capabilities(
    config: &SwitchConfig,
    staging: &StagingCopier,
) -> Result<Capabilities, StartupError> {
    let mode = ExecutionMode::from_enable_flag(config.enable);
    let mut caps = Capabilities::new();

    for action in &config.failsafes {
        caps = caps.with_failsafe(plain_command(action, mode));
    }
    for action in &config.savers {
        caps = caps.with_saver(plain_command(action, mode));
    }
    for action in &config.disablers {
        caps = caps.with_disabler(plain_command(action, mode));
    }

    for (index, action) in config.destructors.iter().enumerate() {
        let tool = staging
            .stage(action.program())
            .map_err(|source| StartupError::Staging { index, source })?;

        caps = match action {
            ActionConfig::Command { args, .. } => {
                caps.with_destructor(CommandAction::new(tool.path, args.clone(), mode))
            }
            ActionConfig::FanOut { args, targets, .. } => caps.with_destructor(
                FanOutDestructor::new(tool, args.clone(), StaticTargets(targets.clone()), mode),
            ),
        };
    }

    tracing::info!(
        mode = ?mode,
        failsafes = caps.failsafes.len(),
        savers = caps.savers.len(),
        disablers = caps.disablers.len(),
        destructors = caps.destructors.len(),
        "Capabilities assembled"
    );
    if !mode.is_enabled() {
        tracing::warn!("Simulation mode: no action will be performed");
    }

    Ok(caps)
}

fn plain_command(action: &ActionConfig, mode: ExecutionMode) -> CommandAction {
    CommandAction::new(action.program(), action_args(action), mode)
}

fn action_args(action: &ActionConfig) -> Vec<String> {
    match action {
        ActionConfig::Command { args, .. } | ActionConfig::FanOut { args, .. } => args.clone(),
    }
}

fn staging_copier(config: &SwitchConfig) -> StagingCopier {
    let dir = config
        .staging
        .dir
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(StagingCopier::default_dir);
    StagingCopier::new(dir)
}

/// Validate, build, bind and arm. The returned switch is ready to serve.
pub async fn start(config: &SwitchConfig) -> Result<Switch, StartupError> {
    validate_config(config).map_err(|errors| StartupError::Config(ConfigError::Validation(errors)))?;

    let raw = config.duration.as_deref().unwrap_or_default();
    let duration = parse_duration(raw)
        .map_err(|e| StartupError::Config(ConfigError::Validation(vec![e.into()])))?;

    let caps = build_capabilities(config, &staging_copier(config))?;
    let engine = Arc::new(Engine::new(caps));

    let switch = Switch::new(config.listener.clone(), duration, engine);
    switch.bind().await?;
    switch.arm().await;
    Ok(switch)
}
