//! Concurrent per-target destruction.
//!
//! # Responsibilities
//! - Enumerate targets when the destructor fires, not at startup
//! - Run one task per target, all at once
//! - Join every task before returning, so the next destructor
//!   (e.g. power-off) never overtakes an in-flight wipe
//!
//! # Design Decisions
//! - A failing target is logged and never stops its siblings
//! - No timeout on individual targets; the join waits for the slowest
//! - Only the staged copy of the tool is ever executed

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::process::Command;
use tokio::task::JoinSet;

use super::staging::StagedTool;
use super::{CapabilityError, Destructor, ExecutionMode};

/// Placeholder replaced by the target in each argument.
pub const TARGET_PLACEHOLDER: &str = "{target}";

/// Source of destruction targets (devices, partitions, directories).
pub trait TargetSource: Send + Sync {
    fn targets(&self) -> Result<Vec<String>, CapabilityError>;
}

/// A fixed list of targets taken from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticTargets(pub Vec<String>);

impl TargetSource for StaticTargets {
    fn targets(&self) -> Result<Vec<String>, CapabilityError> {
        Ok(self.0.clone())
    }
}

/// Runs a staged tool once per target, concurrently.
pub struct FanOutDestructor {
    label: String,
    tool: StagedTool,
    args: Vec<String>,
    source: Box<dyn TargetSource>,
    mode: ExecutionMode,
}

impl FanOutDestructor {
    pub fn new(
        tool: StagedTool,
        args: Vec<String>,
        source: impl TargetSource + 'static,
        mode: ExecutionMode,
    ) -> Self {
        Self {
            label: format!("fan_out:{}", tool.program),
            tool,
            args,
            source: Box::new(source),
            mode,
        }
    }

    /// Arguments for one target, with every placeholder substituted.
    pub fn args_for(&self, target: &str) -> Vec<String> {
        expand_args(&self.args, target)
    }
}

fn expand_args(args: &[String], target: &str) -> Vec<String> {
    args.iter()
        .map(|arg| arg.replace(TARGET_PLACEHOLDER, target))
        .collect()
}

async fn destroy_target(
    program: Arc<PathBuf>,
    args: Vec<String>,
    target: String,
    mode: ExecutionMode,
) -> Result<(), CapabilityError> {
    if !mode.is_enabled() {
        tracing::info!(
            target_name = %target,
            program = %program.display(),
            args = ?args,
            "Simulated: would destroy target"
        );
        return Ok(());
    }

    tracing::warn!(target_name = %target, program = %program.display(), "Destroying target");
    let status = Command::new(program.as_path()).args(&args).status().await?;
    if status.success() {
        tracing::info!(target_name = %target, "Target destroyed");
        Ok(())
    } else {
        Err(CapabilityError::CommandFailed {
            program: program.display().to_string(),
            status: status.to_string(),
        })
    }
}

#[async_trait]
impl Destructor for FanOutDestructor {
    async fn destroy(&self) -> Result<(), CapabilityError> {
        let targets = self.source.targets()?;
        if targets.is_empty() {
            tracing::info!(destructor = %self.label, "No targets found");
            return Ok(());
        }

        let total = targets.len();
        let program = Arc::new(self.tool.path.clone());
        let mut tasks = JoinSet::new();
        for target in targets {
            let args = self.args_for(&target);
            let program = Arc::clone(&program);
            let mode = self.mode;
            tasks.spawn(async move {
                let result = destroy_target(program, args, target.clone(), mode).await;
                (target, result)
            });
        }

        let mut failed = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(()))) => {}
                Ok((target, Err(e))) => {
                    failed += 1;
                    tracing::error!(target_name = %target, error = %e, "Target destruction failed");
                }
                Err(e) => {
                    failed += 1;
                    tracing::error!(error = %e, "Target task aborted");
                }
            }
        }

        if failed > 0 {
            Err(CapabilityError::PartialFailure { failed, total })
        } else {
            Ok(())
        }
    }

    fn name(&self) -> &str {
        &self.label
    }
}
