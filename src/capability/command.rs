//! Operator-supplied external program as a capability.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;

use super::{CapabilityError, Destructor, Disabler, ExecutionMode, Failsafe, Saver};

/// Runs one program with fixed arguments.
///
/// Usable in any phase. Destructor instances are built over a staged
/// program path.
#[derive(Debug, Clone)]
pub struct CommandAction {
    label: String,
    program: PathBuf,
    args: Vec<String>,
    mode: ExecutionMode,
}

impl CommandAction {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>, mode: ExecutionMode) -> Self {
        let program = program.into();
        let label = program.display().to_string();
        Self {
            label,
            program,
            args,
            mode,
        }
    }

    pub async fn execute(&self) -> Result<(), CapabilityError> {
        if !self.mode.is_enabled() {
            tracing::info!(
                program = %self.label,
                args = ?self.args,
                "Simulated: would run command"
            );
            return Ok(());
        }

        tracing::info!(program = %self.label, args = ?self.args, "Running command");
        let status = Command::new(&self.program)
            .args(&self.args)
            .status()
            .await?;

        if status.success() {
            Ok(())
        } else {
            Err(CapabilityError::CommandFailed {
                program: self.label.clone(),
                status: status.to_string(),
            })
        }
    }
}

#[async_trait]
impl Failsafe for CommandAction {
    async fn trigger(&self) -> Result<(), CapabilityError> {
        self.execute().await
    }

    fn name(&self) -> &str {
        &self.label
    }
}

#[async_trait]
impl Saver for CommandAction {
    async fn save(&self) -> Result<(), CapabilityError> {
        self.execute().await
    }

    fn name(&self) -> &str {
        &self.label
    }
}

#[async_trait]
impl Disabler for CommandAction {
    async fn disable(&self) -> Result<(), CapabilityError> {
        self.execute().await
    }

    fn name(&self) -> &str {
        &self.label
    }
}

#[async_trait]
impl Destructor for CommandAction {
    async fn destroy(&self) -> Result<(), CapabilityError> {
        self.execute().await
    }

    fn name(&self) -> &str {
        &self.label
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn simulate_never_spawns() {
        let action = CommandAction::new(
            "/nonexistent/program",
            vec!["--force".into()],
            ExecutionMode::Simulate,
        );
        assert!(action.execute().await.is_ok());
    }

    #[tokio::test]
    async fn enabled_runs_program() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let action = CommandAction::new(
            "sh",
            vec!["-c".into(), format!("touch {}", marker.display())],
            ExecutionMode::Enabled,
        );
        Saver::save(&action).await.unwrap();
        assert!(marker.exists());
    }

    #[tokio::test]
    async fn non_zero_exit_is_reported() {
        let action = CommandAction::new("sh", vec!["-c".into(), "exit 3".into()], ExecutionMode::Enabled);
        let err = Destructor::destroy(&action).await.unwrap_err();
        assert!(matches!(err, CapabilityError::CommandFailed { .. }));
    }

    #[tokio::test]
    async fn missing_program_is_io_error() {
        let action = CommandAction::new("/nonexistent/program", Vec::new(), ExecutionMode::Enabled);
        let err = Failsafe::trigger(&action).await.unwrap_err();
        assert!(matches!(err, CapabilityError::Io(_)));
    }
}
