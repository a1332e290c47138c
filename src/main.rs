//! deadswitch
//!
//! # Architecture Overview
//!
//! ```text
//!   operator                         protected host
//!  ┌─────────┐  RESET\n   ┌──────────────────────────────────────────────┐
//!  │  reset  │───────────▶│ net::listener → net::connection → protocol   │
//!  │ client  │◀───────────│                        │                      │
//!  └─────────┘  1 line    │                        ▼                      │
//!                         │              switch::countdown                │
//!                         │          (halt + rearm under one lock)        │
//!                         │                        │ deadline reached     │
//!                         │                        ▼                      │
//!                         │  engine: failsafes → savers → disablers      │
//!                         │          → destructors (staged, fan-out)      │
//!                         └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};

use deadswitch::client::ResetClient;
use deadswitch::config::{load_config, ListenerConfig, ObservabilityConfig, SwitchConfig};
use deadswitch::engine::RunOutcome;
use deadswitch::lifecycle::startup::{self, StartupError};
use deadswitch::lifecycle::{privilege, signals, Shutdown};
use deadswitch::observability::{logging, metrics};
use deadswitch::switch::SwitchExit;

#[derive(Parser)]
#[command(name = "deadswitch")]
#[command(about = "Remote-resettable dead-man's switch", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Arm the countdown and serve reset commands (requires root)
    Arm(ArmArgs),
    /// Reset a running countdown
    Reset {
        /// Address of the running switch
        #[arg(short, long, default_value_t = ListenerConfig::default().bind_address)]
        addr: String,
    },
}

#[derive(Args)]
struct ArmArgs {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Countdown duration (e.g. 1yr, 1mo, 1w, 2d, 3h, 30m, 45s)
    #[arg(long)]
    dms: Option<String>,

    /// Address to listen on
    #[arg(short, long)]
    addr: Option<String>,

    /// Perform actions instead of simulating them. I know what I'm doing.
    #[arg(long)]
    enable_it: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.command {
        Commands::Reset { addr } => reset(addr).await,
        Commands::Arm(args) => arm(args).await,
    }
}

async fn reset(addr: String) -> ExitCode {
    logging::init_logging(&ObservabilityConfig {
        log_level: "warn".to_string(),
        ..ObservabilityConfig::default()
    });

    match ResetClient::new(addr).reset().await {
        Ok(response) => {
            print!("{response}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error resetting timer: {e}");
            ExitCode::FAILURE
        }
    }
}

fn assemble_config(args: &ArmArgs) -> Result<SwitchConfig, StartupError> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => SwitchConfig::default(),
    };
    if let Some(dms) = &args.dms {
        config.duration = Some(dms.clone());
    }
    if let Some(addr) = &args.addr {
        config.listener.bind_address = addr.clone();
    }
    config.enable |= args.enable_it;
    Ok(config)
}

async fn arm(args: ArmArgs) -> ExitCode {
    let config = match assemble_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    logging::init_logging(&config.observability);
    tracing::info!("deadswitch v{} starting", env!("CARGO_PKG_VERSION"));

    if !privilege::is_elevated() {
        tracing::error!(error = %StartupError::NotPrivileged, "Refusing to arm");
        eprintln!("Error: {}", StartupError::NotPrivileged);
        return ExitCode::FAILURE;
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let switch = match startup::start(&config).await {
        Ok(switch) => switch,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let cancel = Shutdown::new();
    let _signals = signals::spawn_signal_listener(cancel.clone());

    let exit = match switch.serve(cancel.subscribe()).await {
        Ok(exit) => exit,
        Err(e) => {
            tracing::error!(error = %e, "Reset server failed");
            switch.shutdown().await;
            return ExitCode::FAILURE;
        }
    };

    match exit {
        SwitchExit::Triggered(RunOutcome::Aborted) => {
            tracing::error!("Engine run aborted, exiting");
            switch.shutdown().await;
            return ExitCode::FAILURE;
        }
        SwitchExit::Triggered(outcome) => {
            tracing::warn!(outcome = outcome.as_str(), "Engine finished, exiting");
            switch.shutdown().await;
        }
        SwitchExit::Shutdown | SwitchExit::Cancelled => {
            switch.shutdown().await;
            if let Some(outcome) = switch.countdown().wait_if_fired().await {
                tracing::warn!(outcome = outcome.as_str(), "Engine finished after shutdown request");
            }
        }
    }

    tracing::info!("Shutdown complete");
    ExitCode::SUCCESS
}
