//! Simulation engine binary for Warforge.
//!
//! This is the main entry point that wires the phase coordinator, the
//! parts factory, and the factions together. It loads configuration,
//! runs the simulation to its verdict, and prints a report.
//!
//! # Startup Sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `warforge.yaml` (or `WARFORGE_CONFIG`)
//! 3. Run the simulation
//! 4. Print the report, optionally writing a JSON outcome file

mod error;
mod report;

use std::path::{Path, PathBuf};

use tracing::info;
use tracing_subscriber::EnvFilter;

use warforge_core::config::SimulationConfig;
use warforge_core::runner;

use crate::error::EngineError;

/// Application entry point for the simulation engine.
///
/// # Errors
///
/// Returns an error if configuration loading or the simulation itself
/// fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration first so its log level can seed the filter.
    let config = load_config()?;

    // 2. Initialize structured logging; RUST_LOG overrides the config.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!(
        world_name = config.world.name,
        seed = config.world.seed,
        days = config.simulation.days,
        factory_quota = config.factory.daily_quota,
        factions = config.factions.len(),
        "configuration loaded",
    );

    // 3. Run the simulation.
    let outcome = runner::run_simulation(&config).await?;

    // 4. Report.
    println!("{}", report::render(&outcome));
    if let Some(path) = std::env::var_os("WARFORGE_OUTCOME") {
        write_outcome_json(Path::new(&path), &outcome)?;
        info!(path = %PathBuf::from(path).display(), "outcome written");
    }

    info!(days = outcome.days_completed, "warforge-engine shutdown complete");
    Ok(())
}

/// Load the simulation configuration.
///
/// The path comes from `WARFORGE_CONFIG` when set, falling back to
/// `warforge.yaml` in the working directory. A missing file means the
/// default configuration.
fn load_config() -> Result<SimulationConfig, EngineError> {
    let path = std::env::var_os("WARFORGE_CONFIG")
        .map_or_else(|| PathBuf::from("warforge.yaml"), PathBuf::from);
    if path.exists() {
        Ok(SimulationConfig::from_file(&path)?)
    } else {
        Ok(SimulationConfig::default())
    }
}

/// Write the full outcome as JSON for downstream tooling.
fn write_outcome_json(
    path: &Path,
    outcome: &runner::SimulationOutcome,
) -> Result<(), EngineError> {
    let json = serde_json::to_string_pretty(outcome).map_err(|e| EngineError::Report {
        message: format!("failed to serialize outcome: {e}"),
    })?;
    std::fs::write(path, json).map_err(|e| EngineError::Report {
        message: format!("failed to write {}: {e}", path.display()),
    })
}
