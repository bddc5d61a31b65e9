//! Configuration loading and typed config structures for a simulation run.
//!
//! The canonical configuration lives in `warforge.yaml` at the project
//! root. This module defines strongly-typed structs that mirror the YAML
//! structure, and provides a loader that reads and validates the file.

use std::path::Path;

use serde::Deserialize;
use tracing::warn;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The configuration parsed but describes an unrunnable simulation.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// What is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level simulation configuration.
///
/// Mirrors the structure of `warforge.yaml`. All fields have defaults
/// matching a small reference run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimulationConfig {
    /// World-level settings (name, seed).
    #[serde(default)]
    pub world: WorldConfig,

    /// Run boundary settings.
    #[serde(default)]
    pub simulation: SimulationBoundsConfig,

    /// Parts factory settings.
    #[serde(default)]
    pub factory: FactoryConfig,

    /// The factions taking part in the run.
    #[serde(default = "default_factions")]
    pub factions: Vec<FactionEntry>,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            world: WorldConfig::default(),
            simulation: SimulationBoundsConfig::default(),
            factory: FactoryConfig::default(),
            factions: default_factions(),
            logging: LoggingConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if the run it describes cannot complete.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if the run it describes cannot complete.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Total details the factions take from the queue per night.
    pub fn total_consumption(&self) -> u64 {
        self.factions
            .iter()
            .fold(0_u64, |sum, f| sum.saturating_add(u64::from(f.daily_quota)))
    }

    /// Reject configurations whose first day is guaranteed to deadlock.
    ///
    /// Consumption exceeding production means some faction would block on
    /// an empty queue forever on day one, so it is rejected outright. A
    /// queue smaller than the daily quota is legitimate backpressure and
    /// only draws a warning, as does production exceeding consumption
    /// (the surplus accumulates in the queue until it fills).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.simulation.days == 0 {
            return Err(ConfigError::Invalid {
                reason: "simulation.days must be at least 1".to_owned(),
            });
        }
        if self.factory.daily_quota == 0 {
            return Err(ConfigError::Invalid {
                reason: "factory.daily_quota must be at least 1".to_owned(),
            });
        }
        if self.factions.is_empty() {
            return Err(ConfigError::Invalid {
                reason: "at least one faction is required".to_owned(),
            });
        }
        for faction in &self.factions {
            if faction.name.is_empty() || faction.serial_prefix.is_empty() {
                return Err(ConfigError::Invalid {
                    reason: "faction name and serial_prefix must be non-empty".to_owned(),
                });
            }
            if faction.daily_quota == 0 {
                return Err(ConfigError::Invalid {
                    reason: format!("faction {} daily_quota must be at least 1", faction.name),
                });
            }
        }
        for (i, faction) in self.factions.iter().enumerate() {
            for other in self.factions.iter().skip(i.saturating_add(1)) {
                if faction.name == other.name {
                    return Err(ConfigError::Invalid {
                        reason: format!("duplicate faction name {}", faction.name),
                    });
                }
                if faction.serial_prefix == other.serial_prefix {
                    return Err(ConfigError::Invalid {
                        reason: format!("duplicate serial prefix {}", faction.serial_prefix),
                    });
                }
            }
        }

        let consumption = self.total_consumption();
        let production = u64::from(self.factory.daily_quota);
        if consumption > production {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "factions consume {consumption} details per night but the factory \
                     produces only {production} per day; the run would deadlock",
                ),
            });
        }
        if consumption < production {
            warn!(
                production,
                consumption,
                "daily production exceeds consumption; the surplus will pool in the queue",
            );
        }
        if u64::try_from(self.factory.queue_capacity()).unwrap_or(u64::MAX) < production {
            warn!(
                capacity = self.factory.queue_capacity(),
                production,
                "queue capacity is below the daily quota; the factory will block mid-day",
            );
        }
        Ok(())
    }
}

/// World-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorldConfig {
    /// Human-readable simulation name.
    #[serde(default = "default_world_name")]
    pub name: String,

    /// Random seed for the production planner.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            name: default_world_name(),
            seed: default_seed(),
        }
    }
}

/// Run boundary configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimulationBoundsConfig {
    /// Number of day/night cycles to simulate.
    #[serde(default = "default_days")]
    pub days: u64,
}

impl Default for SimulationBoundsConfig {
    fn default() -> Self {
        Self {
            days: default_days(),
        }
    }
}

/// Parts factory configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FactoryConfig {
    /// Details minted per day.
    #[serde(default = "default_factory_quota")]
    pub daily_quota: u32,

    /// Bounded queue capacity; defaults to the daily quota.
    #[serde(default)]
    pub queue_capacity: Option<usize>,

    /// Part-type selection: `random` (seeded) or `round_robin`.
    #[serde(default)]
    pub planner: PlannerKind,
}

impl FactoryConfig {
    /// Effective queue capacity: the explicit value, or the daily quota.
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
            .unwrap_or_else(|| usize::try_from(self.daily_quota).unwrap_or(usize::MAX))
            .max(1)
    }
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            daily_quota: default_factory_quota(),
            queue_capacity: None,
            planner: PlannerKind::default(),
        }
    }
}

/// Which production planner the factory uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlannerKind {
    /// Uniform random over the part types, seeded from `world.seed`.
    #[default]
    Random,

    /// Deterministic cycle through the part types in canonical order.
    RoundRobin,
}

/// One faction's entry in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FactionEntry {
    /// Display name, unique within the run.
    pub name: String,

    /// Serial prefix embedded in robot ids, unique within the run.
    pub serial_prefix: String,

    /// Details taken from the queue each night.
    #[serde(default = "default_faction_quota")]
    pub daily_quota: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_world_name() -> String {
    "Warforge".to_owned()
}

const fn default_seed() -> u64 {
    42
}

const fn default_days() -> u64 {
    100
}

const fn default_factory_quota() -> u32 {
    10
}

const fn default_faction_quota() -> u32 {
    5
}

fn default_factions() -> Vec<FactionEntry> {
    vec![
        FactionEntry {
            name: "Ironclad".to_owned(),
            serial_prefix: "IRC".to_owned(),
            daily_quota: default_faction_quota(),
        },
        FactionEntry {
            name: "Obsidian".to_owned(),
            serial_prefix: "OBS".to_owned(),
            daily_quota: default_faction_quota(),
        },
    ]
}

fn default_log_level() -> String {
    "info".to_owned()
}
