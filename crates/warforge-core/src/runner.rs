//! Run orchestration: wires the coordinator, factory, and factions
//! together and drives a whole simulation to its verdict.
//!
//! The runner spawns one task per party and runs the coordinator on the
//! calling task. Every party task is wrapped so that its failure aborts
//! the coordinator, which in turn unblocks every other party; no failure
//! leaves the run wedged on a synchronization primitive.

use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::assembly::PartRequirements;
use crate::config::{ConfigError, PlannerKind, SimulationConfig};
use crate::coordinator::{PhaseCoordinator, SyncError};
use crate::faction::{Faction, FactionConfig, FactionError, FactionReport};
use crate::factory::{DetailFactory, FactoryError, FactoryReport};
use crate::planner::{DetailPlanner, RoundRobinPlanner, UniformRandomPlanner};
use crate::queue::{QueueError, detail_queue};

/// Errors from a simulation run.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The configuration describes an unrunnable simulation.
    #[error("config error: {source}")]
    Config {
        /// The underlying configuration error.
        #[from]
        source: ConfigError,
    },

    /// The coordinator failed or the run was aborted.
    #[error("synchronization error: {source}")]
    Sync {
        /// The underlying protocol error.
        #[from]
        source: SyncError,
    },

    /// The parts factory failed.
    #[error("factory error: {source}")]
    Factory {
        /// The underlying factory error.
        #[from]
        source: FactoryError,
    },

    /// A faction failed.
    #[error("faction error: {source}")]
    Faction {
        /// The underlying faction error.
        #[from]
        source: FactionError,
    },

    /// The parts queue could not be created.
    #[error("queue error: {source}")]
    Queue {
        /// The underlying queue error.
        #[from]
        source: QueueError,
    },

    /// A party task panicked instead of returning an error.
    #[error("party task panicked: {party}")]
    TaskPanicked {
        /// The panicking party's name.
        party: String,
    },
}

impl RunnerError {
    /// Whether this error is only the echo of a run-wide abort, as
    /// opposed to the failure that caused it.
    fn is_abort_echo(&self) -> bool {
        matches!(
            self,
            Self::Sync {
                source: SyncError::Aborted
            } | Self::Factory {
                source: FactoryError::Sync {
                    source: SyncError::Aborted
                }
            } | Self::Faction {
                source: FactionError::Sync {
                    source: SyncError::Aborted
                }
            }
        )
    }
}

/// Which faction goes to war with the larger army.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Verdict {
    /// One faction built strictly more robots than every other.
    Winner {
        /// The winning faction's name.
        name: String,
        /// Its army size.
        army_size: usize,
    },

    /// Two or more factions tied for the largest army.
    Tie {
        /// The tied army size.
        army_size: usize,
    },
}

/// Everything a completed run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimulationOutcome {
    /// Number of fully completed days.
    pub days_completed: u64,

    /// The factory's production totals.
    pub factory: FactoryReport,

    /// Final state of every faction, in configuration order.
    pub factions: Vec<FactionReport>,

    /// Who goes to war with the larger army.
    pub verdict: Verdict,
}

/// Compare the factions' final armies.
fn decide(reports: &[FactionReport]) -> Verdict {
    let largest = reports.iter().map(FactionReport::army_size).max().unwrap_or(0);
    let mut at_top = reports.iter().filter(|r| r.army_size() == largest);
    match (at_top.next(), at_top.next()) {
        (Some(winner), None) => Verdict::Winner {
            name: winner.name.clone(),
            army_size: largest,
        },
        _ => Verdict::Tie {
            army_size: largest,
        },
    }
}

/// Await a party task, flattening panics into [`RunnerError`].
async fn join_party<T, E>(party: &str, handle: JoinHandle<Result<T, E>>) -> Result<T, RunnerError>
where
    RunnerError: From<E>,
{
    match handle.await {
        Ok(result) => result.map_err(RunnerError::from),
        Err(join_error) => {
            error!(party, %join_error, "party task did not complete");
            Err(RunnerError::TaskPanicked {
                party: party.to_owned(),
            })
        }
    }
}

/// Of all the errors a failed run collected, return the root cause:
/// the first error that is not merely an abort echo.
fn root_cause(errors: Vec<RunnerError>) -> RunnerError {
    let mut echo = None;
    for error in errors {
        if error.is_abort_echo() {
            if echo.is_none() {
                echo = Some(error);
            }
        } else {
            return error;
        }
    }
    echo.unwrap_or(RunnerError::Sync {
        source: SyncError::Aborted,
    })
}

/// Run a whole simulation from configuration to verdict.
///
/// # Errors
///
/// Returns [`RunnerError::Config`] for an unrunnable configuration, and
/// otherwise the root-cause error of whichever party failed first. A
/// failed run never leaves tasks blocked: the failing party aborts the
/// coordinator and every other party unwinds.
pub async fn run_simulation(config: &SimulationConfig) -> Result<SimulationOutcome, RunnerError> {
    config.validate()?;

    let party_count = config.factions.len().saturating_add(1);
    let coordinator = Arc::new(PhaseCoordinator::new(
        config.simulation.days,
        party_count,
    )?);
    let (queue_tx, queue_rx) = detail_queue(config.factory.queue_capacity())?;
    let queue_rx = Arc::new(queue_rx);

    info!(
        world = %config.world.name,
        days = config.simulation.days,
        factions = config.factions.len(),
        "starting simulation run",
    );

    let planner: Box<dyn DetailPlanner> = match config.factory.planner {
        PlannerKind::Random => Box::new(UniformRandomPlanner::seeded(config.world.seed)),
        PlannerKind::RoundRobin => Box::new(RoundRobinPlanner::new()),
    };
    let factory = DetailFactory::new(
        Arc::clone(&coordinator),
        queue_tx,
        config.factory.daily_quota,
        planner,
    );
    let factory_task = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move {
            let result = factory.run().await;
            if result.is_err() {
                coordinator.abort();
            }
            result
        })
    };

    let mut faction_tasks = Vec::with_capacity(config.factions.len());
    for entry in &config.factions {
        let faction = Faction::new(
            FactionConfig {
                name: entry.name.clone(),
                serial_prefix: entry.serial_prefix.clone(),
                daily_quota: entry.daily_quota,
            },
            Arc::clone(&coordinator),
            Arc::clone(&queue_rx),
            PartRequirements::default(),
        );
        let coordinator = Arc::clone(&coordinator);
        let task = tokio::spawn(async move {
            let result = faction.run().await;
            if result.is_err() {
                coordinator.abort();
            }
            result
        });
        faction_tasks.push((entry.name.clone(), task));
    }

    let summary = coordinator.run().await;
    if summary.is_err() {
        coordinator.abort();
    }

    // Every party is joined regardless of the coordinator's fate, so the
    // failure that caused an abort is the one reported.
    let mut errors = Vec::new();
    let factory_report = match join_party("factory", factory_task).await {
        Ok(report) => Some(report),
        Err(error) => {
            errors.push(error);
            None
        }
    };
    let mut faction_reports = Vec::with_capacity(faction_tasks.len());
    for (name, task) in faction_tasks {
        match join_party(&name, task).await {
            Ok(report) => faction_reports.push(report),
            Err(error) => errors.push(error),
        }
    }
    let summary = match summary {
        Ok(summary) => Some(summary),
        Err(error) => {
            errors.push(error.into());
            None
        }
    };

    if !errors.is_empty() {
        return Err(root_cause(errors));
    }
    let (Some(summary), Some(factory_report)) = (summary, factory_report) else {
        return Err(RunnerError::Sync {
            source: SyncError::Aborted,
        });
    };

    let verdict = decide(&faction_reports);
    info!(days = summary.days_completed, ?verdict, "simulation run complete");
    Ok(SimulationOutcome {
        days_completed: summary.days_completed,
        factory: factory_report,
        factions: faction_reports,
        verdict,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use crate::config::{FactionEntry, FactoryConfig, SimulationBoundsConfig};

    use super::*;

    fn roster_of(size: usize) -> FactionReport {
        use warforge_types::{Detail, DetailType, Robot};
        let robot = |n: usize| Robot {
            id: format!("X_{n}"),
            head: Detail::mint(DetailType::Head, 0),
            torso: Detail::mint(DetailType::Torso, 0),
            hand: Detail::mint(DetailType::Hand, 0),
            feet: Detail::mint(DetailType::Feet, 0),
        };
        FactionReport {
            name: format!("size-{size}"),
            roster: (0..size).map(robot).collect(),
            leftover: std::collections::BTreeMap::new(),
            consumed: std::collections::BTreeMap::new(),
        }
    }

    #[test]
    fn verdict_picks_the_strict_winner() {
        let verdict = decide(&[roster_of(3), roster_of(5)]);
        assert_eq!(
            verdict,
            Verdict::Winner {
                name: "size-5".to_owned(),
                army_size: 5
            }
        );
    }

    #[test]
    fn verdict_ties_equal_armies() {
        let verdict = decide(&[roster_of(4), roster_of(4), roster_of(1)]);
        assert_eq!(verdict, Verdict::Tie { army_size: 4 });
    }

    fn small_config(days: u64) -> SimulationConfig {
        SimulationConfig {
            simulation: SimulationBoundsConfig { days },
            factory: FactoryConfig {
                daily_quota: 8,
                queue_capacity: None,
                planner: PlannerKind::RoundRobin,
            },
            factions: vec![
                FactionEntry {
                    name: "Ironclad".to_owned(),
                    serial_prefix: "IRC".to_owned(),
                    daily_quota: 4,
                },
                FactionEntry {
                    name: "Obsidian".to_owned(),
                    serial_prefix: "OBS".to_owned(),
                    daily_quota: 4,
                },
            ],
            ..SimulationConfig::default()
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn full_run_produces_an_outcome() {
        let config = small_config(5);
        let outcome = tokio::time::timeout(Duration::from_secs(60), run_simulation(&config))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(outcome.days_completed, 5);
        assert_eq!(outcome.factory.total(), 40);
        assert_eq!(outcome.factions.len(), 2);

        // Conservation: everything produced was taken by some faction.
        let consumed: u64 = outcome
            .factions
            .iter()
            .flat_map(|f| f.consumed.values())
            .sum();
        assert_eq!(consumed, outcome.factory.total());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn invalid_config_is_rejected_before_spawning() {
        let mut config = small_config(1);
        config.factions.clear();
        let result = run_simulation(&config).await;
        assert!(matches!(result, Err(RunnerError::Config { .. })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn single_faction_always_wins() {
        let config = SimulationConfig {
            simulation: SimulationBoundsConfig { days: 2 },
            factory: FactoryConfig {
                daily_quota: 4,
                queue_capacity: None,
                planner: PlannerKind::RoundRobin,
            },
            factions: vec![FactionEntry {
                name: "Ironclad".to_owned(),
                serial_prefix: "IRC".to_owned(),
                daily_quota: 4,
            }],
            ..SimulationConfig::default()
        };
        let outcome = tokio::time::timeout(Duration::from_secs(60), run_simulation(&config))
            .await
            .unwrap()
            .unwrap();

        // One of each type per day: one robot per night, none left over.
        assert_eq!(
            outcome.verdict,
            Verdict::Winner {
                name: "Ironclad".to_owned(),
                army_size: 2
            }
        );
        let ironclad = outcome.factions.first().unwrap();
        assert!(ironclad.leftover.is_empty());
        assert_eq!(ironclad.roster.first().unwrap().id, "IRC_1");
    }
}
