//! Factions: the consuming parties of the simulation.
//!
//! Each faction owns a private [`Inventory`] and robot roster that no
//! other task can reach. During the day a faction has nothing to do and
//! signals ready-for-night immediately. At night it takes its quota of
//! details from the shared parts queue, files them by type, assembles as
//! many robots as the stock allows, and signals ready-for-new-day.
//!
//! Robot serials are per-faction and increment before use, so the first
//! robot of a faction with prefix `IRC` is `IRC_1`.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use warforge_types::{DetailType, Inventory, Phase, Robot};

use crate::assembly::{AssemblyError, PartRequirements, assemble};
use crate::coordinator::{PhaseCoordinator, SyncError};
use crate::queue::{DetailReceiver, QueueError};

/// Errors from a faction's run.
#[derive(Debug, thiserror::Error)]
pub enum FactionError {
    /// The day/night protocol failed or the run was aborted.
    #[error("synchronization error: {source}")]
    Sync {
        /// The underlying protocol error.
        #[from]
        source: SyncError,
    },

    /// The parts queue closed mid-run.
    #[error("queue error: {source}")]
    Queue {
        /// The underlying queue error.
        #[from]
        source: QueueError,
    },

    /// Robot assembly failed.
    #[error("assembly error: {source}")]
    Assembly {
        /// The underlying assembly error.
        #[from]
        source: AssemblyError,
    },
}

/// Static identity and behavior of one faction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactionConfig {
    /// Display name, unique within a run.
    pub name: String,

    /// Serial prefix embedded in robot ids.
    pub serial_prefix: String,

    /// Number of details taken from the queue each night.
    pub daily_quota: u32,
}

/// Final state of a faction when the run completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FactionReport {
    /// The faction's display name.
    pub name: String,

    /// Every robot assembled over the run, in assembly order.
    pub roster: Vec<Robot>,

    /// Parts left unassembled at the end of the run, per type.
    pub leftover: BTreeMap<DetailType, usize>,

    /// Details taken from the queue over the run, per type.
    pub consumed: BTreeMap<DetailType, u64>,
}

impl FactionReport {
    /// The army this faction goes to war with.
    pub fn army_size(&self) -> usize {
        self.roster.len()
    }
}

/// A consuming party: collects details at night and assembles robots.
#[derive(Debug)]
pub struct Faction {
    config: FactionConfig,
    coordinator: Arc<PhaseCoordinator>,
    queue: Arc<DetailReceiver>,
    requirements: PartRequirements,
    inventory: Inventory,
    roster: Vec<Robot>,
    robot_counter: u64,
    consumed: BTreeMap<DetailType, u64>,
}

impl Faction {
    /// Create a faction with an empty inventory and roster.
    pub fn new(
        config: FactionConfig,
        coordinator: Arc<PhaseCoordinator>,
        queue: Arc<DetailReceiver>,
        requirements: PartRequirements,
    ) -> Self {
        Self {
            config,
            coordinator,
            queue,
            requirements,
            inventory: Inventory::new(),
            roster: Vec::new(),
            robot_counter: 0,
            consumed: BTreeMap::new(),
        }
    }

    /// The faction's display name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Take this night's quota of details from the shared queue.
    ///
    /// Blocks on an empty queue until the factory pushes; an abort
    /// unblocks the take and fails the night.
    async fn collect_nightly_quota(&mut self) -> Result<(), FactionError> {
        for taken in 1..=self.config.daily_quota {
            let detail = tokio::select! {
                () = self.coordinator.aborted() => return Err(SyncError::Aborted.into()),
                result = self.queue.take() => result?,
            };
            debug!(
                faction = %self.config.name,
                detail = %detail,
                taken,
                quota = self.config.daily_quota,
                "detail collected",
            );
            let count = self.consumed.entry(detail.detail_type).or_insert(0);
            *count = count.saturating_add(1);
            self.inventory.store(detail);
        }
        Ok(())
    }

    /// Assemble every robot the current stock allows.
    fn assemble_available(&mut self) -> Result<(), FactionError> {
        let robots = assemble(
            &self.config.serial_prefix,
            &mut self.robot_counter,
            &mut self.inventory,
            &self.requirements,
        )?;
        if !robots.is_empty() {
            info!(
                faction = %self.config.name,
                assembled = robots.len(),
                army = self.roster.len().saturating_add(robots.len()),
                "robots assembled",
            );
        }
        self.roster.extend(robots);
        Ok(())
    }

    /// The faction's full party loop, from the start gate to the end of
    /// the run. Consumes the faction and returns its final state.
    ///
    /// # Errors
    ///
    /// Any [`FactionError`] is fatal to the run; the caller is expected to
    /// abort the coordinator so the other parties unblock.
    pub async fn run(mut self) -> Result<FactionReport, FactionError> {
        self.coordinator.await_start().await?;
        info!(faction = %self.config.name, "faction entering the day cycle");

        loop {
            if self.coordinator.phase() == Phase::Finished {
                break;
            }
            // Nothing to do by day; the faction works at night.
            self.coordinator.signal_ready_for_night().await?;

            if self.coordinator.await_nightfall().await? == Phase::Finished {
                break;
            }
            self.collect_nightly_quota().await?;
            self.assemble_available()?;

            self.coordinator.signal_ready_for_new_day().await?;
            self.coordinator.await_new_day().await?;
        }

        let report = FactionReport {
            name: self.config.name,
            leftover: self.inventory.counts(),
            consumed: self.consumed,
            roster: self.roster,
        };
        info!(
            faction = %report.name,
            army = report.army_size(),
            leftover = report.leftover.values().sum::<usize>(),
            "faction finished",
        );
        Ok(report)
    }
}
