//! The parts factory: the producing party of the simulation.
//!
//! Each day the factory mints its full daily quota of details and pushes
//! them into the bounded parts queue, blocking whenever the queue is full.
//! Only after the last detail of the quota has been enqueued does it
//! signal ready-for-night. At night the factory idles; it signals
//! ready-for-new-day immediately and joins the new-day barrier like every
//! other party.
//!
//! Detail serial counters are per-type and start at zero, so a run that
//! mints `k` heads produces exactly `Head_0 .. Head_{k-1}`.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use warforge_types::{Detail, DetailType, Phase};

use crate::coordinator::{PhaseCoordinator, SyncError};
use crate::planner::DetailPlanner;
use crate::queue::{DetailSender, QueueError};

/// Errors from the parts factory.
#[derive(Debug, thiserror::Error)]
pub enum FactoryError {
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

    /// A per-type serial counter would overflow.
    #[error("serial counter overflow for {detail_type}")]
    CounterOverflow {
        /// The part type whose counter wrapped.
        detail_type: DetailType,
    },
}

/// Production totals reported when the factory's run completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FactoryReport {
    /// Number of details minted per type over the whole run.
    pub produced: BTreeMap<DetailType, u64>,
}

impl FactoryReport {
    /// Total number of details minted across all types.
    pub fn total(&self) -> u64 {
        self.produced.values().fold(0, |sum, n| sum.saturating_add(*n))
    }
}

/// The producing party: mints details and feeds the parts queue.
pub struct DetailFactory {
    coordinator: Arc<PhaseCoordinator>,
    queue: DetailSender,
    daily_quota: u32,
    planner: Box<dyn DetailPlanner>,
    serials: BTreeMap<DetailType, u64>,
    produced: BTreeMap<DetailType, u64>,
}

impl std::fmt::Debug for DetailFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetailFactory")
            .field("daily_quota", &self.daily_quota)
            .field("produced", &self.produced)
            .finish_non_exhaustive()
    }
}

impl DetailFactory {
    /// Create a factory producing `daily_quota` details per day.
    pub fn new(
        coordinator: Arc<PhaseCoordinator>,
        queue: DetailSender,
        daily_quota: u32,
        planner: Box<dyn DetailPlanner>,
    ) -> Self {
        Self {
            coordinator,
            queue,
            daily_quota,
            planner,
            serials: BTreeMap::new(),
            produced: BTreeMap::new(),
        }
    }

    /// Mint the next detail of the given type, advancing its serial.
    fn mint_next(&mut self, detail_type: DetailType) -> Result<Detail, FactoryError> {
        let serial = self.serials.entry(detail_type).or_insert(0);
        let detail = Detail::mint(detail_type, *serial);
        *serial = serial
            .checked_add(1)
            .ok_or(FactoryError::CounterOverflow { detail_type })?;

        let count = self.produced.entry(detail_type).or_insert(0);
        *count = count.saturating_add(1);
        Ok(detail)
    }

    /// Produce one day's quota, pushing each detail into the queue.
    ///
    /// Blocks on a full queue until a faction takes a detail; an abort
    /// unblocks the push and fails the day.
    ///
    /// # Errors
    ///
    /// Returns [`FactoryError::Queue`] if the queue closed,
    /// [`FactoryError::Sync`] if the run was aborted mid-push, and
    /// [`FactoryError::CounterOverflow`] if a serial counter wrapped.
    pub async fn produce_daily_quota(&mut self) -> Result<(), FactoryError> {
        for minted in 1..=self.daily_quota {
            let detail_type = self.planner.next_type();
            let detail = self.mint_next(detail_type)?;
            debug!(detail = %detail, minted, quota = self.daily_quota, "detail produced");
            tokio::select! {
                () = self.coordinator.aborted() => return Err(SyncError::Aborted.into()),
                result = self.queue.put(detail) => result?,
            }
        }
        Ok(())
    }

    /// The factory's full party loop, from the start gate to the end of
    /// the run.
    ///
    /// # Errors
    ///
    /// Any [`FactoryError`] is fatal to the run; the caller is expected to
    /// abort the coordinator so the other parties unblock.
    pub async fn run(mut self) -> Result<FactoryReport, FactoryError> {
        self.coordinator.await_start().await?;
        info!(quota = self.daily_quota, "parts factory entering the day cycle");

        loop {
            if self.coordinator.phase() == Phase::Finished {
                break;
            }
            let day = self.coordinator.current_day().await;
            debug!(day, "factory day started");

            self.produce_daily_quota().await?;
            self.coordinator.signal_ready_for_night().await?;

            if self.coordinator.await_nightfall().await? == Phase::Finished {
                break;
            }
            // The factory has no night work.
            self.coordinator.signal_ready_for_new_day().await?;
            self.coordinator.await_new_day().await?;
        }

        let report = FactoryReport {
            produced: self.produced,
        };
        info!(total = report.total(), "parts factory finished");
        Ok(report)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use crate::planner::RoundRobinPlanner;
    use crate::queue::detail_queue;

    use super::*;

    fn factory_with(
        coordinator: &Arc<PhaseCoordinator>,
        quota: u32,
        capacity: usize,
    ) -> (DetailFactory, crate::queue::DetailReceiver) {
        let (tx, rx) = detail_queue(capacity).unwrap();
        let factory = DetailFactory::new(
            Arc::clone(coordinator),
            tx,
            quota,
            Box::new(RoundRobinPlanner::new()),
        );
        (factory, rx)
    }

    #[tokio::test]
    async fn quota_is_produced_in_planner_order() {
        let coordinator = Arc::new(PhaseCoordinator::new(1, 1).unwrap());
        let (mut factory, rx) = factory_with(&coordinator, 4, 8);

        factory.produce_daily_quota().await.unwrap();

        assert_eq!(rx.take().await.unwrap().id, "Head_0");
        assert_eq!(rx.take().await.unwrap().id, "Torso_0");
        assert_eq!(rx.take().await.unwrap().id, "Hand_0");
        assert_eq!(rx.take().await.unwrap().id, "Feet_0");
    }

    #[tokio::test]
    async fn serials_continue_across_days() {
        let coordinator = Arc::new(PhaseCoordinator::new(2, 1).unwrap());
        let (mut factory, rx) = factory_with(&coordinator, 4, 16);

        factory.produce_daily_quota().await.unwrap();
        factory.produce_daily_quota().await.unwrap();

        let mut ids = Vec::new();
        for _ in 0..8 {
            ids.push(rx.take().await.unwrap().id);
        }
        assert!(ids.contains(&"Head_0".to_owned()));
        assert!(ids.contains(&"Head_1".to_owned()));
        assert!(!ids.contains(&"Head_2".to_owned()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn abort_unblocks_a_full_queue_push() {
        let coordinator = Arc::new(PhaseCoordinator::new(1, 1).unwrap());
        // Quota exceeds capacity and nothing consumes: the push must block.
        let (mut factory, _rx) = factory_with(&coordinator, 4, 1);

        let producer = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move {
                let result = factory.produce_daily_quota().await;
                drop(coordinator);
                result
            })
        };
        tokio::task::yield_now().await;

        coordinator.abort();
        let result = tokio::time::timeout(Duration::from_secs(5), producer)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(
            result,
            Err(FactoryError::Sync {
                source: SyncError::Aborted
            })
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn full_run_reports_production_totals() {
        let days = 3;
        let coordinator = Arc::new(PhaseCoordinator::new(days, 2).unwrap());
        let (factory, rx) = factory_with(&coordinator, 4, 16);

        let producer = tokio::spawn(factory.run());

        // A drain party standing in for the factions: takes the whole
        // quota each night.
        let consumer = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move {
                coordinator.await_start().await?;
                loop {
                    if coordinator.phase() == Phase::Finished {
                        break;
                    }
                    coordinator.signal_ready_for_night().await?;
                    if coordinator.await_nightfall().await? == Phase::Finished {
                        break;
                    }
                    for _ in 0..4 {
                        let _ = rx.take().await;
                    }
                    coordinator.signal_ready_for_new_day().await?;
                    coordinator.await_new_day().await?;
                }
                Ok::<(), FactoryError>(())
            })
        };

        coordinator.run().await.unwrap();

        let report = tokio::time::timeout(Duration::from_secs(30), producer)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        consumer.await.unwrap().unwrap();

        assert_eq!(report.total(), days.checked_mul(4).unwrap());
        // Round-robin over 3 days of 4: one of each type per day.
        for detail_type in DetailType::ALL {
            assert_eq!(report.produced.get(&detail_type).copied(), Some(days));
        }
    }
}
