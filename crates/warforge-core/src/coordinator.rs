//! The phase coordinator: owner of the clock and the day/night protocol.
//!
//! One [`PhaseCoordinator`] instance drives the whole run. It owns the
//! [`SimulationClock`] (behind its exclusion lock), the per-day
//! [`DayRendezvous`] pair, the cyclic new-day barrier, and the phase
//! broadcast channel. Every party -- the parts factory and each faction --
//! blocks on the coordinator's primitives and never touches the clock
//! directly.
//!
//! # Protocol
//!
//! ```text
//! start: NotStarted -> Day, releasing the start gate exactly once.
//! per day:
//!   1. wait for all parties' ready-for-night signals
//!   2. under the clock lock: set Night, broadcast
//!   3. wait for all parties' ready-for-new-day signals
//!   4. under the clock lock: install fresh latches, set Day
//!      (or Finished on the final day), broadcast
//!   5. arrive at the barrier with every party; on release the day
//!      counter advances exactly once
//! ```
//!
//! Setting `Finished` before the final barrier release is what lets every
//! party observe the end of the run instead of deadlocking on a day that
//! will never come.
//!
//! # Failure model
//!
//! There is no retry and no partial-failure path. [`abort`] broadcasts a
//! run-wide abort; every blocked wait resolves to [`SyncError::Aborted`]
//! and the whole run terminates. No timeout or deadlock detection is
//! layered on top of the waits.
//!
//! [`abort`]: PhaseCoordinator::abort

use tokio::sync::{Barrier, Mutex, watch};
use tracing::{debug, info};

use warforge_types::Phase;

use crate::clock::{ClockError, SimulationClock};
use crate::rendezvous::{CountdownLatch, DayRendezvous, LatchError};

/// Errors from the day/night synchronization protocol.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The run was aborted while this party was blocked.
    ///
    /// Fatal: the protocol has no retry or partial-failure semantics.
    #[error("simulation run aborted")]
    Aborted,

    /// A rendezvous latch was signaled out of step with the day cycle.
    #[error("rendezvous error: {source}")]
    Rendezvous {
        /// The underlying latch error.
        #[from]
        source: LatchError,
    },

    /// An illegal clock mutation was attempted.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },

    /// The coordinator was constructed with no parties.
    #[error("party count must be at least 1, got {given}")]
    InvalidPartyCount {
        /// The rejected value.
        given: usize,
    },

    /// The coordinator was constructed with no days to simulate.
    #[error("day count must be at least 1, got {given}")]
    InvalidDayCount {
        /// The rejected value.
        given: u64,
    },
}

/// Summary returned by the coordinator when the run completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorSummary {
    /// Number of fully completed days. Equals the configured day count.
    pub days_completed: u64,
}

/// Owner of the day counter, phase flag, and synchronization primitives.
#[derive(Debug)]
pub struct PhaseCoordinator {
    /// Number of days to simulate.
    days: u64,

    /// Number of parties (producer + factions), excluding the coordinator.
    party_count: usize,

    /// The clock, mutated only under this lock.
    clock: Mutex<SimulationClock>,

    /// Phase broadcast; parties wait on subscribed receivers.
    phase_tx: watch::Sender<Phase>,

    /// The current day's latch pair, replaced each cycle.
    rendezvous: Mutex<DayRendezvous>,

    /// Cyclic barrier releasing all parties plus the coordinator into the
    /// next day; resets automatically after each release.
    new_day_gate: Barrier,

    /// Run-wide abort broadcast.
    abort_tx: watch::Sender<bool>,
}

impl PhaseCoordinator {
    /// Create a coordinator for `days` cycles over `party_count` parties.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidDayCount`] or
    /// [`SyncError::InvalidPartyCount`] for zero values.
    pub fn new(days: u64, party_count: usize) -> Result<Self, SyncError> {
        if days == 0 {
            return Err(SyncError::InvalidDayCount { given: days });
        }
        if party_count == 0 {
            return Err(SyncError::InvalidPartyCount { given: party_count });
        }
        let (phase_tx, _) = watch::channel(Phase::NotStarted);
        let (abort_tx, _) = watch::channel(false);
        Ok(Self {
            days,
            party_count,
            clock: Mutex::new(SimulationClock::new()),
            phase_tx,
            rendezvous: Mutex::new(DayRendezvous::fresh(party_count)),
            new_day_gate: Barrier::new(party_count.saturating_add(1)),
            abort_tx,
        })
    }

    /// Number of days this coordinator will simulate.
    pub const fn days(&self) -> u64 {
        self.days
    }

    /// Number of parties, excluding the coordinator itself.
    pub const fn party_count(&self) -> usize {
        self.party_count
    }

    // -----------------------------------------------------------------------
    // Synchronized reads
    // -----------------------------------------------------------------------

    /// The current phase, read with the same visibility guarantee as the
    /// coordinator's writes.
    pub fn phase(&self) -> Phase {
        *self.phase_tx.borrow()
    }

    /// Whether the current phase is night.
    pub fn is_night(&self) -> bool {
        self.phase().is_night()
    }

    /// Number of fully completed days so far.
    pub async fn current_day(&self) -> u64 {
        self.clock.lock().await.day()
    }

    // -----------------------------------------------------------------------
    // Party-facing signals and waits
    // -----------------------------------------------------------------------

    /// Signal that the calling party has finished its day work.
    ///
    /// Decrementing the latch to zero wakes the coordinator.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Rendezvous`] if this day's latch was already
    /// exhausted (a party is out of step with the cycle).
    pub async fn signal_ready_for_night(&self) -> Result<(), SyncError> {
        let latch = self.rendezvous.lock().await.ready_for_night();
        latch.count_down()?;
        debug!(remaining = latch.remaining(), "ready-for-night signaled");
        Ok(())
    }

    /// Signal that the calling party has finished its night work.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Rendezvous`] if this day's latch was already
    /// exhausted.
    pub async fn signal_ready_for_new_day(&self) -> Result<(), SyncError> {
        let latch = self.rendezvous.lock().await.ready_for_new_day();
        latch.count_down()?;
        debug!(remaining = latch.remaining(), "ready-for-new-day signaled");
        Ok(())
    }

    /// Block until the simulation has started (phase leaves `NotStarted`).
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Aborted`] if the run is aborted while waiting.
    pub async fn await_start(&self) -> Result<(), SyncError> {
        let mut rx = self.phase_tx.subscribe();
        tokio::select! {
            () = self.aborted() => Err(SyncError::Aborted),
            result = rx.wait_for(|phase| *phase != Phase::NotStarted) => {
                result.map(|_| ()).map_err(|_closed| SyncError::Aborted)
            }
        }
    }

    /// Block until the phase flips to night.
    ///
    /// The predicate is re-checked after every wake, so a spurious wakeup
    /// can never release the caller early. Returns the observed phase:
    /// [`Phase::Night`] in the normal case, or [`Phase::Finished`] if the
    /// run ended while the caller was waiting -- the caller must exit
    /// without doing night work in that case.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Aborted`] if the run is aborted while waiting.
    pub async fn await_nightfall(&self) -> Result<Phase, SyncError> {
        let mut rx = self.phase_tx.subscribe();
        tokio::select! {
            () = self.aborted() => Err(SyncError::Aborted),
            result = rx.wait_for(|phase| matches!(phase, Phase::Night | Phase::Finished)) => {
                result.map(|phase| *phase).map_err(|_closed| SyncError::Aborted)
            }
        }
    }

    /// Block at the cyclic barrier until all parties plus the coordinator
    /// have arrived.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Aborted`] if the run is aborted while waiting.
    pub async fn await_new_day(&self) -> Result<(), SyncError> {
        tokio::select! {
            () = self.aborted() => Err(SyncError::Aborted),
            _ = self.new_day_gate.wait() => Ok(()),
        }
    }

    // -----------------------------------------------------------------------
    // Abort
    // -----------------------------------------------------------------------

    /// Broadcast a run-wide abort.
    ///
    /// Every wait blocked on the coordinator resolves to
    /// [`SyncError::Aborted`]; no party is left leaked on a primitive.
    pub fn abort(&self) {
        info!("aborting simulation run");
        self.abort_tx.send_replace(true);
    }

    /// Completes when the run has been aborted. Never completes otherwise.
    pub async fn aborted(&self) {
        let mut rx = self.abort_tx.subscribe();
        // A closed channel cannot happen while `self` is alive, but if it
        // ever did it would count as an abort too.
        let _ = rx.wait_for(|aborted| *aborted).await;
    }

    // -----------------------------------------------------------------------
    // The coordinator's own run loop
    // -----------------------------------------------------------------------

    /// Release all parties blocked on the initial gate, exactly once.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Clock`] if the simulation has already started.
    pub async fn start(&self) -> Result<(), SyncError> {
        let mut clock = self.clock.lock().await;
        clock.start()?;
        self.phase_tx.send_replace(Phase::Day);
        info!(parties = self.party_count, days = self.days, "simulation started");
        Ok(())
    }

    /// Drive the full day/night cycle for the configured number of days.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError`] on abort or on any protocol violation. All
    /// failures are fatal to the run.
    pub async fn run(&self) -> Result<CoordinatorSummary, SyncError> {
        self.start().await?;

        for day in 0..self.days {
            let is_final_day = day.saturating_add(1) == self.days;

            debug!(day, "waiting for all parties to be ready for the night");
            let ready_for_night = self.rendezvous.lock().await.ready_for_night();
            self.wait_abortable(&ready_for_night).await?;

            {
                let mut clock = self.clock.lock().await;
                clock.set_phase(Phase::Night)?;
                self.phase_tx.send_replace(Phase::Night);
            }
            info!(day, "night has come; notifying all parties");

            debug!(day, "waiting for all parties to finish night activities");
            let ready_for_new_day = self.rendezvous.lock().await.ready_for_new_day();
            self.wait_abortable(&ready_for_new_day).await?;

            {
                let mut clock = self.clock.lock().await;
                *self.rendezvous.lock().await = DayRendezvous::fresh(self.party_count);
                let next = if is_final_day { Phase::Finished } else { Phase::Day };
                clock.set_phase(next)?;
                self.phase_tx.send_replace(next);
            }
            debug!(day, "new-day preparations finished");

            self.await_new_day().await?;

            let completed = {
                let mut clock = self.clock.lock().await;
                clock.complete_day()?
            };
            info!(day = completed, "day finished");
        }

        let days_completed = self.current_day().await;
        info!(days_completed, "simulation finished");
        Ok(CoordinatorSummary { days_completed })
    }

    /// Wait on a latch, resolving to [`SyncError::Aborted`] on abort.
    async fn wait_abortable(&self, latch: &CountdownLatch) -> Result<(), SyncError> {
        tokio::select! {
            () = self.aborted() => Err(SyncError::Aborted),
            () = latch.wait() => Ok(()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[test]
    fn zero_days_rejected() {
        assert!(matches!(
            PhaseCoordinator::new(0, 3),
            Err(SyncError::InvalidDayCount { given: 0 })
        ));
    }

    #[test]
    fn zero_parties_rejected() {
        assert!(matches!(
            PhaseCoordinator::new(5, 0),
            Err(SyncError::InvalidPartyCount { given: 0 })
        ));
    }

    #[tokio::test]
    async fn phase_starts_not_started() {
        let coordinator = PhaseCoordinator::new(1, 1).unwrap();
        assert_eq!(coordinator.phase(), Phase::NotStarted);
        assert!(!coordinator.is_night());
        assert_eq!(coordinator.current_day().await, 0);
    }

    #[tokio::test]
    async fn start_publishes_day_exactly_once() {
        let coordinator = PhaseCoordinator::new(1, 1).unwrap();
        coordinator.start().await.unwrap();
        assert_eq!(coordinator.phase(), Phase::Day);
        assert!(coordinator.start().await.is_err());
    }

    #[tokio::test]
    async fn await_start_releases_on_start() {
        let coordinator = Arc::new(PhaseCoordinator::new(1, 1).unwrap());
        let waiter = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.await_start().await })
        };
        tokio::task::yield_now().await;
        coordinator.start().await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), waiter)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn abort_wakes_blocked_waits() {
        let coordinator = Arc::new(PhaseCoordinator::new(1, 2).unwrap());
        let nightfall = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.await_nightfall().await })
        };
        let gate = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.await_new_day().await })
        };
        tokio::task::yield_now().await;

        coordinator.abort();

        let nightfall = tokio::time::timeout(Duration::from_secs(5), nightfall)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(nightfall, Err(SyncError::Aborted)));

        let gate = tokio::time::timeout(Duration::from_secs(5), gate)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(gate, Err(SyncError::Aborted)));
    }

    /// A minimal party loop for protocol tests: no production, no
    /// consumption, just the synchronization steps.
    async fn run_party(coordinator: Arc<PhaseCoordinator>) -> Result<u64, SyncError> {
        let mut cycles = 0_u64;
        coordinator.await_start().await?;
        loop {
            if coordinator.phase() == Phase::Finished {
                break;
            }
            coordinator.signal_ready_for_night().await?;
            if coordinator.await_nightfall().await? == Phase::Finished {
                break;
            }
            coordinator.signal_ready_for_new_day().await?;
            coordinator.await_new_day().await?;
            cycles = cycles.saturating_add(1);
        }
        Ok(cycles)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn full_run_completes_all_days() {
        let days = 5;
        let parties = 3;
        let coordinator = Arc::new(PhaseCoordinator::new(days, parties).unwrap());

        let mut handles = Vec::new();
        for _ in 0..parties {
            let coordinator = Arc::clone(&coordinator);
            handles.push(tokio::spawn(run_party(coordinator)));
        }

        let summary = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.run().await })
        };

        let summary = tokio::time::timeout(Duration::from_secs(30), summary)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(summary.days_completed, days);
        assert_eq!(coordinator.phase(), Phase::Finished);
        assert_eq!(coordinator.current_day().await, days);

        for handle in handles {
            let cycles = handle.await.unwrap().unwrap();
            assert_eq!(cycles, days);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn night_never_observed_before_every_ready_signal() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let days = 3;
        let parties = 3_usize;
        let coordinator = Arc::new(PhaseCoordinator::new(days, parties).unwrap());
        let ready = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..parties {
            let coordinator = Arc::clone(&coordinator);
            let ready = Arc::clone(&ready);
            handles.push(tokio::spawn(async move {
                coordinator.await_start().await?;
                loop {
                    if coordinator.phase() == Phase::Finished {
                        break;
                    }
                    ready.fetch_add(1, Ordering::SeqCst);
                    coordinator.signal_ready_for_night().await?;
                    if coordinator.await_nightfall().await? == Phase::Finished {
                        break;
                    }
                    // Night was published, so every party must already
                    // have signaled for this day.
                    assert_eq!(ready.load(Ordering::SeqCst), parties);
                    coordinator.signal_ready_for_new_day().await?;
                    coordinator.await_new_day().await?;
                    ready.fetch_sub(1, Ordering::SeqCst);
                }
                Ok::<(), SyncError>(())
            }));
        }

        tokio::time::timeout(Duration::from_secs(30), coordinator.run())
            .await
            .unwrap()
            .unwrap();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn single_party_single_day() {
        let coordinator = Arc::new(PhaseCoordinator::new(1, 1).unwrap());
        let party = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(run_party(coordinator))
        };
        let summary = coordinator.run().await.unwrap();
        assert_eq!(summary.days_completed, 1);
        assert_eq!(party.await.unwrap().unwrap(), 1);
    }

    #[tokio::test]
    async fn extra_signal_is_a_protocol_violation() {
        let coordinator = PhaseCoordinator::new(1, 1).unwrap();
        coordinator.start().await.unwrap();
        coordinator.signal_ready_for_night().await.unwrap();
        let result = coordinator.signal_ready_for_night().await;
        assert!(matches!(result, Err(SyncError::Rendezvous { .. })));
    }
}
