//! Simulation clock: the day counter and phase flag.
//!
//! The clock is the single source of truth for the simulation's temporal
//! state. It is owned exclusively by the [`PhaseCoordinator`] and mutated
//! only while the coordinator holds its exclusion lock; every other party
//! reads it through the coordinator's synchronized accessors -- there is
//! no raw unsynchronized flag read anywhere.
//!
//! # Design Principles
//!
//! - The day counter uses checked arithmetic (no silent overflow).
//! - Phase transitions are validated: `NotStarted -> Day`, `Day -> Night`,
//!   `Night -> Day`, `Night -> Finished`. Anything else is rejected, so
//!   the phase can never skip or reverse.
//! - The day counter advances exactly once per completed cycle.
//!
//! [`PhaseCoordinator`]: crate::coordinator::PhaseCoordinator

use warforge_types::Phase;

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// An illegal phase transition was attempted.
    #[error("illegal phase transition: {from} -> {to}")]
    InvalidTransition {
        /// The phase the clock was in.
        from: Phase,
        /// The rejected target phase.
        to: Phase,
    },

    /// The day counter would overflow.
    #[error("day counter overflow: cannot advance beyond u64::MAX")]
    DayOverflow,
}

/// The day counter and phase flag driving the day/night cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationClock {
    /// Number of fully completed day/night cycles.
    day: u64,

    /// Current phase.
    phase: Phase,
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationClock {
    /// Create a clock at day 0 in the [`Phase::NotStarted`] phase.
    pub const fn new() -> Self {
        Self {
            day: 0,
            phase: Phase::NotStarted,
        }
    }

    /// Return the number of completed days.
    pub const fn day(&self) -> u64 {
        self.day
    }

    /// Return the current phase.
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether the current phase is night.
    pub const fn is_night(&self) -> bool {
        self.phase.is_night()
    }

    /// Open the simulation: transition `NotStarted -> Day`.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidTransition`] if the simulation has
    /// already started.
    pub fn start(&mut self) -> Result<(), ClockError> {
        self.set_phase(Phase::Day)
    }

    /// Transition to a new phase, validating legality.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidTransition`] for any transition other
    /// than `NotStarted -> Day`, `Day -> Night`, `Night -> Day`, or
    /// `Night -> Finished`.
    pub fn set_phase(&mut self, to: Phase) -> Result<(), ClockError> {
        let legal = matches!(
            (self.phase, to),
            (Phase::NotStarted | Phase::Night, Phase::Day)
                | (Phase::Day, Phase::Night)
                | (Phase::Night, Phase::Finished)
        );
        if !legal {
            return Err(ClockError::InvalidTransition {
                from: self.phase,
                to,
            });
        }
        self.phase = to;
        Ok(())
    }

    /// Record the completion of one full day/night cycle.
    ///
    /// Returns the new day count.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::DayOverflow`] if the counter would exceed
    /// `u64::MAX`.
    pub fn complete_day(&mut self) -> Result<u64, ClockError> {
        self.day = self.day.checked_add(1).ok_or(ClockError::DayOverflow)?;
        Ok(self.day)
    }
}
