//! The day/night simulation phase.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The phase of the simulation as published by the coordinator.
///
/// Legal transitions are `NotStarted -> Day`, `Day -> Night`,
/// `Night -> Day`, and `Night -> Finished`. The clock rejects anything
/// else -- the phase never skips and never reverses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// The coordinator has not opened the start gate yet.
    NotStarted,
    /// Production and readiness signaling happen by day.
    Day,
    /// Consumption and assembly happen by night.
    Night,
    /// All simulated days have completed; every party exits.
    Finished,
}

impl Phase {
    /// Whether this phase is [`Phase::Night`].
    pub const fn is_night(self) -> bool {
        matches!(self, Self::Night)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotStarted => "not-started",
            Self::Day => "day",
            Self::Night => "night",
            Self::Finished => "finished",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_night_is_night() {
        assert!(Phase::Night.is_night());
        assert!(!Phase::NotStarted.is_night());
        assert!(!Phase::Day.is_night());
        assert!(!Phase::Finished.is_night());
    }
}
