//! The assembled [`Robot`] composite.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::detail::Detail;

/// A robot assembled from one part of each type.
///
/// The id embeds the faction's serial prefix and the faction's monotonic
/// robot counter, e.g. `IRC_3`. Ids within one faction are unique and
/// strictly increasing; the counter is never reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Robot {
    /// Unique id of the form `<serialPrefix>_<n>`.
    pub id: String,
    /// The head slot.
    pub head: Detail,
    /// The torso slot.
    pub torso: Detail,
    /// The hand slot.
    pub hand: Detail,
    /// The feet slot.
    pub feet: Detail,
}

impl fmt::Display for Robot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}, {}, {}, {}]",
            self.id, self.head, self.torso, self.hand, self.feet
        )
    }
}
