//! Part types and the immutable [`Detail`] value.
//!
//! A detail is a single typed robot part with a unique identifier. Ids are
//! assigned by the parts factory from a per-type monotonic counter that
//! starts at 0 and is never reset, so the ids of one type over a run of K
//! parts are exactly `Type_0` through `Type_(K-1)`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The closed set of part types a robot is assembled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DetailType {
    /// Sensor and control housing.
    Head,
    /// Central chassis the other parts mount onto.
    Torso,
    /// Manipulator arm.
    Hand,
    /// Locomotion assembly.
    Feet,
}

impl DetailType {
    /// Every part type, in canonical order.
    pub const ALL: [Self; 4] = [Self::Head, Self::Torso, Self::Hand, Self::Feet];

    /// The display name used as the prefix of detail ids.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Head => "Head",
            Self::Torso => "Torso",
            Self::Hand => "Hand",
            Self::Feet => "Feet",
        }
    }
}

impl fmt::Display for DetailType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single typed part produced by the factory.
///
/// Details are immutable once minted. The id embeds the type name and the
/// per-type serial number, e.g. `Torso_17`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detail {
    /// Unique id of the form `<TypeName>_<n>`.
    pub id: String,
    /// The part type.
    pub detail_type: DetailType,
}

impl Detail {
    /// Mint a detail of the given type with the given serial number.
    pub fn mint(detail_type: DetailType, serial: u64) -> Self {
        Self {
            id: format!("{}_{serial}", detail_type.name()),
            detail_type,
        }
    }
}

impl fmt::Display for Detail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}
