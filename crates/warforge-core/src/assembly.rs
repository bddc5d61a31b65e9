//! Robot assembly: a pure function over a faction's inventory.
//!
//! Assembly never blocks and never touches shared state. Given an
//! inventory and a per-robot part requirement, it computes how many
//! robots can be built, removes the consumed parts
//! most-recently-added-first, and returns the new robots. The removal
//! order is a determinism choice, not a semantic requirement: identical
//! inputs (up to the externally owned serial counter) always produce
//! identical output.

use std::collections::BTreeMap;

use warforge_types::{Detail, DetailType, Inventory, Robot};

/// Errors from robot assembly.
#[derive(Debug, thiserror::Error)]
pub enum AssemblyError {
    /// A robot could be built by the requirement counts, but a named part
    /// slot has no requirement to fill it.
    ///
    /// Every robot carries one part in each of its four slots; a
    /// requirement that is zero or absent for one of them while other
    /// types have buildable stock is contradictory input, surfaced rather
    /// than patched over.
    #[error("requirement leaves the {slot} slot unfillable")]
    UnfillableSlot {
        /// The part type whose slot cannot be filled.
        slot: DetailType,
    },

    /// The inventory ran out of a part the buildable count promised.
    #[error("inventory exhausted for {detail_type} mid-assembly")]
    MissingPart {
        /// The exhausted part type.
        detail_type: DetailType,
    },

    /// The faction's robot serial counter would overflow.
    #[error("robot serial counter overflow")]
    CounterOverflow,
}

/// Per-robot part requirements.
///
/// Types absent from the map (or mapped to zero) are not required and do
/// not constrain the buildable count. The default requires one part of
/// each of the four types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartRequirements {
    per_robot: BTreeMap<DetailType, u32>,
}

impl Default for PartRequirements {
    fn default() -> Self {
        Self::new(DetailType::ALL.into_iter().map(|t| (t, 1)).collect())
    }
}

impl PartRequirements {
    /// Create requirements from an explicit per-type map.
    pub const fn new(per_robot: BTreeMap<DetailType, u32>) -> Self {
        Self { per_robot }
    }

    /// Number of parts of the given type needed per robot (0 = not
    /// required).
    pub fn per_robot(&self, detail_type: DetailType) -> u32 {
        self.per_robot.get(&detail_type).copied().unwrap_or(0)
    }
}

/// Number of robots the inventory can satisfy under the requirements.
///
/// The count is the minimum over every required type T of
/// `floor(inventory[T] / required[T])`; a type with stock but no
/// requirement does not constrain the result, and a required type absent
/// from the inventory contributes zero. No positive requirement at all
/// means nothing can be built.
pub fn buildable_count(inventory: &Inventory, requirements: &PartRequirements) -> usize {
    let mut buildable: Option<usize> = None;
    for detail_type in DetailType::ALL {
        let required = requirements.per_robot(detail_type);
        if required == 0 {
            continue;
        }
        let required = usize::try_from(required).unwrap_or(usize::MAX);
        let possible = inventory.count(detail_type).checked_div(required).unwrap_or(0);
        buildable = Some(buildable.map_or(possible, |b| b.min(possible)));
    }
    buildable.unwrap_or(0)
}

/// Assemble as many robots as the inventory allows.
///
/// For each robot the counter is incremented first and the new value is
/// embedded in the id, so a counter starting at 0 yields
/// `<serial_prefix>_1` for the first robot. Consumed parts are removed
/// most-recently-added-first; the first part removed per type fills the
/// robot's named slot and any extras required by the count are consumed
/// as spares. When nothing can be built the inventory is left untouched
/// and an empty list is returned.
///
/// # Errors
///
/// Returns [`AssemblyError::UnfillableSlot`] for contradictory
/// requirements, [`AssemblyError::CounterOverflow`] if the serial counter
/// would wrap, and [`AssemblyError::MissingPart`] if the inventory
/// contradicts the buildable count (unreachable through [`Inventory`]'s
/// public interface).
pub fn assemble(
    serial_prefix: &str,
    counter: &mut u64,
    inventory: &mut Inventory,
    requirements: &PartRequirements,
) -> Result<Vec<Robot>, AssemblyError> {
    let buildable = buildable_count(inventory, requirements);
    if buildable == 0 {
        return Ok(Vec::new());
    }

    // A buildable robot still needs one part per named slot.
    for detail_type in DetailType::ALL {
        if requirements.per_robot(detail_type) == 0 {
            return Err(AssemblyError::UnfillableSlot { slot: detail_type });
        }
    }

    let mut robots = Vec::with_capacity(buildable);
    for _ in 0..buildable {
        *counter = counter.checked_add(1).ok_or(AssemblyError::CounterOverflow)?;
        let id = format!("{serial_prefix}_{counter}");

        let head = consume(inventory, DetailType::Head, requirements)?;
        let torso = consume(inventory, DetailType::Torso, requirements)?;
        let hand = consume(inventory, DetailType::Hand, requirements)?;
        let feet = consume(inventory, DetailType::Feet, requirements)?;

        robots.push(Robot {
            id,
            head,
            torso,
            hand,
            feet,
        });
    }
    Ok(robots)
}

/// Remove the required number of parts of one type, returning the part
/// that fills the robot's slot (the most recently added one).
fn consume(
    inventory: &mut Inventory,
    detail_type: DetailType,
    requirements: &PartRequirements,
) -> Result<Detail, AssemblyError> {
    let required = requirements.per_robot(detail_type);
    let slot = inventory
        .take_latest(detail_type)
        .ok_or(AssemblyError::MissingPart { detail_type })?;
    for _ in 1..required {
        inventory
            .take_latest(detail_type)
            .ok_or(AssemblyError::MissingPart { detail_type })?;
    }
    Ok(slot)
}
