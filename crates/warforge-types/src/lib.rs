//! Shared type definitions for the Warforge simulation.
//!
//! This crate is the single source of truth for the value types that flow
//! between the parts factory, the factions, and the assembly line.
//!
//! # Modules
//!
//! - [`detail`] -- The closed set of part types and the [`Detail`] value.
//! - [`inventory`] -- Per-faction typed part storage with LIFO removal.
//! - [`phase`] -- The day/night simulation phase.
//! - [`robot`] -- The assembled [`Robot`] composite.
//!
//! [`Detail`]: detail::Detail
//! [`Robot`]: robot::Robot

pub mod detail;
pub mod inventory;
pub mod phase;
pub mod robot;

// Re-export all public types at crate root for convenience.
pub use detail::{Detail, DetailType};
pub use inventory::Inventory;
pub use phase::Phase;
pub use robot::Robot;
