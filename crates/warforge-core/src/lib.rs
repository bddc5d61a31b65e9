//! Day/night cycle, synchronization protocol, and orchestration for the
//! Warforge simulation.
//!
//! This crate owns the protocol that keeps one parts factory and any
//! number of robot-building factions in lockstep across simulated days:
//! all parties work during the day, the night begins only when every
//! party is ready, and a new day begins only when every party has
//! finished its night work.
//!
//! # Modules
//!
//! - [`clock`] -- Day counter and phase flag with legal-transition checks.
//! - [`rendezvous`] -- Per-day countdown latch pair.
//! - [`coordinator`] -- The [`PhaseCoordinator`] driving the protocol.
//! - [`queue`] -- Bounded parts queue between factory and factions.
//! - [`planner`] -- [`DetailPlanner`] trait and its implementations.
//! - [`factory`] -- The producing party.
//! - [`faction`] -- The consuming parties.
//! - [`assembly`] -- Pure robot assembly over an inventory.
//! - [`config`] -- Configuration loading from `warforge.yaml`.
//! - [`runner`] -- Whole-run orchestration and the final verdict.
//!
//! [`PhaseCoordinator`]: coordinator::PhaseCoordinator
//! [`DetailPlanner`]: planner::DetailPlanner

pub mod assembly;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod faction;
pub mod factory;
pub mod planner;
pub mod queue;
pub mod rendezvous;
pub mod runner;
