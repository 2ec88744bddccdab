#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`FixtureError`)
//! - [`naming`]: Deterministic entity names (`Namer`)
//! - [`body`]: Request bodies for policies, components and templates
//! - [`manager`]: Generic reconciling tracker (`EntityManager`, `KindStrategy`)
//! - [`strategy`]: One strategy per entity kind
//! - [`fixture`]: dyn-compatible registry (`Fixture`, `FixtureRegistry`, `SnapshotHandle`)
//! - [`orchestrator`]: Plan-driven wiring (`Orchestrator`)
//!
//! # Order
//!
//! ```text
//! setup:    policy -> component -> template -> snapshot -> index | data_stream
//! teardown: index | data_stream -> snapshot -> template -> component -> policy
//! ```

pub mod body;
pub mod error;
pub mod fixture;
pub mod manager;
pub mod naming;
pub mod orchestrator;
pub mod strategy;

// --- Public API Re-exports ---

pub use error::FixtureError;
pub use fixture::{DynFixture, Fixture, FixtureRegistry, SnapshotHandle};
pub use manager::{EntityManager, KindStrategy, Reconciled, TeardownReport};
pub use naming::Namer;
pub use orchestrator::Orchestrator;
