#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`LifecycleError`)
//! - [`wait`]: Bounded polling (`Waiter`, `PollBudget`)
//! - [`tracker`]: Phase observation and moves (`PhaseTracker`)
//! - [`migrator`]: Tier migration (`TierMigrator`, `SnapshotLedger`)
//!
//! # Flow
//!
//! ```text
//! TierMigrator.migrate(tier)
//!      +-- hot | warm ----> PhaseTracker.advance() in place
//!      |
//! TierMigrator.mount_ss()
//!      |
//!      +-- write target? --> WriteTarget
//!      +-- no policy ------> manual_ss() --> snapshot_and_mount
//!      |
//!      PhaseTracker.advance(cold | frozen)
//!      |
//!      wait for mounted name --> ManagedList.remount() --> SnapshotLedger.record()
//! ```

pub mod error;
pub mod migrator;
pub mod tracker;
pub mod wait;

// --- Public API Re-exports ---

pub use error::LifecycleError;
pub use migrator::{MountOutcome, SnapshotLedger, TierMigrator, next_target};
pub use tracker::{PhaseTracker, next_phase, resolve};
pub use wait::{PollBudget, Waiter};
