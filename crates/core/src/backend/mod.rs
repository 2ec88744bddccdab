//! Tiered-storage backend abstraction.
//!
//! The [`Backend`] trait is the only way the engine talks to the storage
//! service. Production code wires in a real client; tests and the
//! `simulate` command use [`MemoryBackend`](memory::MemoryBackend).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐
//! │ PhaseTracker │   │ EntityManager│
//! └──────┬───────┘   └──────┬───────┘
//!        │                  │
//!        ▼                  ▼
//!      ┌──────────────────────┐
//!      │   Backend (trait)    │
//!      └──────────────────────┘
//!           │            │
//!           ▼            ▼
//!      ┌────────┐   ┌─────────┐
//!      │ client │   │ Memory  │
//!      └────────┘   └─────────┘
//! ```
//!
//! # Consistency
//!
//! The backend is eventually consistent. A name that existed on one call may be
//! gone on the next because a lifecycle step remounted it elsewhere; callers
//! treat [`BackendError::NotFound`] as a normal outcome where that can happen.

pub mod memory;

use std::future::Future;

use crate::error::BackendError;
use crate::types::{
    CreateOptions, EntityKind, Phase, PhaseSnapshot, Resolved, StepKey, strip_mount_prefix,
};

/// Name prefix of data stream backing indices.
pub const BACKING_PREFIX: &str = ".ds-";

/// Index setting naming the lifecycle policy that governs an index.
pub const POLICY_SETTING: &str = "index.lifecycle.name";

/// Index setting naming the alias a policy rolls over.
pub const ROLLOVER_ALIAS_SETTING: &str = "index.lifecycle.rollover_alias";

/// Trait abstracting the tiered-storage service.
///
/// Every method is async and `Send`; the engine awaits them strictly in
/// sequence and never holds a call open across another.
pub trait Backend: Send + Sync + 'static {
    /// Creates an entity of the given kind.
    ///
    /// `opts.body` carries the kind-specific request body (policy phases,
    /// template patterns, component settings).
    fn create(
        &self,
        kind: EntityKind,
        name: &str,
        opts: &CreateOptions,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Deletes an entity.
    ///
    /// Returns `Ok(false)` when the service did not acknowledge the deletion.
    ///
    /// # Errors
    ///
    /// - `BackendError::NotFound`: the entity is already gone
    /// - `BackendError::Rejected`: the service refused (for example, still referenced)
    fn delete(
        &self,
        kind: EntityKind,
        name: &str,
    ) -> impl Future<Output = Result<bool, BackendError>> + Send;

    /// Checks whether an entity exists under exactly this name.
    fn exists(
        &self,
        kind: EntityKind,
        name: &str,
    ) -> impl Future<Output = Result<bool, BackendError>> + Send;

    /// Lists entity names of the given kind matching a `*` wildcard pattern.
    fn scan(
        &self,
        kind: EntityKind,
        pattern: &str,
    ) -> impl Future<Output = Result<Vec<String>, BackendError>> + Send;

    /// Lists entities that still depend on the named one.
    ///
    /// An entity may only be deleted once this is empty.
    fn referrers(
        &self,
        kind: EntityKind,
        name: &str,
    ) -> impl Future<Output = Result<Vec<String>, BackendError>> + Send;

    /// Resolves a name to physical indices, aliases and data streams.
    fn resolve(&self, name: &str) -> impl Future<Output = Result<Resolved, BackendError>> + Send;

    /// Reads the lifecycle state of a physical index.
    ///
    /// # Errors
    ///
    /// `BackendError::NotFound` when the index no longer exists under `name`.
    fn get_phase_state(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<PhaseSnapshot, BackendError>> + Send;

    /// Requests a lifecycle move from `current` to `next`.
    ///
    /// # Errors
    ///
    /// `BackendError::Rejected` when `current` does not match the live state.
    fn move_phase(
        &self,
        name: &str,
        current: &StepKey,
        next: &StepKey,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Returns the phases a policy defines, sorted by rank.
    fn get_policy_phase_list(
        &self,
        policy: &str,
    ) -> impl Future<Output = Result<Vec<Phase>, BackendError>> + Send;

    /// Snapshots `source` into `repository` and mounts it at `tier`.
    ///
    /// The mounted copy replaces the source under
    /// [`mounted_name`](crate::types::mounted_name).
    fn snapshot_and_mount(
        &self,
        repository: &str,
        snapshot: &str,
        source: &str,
        tier: Phase,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Returns the snapshot backing a mounted index, if any.
    fn backing_snapshot(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<String>, BackendError>> + Send;

    /// Returns the current write target of an alias or data stream.
    fn get_write_target(
        &self,
        group: &str,
    ) -> impl Future<Output = Result<Option<String>, BackendError>> + Send;

    /// Rolls a group over to a new write target and returns its name.
    ///
    /// `new_name` is honoured for aliases; data streams name their own
    /// backing indices.
    fn rollover(
        &self,
        group: &str,
        new_name: Option<&str>,
        opts: &CreateOptions,
    ) -> impl Future<Output = Result<String, BackendError>> + Send;
}

/// Matches `name` against a pattern where `*` stands for any run of characters.
pub fn wildcard_match(pattern: &str, name: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    let (first, rest) = match parts.split_first() {
        Some(split) => split,
        None => return name.is_empty(),
    };
    let Some(mut remaining) = name.strip_prefix(first) else {
        return false;
    };
    let Some((last, middle)) = rest.split_last() else {
        return remaining.is_empty();
    };
    for part in middle {
        match remaining.find(part) {
            Some(pos) => remaining = &remaining[pos + part.len()..],
            None => return false,
        }
    }
    remaining.len() >= last.len() && remaining.ends_with(last)
}

/// Name of the snapshot a lifecycle policy takes of `source` before mounting it.
pub fn policy_snapshot_name(source: &str, policy: &str) -> String {
    format!("{}-{policy}-snapshot", strip_mount_prefix(source))
}

/// Source index of a snapshot named by [`policy_snapshot_name`] under `policy`.
pub fn policy_snapshot_source<'a>(snapshot: &'a str, policy: &str) -> Option<&'a str> {
    snapshot
        .strip_suffix("-snapshot")?
        .strip_suffix(policy)?
        .strip_suffix('-')
        .filter(|source| !source.is_empty())
}

/// Name of generation `generation` of a data stream's backing indices.
pub fn backing_index_name(stream: &str, generation: u32) -> String {
    format!("{BACKING_PREFIX}{stream}-{generation:06}")
}

/// Data stream a backing index belongs to.
pub fn backing_stream(index: &str) -> Option<&str> {
    let (stream, generation) = strip_mount_prefix(index)
        .strip_prefix(BACKING_PREFIX)?
        .rsplit_once('-')?;
    let numeric = !generation.is_empty() && generation.bytes().all(|b| b.is_ascii_digit());
    (numeric && !stream.is_empty()).then_some(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_exact_without_star() {
        assert!(wildcard_match("abc", "abc"));
        assert!(!wildcard_match("abc", "abcd"));
    }

    #[test]
    fn wildcard_leading_and_trailing() {
        let pattern = "*tb-idx-u1*";
        assert!(wildcard_match(pattern, "tb-idx-u1-000001"));
        assert!(wildcard_match(pattern, "partial-tb-idx-u1-000001"));
        assert!(!wildcard_match(pattern, "tb-idx-u2-000001"));
    }

    #[test]
    fn wildcard_middle_segments_in_order() {
        assert!(wildcard_match("a*b*c", "axxbyyc"));
        assert!(!wildcard_match("a*c*b", "axxbyyc"));
        assert!(wildcard_match("*", ""));
    }

    #[test]
    fn wildcard_suffix_does_not_overlap_prefix() {
        assert!(!wildcard_match("ab*ba", "aba"));
        assert!(wildcard_match("ab*ba", "abba"));
    }

    #[test]
    fn policy_snapshot_name_round_trips_through_source() {
        let name = policy_snapshot_name("partial-tb-idx-u1-000001", "tb-ilm-u1-000001");
        assert_eq!(name, "tb-idx-u1-000001-tb-ilm-u1-000001-snapshot");
        assert_eq!(
            policy_snapshot_source(&name, "tb-ilm-u1-000001"),
            Some("tb-idx-u1-000001")
        );
        assert_eq!(policy_snapshot_source(&name, "tb-ilm-u2-000001"), None);
        assert_eq!(policy_snapshot_source("tb-snp-u1-000001", "tb-ilm-u1-000001"), None);
    }

    #[test]
    fn backing_stream_parses_generation_suffix() {
        let backing = backing_index_name("tb-ds-u1-000001", 2);
        assert_eq!(backing, ".ds-tb-ds-u1-000001-000002");
        assert_eq!(backing_stream(&backing), Some("tb-ds-u1-000001"));
        assert_eq!(backing_stream("partial-.ds-tb-ds-u1-000001-000002"), Some("tb-ds-u1-000001"));
        assert_eq!(backing_stream("tb-idx-u1-000001"), None);
        assert_eq!(backing_stream(".ds-stream-gen"), None);
    }
}
