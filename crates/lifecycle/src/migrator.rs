//! Tier migration with identity replacement.
//!
//! Moving an index into cold or frozen storage mounts it from a snapshot, and
//! the backend then exposes it under a new name ([`mounted_name`]). The
//! [`TierMigrator`] drives that move and swaps the identity in the owning
//! [`ManagedList`] only after the mounted copy is verified and settled.
//!
//! The write target of a rollover group is never migrated.

use std::future::Future;
use std::sync::Arc;

use tierbed_core::backend::Backend;
use tierbed_core::identity::{EntityId, EntityIdentity, ManagedList};
use tierbed_core::metrics as m;
use tierbed_core::types::{EntityKind, Phase, mounted_name};
use tracing::{Instrument, Span, debug, info, info_span, warn};

use crate::error::LifecycleError;
use crate::tracker::PhaseTracker;
use crate::wait::Waiter;

/// Snapshot bookkeeping shared between migrations and teardown.
///
/// Every snapshot a migration creates or discovers is routed through the
/// ledger so it is cleaned up after the indices that mount it.
pub trait SnapshotLedger: Send + Sync {
    /// Next unused snapshot name in the ledger's namespace.
    fn next_snapshot_name(&self) -> impl Future<Output = String> + Send;

    /// Verifies that `snapshot` exists and starts tracking it.
    fn record(&self, snapshot: &str) -> impl Future<Output = Result<(), LifecycleError>> + Send;
}

/// Result of a [`TierMigrator::mount_ss`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountOutcome {
    /// The entity is the group's write target and was left in place.
    WriteTarget,
    /// Nothing needed to move.
    Unchanged,
    /// The entity now lives under `name`.
    Mounted { name: String },
}

/// Picks the storage tier to move towards from `current`.
///
/// With neither cold nor frozen in the policy this is `current`. With both,
/// cold comes first and frozen after it. The result never ranks below
/// `current`.
pub fn next_target(phase_list: &[Phase], current: Phase) -> Phase {
    let cold = phase_list.contains(&Phase::Cold);
    let frozen = phase_list.contains(&Phase::Frozen);
    let target = match (cold, frozen) {
        (false, false) => current,
        (true, true) if current < Phase::Cold => Phase::Cold,
        (true, true) | (false, true) => Phase::Frozen,
        (true, false) => Phase::Cold,
    };
    target.max(current)
}

/// Drives cold/frozen migrations for entities of one [`ManagedList`].
#[derive(Debug)]
pub struct TierMigrator<B, L> {
    backend: Arc<B>,
    ledger: L,
    waiter: Waiter,
    repository: Option<String>,
    span: Span,
}

impl<B: Backend, L: SnapshotLedger> TierMigrator<B, L> {
    pub fn new(backend: Arc<B>, ledger: L, waiter: Waiter, repository: Option<String>) -> Self {
        let span = info_span!("tier_migrator", repository = repository.as_deref().unwrap_or(""));
        Self {
            backend,
            ledger,
            waiter,
            repository,
            span,
        }
    }

    pub fn repository(&self) -> Option<&str> {
        self.repository.as_deref()
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Moves entity `id` towards `tier` and replaces its identity on remount.
    ///
    /// `group` is the alias or data stream the entity belongs to, if any; its
    /// current write target is never moved.
    pub async fn mount_ss(
        &self,
        list: &mut ManagedList,
        id: EntityId,
        tier: Phase,
        group: Option<&str>,
    ) -> Result<MountOutcome, LifecycleError> {
        let identity = tracked(list, id)?;
        let name = identity.current_name().to_owned();

        if self.is_write_target(&name, group, tier).await? {
            return Ok(MountOutcome::WriteTarget);
        }
        if !tier.is_storage_migration() {
            return Ok(MountOutcome::Unchanged);
        }

        let mut tracker = PhaseTracker::new(self.backend.clone(), &name, self.waiter).await?;
        if tracker.policy().is_none() {
            return self.manual_ss(list, id, tier).await;
        }
        if tracker.phase() == Phase::New {
            tracker.wait_for_managed().await?;
        }

        let original = identity.original_name().to_owned();
        let mut mounted = None;
        loop {
            let current = tracker.phase();
            let target = next_target(tracker.phase_list(), current);
            if target == current || current >= tier {
                break;
            }

            tracker.wait4complete().await?;
            match tracker.advance(target).await {
                Ok(()) => {}
                Err(err) if err.is_identity_changed() => {
                    debug!(parent: &self.span, name = tracker.name(), "source vanished during move");
                }
                Err(err) => return Err(err),
            }

            let new_name = mounted_name(&original, target);
            self.wait_for_index(&new_name).await?;
            let mut fresh = PhaseTracker::new(self.backend.clone(), &new_name, self.waiter).await?;
            fresh.wait4complete().await?;

            list.remount(id, &new_name)
                .ok_or(LifecycleError::Untracked(id))?;
            metrics::counter!(
                m::REMOUNTS_TOTAL,
                m::LABEL_TIER => target.as_str(),
                m::LABEL_MODE => "policy"
            )
            .increment(1);
            info!(
                parent: &self.span,
                from = tracker.name(),
                to = new_name.as_str(),
                tier = %target,
                "remounted"
            );

            let snapshot = self
                .backend
                .backing_snapshot(&new_name)
                .instrument(self.span.clone())
                .await?;
            if let Some(snapshot) = snapshot {
                self.ledger.record(&snapshot).await?;
            }

            mounted = Some(new_name);
            tracker = fresh;
        }

        Ok(mounted.map_or(MountOutcome::Unchanged, |name| MountOutcome::Mounted { name }))
    }

    /// Snapshots and mounts an unmanaged entity directly.
    ///
    /// # Errors
    ///
    /// `LifecycleError::MissingRepository` when no repository is configured.
    pub async fn manual_ss(
        &self,
        list: &mut ManagedList,
        id: EntityId,
        tier: Phase,
    ) -> Result<MountOutcome, LifecycleError> {
        let identity = tracked(list, id)?;
        let source = identity.current_name().to_owned();
        if !tier.is_storage_migration() {
            return Ok(MountOutcome::Unchanged);
        }
        let Some(repository) = self.repository.as_deref() else {
            return Err(LifecycleError::MissingRepository { name: source });
        };
        let target = mounted_name(&source, tier);
        if target == source {
            return Ok(MountOutcome::Unchanged);
        }

        let snapshot = self.ledger.next_snapshot_name().await;
        info!(
            parent: &self.span,
            source = source.as_str(),
            snapshot = snapshot.as_str(),
            tier = %tier,
            "mounting from manual snapshot"
        );
        self.backend
            .snapshot_and_mount(repository, &snapshot, &source, tier)
            .instrument(self.span.clone())
            .await?;
        self.ledger.record(&snapshot).await?;
        self.wait_for_index(&target).await?;

        list.remount(id, &target)
            .ok_or(LifecycleError::Untracked(id))?;
        metrics::counter!(
            m::REMOUNTS_TOTAL,
            m::LABEL_TIER => tier.as_str(),
            m::LABEL_MODE => "manual"
        )
        .increment(1);
        Ok(MountOutcome::Mounted { name: target })
    }

    /// Moves entity `id` to `tier`, whichever kind of tier it is.
    ///
    /// Cold and frozen go through [`mount_ss`](Self::mount_ss). Hot and warm
    /// advance the policy in place and keep the identity; unmanaged entities
    /// stay where they are, with a warning.
    pub async fn migrate(
        &self,
        list: &mut ManagedList,
        id: EntityId,
        tier: Phase,
        group: Option<&str>,
    ) -> Result<MountOutcome, LifecycleError> {
        if tier.is_storage_migration() {
            return self.mount_ss(list, id, tier, group).await;
        }
        let name = tracked(list, id)?.current_name().to_owned();
        if self.is_write_target(&name, group, tier).await? {
            return Ok(MountOutcome::WriteTarget);
        }

        let mut tracker = PhaseTracker::new(self.backend.clone(), &name, self.waiter).await?;
        if tracker.policy().is_none() {
            warn!(
                parent: &self.span,
                name = name.as_str(),
                tier = %tier,
                "no lifecycle policy on entity, tier left unchanged"
            );
            return Ok(MountOutcome::Unchanged);
        }
        if tracker.phase() == Phase::New {
            tracker.wait_for_managed().await?;
        }
        tracker.advance(tier).await?;
        Ok(MountOutcome::Unchanged)
    }

    async fn is_write_target(
        &self,
        name: &str,
        group: Option<&str>,
        tier: Phase,
    ) -> Result<bool, LifecycleError> {
        let Some(group) = group else {
            return Ok(false);
        };
        let write_target = self
            .backend
            .get_write_target(group)
            .instrument(self.span.clone())
            .await?;
        if write_target.as_deref() != Some(name) {
            return Ok(false);
        }
        info!(
            parent: &self.span,
            name,
            group,
            tier = %tier,
            "leaving write target in place"
        );
        metrics::counter!(m::WRITE_TARGET_SKIPS_TOTAL).increment(1);
        Ok(true)
    }

    async fn wait_for_index(&self, name: &str) -> Result<(), LifecycleError> {
        let mut budget = self.waiter.budget("mount", name);
        loop {
            let present = self
                .backend
                .exists(EntityKind::Index, name)
                .instrument(self.span.clone())
                .await?;
            if present {
                return Ok(());
            }
            budget.tick(format!("{name} not mounted yet")).await?;
        }
    }
}

fn tracked(list: &ManagedList, id: EntityId) -> Result<EntityIdentity, LifecycleError> {
    list.get(id).cloned().ok_or(LifecycleError::Untracked(id))
}
