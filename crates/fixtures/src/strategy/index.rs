//! Indices, optionally grouped behind a rollover alias.
//!
//! With a policy, the first index bootstraps the write alias and every later
//! position rolls it over, so the last index created is the write target.
//! Without one, indices are plain and tier moves go through manual snapshots.

use tierbed_core::backend::Backend;
use tierbed_core::config::EntitySpec;
use tierbed_core::identity::{EntityId, ManagedList};
use tierbed_core::types::{CreateOptions, EntityKind};
use tierbed_lifecycle::{MountOutcome, TierMigrator};
use tracing::info;

use crate::error::FixtureError;
use crate::fixture::SnapshotHandle;
use crate::manager::KindStrategy;

pub struct IndexStrategy<B: Backend> {
    entities: Vec<EntitySpec>,
    policy: Option<String>,
    group: Option<String>,
    migrator: TierMigrator<B, SnapshotHandle<B>>,
}

impl<B: Backend> IndexStrategy<B> {
    /// `group` is the rollover alias; it only applies when `policy` is set.
    pub fn new(
        entities: Vec<EntitySpec>,
        policy: Option<String>,
        group: Option<String>,
        migrator: TierMigrator<B, SnapshotHandle<B>>,
    ) -> Self {
        let group = policy.as_ref().and(group);
        Self {
            entities,
            policy,
            group,
            migrator,
        }
    }

    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    fn spec(&self, position: usize) -> EntitySpec {
        self.entities.get(position).copied().unwrap_or_default()
    }
}

impl<B: Backend> KindStrategy<B> for IndexStrategy<B> {
    fn kind(&self) -> EntityKind {
        EntityKind::Index
    }

    fn build_count(&self) -> usize {
        self.entities.len()
    }

    fn policy(&self) -> Option<&str> {
        self.policy.as_deref()
    }

    async fn create(&mut self, backend: &B, name: &str, position: usize) -> Result<(), FixtureError> {
        let opts = CreateOptions::default().docs(self.spec(position).doc_fill());
        match self.group.as_deref() {
            Some(group) if position > 0 => {
                backend.rollover(group, Some(name), &opts).await?;
            }
            group => {
                let opts = opts.alias(group.map(str::to_owned));
                backend.create(EntityKind::Index, name, &opts).await?;
            }
        }
        Ok(())
    }

    async fn finalize(
        &mut self,
        _backend: &B,
        list: &mut ManagedList,
        created: &[EntityId],
    ) -> Result<(), FixtureError> {
        for (position, &id) in created.iter().enumerate() {
            let tier = self.spec(position).target_tier;
            let outcome = self
                .migrator
                .migrate(list, id, tier, self.group.as_deref())
                .await?;
            if let MountOutcome::Mounted { name } = &outcome {
                info!(name = name.as_str(), tier = %tier, "index now lives under a mounted name");
            }
        }
        Ok(())
    }
}
