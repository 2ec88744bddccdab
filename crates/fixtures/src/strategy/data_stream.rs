//! A single data stream whose backing indices follow the build list.
//!
//! Position 0 of the build list fills the first backing index; every further
//! position rolls the stream over once. The backing indices are tracked in a
//! list of their own because deleting the stream deletes them too.

use tierbed_core::backend::Backend;
use tierbed_core::config::EntitySpec;
use tierbed_core::error::BackendError;
use tierbed_core::identity::{EntityId, EntityIdentity, ManagedList};
use tierbed_core::types::{CreateOptions, EntityKind};
use tierbed_lifecycle::TierMigrator;
use tracing::debug;

use crate::error::FixtureError;
use crate::fixture::SnapshotHandle;
use crate::manager::KindStrategy;

pub struct DataStreamStrategy<B: Backend> {
    entities: Vec<EntitySpec>,
    policy: Option<String>,
    migrator: TierMigrator<B, SnapshotHandle<B>>,
    backing: ManagedList,
}

impl<B: Backend> DataStreamStrategy<B> {
    pub fn new(
        entities: Vec<EntitySpec>,
        policy: Option<String>,
        migrator: TierMigrator<B, SnapshotHandle<B>>,
    ) -> Self {
        Self {
            entities,
            policy,
            migrator,
            backing: ManagedList::new(),
        }
    }

    /// Backing indices in generation order, under their current names.
    pub fn backing(&self) -> &ManagedList {
        &self.backing
    }

    fn spec(&self, position: usize) -> EntitySpec {
        self.entities.get(position).copied().unwrap_or_default()
    }

    fn push_backing(&mut self, name: &str) -> EntityId {
        self.backing
            .push(EntityIdentity::new(EntityKind::Index, name, self.policy.clone()))
    }
}

impl<B: Backend> KindStrategy<B> for DataStreamStrategy<B> {
    fn kind(&self) -> EntityKind {
        EntityKind::DataStream
    }

    fn build_count(&self) -> usize {
        1
    }

    fn policy(&self) -> Option<&str> {
        self.policy.as_deref()
    }

    async fn create(&mut self, backend: &B, name: &str, _position: usize) -> Result<(), FixtureError> {
        let opts = CreateOptions::default().docs(self.spec(0).doc_fill());
        backend.create(EntityKind::DataStream, name, &opts).await?;
        Ok(())
    }

    async fn finalize(
        &mut self,
        backend: &B,
        list: &mut ManagedList,
        created: &[EntityId],
    ) -> Result<(), FixtureError> {
        let Some(stream) = created
            .first()
            .and_then(|id| list.get(*id))
            .map(|e| e.current_name().to_owned())
        else {
            return Ok(());
        };

        let first = backend
            .get_write_target(&stream)
            .await?
            .ok_or_else(|| BackendError::NotFound {
                kind: EntityKind::Index,
                name: format!("{stream} write index"),
            })?;
        let mut generations = vec![self.push_backing(&first)];
        for position in 1..self.entities.len() {
            let opts = CreateOptions::default().docs(self.spec(position).doc_fill());
            let backing = backend.rollover(&stream, None, &opts).await?;
            debug!(stream = stream.as_str(), backing = backing.as_str(), "rolled over");
            generations.push(self.push_backing(&backing));
        }

        for (position, id) in generations.into_iter().enumerate() {
            let tier = self.spec(position).target_tier;
            self.migrator
                .migrate(&mut self.backing, id, tier, Some(&stream))
                .await?;
        }
        Ok(())
    }

    fn dependents(&self) -> Vec<(EntityKind, String)> {
        self.backing
            .names()
            .into_iter()
            .map(|name| (EntityKind::Index, name))
            .collect()
    }

    fn released(&mut self, _name: &str) {
        self.backing = ManagedList::new();
    }
}
