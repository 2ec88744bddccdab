//! Generic reconciling entity manager.
//!
//! One [`EntityManager`] owns the entities of a single kind. What differs
//! between kinds (request bodies, rollover, tier migration) lives in a
//! [`KindStrategy`]; naming, verification, reconciliation and teardown are
//! shared.
//!
//! Teardown never returns an error. Every outcome lands in a
//! [`TeardownReport`] and failures are logged.

use std::future::Future;
use std::sync::Arc;

use tierbed_core::backend::Backend;
use tierbed_core::identity::{EntityId, EntityIdentity, ManagedList};
use tierbed_core::metrics as m;
use tierbed_core::types::EntityKind;
use tracing::{Instrument, Span, debug, info, info_span, warn};

use crate::error::FixtureError;
use crate::naming::Namer;

/// Kind-specific behaviour plugged into an [`EntityManager`].
pub trait KindStrategy<B: Backend>: Send + Sync {
    fn kind(&self) -> EntityKind;

    /// Number of entities `setup()` creates.
    fn build_count(&self) -> usize;

    /// Lifecycle policy governing created entities, if any.
    fn policy(&self) -> Option<&str> {
        None
    }

    /// Creates the entity at `position` of the build list under `name`.
    fn create(
        &mut self,
        backend: &B,
        name: &str,
        position: usize,
    ) -> impl Future<Output = Result<(), FixtureError>> + Send;

    /// Runs once after every entity was created and verified.
    fn finalize(
        &mut self,
        _backend: &B,
        _list: &mut ManagedList,
        _created: &[EntityId],
    ) -> impl Future<Output = Result<(), FixtureError>> + Send {
        async { Ok(()) }
    }

    /// Entities owned through this kind but deleted along with it.
    fn dependents(&self) -> Vec<(EntityKind, String)> {
        Vec::new()
    }

    /// Called after `name` was deleted.
    fn released(&mut self, _name: &str) {}

    /// Extra scan patterns for entities this kind owns outside its namer.
    fn scan_patterns(&self) -> Vec<String> {
        Vec::new()
    }

    /// Whether a name found by [`scan_patterns`](Self::scan_patterns)
    /// belongs to this run.
    fn owns(&self, _name: &str) -> bool {
        false
    }
}

/// Outcome of one [`EntityManager::reconcile`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciled {
    /// Names found on the backend and added to tracking.
    pub adopted: Vec<String>,
    /// Tracked names the backend no longer has.
    pub dropped: Vec<String>,
}

/// Per-manager teardown outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeardownReport {
    pub kind: EntityKind,
    pub deleted: Vec<String>,
    /// `(name, reason)` for every entity that could not be deleted.
    pub failed: Vec<(String, String)>,
    pub adopted: usize,
    pub dropped: usize,
    /// Setup never completed, nothing was deleted.
    pub setup_incomplete: bool,
}

impl TeardownReport {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            deleted: Vec::new(),
            failed: Vec::new(),
            adopted: 0,
            dropped: 0,
            setup_incomplete: false,
        }
    }

    pub fn is_clean(&self) -> bool {
        !self.setup_incomplete && self.failed.is_empty()
    }
}

/// Creates, tracks, reconciles and deletes the entities of one kind.
#[derive(Debug)]
pub struct EntityManager<B, S> {
    backend: Arc<B>,
    namer: Namer,
    entities: ManagedList,
    strategy: S,
    setup_done: bool,
    span: Span,
}

impl<B: Backend, S: KindStrategy<B>> EntityManager<B, S> {
    pub fn new(backend: Arc<B>, prefix: &str, uniq: &str, strategy: S) -> Self {
        let kind = strategy.kind();
        let namer = Namer::new(prefix, kind, uniq);
        let span = info_span!("entity_manager", kind = kind.as_str(), base = namer.base());
        Self {
            backend,
            namer,
            entities: ManagedList::new(),
            strategy,
            setup_done: false,
            span,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.strategy.kind()
    }

    pub fn namer(&self) -> &Namer {
        &self.namer
    }

    pub fn pattern(&self) -> String {
        self.namer.pattern()
    }

    pub fn entities(&self) -> &ManagedList {
        &self.entities
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn is_setup(&self) -> bool {
        self.setup_done
    }

    /// Issues the next name of this namespace without creating anything.
    pub fn next_name(&mut self) -> String {
        self.namer.next_name()
    }

    /// Tracked names plus the strategy's dependents.
    pub fn tracked(&self) -> Vec<(EntityKind, String)> {
        let kind = self.kind();
        let mut tracked: Vec<_> = self
            .entities
            .names()
            .into_iter()
            .map(|name| (kind, name))
            .collect();
        tracked.extend(self.strategy.dependents());
        tracked
    }

    /// Creates the build list, verifying each entity before tracking it.
    ///
    /// # Errors
    ///
    /// `FixtureError::Unverified` as soon as one created entity cannot be
    /// found; entities verified so far stay tracked.
    pub async fn setup(&mut self) -> Result<(), FixtureError> {
        let kind = self.kind();
        let mut created = Vec::with_capacity(self.strategy.build_count());
        for position in 0..self.strategy.build_count() {
            let name = self.namer.next_name();
            self.strategy
                .create(&self.backend, &name, position)
                .instrument(self.span.clone())
                .await?;
            self.verify(&name).await?;

            let policy = self.strategy.policy().map(str::to_owned);
            created.push(self.entities.push(EntityIdentity::new(kind, name.as_str(), policy)));
            metrics::counter!(m::ENTITIES_CREATED_TOTAL, m::LABEL_KIND => kind.as_str())
                .increment(1);
            info!(parent: &self.span, name = name.as_str(), position, "created");
        }

        self.strategy
            .finalize(&self.backend, &mut self.entities, &created)
            .instrument(self.span.clone())
            .await?;
        self.setup_done = true;
        Ok(())
    }

    /// Starts tracking an entity created elsewhere.
    ///
    /// Already tracked names return their existing id.
    pub async fn track(&mut self, name: &str) -> Result<EntityId, FixtureError> {
        if let Some(id) = self.entities.find(name) {
            return Ok(id);
        }
        self.verify(name).await?;
        let id = self
            .entities
            .push(EntityIdentity::new(self.kind(), name, None));
        debug!(parent: &self.span, name, "tracking");
        Ok(id)
    }

    /// Brings tracking in line with the backend.
    ///
    /// Scan patterns are wildcards and may match sibling runs, so only names
    /// the namer or the strategy owns count as live. Live names tracking
    /// lacks are adopted. Tracked names the scan misses are checked directly
    /// and dropped only when really gone.
    pub async fn reconcile(&mut self) -> Result<Reconciled, FixtureError> {
        let kind = self.kind();
        let mut patterns = vec![self.namer.pattern()];
        patterns.extend(self.strategy.scan_patterns());

        let mut live: Vec<String> = Vec::new();
        for pattern in &patterns {
            let found = self
                .backend
                .scan(kind, pattern)
                .instrument(self.span.clone())
                .await?;
            for name in found {
                if live.contains(&name) {
                    continue;
                }
                if self.namer.owns(&name) || self.strategy.owns(&name) {
                    live.push(name);
                } else {
                    debug!(parent: &self.span, name = name.as_str(), "ignoring foreign match");
                }
            }
        }

        let mut outcome = Reconciled::default();
        for name in &live {
            if self.entities.find(name).is_none() {
                self.entities.push(EntityIdentity::new(kind, name.as_str(), None));
                metrics::counter!(m::ENTITIES_ADOPTED_TOTAL, m::LABEL_KIND => kind.as_str())
                    .increment(1);
                info!(parent: &self.span, name = name.as_str(), "adopted untracked entity");
                outcome.adopted.push(name.clone());
            }
        }

        for id in self.entities.ids() {
            let Some(name) = self.entities.get(id).map(|e| e.current_name().to_owned()) else {
                continue;
            };
            if live.contains(&name) {
                continue;
            }
            let present = self
                .backend
                .exists(kind, &name)
                .instrument(self.span.clone())
                .await?;
            if !present {
                self.entities.remove(id);
                metrics::counter!(m::ENTITIES_DROPPED_TOTAL, m::LABEL_KIND => kind.as_str())
                    .increment(1);
                info!(parent: &self.span, name = name.as_str(), "dropped vanished entity");
                outcome.dropped.push(name);
            }
        }
        Ok(outcome)
    }

    /// Deletes everything tracked and reports per-entity outcomes.
    pub async fn teardown_report(&mut self) -> TeardownReport {
        let kind = self.kind();
        let mut report = TeardownReport::new(kind);
        if !self.setup_done {
            warn!(
                parent: &self.span,
                pattern = self.namer.pattern().as_str(),
                "setup did not complete; delete entities matching the pattern manually"
            );
            report.setup_incomplete = true;
            return report;
        }

        match self.reconcile().await {
            Ok(reconciled) => {
                report.adopted = reconciled.adopted.len();
                report.dropped = reconciled.dropped.len();
            }
            Err(err) => {
                warn!(parent: &self.span, error = %err, "reconcile failed, deleting tracked entities as-is");
            }
        }

        for id in self.entities.ids().into_iter().rev() {
            let Some(name) = self.entities.get(id).map(|e| e.current_name().to_owned()) else {
                continue;
            };
            match self.delete_one(&name).await {
                Ok(()) => {
                    self.entities.remove(id);
                    self.strategy.released(&name);
                    metrics::counter!(m::ENTITIES_DELETED_TOTAL, m::LABEL_KIND => kind.as_str())
                        .increment(1);
                    debug!(parent: &self.span, name = name.as_str(), "deleted");
                    report.deleted.push(name);
                }
                Err(err) => {
                    metrics::counter!(m::DELETIONS_FAILED_TOTAL, m::LABEL_KIND => kind.as_str())
                        .increment(1);
                    warn!(parent: &self.span, name = name.as_str(), error = %err, "delete failed");
                    report.failed.push((name, err.to_string()));
                }
            }
        }
        report
    }

    /// Deletes everything tracked. Returns `false` if anything was left behind.
    pub async fn teardown(&mut self) -> bool {
        self.teardown_report().await.is_clean()
    }

    async fn verify(&self, name: &str) -> Result<(), FixtureError> {
        let kind = self.kind();
        let present = self
            .backend
            .exists(kind, name)
            .instrument(self.span.clone())
            .await?;
        if present {
            Ok(())
        } else {
            Err(FixtureError::Unverified {
                kind,
                name: name.to_owned(),
            })
        }
    }

    async fn delete_one(&self, name: &str) -> Result<(), FixtureError> {
        let kind = self.kind();
        let referrers = self
            .backend
            .referrers(kind, name)
            .instrument(self.span.clone())
            .await?;
        if !referrers.is_empty() {
            return Err(FixtureError::Referenced {
                kind,
                name: name.to_owned(),
                referrers,
            });
        }
        match self.backend.delete(kind, name).instrument(self.span.clone()).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(FixtureError::NotDeleted {
                kind,
                name: name.to_owned(),
            }),
            Err(err) if err.is_not_found() => {
                debug!(parent: &self.span, name, "already gone");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}
