//! Plan-driven wiring of every manager.
//!
//! [`Orchestrator::build`] turns a validated [`Plan`] into a
//! [`FixtureRegistry`] with one manager per kind, in dependency order.
//! Names that one manager needs from another (the policy name for the settings
//! component, component names for the template) are computed up front with
//! [`Namer::peek`], since naming is deterministic.

use std::sync::Arc;

use tierbed_core::backend::Backend;
use tierbed_core::config::{Plan, PlanKind};
use tierbed_core::types::EntityKind;
use tierbed_lifecycle::{TierMigrator, Waiter};
use tracing::{Instrument, Span, info, info_span, warn};

use crate::error::FixtureError;
use crate::fixture::{FixtureRegistry, SnapshotHandle};
use crate::manager::{EntityManager, TeardownReport};
use crate::naming::Namer;
use crate::strategy::{
    ComponentStrategy, DataStreamStrategy, IndexStrategy, PolicyStrategy, SnapshotStrategy,
    TemplateStrategy,
};

/// Owns the managers of one fixture run.
pub struct Orchestrator {
    registry: FixtureRegistry,
    uniq: String,
    patterns: Vec<(EntityKind, String)>,
    span: Span,
}

impl Orchestrator {
    /// Validates `plan` and builds every manager. Nothing touches the backend yet.
    ///
    /// # Errors
    ///
    /// `FixtureError::Config` for a contradictory plan.
    pub fn build<B: Backend>(
        backend: Arc<B>,
        plan: &Plan,
        waiter: Waiter,
    ) -> Result<Self, FixtureError> {
        plan.validate()?;
        let mut plan = plan.clone();
        let uniq = plan.resolve_uniq().to_owned();
        let prefix = plan.prefix.as_str();
        let repository = plan.policy.repository().map(str::to_owned);
        let span = info_span!("orchestrator", prefix, uniq = uniq.as_str());

        let policies = EntityManager::new(
            backend.clone(),
            prefix,
            &uniq,
            PolicyStrategy::new(&plan.policy),
        );
        let policy = plan.policy.enabled.then(|| policies.namer().peek(1));

        let primary = Namer::new(prefix, plan.kind.entity_kind(), &uniq);
        let rollover_alias = match plan.kind {
            PlanKind::Index => policy.as_ref().map(|_| primary.base().to_owned()),
            PlanKind::DataStream => None,
        };

        let components = EntityManager::new(
            backend.clone(),
            prefix,
            &uniq,
            ComponentStrategy::new(policy.clone(), rollover_alias.clone()),
        );
        let component_names = (1..=ComponentStrategy::COUNT as u32)
            .map(|n| components.namer().peek(n))
            .collect();

        // Exact planned names, never a wildcard.
        let data_stream = plan.kind == PlanKind::DataStream;
        let template_targets = match plan.kind {
            PlanKind::Index => (1..=plan.entities.len() as u32).map(|n| primary.peek(n)).collect(),
            PlanKind::DataStream => vec![primary.peek(1)],
        };
        let templates = EntityManager::new(
            backend.clone(),
            prefix,
            &uniq,
            TemplateStrategy::new(template_targets, component_names, data_stream),
        );

        let mut snapshot_strategy = SnapshotStrategy::new(repository.clone());
        if let Some(policy) = policy.as_deref() {
            snapshot_strategy =
                snapshot_strategy.with_policy_snapshots(policy, primary.clone(), data_stream);
        }
        let snapshots = SnapshotHandle::new(EntityManager::new(
            backend.clone(),
            prefix,
            &uniq,
            snapshot_strategy,
        ));
        let migrator = TierMigrator::new(backend.clone(), snapshots.clone(), waiter, repository);

        let mut patterns = vec![
            (EntityKind::Policy, policies.pattern()),
            (EntityKind::Component, components.pattern()),
            (EntityKind::Template, templates.pattern()),
            (
                EntityKind::Snapshot,
                Namer::new(prefix, EntityKind::Snapshot, &uniq).pattern(),
            ),
        ];

        let mut registry = FixtureRegistry::new();
        registry.register(Box::new(policies));
        registry.register(Box::new(components));
        registry.register(Box::new(templates));
        registry.register(Box::new(snapshots));
        match plan.kind {
            PlanKind::Index => {
                let manager = EntityManager::new(
                    backend,
                    prefix,
                    &uniq,
                    IndexStrategy::new(plan.entities.clone(), policy, rollover_alias, migrator),
                );
                patterns.push((EntityKind::Index, manager.pattern()));
                registry.register(Box::new(manager));
            }
            PlanKind::DataStream => {
                let manager = EntityManager::new(
                    backend,
                    prefix,
                    &uniq,
                    DataStreamStrategy::new(plan.entities.clone(), policy, migrator),
                );
                patterns.push((EntityKind::DataStream, manager.pattern()));
                registry.register(Box::new(manager));
            }
        }

        info!(parent: &span, fixtures = registry.len(), "fixture plan ready");
        Ok(Self {
            registry,
            uniq,
            patterns,
            span,
        })
    }

    /// Unique token shared by every name of this run.
    pub fn uniq(&self) -> &str {
        &self.uniq
    }

    /// Scan pattern of every managed kind, in setup order.
    pub fn patterns(&self) -> &[(EntityKind, String)] {
        &self.patterns
    }

    /// Creates every fixture in dependency order, stopping at the first failure.
    ///
    /// After a failure, call [`teardown`](Self::teardown) to clean up what was
    /// already created.
    pub async fn setup(&mut self) -> Result<(), FixtureError> {
        let span = self.span.clone();
        self.registry.setup_all().instrument(span).await
    }

    /// Tears every manager down in reverse order and returns their reports.
    pub async fn teardown_reports(&mut self) -> Vec<TeardownReport> {
        let span = self.span.clone();
        self.registry.teardown_all().instrument(span).await
    }

    /// Tears everything down. Returns `false` and warns if anything leaked.
    pub async fn teardown(&mut self) -> bool {
        let reports = self.teardown_reports().await;
        let leaked: Vec<&TeardownReport> = reports.iter().filter(|r| !r.is_clean()).collect();
        if leaked.is_empty() {
            info!(parent: &self.span, "all fixtures removed");
            return true;
        }
        for report in &leaked {
            let pattern = self
                .patterns
                .iter()
                .find(|(kind, _)| *kind == report.kind)
                .map_or("", |(_, p)| p.as_str());
            warn!(
                parent: &self.span,
                kind = report.kind.as_str(),
                pattern,
                failed = report.failed.len(),
                setup_incomplete = report.setup_incomplete,
                "fixtures leaked; manual cleanup needed"
            );
        }
        false
    }

    /// Tracked names per kind, in setup order.
    pub async fn tracked(&self) -> Vec<(EntityKind, String)> {
        self.registry.tracked_all().await
    }
}
