//! In-memory tiered-storage simulator.
//!
//! [`MemoryBackend`] implements [`Backend`] without any network I/O. It models
//! just enough of a tiered-storage service to exercise the lifecycle engine:
//!
//! - a tick-driven lifecycle scheduler: every read call advances the clock by
//!   one tick, and pending steps settle after `settle_ticks` ticks
//! - searchable-snapshot remounts that remove the source index and expose the
//!   copy under [`mounted_name`]
//! - aliases and data streams with write targets and rollover
//! - templates matched by pattern, policies resolved through components
//! - repositories, snapshots and reference checks on delete
//! - fault injection (`fail_delete`, `unacked_delete`, `stall`)
//!
//! Every mutating call is appended to a [`Call`] journal for assertions.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::debug;

use super::{
    Backend, POLICY_SETTING, backing_index_name, policy_snapshot_name, wildcard_match,
};
use crate::error::BackendError;
use crate::types::{
    COMPLETE, CreateOptions, EntityKind, Phase, PhaseSnapshot, Resolved, StepKey, mounted_name,
    strip_mount_prefix,
};

const RUNNING: &str = "running";
const DEFAULT_SETTLE_TICKS: u32 = 2;

/// A mutating call recorded by [`MemoryBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create { kind: EntityKind, name: String },
    Delete { kind: EntityKind, name: String },
    MovePhase { name: String, from: Phase, to: Phase },
    SnapshotAndMount { source: String, tier: Phase },
    Rollover { group: String, new_index: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingOp {
    /// The policy picks the index up and enters its first phase.
    Enter,
    /// The running action and step finish.
    Complete,
    /// The index is remounted from its snapshot at this tier.
    Mount(Phase),
}

#[derive(Debug, Clone)]
struct Pending {
    op: PendingOp,
    remaining: u32,
}

#[derive(Debug, Clone)]
struct IndexRecord {
    policy: Option<String>,
    phase: Phase,
    action: String,
    step: String,
    docs: u64,
    snapshot: Option<String>,
    pending: Option<Pending>,
}

impl IndexRecord {
    fn snapshot_state(&self) -> PhaseSnapshot {
        match &self.policy {
            Some(policy) => PhaseSnapshot {
                phase: self.phase,
                action: self.action.clone(),
                step: self.step.clone(),
                policy: Some(policy.clone()),
            },
            None => PhaseSnapshot::unmanaged(),
        }
    }
}

#[derive(Debug, Clone)]
struct TemplateRecord {
    patterns: Vec<String>,
    composed_of: Vec<String>,
    data_stream: bool,
}

#[derive(Debug, Clone)]
struct AliasRecord {
    members: Vec<String>,
    write: Option<String>,
}

#[derive(Debug, Clone)]
struct DataStreamRecord {
    backing: Vec<String>,
    generation: u32,
}

#[derive(Debug, Clone)]
struct SnapshotRecord {
    repository: String,
    indices: Vec<String>,
}

#[derive(Debug, Default)]
struct Faults {
    fail_delete: BTreeSet<String>,
    unacked_delete: BTreeSet<String>,
    stalled: BTreeSet<String>,
}

#[derive(Debug)]
struct SimState {
    settle_ticks: u32,
    repositories: BTreeSet<String>,
    policies: BTreeMap<String, Value>,
    components: BTreeMap<String, Value>,
    templates: BTreeMap<String, TemplateRecord>,
    indices: BTreeMap<String, IndexRecord>,
    aliases: BTreeMap<String, AliasRecord>,
    data_streams: BTreeMap<String, DataStreamRecord>,
    snapshots: BTreeMap<String, SnapshotRecord>,
    faults: Faults,
    journal: Vec<Call>,
}

impl Default for SimState {
    fn default() -> Self {
        Self {
            settle_ticks: DEFAULT_SETTLE_TICKS,
            repositories: BTreeSet::new(),
            policies: BTreeMap::new(),
            components: BTreeMap::new(),
            templates: BTreeMap::new(),
            indices: BTreeMap::new(),
            aliases: BTreeMap::new(),
            data_streams: BTreeMap::new(),
            snapshots: BTreeMap::new(),
            faults: Faults::default(),
            journal: Vec::new(),
        }
    }
}

/// In-memory implementation of [`Backend`].
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<SimState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a snapshot repository.
    pub fn with_repository(self, name: &str) -> Self {
        self.state().repositories.insert(name.to_owned());
        self
    }

    /// Sets how many ticks a pending lifecycle step takes to settle.
    pub fn with_settle_ticks(self, ticks: u32) -> Self {
        self.state().settle_ticks = ticks;
        self
    }

    /// Makes every delete of `name` fail with a request error.
    pub fn fail_delete(&self, name: &str) {
        self.state().faults.fail_delete.insert(name.to_owned());
    }

    /// Makes every delete of `name` return unacknowledged without deleting.
    pub fn unacked_delete(&self, name: &str) {
        self.state().faults.unacked_delete.insert(name.to_owned());
    }

    /// Freezes the lifecycle scheduler for one index.
    pub fn stall(&self, name: &str) {
        self.state().faults.stalled.insert(name.to_owned());
    }

    /// Unfreezes an index stalled with [`stall`](Self::stall).
    pub fn resume(&self, name: &str) {
        self.state().faults.stalled.remove(name);
    }

    /// Mutating calls in the order they were received.
    pub fn journal(&self) -> Vec<Call> {
        self.state().journal.clone()
    }

    /// Number of phase moves requested so far.
    pub fn move_count(&self) -> usize {
        self.state()
            .journal
            .iter()
            .filter(|c| matches!(c, Call::MovePhase { .. }))
            .count()
    }

    /// Names of one kind, without advancing the clock.
    pub fn names(&self, kind: EntityKind) -> Vec<String> {
        let state = self.state();
        match kind {
            EntityKind::Policy => state.policies.keys().cloned().collect(),
            EntityKind::Component => state.components.keys().cloned().collect(),
            EntityKind::Template => state.templates.keys().cloned().collect(),
            EntityKind::Index => state.indices.keys().cloned().collect(),
            EntityKind::DataStream => state.data_streams.keys().cloned().collect(),
            EntityKind::Snapshot => state.snapshots.keys().cloned().collect(),
            EntityKind::Repository => state.repositories.iter().cloned().collect(),
        }
    }

    /// Every entity other than repositories still present.
    pub fn leftovers(&self) -> Vec<(EntityKind, String)> {
        [
            EntityKind::Policy,
            EntityKind::Component,
            EntityKind::Template,
            EntityKind::Index,
            EntityKind::DataStream,
            EntityKind::Snapshot,
        ]
        .into_iter()
        .flat_map(|kind| self.names(kind).into_iter().map(move |n| (kind, n)))
        .collect()
    }

    /// Document count of an index, without advancing the clock.
    pub fn doc_count(&self, index: &str) -> Option<u64> {
        self.state().indices.get(index).map(|r| r.docs)
    }

    /// Lifecycle state of an index, without advancing the clock.
    pub fn peek_phase(&self, index: &str) -> Option<PhaseSnapshot> {
        self.state().indices.get(index).map(IndexRecord::snapshot_state)
    }

    /// Removes an index directly, as an external actor would.
    pub fn drop_index(&self, name: &str) -> bool {
        let mut state = self.state();
        let removed = state.indices.remove(name).is_some();
        state.detach_index(name);
        removed
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SimState {
    /// Advances the lifecycle clock by one tick.
    fn tick(&mut self) {
        let mut due = Vec::new();
        for (name, record) in &mut self.indices {
            if self.faults.stalled.contains(name) {
                continue;
            }
            if let Some(pending) = record.pending.as_mut() {
                pending.remaining = pending.remaining.saturating_sub(1);
                if pending.remaining == 0 {
                    due.push((name.clone(), pending.op));
                }
            }
        }
        for (name, op) in due {
            self.apply(&name, op);
        }
    }

    fn schedule(&self, op: PendingOp) -> Option<Pending> {
        Some(Pending {
            op,
            remaining: self.settle_ticks,
        })
    }

    fn apply(&mut self, name: &str, op: PendingOp) {
        match op {
            PendingOp::Enter => {
                let first = self
                    .indices
                    .get(name)
                    .and_then(|r| r.policy.as_deref())
                    .and_then(|p| self.policies.get(p))
                    .map(policy_phases)
                    .and_then(|phases| phases.into_iter().find(|p| *p != Phase::New))
                    .unwrap_or(Phase::Hot);
                let pending = self.schedule(PendingOp::Complete);
                if let Some(record) = self.indices.get_mut(name) {
                    record.phase = first;
                    record.action = RUNNING.to_owned();
                    record.step = RUNNING.to_owned();
                    record.pending = pending;
                }
            }
            PendingOp::Complete => {
                if let Some(record) = self.indices.get_mut(name) {
                    record.action = COMPLETE.to_owned();
                    record.step = COMPLETE.to_owned();
                    record.pending = None;
                }
            }
            PendingOp::Mount(tier) => self.mount(name, tier),
        }
    }

    /// Replaces `source` with its mounted copy at `tier`.
    fn mount(&mut self, source: &str, tier: Phase) {
        let Some(mut record) = self.indices.remove(source) else {
            return;
        };
        let target = mounted_name(source, tier);
        let snapshot = match record.snapshot.clone() {
            Some(existing) => existing,
            None => {
                let repository = record
                    .policy
                    .as_deref()
                    .and_then(|p| self.policies.get(p))
                    .and_then(|body| mount_repository(body, tier))
                    .unwrap_or_default();
                let name =
                    policy_snapshot_name(source, record.policy.as_deref().unwrap_or("manual"));
                self.snapshots.insert(
                    name.clone(),
                    SnapshotRecord {
                        repository,
                        indices: vec![strip_mount_prefix(source).to_owned()],
                    },
                );
                name
            }
        };
        record.snapshot = Some(snapshot);
        if record.policy.is_some() {
            record.phase = tier;
            record.action = "searchable_snapshot".to_owned();
            record.step = RUNNING.to_owned();
            record.pending = self.schedule(PendingOp::Complete);
        } else {
            record.pending = None;
        }
        debug!(source, target = target.as_str(), tier = %tier, "simulated remount");
        self.indices.insert(target.clone(), record);
        self.rename_member(source, &target);
    }

    fn rename_member(&mut self, old: &str, new: &str) {
        for alias in self.aliases.values_mut() {
            for member in &mut alias.members {
                if member == old {
                    *member = new.to_owned();
                }
            }
            if alias.write.as_deref() == Some(old) {
                alias.write = Some(new.to_owned());
            }
        }
        for stream in self.data_streams.values_mut() {
            for backing in &mut stream.backing {
                if backing == old {
                    *backing = new.to_owned();
                }
            }
        }
    }

    fn detach_index(&mut self, name: &str) {
        for alias in self.aliases.values_mut() {
            alias.members.retain(|m| m != name);
            if alias.write.as_deref() == Some(name) {
                alias.write = None;
            }
        }
        self.aliases.retain(|_, a| !a.members.is_empty());
        for stream in self.data_streams.values_mut() {
            stream.backing.retain(|b| b != name);
        }
    }

    fn exists(&self, kind: EntityKind, name: &str) -> bool {
        match kind {
            EntityKind::Policy => self.policies.contains_key(name),
            EntityKind::Component => self.components.contains_key(name),
            EntityKind::Template => self.templates.contains_key(name),
            EntityKind::Index => self.indices.contains_key(name),
            EntityKind::DataStream => self.data_streams.contains_key(name),
            EntityKind::Snapshot => self.snapshots.contains_key(name),
            EntityKind::Repository => self.repositories.contains(name),
        }
    }

    fn referrers(&self, kind: EntityKind, name: &str) -> Vec<String> {
        match kind {
            EntityKind::Policy => self
                .indices
                .iter()
                .filter(|(_, r)| r.policy.as_deref() == Some(name))
                .map(|(n, _)| n.clone())
                .collect(),
            EntityKind::Component => self
                .templates
                .iter()
                .filter(|(_, t)| t.composed_of.iter().any(|c| c == name))
                .map(|(n, _)| n.clone())
                .collect(),
            EntityKind::Template => match self.templates.get(name) {
                Some(template) => self
                    .data_streams
                    .keys()
                    .filter(|ds| template.patterns.iter().any(|p| wildcard_match(p, ds)))
                    .cloned()
                    .collect(),
                None => Vec::new(),
            },
            EntityKind::Snapshot => self
                .indices
                .iter()
                .filter(|(_, r)| r.snapshot.as_deref() == Some(name))
                .map(|(n, _)| n.clone())
                .collect(),
            EntityKind::Repository => self
                .snapshots
                .iter()
                .filter(|(_, s)| s.repository == name)
                .map(|(n, _)| n.clone())
                .collect(),
            EntityKind::Index | EntityKind::DataStream => Vec::new(),
        }
    }

    /// Finds the first template whose patterns match `name`.
    fn matching_template(&self, name: &str) -> Option<&TemplateRecord> {
        self.templates
            .values()
            .find(|t| t.patterns.iter().any(|p| wildcard_match(p, name)))
    }

    /// Policy named by the components of the template matching `name`.
    fn template_policy(&self, name: &str) -> Option<String> {
        let template = self.matching_template(name)?;
        template.composed_of.iter().find_map(|component| {
            self.components
                .get(component)
                .and_then(|body| body.pointer("/template/settings"))
                .and_then(|settings| settings.get(POLICY_SETTING))
                .and_then(Value::as_str)
                .map(str::to_owned)
        })
    }

    fn insert_index(
        &mut self,
        name: &str,
        policy: Option<String>,
        docs: u64,
    ) -> Result<(), BackendError> {
        if let Some(policy) = policy.as_deref()
            && !self.policies.contains_key(policy)
        {
            return Err(BackendError::Rejected {
                kind: EntityKind::Index,
                name: name.to_owned(),
                reason: format!("unknown lifecycle policy '{policy}'"),
            });
        }
        let pending = policy.as_ref().and_then(|_| self.schedule(PendingOp::Enter));
        self.indices.insert(
            name.to_owned(),
            IndexRecord {
                policy,
                phase: Phase::New,
                action: COMPLETE.to_owned(),
                step: COMPLETE.to_owned(),
                docs,
                snapshot: None,
                pending,
            },
        );
        Ok(())
    }

    fn create(
        &mut self,
        kind: EntityKind,
        name: &str,
        opts: &CreateOptions,
    ) -> Result<(), BackendError> {
        if self.exists(kind, name) {
            return Err(rejected(kind, name, "already exists"));
        }
        match kind {
            EntityKind::Policy => {
                for phase in policy_phases(&opts.body) {
                    if let Some(repo) = mount_repository(&opts.body, phase)
                        && !self.repositories.contains(&repo)
                    {
                        return Err(rejected(kind, name, &format!("unknown repository '{repo}'")));
                    }
                }
                self.policies.insert(name.to_owned(), opts.body.clone());
            }
            EntityKind::Component => {
                self.components.insert(name.to_owned(), opts.body.clone());
            }
            EntityKind::Template => {
                let record = TemplateRecord {
                    patterns: string_list(&opts.body, "index_patterns"),
                    composed_of: string_list(&opts.body, "composed_of"),
                    data_stream: opts.body.get("data_stream").is_some(),
                };
                if record.patterns.is_empty() {
                    return Err(rejected(kind, name, "no index patterns"));
                }
                if let Some(missing) = record
                    .composed_of
                    .iter()
                    .find(|c| !self.components.contains_key(c.as_str()))
                {
                    return Err(rejected(kind, name, &format!("unknown component '{missing}'")));
                }
                self.templates.insert(name.to_owned(), record);
            }
            EntityKind::Index => {
                if self.aliases.contains_key(name) || self.data_streams.contains_key(name) {
                    return Err(rejected(kind, name, "name is taken by a group"));
                }
                let policy = opts.policy.clone().or_else(|| self.template_policy(name));
                let docs = opts.docs.map_or(0, |d| d.count);
                self.insert_index(name, policy, docs)?;
                if let Some(alias) = opts.alias.as_deref() {
                    let entry = self.aliases.entry(alias.to_owned()).or_insert(AliasRecord {
                        members: Vec::new(),
                        write: None,
                    });
                    entry.members.push(name.to_owned());
                    entry.write = Some(name.to_owned());
                }
            }
            EntityKind::DataStream => {
                if !self.matching_template(name).is_some_and(|t| t.data_stream) {
                    return Err(rejected(kind, name, "no matching data stream template"));
                }
                let backing = backing_index_name(name, 1);
                let policy = self.template_policy(name);
                let docs = opts.docs.map_or(0, |d| d.count);
                self.insert_index(&backing, policy, docs)?;
                self.data_streams.insert(
                    name.to_owned(),
                    DataStreamRecord {
                        backing: vec![backing],
                        generation: 1,
                    },
                );
            }
            EntityKind::Snapshot => {
                let repository = opts
                    .body
                    .get("repository")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned();
                if !self.repositories.contains(&repository) {
                    return Err(BackendError::NotFound {
                        kind: EntityKind::Repository,
                        name: repository,
                    });
                }
                self.snapshots.insert(
                    name.to_owned(),
                    SnapshotRecord {
                        repository,
                        indices: string_list(&opts.body, "indices"),
                    },
                );
            }
            EntityKind::Repository => {
                self.repositories.insert(name.to_owned());
            }
        }
        self.journal.push(Call::Create {
            kind,
            name: name.to_owned(),
        });
        Ok(())
    }

    fn delete(&mut self, kind: EntityKind, name: &str) -> Result<bool, BackendError> {
        if self.faults.fail_delete.contains(name) {
            return Err(BackendError::Request(format!(
                "simulated failure deleting {kind} '{name}'"
            )));
        }
        if !self.exists(kind, name) {
            return Err(not_found(kind, name));
        }
        let referrers = self.referrers(kind, name);
        if !referrers.is_empty() {
            return Err(rejected(
                kind,
                name,
                &format!("still referenced by [{}]", referrers.join(", ")),
            ));
        }
        if self.faults.unacked_delete.contains(name) {
            return Ok(false);
        }
        match kind {
            EntityKind::Policy => {
                self.policies.remove(name);
            }
            EntityKind::Component => {
                self.components.remove(name);
            }
            EntityKind::Template => {
                self.templates.remove(name);
            }
            EntityKind::Index => {
                let is_stream_write = self
                    .data_streams
                    .values()
                    .any(|ds| ds.backing.last().map(String::as_str) == Some(name));
                if is_stream_write {
                    return Err(rejected(kind, name, "write index of a data stream"));
                }
                self.indices.remove(name);
                self.detach_index(name);
            }
            EntityKind::DataStream => {
                if let Some(stream) = self.data_streams.remove(name) {
                    for backing in stream.backing {
                        self.indices.remove(&backing);
                    }
                }
            }
            EntityKind::Snapshot => {
                self.snapshots.remove(name);
            }
            EntityKind::Repository => {
                self.repositories.remove(name);
            }
        }
        self.journal.push(Call::Delete {
            kind,
            name: name.to_owned(),
        });
        Ok(true)
    }

    fn move_phase(
        &mut self,
        name: &str,
        current: &StepKey,
        next: &StepKey,
    ) -> Result<(), BackendError> {
        let record = self
            .indices
            .get(name)
            .ok_or_else(|| not_found(EntityKind::Index, name))?;
        let Some(policy) = record.policy.clone() else {
            return Err(rejected(EntityKind::Index, name, "index is not managed"));
        };
        let matches_current = record.phase == current.phase
            && current.action.as_deref().is_none_or(|a| a == record.action)
            && current.step.as_deref().is_none_or(|s| s == record.step);
        if !matches_current {
            return Err(rejected(
                EntityKind::Index,
                name,
                &format!(
                    "current step {:?} does not match phase={} action={} step={}",
                    current, record.phase, record.action, record.step
                ),
            ));
        }
        let body = self.policies.get(&policy).cloned().unwrap_or(Value::Null);
        if !policy_phases(&body).contains(&next.phase) {
            return Err(rejected(
                EntityKind::Index,
                name,
                &format!("policy '{policy}' has no '{}' phase", next.phase),
            ));
        }

        let from = record.phase;
        let op = if next.phase.is_storage_migration() && mount_repository(&body, next.phase).is_some()
        {
            PendingOp::Mount(next.phase)
        } else {
            PendingOp::Complete
        };
        let pending = self.schedule(op);
        if let Some(record) = self.indices.get_mut(name) {
            record.phase = next.phase;
            record.action = match op {
                PendingOp::Mount(_) => "searchable_snapshot".to_owned(),
                _ => RUNNING.to_owned(),
            };
            record.step = RUNNING.to_owned();
            record.pending = pending;
        }
        self.journal.push(Call::MovePhase {
            name: name.to_owned(),
            from,
            to: next.phase,
        });
        Ok(())
    }

    fn snapshot_and_mount(
        &mut self,
        repository: &str,
        snapshot: &str,
        source: &str,
        tier: Phase,
    ) -> Result<(), BackendError> {
        if !self.repositories.contains(repository) {
            return Err(not_found(EntityKind::Repository, repository));
        }
        if !tier.is_storage_migration() {
            return Err(rejected(
                EntityKind::Index,
                source,
                &format!("'{tier}' is not a mountable tier"),
            ));
        }
        if self.snapshots.contains_key(snapshot) {
            return Err(rejected(EntityKind::Snapshot, snapshot, "already exists"));
        }
        if !self.indices.contains_key(source) {
            return Err(not_found(EntityKind::Index, source));
        }
        self.snapshots.insert(
            snapshot.to_owned(),
            SnapshotRecord {
                repository: repository.to_owned(),
                indices: vec![strip_mount_prefix(source).to_owned()],
            },
        );
        let pending = self.schedule(PendingOp::Mount(tier));
        if let Some(record) = self.indices.get_mut(source) {
            record.snapshot = Some(snapshot.to_owned());
            record.pending = pending;
        }
        self.journal.push(Call::SnapshotAndMount {
            source: source.to_owned(),
            tier,
        });
        Ok(())
    }

    fn rollover(
        &mut self,
        group: &str,
        new_name: Option<&str>,
        opts: &CreateOptions,
    ) -> Result<String, BackendError> {
        let docs = opts.docs.map_or(0, |d| d.count);
        let new_index = if let Some(stream) = self.data_streams.get(group) {
            let generation = stream.generation + 1;
            let backing = backing_index_name(group, generation);
            let policy = self.template_policy(group);
            self.insert_index(&backing, policy, docs)?;
            if let Some(stream) = self.data_streams.get_mut(group) {
                stream.backing.push(backing.clone());
                stream.generation = generation;
            }
            backing
        } else if self.aliases.contains_key(group) {
            let Some(new_name) = new_name else {
                return Err(rejected(EntityKind::Index, group, "alias rollover needs a name"));
            };
            if self.indices.contains_key(new_name) {
                return Err(rejected(EntityKind::Index, new_name, "already exists"));
            }
            let inherited = self
                .aliases
                .get(group)
                .and_then(|a| a.write.as_deref())
                .and_then(|w| self.indices.get(w))
                .and_then(|r| r.policy.clone());
            let policy = opts
                .policy
                .clone()
                .or(inherited)
                .or_else(|| self.template_policy(new_name));
            self.insert_index(new_name, policy, docs)?;
            if let Some(alias) = self.aliases.get_mut(group) {
                alias.members.push(new_name.to_owned());
                alias.write = Some(new_name.to_owned());
            }
            new_name.to_owned()
        } else {
            return Err(not_found(EntityKind::Index, group));
        };
        self.journal.push(Call::Rollover {
            group: group.to_owned(),
            new_index: new_index.clone(),
        });
        Ok(new_index)
    }

    fn resolve(&self, name: &str) -> Resolved {
        let mut resolved = Resolved::default();
        if let Some(alias) = self.aliases.get(name) {
            resolved.aliases.push(name.to_owned());
            resolved.indices.extend(alias.members.iter().cloned());
        }
        if let Some(stream) = self.data_streams.get(name) {
            resolved.data_streams.push(name.to_owned());
            resolved.indices.extend(stream.backing.iter().cloned());
        }
        if name.contains('*') {
            resolved.indices.extend(
                self.indices
                    .keys()
                    .filter(|i| wildcard_match(name, i))
                    .cloned(),
            );
        } else if self.indices.contains_key(name) {
            resolved.indices.push(name.to_owned());
        }
        resolved.indices.sort();
        resolved.indices.dedup();
        resolved
    }

    fn write_target(&self, group: &str) -> Option<String> {
        if let Some(alias) = self.aliases.get(group) {
            return alias.write.clone();
        }
        self.data_streams
            .get(group)
            .and_then(|ds| ds.backing.last().cloned())
    }
}

impl Backend for MemoryBackend {
    async fn create(
        &self,
        kind: EntityKind,
        name: &str,
        opts: &CreateOptions,
    ) -> Result<(), BackendError> {
        self.state().create(kind, name, opts)
    }

    async fn delete(&self, kind: EntityKind, name: &str) -> Result<bool, BackendError> {
        self.state().delete(kind, name)
    }

    async fn exists(&self, kind: EntityKind, name: &str) -> Result<bool, BackendError> {
        let mut state = self.state();
        state.tick();
        Ok(state.exists(kind, name))
    }

    async fn scan(&self, kind: EntityKind, pattern: &str) -> Result<Vec<String>, BackendError> {
        {
            self.state().tick();
        }
        Ok(self
            .names(kind)
            .into_iter()
            .filter(|n| wildcard_match(pattern, n))
            .collect())
    }

    async fn referrers(&self, kind: EntityKind, name: &str) -> Result<Vec<String>, BackendError> {
        let mut state = self.state();
        state.tick();
        Ok(state.referrers(kind, name))
    }

    async fn resolve(&self, name: &str) -> Result<Resolved, BackendError> {
        let mut state = self.state();
        state.tick();
        Ok(state.resolve(name))
    }

    async fn get_phase_state(&self, name: &str) -> Result<PhaseSnapshot, BackendError> {
        let mut state = self.state();
        state.tick();
        state
            .indices
            .get(name)
            .map(IndexRecord::snapshot_state)
            .ok_or_else(|| not_found(EntityKind::Index, name))
    }

    async fn move_phase(
        &self,
        name: &str,
        current: &StepKey,
        next: &StepKey,
    ) -> Result<(), BackendError> {
        self.state().move_phase(name, current, next)
    }

    async fn get_policy_phase_list(&self, policy: &str) -> Result<Vec<Phase>, BackendError> {
        self.state()
            .policies
            .get(policy)
            .map(policy_phases)
            .ok_or_else(|| not_found(EntityKind::Policy, policy))
    }

    async fn snapshot_and_mount(
        &self,
        repository: &str,
        snapshot: &str,
        source: &str,
        tier: Phase,
    ) -> Result<(), BackendError> {
        self.state()
            .snapshot_and_mount(repository, snapshot, source, tier)
    }

    async fn backing_snapshot(&self, name: &str) -> Result<Option<String>, BackendError> {
        let mut state = self.state();
        state.tick();
        state
            .indices
            .get(name)
            .map(|r| r.snapshot.clone())
            .ok_or_else(|| not_found(EntityKind::Index, name))
    }

    async fn get_write_target(&self, group: &str) -> Result<Option<String>, BackendError> {
        let mut state = self.state();
        state.tick();
        Ok(state.write_target(group))
    }

    async fn rollover(
        &self,
        group: &str,
        new_name: Option<&str>,
        opts: &CreateOptions,
    ) -> Result<String, BackendError> {
        self.state().rollover(group, new_name, opts)
    }
}

/// Phases defined by a policy body, sorted by rank.
fn policy_phases(body: &Value) -> Vec<Phase> {
    let mut phases: Vec<Phase> = body
        .pointer("/policy/phases")
        .and_then(Value::as_object)
        .map(|map| map.keys().filter_map(|k| k.parse().ok()).collect())
        .unwrap_or_default();
    phases.sort();
    phases
}

/// Repository a policy mounts from at `phase`, if that phase mounts at all.
fn mount_repository(body: &Value, phase: Phase) -> Option<String> {
    body.pointer(&format!(
        "/policy/phases/{phase}/actions/searchable_snapshot/snapshot_repository"
    ))
    .and_then(Value::as_str)
    .map(str::to_owned)
}

fn string_list(body: &Value, key: &str) -> Vec<String> {
    body.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default()
}

fn not_found(kind: EntityKind, name: &str) -> BackendError {
    BackendError::NotFound {
        kind,
        name: name.to_owned(),
    }
}

fn rejected(kind: EntityKind, name: &str, reason: &str) -> BackendError {
    BackendError::Rejected {
        kind,
        name: name.to_owned(),
        reason: reason.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn policy_body(repo: Option<&str>) -> Value {
        let mut phases = json!({
            "hot": { "actions": {} },
            "warm": { "actions": {} },
            "delete": { "actions": { "delete": {} } },
        });
        if let Some(repo) = repo {
            phases["cold"] = json!({
                "actions": { "searchable_snapshot": { "snapshot_repository": repo } }
            });
            phases["frozen"] = json!({
                "actions": { "searchable_snapshot": { "snapshot_repository": repo } }
            });
        }
        json!({ "policy": { "phases": phases } })
    }

    async fn managed_index(backend: &MemoryBackend, name: &str) {
        backend
            .create(EntityKind::Policy, "p", &CreateOptions::with_body(policy_body(Some("repo"))))
            .await
            .unwrap();
        backend
            .create(
                EntityKind::Index,
                name,
                &CreateOptions::default().policy(Some("p".to_owned())),
            )
            .await
            .unwrap();
    }

    async fn settle(backend: &MemoryBackend, ticks: usize) {
        for _ in 0..ticks {
            backend.exists(EntityKind::Repository, "repo").await.unwrap();
        }
    }

    #[tokio::test]
    async fn policy_phase_list_is_rank_sorted() {
        let backend = MemoryBackend::new().with_repository("repo");
        backend
            .create(EntityKind::Policy, "p", &CreateOptions::with_body(policy_body(Some("repo"))))
            .await
            .unwrap();
        let phases = backend.get_policy_phase_list("p").await.unwrap();
        assert_eq!(
            phases,
            [Phase::Hot, Phase::Warm, Phase::Cold, Phase::Frozen, Phase::Delete]
        );
    }

    #[tokio::test]
    async fn policy_with_unknown_repository_is_rejected() {
        let backend = MemoryBackend::new();
        let err = backend
            .create(EntityKind::Policy, "p", &CreateOptions::with_body(policy_body(Some("nope"))))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Rejected { .. }));
    }

    #[tokio::test]
    async fn managed_index_enters_first_phase_after_ticks() {
        let backend = MemoryBackend::new().with_repository("repo");
        managed_index(&backend, "i").await;

        assert_eq!(backend.peek_phase("i").unwrap().phase, Phase::New);
        settle(&backend, 2).await;
        let state = backend.peek_phase("i").unwrap();
        assert_eq!(state.phase, Phase::Hot);
        assert!(!state.is_complete());
        settle(&backend, 2).await;
        assert!(backend.peek_phase("i").unwrap().is_complete());
    }

    #[tokio::test]
    async fn move_phase_rejects_stale_step() {
        let backend = MemoryBackend::new().with_repository("repo");
        managed_index(&backend, "i").await;
        settle(&backend, 4).await;

        let stale = StepKey {
            phase: Phase::Hot,
            action: Some("rollover".to_owned()),
            step: Some(COMPLETE.to_owned()),
        };
        let err = backend
            .move_phase("i", &stale, &StepKey::phase(Phase::Warm))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Rejected { .. }));
        assert_eq!(backend.move_count(), 0);
    }

    #[tokio::test]
    async fn cold_move_remounts_under_restored_name() {
        let backend = MemoryBackend::new().with_repository("repo");
        managed_index(&backend, "i").await;
        settle(&backend, 4).await;

        let current = StepKey::exact(&backend.peek_phase("i").unwrap());
        backend
            .move_phase("i", &current, &StepKey::phase(Phase::Cold))
            .await
            .unwrap();
        settle(&backend, 2).await;

        assert!(!backend.exists(EntityKind::Index, "i").await.unwrap());
        assert!(backend.exists(EntityKind::Index, "restored-i").await.unwrap());
        let snapshot = backend.backing_snapshot("restored-i").await.unwrap().unwrap();
        assert!(backend.exists(EntityKind::Snapshot, &snapshot).await.unwrap());
        assert_eq!(
            backend.referrers(EntityKind::Snapshot, &snapshot).await.unwrap(),
            ["restored-i"]
        );
        assert!(matches!(
            backend.get_phase_state("i").await.unwrap_err(),
            BackendError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn manual_mount_creates_snapshot_immediately() {
        let backend = MemoryBackend::new().with_repository("repo");
        backend
            .create(EntityKind::Index, "plain", &CreateOptions::default())
            .await
            .unwrap();
        backend
            .snapshot_and_mount("repo", "snap-1", "plain", Phase::Frozen)
            .await
            .unwrap();
        assert_eq!(backend.names(EntityKind::Snapshot), ["snap-1"]);

        settle(&backend, 2).await;
        assert_eq!(backend.names(EntityKind::Index), ["partial-plain"]);
        assert_eq!(
            backend.get_phase_state("partial-plain").await.unwrap(),
            PhaseSnapshot::unmanaged()
        );
    }

    #[tokio::test]
    async fn alias_rollover_moves_write_target() {
        let backend = MemoryBackend::new();
        backend
            .create(
                EntityKind::Index,
                "a-1",
                &CreateOptions::default().alias(Some("a".to_owned())),
            )
            .await
            .unwrap();
        let created = backend
            .rollover("a", Some("a-2"), &CreateOptions::default())
            .await
            .unwrap();
        assert_eq!(created, "a-2");
        assert_eq!(backend.get_write_target("a").await.unwrap().as_deref(), Some("a-2"));

        let resolved = backend.resolve("a").await.unwrap();
        assert!(resolved.is_group());
        assert_eq!(resolved.indices, ["a-1", "a-2"]);
    }

    #[tokio::test]
    async fn data_stream_requires_template_and_names_backing_indices() {
        let backend = MemoryBackend::new();
        let err = backend
            .create(EntityKind::DataStream, "logs-x", &CreateOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Rejected { .. }));

        backend
            .create(
                EntityKind::Template,
                "t",
                &CreateOptions::with_body(json!({
                    "index_patterns": ["logs-*"],
                    "composed_of": [],
                    "data_stream": {},
                })),
            )
            .await
            .unwrap();
        backend
            .create(EntityKind::DataStream, "logs-x", &CreateOptions::default())
            .await
            .unwrap();
        let second = backend
            .rollover("logs-x", None, &CreateOptions::default())
            .await
            .unwrap();
        assert_eq!(second, ".ds-logs-x-000002");
        assert_eq!(
            backend.referrers(EntityKind::Template, "t").await.unwrap(),
            ["logs-x"]
        );

        let err = backend.delete(EntityKind::Index, &second).await.unwrap_err();
        assert!(matches!(err, BackendError::Rejected { .. }));
        assert!(backend.delete(EntityKind::DataStream, "logs-x").await.unwrap());
        assert!(backend.names(EntityKind::Index).is_empty());
    }

    #[tokio::test]
    async fn template_policy_flows_from_component_settings() {
        let backend = MemoryBackend::new();
        backend
            .create(EntityKind::Policy, "p", &CreateOptions::with_body(policy_body(None)))
            .await
            .unwrap();
        backend
            .create(
                EntityKind::Component,
                "c",
                &CreateOptions::with_body(json!({
                    "template": { "settings": { POLICY_SETTING: "p" } }
                })),
            )
            .await
            .unwrap();
        backend
            .create(
                EntityKind::Template,
                "t",
                &CreateOptions::with_body(json!({
                    "index_patterns": ["tb-*"],
                    "composed_of": ["c"],
                })),
            )
            .await
            .unwrap();
        backend
            .create(EntityKind::Index, "tb-1", &CreateOptions::default())
            .await
            .unwrap();

        let state = backend.get_phase_state("tb-1").await.unwrap();
        assert_eq!(state.policy.as_deref(), Some("p"));
        assert_eq!(backend.referrers(EntityKind::Policy, "p").await.unwrap(), ["tb-1"]);
        assert_eq!(backend.referrers(EntityKind::Component, "c").await.unwrap(), ["t"]);
    }

    #[tokio::test]
    async fn delete_faults_and_reference_checks() {
        let backend = MemoryBackend::new();
        for name in ["x", "y"] {
            backend
                .create(EntityKind::Index, name, &CreateOptions::default())
                .await
                .unwrap();
        }
        backend.fail_delete("x");
        backend.unacked_delete("y");

        assert!(matches!(
            backend.delete(EntityKind::Index, "x").await.unwrap_err(),
            BackendError::Request(_)
        ));
        assert!(!backend.delete(EntityKind::Index, "y").await.unwrap());
        assert!(backend.exists(EntityKind::Index, "y").await.unwrap());
        assert!(
            backend
                .delete(EntityKind::Index, "missing")
                .await
                .unwrap_err()
                .is_not_found()
        );
    }

    #[tokio::test]
    async fn stalled_index_never_settles() {
        let backend = MemoryBackend::new().with_repository("repo");
        managed_index(&backend, "i").await;
        backend.stall("i");
        settle(&backend, 10).await;
        assert_eq!(backend.peek_phase("i").unwrap().phase, Phase::New);

        backend.resume("i");
        settle(&backend, 2).await;
        assert_eq!(backend.peek_phase("i").unwrap().phase, Phase::Hot);
    }
}
