//! Phase tracking for a single physical index.
//!
//! [`PhaseTracker`] observes and advances one index through the phases of its
//! lifecycle policy. It never moves an index while the current action or step
//! is still running, and it treats a vanished name as
//! [`LifecycleError::IdentityChanged`] instead of hiding it.

use std::sync::Arc;

use tierbed_core::backend::Backend;
use tierbed_core::error::BackendError;
use tierbed_core::types::{EntityKind, Phase, PhaseSnapshot, StepKey};
use tracing::{Instrument, Span, debug, info, info_span, warn};

use crate::error::LifecycleError;
use crate::wait::Waiter;

/// Resolves `name` to exactly one physical index.
///
/// # Errors
///
/// - `LifecycleError::Ambiguous`: `name` is an alias or data stream, or matches
///   more than one index
/// - `LifecycleError::Backend(NotFound)`: nothing matches
pub async fn resolve<B: Backend>(backend: &B, name: &str) -> Result<String, LifecycleError> {
    let resolved = backend.resolve(name).await?;
    if resolved.is_group() {
        return Err(LifecycleError::Ambiguous {
            name: name.to_owned(),
            reason: format!(
                "resolves to a group (aliases {:?}, data streams {:?})",
                resolved.aliases, resolved.data_streams
            ),
        });
    }
    match resolved.indices.as_slice() {
        [] => Err(BackendError::NotFound {
            kind: EntityKind::Index,
            name: name.to_owned(),
        }
        .into()),
        [single] => Ok(single.clone()),
        many => Err(LifecycleError::Ambiguous {
            name: name.to_owned(),
            reason: format!("matches {} indices", many.len()),
        }),
    }
}

/// Nearest phase in `phase_list` ranked strictly after `current`.
///
/// Returns `None` once `current` is terminal or nothing later is listed.
pub fn next_phase(phase_list: &[Phase], current: Phase) -> Option<Phase> {
    if current.is_terminal() {
        return None;
    }
    phase_list.iter().copied().filter(|p| *p > current).min()
}

/// Observes and drives the lifecycle of one index.
#[derive(Debug)]
pub struct PhaseTracker<B> {
    backend: Arc<B>,
    name: String,
    waiter: Waiter,
    state: PhaseSnapshot,
    phase_list: Vec<Phase>,
    span: Span,
}

impl<B: Backend> PhaseTracker<B> {
    /// Resolves `name` and loads its current state.
    pub async fn new(backend: Arc<B>, name: &str, waiter: Waiter) -> Result<Self, LifecycleError> {
        let span = info_span!("phase_tracker", name);
        let canonical = resolve(backend.as_ref(), name)
            .instrument(span.clone())
            .await?;
        let mut tracker = Self {
            backend,
            name: canonical,
            waiter,
            state: PhaseSnapshot::unmanaged(),
            phase_list: Vec::new(),
            span,
        };
        tracker.update().await?;
        Ok(tracker)
    }

    /// Canonical physical name being tracked.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last observed state.
    pub fn state(&self) -> &PhaseSnapshot {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn policy(&self) -> Option<&str> {
        self.state.policy.as_deref()
    }

    /// Phases of the governing policy, sorted by rank.
    pub fn phase_list(&self) -> &[Phase] {
        &self.phase_list
    }

    pub fn is_complete(&self) -> bool {
        self.state.is_complete()
    }

    pub fn next_phase(&self) -> Option<Phase> {
        next_phase(&self.phase_list, self.state.phase)
    }

    /// Re-reads the phase state from the backend.
    ///
    /// # Errors
    ///
    /// `LifecycleError::IdentityChanged` when the name no longer exists.
    pub async fn update(&mut self) -> Result<&PhaseSnapshot, LifecycleError> {
        let span = self.span.clone();
        async {
            let state = match self.backend.get_phase_state(&self.name).await {
                Ok(state) => state,
                Err(err) if err.is_not_found() => {
                    debug!("tracked name vanished");
                    return Err(LifecycleError::IdentityChanged {
                        name: self.name.clone(),
                    });
                }
                Err(err) => return Err(err.into()),
            };
            let policy_changed = state.policy != self.state.policy;
            if policy_changed || (state.policy.is_some() && self.phase_list.is_empty()) {
                self.phase_list = match state.policy.as_deref() {
                    Some(policy) => self.backend.get_policy_phase_list(policy).await?,
                    None => Vec::new(),
                };
            }
            self.state = state;
            Ok(())
        }
        .instrument(span)
        .await?;
        Ok(&self.state)
    }

    /// Waits until the current action and step are complete.
    pub async fn wait4complete(&mut self) -> Result<(), LifecycleError> {
        if self.state.is_complete() {
            return Ok(());
        }
        let mut budget = self.waiter.budget("completion", &self.name);
        loop {
            budget.tick(&self.state).await?;
            self.update().await?;
            if self.state.is_complete() {
                return Ok(());
            }
        }
    }

    /// Waits until the policy has picked the index up.
    pub async fn wait_for_managed(&mut self) -> Result<(), LifecycleError> {
        let mut budget = self.waiter.budget("policy pickup", &self.name);
        while self.state.phase == Phase::New {
            budget.tick(&self.state).await?;
            self.update().await?;
        }
        Ok(())
    }

    /// Moves the index to `target` and waits for the move to land.
    ///
    /// Already being at `target` issues no backend move. For cold and frozen
    /// targets the tracked name may disappear mid-wait; that surfaces as
    /// `IdentityChanged` and the caller picks up the mounted copy.
    pub async fn advance(&mut self, target: Phase) -> Result<(), LifecycleError> {
        if self.state.phase.is_terminal() {
            warn!(
                parent: &self.span,
                phase = %self.state.phase,
                "index is in its terminal phase, not advancing"
            );
            return Ok(());
        }
        self.update().await?;
        self.wait4complete().await?;

        let current = self.state.phase;
        if current == target {
            debug!(parent: &self.span, phase = %target, "already in target phase");
            return Ok(());
        }
        if target < current {
            warn!(parent: &self.span, from = %current, to = %target, "refusing to move backwards");
            return Ok(());
        }

        info!(parent: &self.span, from = %current, to = %target, "moving phase");
        self.backend
            .move_phase(&self.name, &StepKey::exact(&self.state), &StepKey::phase(target))
            .instrument(self.span.clone())
            .await?;

        let mut budget = self.waiter.budget("phase move", &self.name);
        loop {
            self.update().await?;
            if self.state.phase >= target {
                break;
            }
            budget.tick(&self.state).await?;
        }

        if !target.is_storage_migration() {
            self.wait4complete().await?;
        }
        Ok(())
    }
}
