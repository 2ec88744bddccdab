use serde_json::Value;
use tierbed_core::backend::Backend;
use tierbed_core::config::PolicyConfig;
use tierbed_core::types::{CreateOptions, EntityKind};

use crate::body::policy_body;
use crate::error::FixtureError;
use crate::manager::KindStrategy;

/// 생명주기 정책 하나 (비활성화되어 있으면 만들지 않음)
#[derive(Debug, Clone)]
pub struct PolicyStrategy {
    enabled: bool,
    body: Value,
}

impl PolicyStrategy {
    pub fn new(policy: &PolicyConfig) -> Self {
        Self {
            enabled: policy.enabled,
            body: policy_body(policy),
        }
    }
}

impl<B: Backend> KindStrategy<B> for PolicyStrategy {
    fn kind(&self) -> EntityKind {
        EntityKind::Policy
    }

    fn build_count(&self) -> usize {
        usize::from(self.enabled)
    }

    async fn create(&mut self, backend: &B, name: &str, _position: usize) -> Result<(), FixtureError> {
        backend
            .create(EntityKind::Policy, name, &CreateOptions::with_body(self.body.clone()))
            .await?;
        Ok(())
    }
}
