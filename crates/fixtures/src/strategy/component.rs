use tierbed_core::backend::Backend;
use tierbed_core::types::{CreateOptions, EntityKind};

use crate::body::{mappings_component, settings_component};
use crate::error::FixtureError;
use crate::manager::KindStrategy;

/// 컴포넌트 템플릿 두 개: 설정(정책 연결)과 매핑
#[derive(Debug, Clone)]
pub struct ComponentStrategy {
    policy: Option<String>,
    rollover_alias: Option<String>,
}

impl ComponentStrategy {
    /// 생성 순서 (설정, 매핑)
    pub const COUNT: usize = 2;

    pub fn new(policy: Option<String>, rollover_alias: Option<String>) -> Self {
        Self {
            policy,
            rollover_alias,
        }
    }
}

impl<B: Backend> KindStrategy<B> for ComponentStrategy {
    fn kind(&self) -> EntityKind {
        EntityKind::Component
    }

    fn build_count(&self) -> usize {
        Self::COUNT
    }

    fn policy(&self) -> Option<&str> {
        self.policy.as_deref()
    }

    async fn create(&mut self, backend: &B, name: &str, position: usize) -> Result<(), FixtureError> {
        let body = match position {
            0 => settings_component(self.policy.as_deref(), self.rollover_alias.as_deref()),
            _ => mappings_component(),
        };
        backend
            .create(EntityKind::Component, name, &CreateOptions::with_body(body))
            .await?;
        Ok(())
    }
}
