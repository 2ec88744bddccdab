use tierbed_core::backend::Backend;
use tierbed_core::types::{CreateOptions, EntityKind};

use crate::body::template_body;
use crate::error::FixtureError;
use crate::manager::KindStrategy;

/// 계획된 주 엔티티 이름을 정확히 나열하는 인덱스 템플릿 하나
#[derive(Debug, Clone)]
pub struct TemplateStrategy {
    patterns: Vec<String>,
    composed_of: Vec<String>,
    data_stream: bool,
}

impl TemplateStrategy {
    pub fn new(patterns: Vec<String>, composed_of: Vec<String>, data_stream: bool) -> Self {
        Self {
            patterns,
            composed_of,
            data_stream,
        }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

impl<B: Backend> KindStrategy<B> for TemplateStrategy {
    fn kind(&self) -> EntityKind {
        EntityKind::Template
    }

    fn build_count(&self) -> usize {
        1
    }

    async fn create(&mut self, backend: &B, name: &str, _position: usize) -> Result<(), FixtureError> {
        let body = template_body(&self.patterns, &self.composed_of, self.data_stream);
        backend
            .create(EntityKind::Template, name, &CreateOptions::with_body(body))
            .await?;
        Ok(())
    }
}
