//! 픽스처 통합 테스트 공용 헬퍼

#![allow(dead_code)]

use std::sync::Arc;

use tierbed_core::backend::memory::MemoryBackend;
use tierbed_core::config::{EntitySpec, Plan, PlanKind, PolicyConfig};
use tierbed_core::types::Phase;

pub const PREFIX: &str = "tb";
pub const UNIQ: &str = "t1";
pub const REPO: &str = "repo";

pub fn backend() -> Arc<MemoryBackend> {
    Arc::new(MemoryBackend::new().with_repository(REPO))
}

/// 목표 티어마다 엔티티 하나씩, 문서 5개
pub fn entities(tiers: &[Phase]) -> Vec<EntitySpec> {
    tiers
        .iter()
        .map(|&target_tier| EntitySpec {
            doc_count: 5,
            match_docs: true,
            target_tier,
        })
        .collect()
}

/// 모든 단계를 가진 정책과 함께 계획을 만듭니다.
pub fn plan(kind: PlanKind, tiers: &[Phase]) -> Plan {
    Plan {
        prefix: PREFIX.to_owned(),
        uniq: UNIQ.to_owned(),
        kind,
        entities: entities(tiers),
        policy: PolicyConfig {
            enabled: true,
            phases: vec![Phase::Hot, Phase::Warm, Phase::Cold, Phase::Frozen, Phase::Delete],
            repository: REPO.to_owned(),
            forcemerge: true,
            max_num_segments: 1,
        },
    }
}

/// 정책 없이 수동 스냅샷으로만 티어를 옮기는 계획
pub fn unmanaged_plan(tiers: &[Phase]) -> Plan {
    let mut plan = plan(PlanKind::Index, tiers);
    plan.policy.enabled = false;
    plan
}

pub fn name(tag: &str, n: u32) -> String {
    format!("{PREFIX}-{tag}-{UNIQ}-{n:06}")
}
