//! 메트릭 상수
//!
//! 모든 메트릭의 이름을 중앙에서 정의합니다.
//! 각 크레이트는 이 상수를 사용하여 `metrics::counter!()` 매크로를 호출합니다.
//! 레코더가 설치되지 않으면 호출은 아무 일도 하지 않습니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `tierbed_`
//! - 접미어: `_total` (counter)
//!
//! # 사용 예시
//!
//! ```ignore
//! use tierbed_core::metrics as m;
//!
//! metrics::counter!(m::ENTITIES_CREATED_TOTAL, m::LABEL_KIND => "index").increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 엔티티 종류 레이블 키 (policy, component, template, index, data_stream, snapshot)
pub const LABEL_KIND: &str = "kind";

/// 티어 레이블 키 (cold, frozen)
pub const LABEL_TIER: &str = "tier";

/// 마운트 방식 레이블 키 (policy, manual)
pub const LABEL_MODE: &str = "mode";

// ─── 관리자 메트릭 ────────────────────────────────────────────────

/// 생성 후 검증까지 끝난 엔티티 수 (counter, label: kind)
pub const ENTITIES_CREATED_TOTAL: &str = "tierbed_entities_created_total";

/// 정리 시 삭제된 엔티티 수 (counter, label: kind)
pub const ENTITIES_DELETED_TOTAL: &str = "tierbed_entities_deleted_total";

/// 정리 시 삭제에 실패한 엔티티 수 (counter, label: kind)
pub const DELETIONS_FAILED_TOTAL: &str = "tierbed_deletions_failed_total";

/// 조정 과정에서 백엔드에서만 발견되어 편입된 엔티티 수 (counter, label: kind)
pub const ENTITIES_ADOPTED_TOTAL: &str = "tierbed_entities_adopted_total";

/// 조정 과정에서 사라진 것으로 확인되어 제외된 엔티티 수 (counter, label: kind)
pub const ENTITIES_DROPPED_TOTAL: &str = "tierbed_entities_dropped_total";

// ─── 생명주기 메트릭 ────────────────────────────────────────────────

/// 완료된 재마운트 수 (counter, labels: tier, mode)
pub const REMOUNTS_TOTAL: &str = "tierbed_remounts_total";

/// 쓰기 대상이라 건너뛴 티어 이동 수 (counter)
pub const WRITE_TARGET_SKIPS_TOTAL: &str = "tierbed_write_target_skips_total";

/// 상한을 초과한 대기 수 (counter)
pub const WAITS_EXCEEDED_TOTAL: &str = "tierbed_waits_exceeded_total";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_names_share_prefix() {
        for name in [
            ENTITIES_CREATED_TOTAL,
            ENTITIES_DELETED_TOTAL,
            DELETIONS_FAILED_TOTAL,
            ENTITIES_ADOPTED_TOTAL,
            ENTITIES_DROPPED_TOTAL,
            REMOUNTS_TOTAL,
            WRITE_TARGET_SKIPS_TOTAL,
            WAITS_EXCEEDED_TOTAL,
        ] {
            assert!(name.starts_with("tierbed_"), "{name}");
            assert!(name.ends_with("_total"), "{name}");
        }
    }
}
