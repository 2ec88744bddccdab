//! 생명주기 엔진 에러 타입
//!
//! [`LifecycleError`]는 단계 추적과 티어 이동에서 발생하는 모든 에러를 표현합니다.
//! `From<LifecycleError> for TierbedError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use std::time::Duration;

use tierbed_core::error::{BackendError, TierbedError};
use tierbed_core::identity::EntityId;

/// 생명주기 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// 백엔드 호출 실패
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// 이름이 단일 물리 인덱스로 해석되지 않음
    #[error("'{name}' is ambiguous: {reason}")]
    Ambiguous {
        /// 해석하려던 이름
        name: String,
        /// 거부 사유
        reason: String,
    },

    /// 추적 중이던 이름이 백엔드에서 사라짐 (재마운트 진행 중일 수 있음)
    #[error("'{name}' no longer exists under this name")]
    IdentityChanged {
        /// 사라진 이름
        name: String,
    },

    /// 대기 상한 초과
    #[error(
        "gave up waiting for {what} on '{name}' after {iterations} checks ({elapsed:?}), last state: {last_state}"
    )]
    WaitExceeded {
        /// 기다리던 조건
        what: String,
        /// 대상 이름
        name: String,
        /// 확인 횟수
        iterations: u32,
        /// 경과 시간
        elapsed: Duration,
        /// 마지막으로 관찰한 상태
        last_state: String,
    },

    /// 수동 티어 이동에 필요한 스냅샷 저장소가 없음
    #[error("no snapshot repository configured to mount '{name}'")]
    MissingRepository {
        /// 이동하려던 엔티티 이름
        name: String,
    },

    /// 관리 목록에 없는 엔티티 ID
    #[error("entity {0} is not tracked")]
    Untracked(EntityId),
}

impl LifecycleError {
    /// 재마운트로 이름이 바뀐 경우인지 확인합니다.
    pub fn is_identity_changed(&self) -> bool {
        matches!(self, Self::IdentityChanged { .. })
    }
}

impl From<LifecycleError> for TierbedError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::Backend(inner) => TierbedError::Backend(inner),
            other => TierbedError::Lifecycle(other.to_string()),
        }
    }
}
