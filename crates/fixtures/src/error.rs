//! 픽스처 에러 타입
//!
//! [`FixtureError`]는 엔티티 생성, 검증, 삭제에서 발생하는 에러를 표현합니다.
//! 정리(teardown) 중 발생한 에러는 전파되지 않고 `TeardownReport`에 기록됩니다.

use tierbed_core::error::{BackendError, ConfigError, TierbedError};
use tierbed_core::types::EntityKind;
use tierbed_lifecycle::LifecycleError;

/// 픽스처 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    /// 단계 추적 또는 티어 이동 실패
    #[error("lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    /// 백엔드 호출 실패
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// 모순된 계획
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 생성 요청은 성공했지만 존재를 확인하지 못함
    #[error("{kind} '{name}' was requested but does not exist")]
    Unverified {
        /// 엔티티 종류
        kind: EntityKind,
        /// 엔티티 이름
        name: String,
    },

    /// 다른 엔티티가 아직 참조 중이라 삭제할 수 없음
    #[error("{kind} '{name}' is still referenced by {referrers:?}")]
    Referenced {
        /// 엔티티 종류
        kind: EntityKind,
        /// 엔티티 이름
        name: String,
        /// 참조 중인 엔티티 이름
        referrers: Vec<String>,
    },

    /// 삭제 요청이 승인되지 않음
    #[error("deletion of {kind} '{name}' was not acknowledged")]
    NotDeleted {
        /// 엔티티 종류
        kind: EntityKind,
        /// 엔티티 이름
        name: String,
    },
}

impl From<FixtureError> for TierbedError {
    fn from(err: FixtureError) -> Self {
        match err {
            FixtureError::Lifecycle(inner) => inner.into(),
            FixtureError::Backend(inner) => TierbedError::Backend(inner),
            FixtureError::Config(inner) => TierbedError::Config(inner),
            other => TierbedError::Fixture(other.to_string()),
        }
    }
}

impl From<FixtureError> for LifecycleError {
    fn from(err: FixtureError) -> Self {
        match err {
            FixtureError::Lifecycle(inner) => inner,
            FixtureError::Backend(inner) => LifecycleError::Backend(inner),
            FixtureError::Unverified { kind, name } => {
                LifecycleError::Backend(BackendError::NotFound { kind, name })
            }
            other => LifecycleError::Backend(BackendError::Request(other.to_string())),
        }
    }
}
