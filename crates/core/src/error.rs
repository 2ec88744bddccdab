//! 에러 타입: 도메인별 에러 정의

use crate::types::EntityKind;

/// tierbed 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum TierbedError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 백엔드 호출 에러
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// 단계 추적/티어 이동 에러
    #[error("lifecycle error: {0}")]
    Lifecycle(String),

    /// 픽스처 생성/정리 에러
    #[error("fixture error: {0}")]
    Fixture(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 백엔드 호출 에러
///
/// `NotFound`는 정상 흐름에서도 발생합니다. 원격 재마운트가 진행 중이면
/// 추적 중이던 이름이 사라질 수 있습니다.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// 대상 엔티티가 존재하지 않음
    #[error("{kind} not found: {name}")]
    NotFound { kind: EntityKind, name: String },

    /// 백엔드가 요청을 거부함 (선행 조건 불일치 등)
    #[error("{kind} '{name}' rejected: {reason}")]
    Rejected {
        kind: EntityKind,
        name: String,
        reason: String,
    },

    /// 요청 자체가 실패함
    #[error("request failed: {0}")]
    Request(String),
}

impl BackendError {
    /// 대상이 존재하지 않는다는 응답인지 확인합니다.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
