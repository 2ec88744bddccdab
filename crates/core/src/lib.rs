#![doc = include_str!("../README.md")]

pub mod backend;
pub mod config;
pub mod error;
pub mod identity;
pub mod metrics;
pub mod types;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{BackendError, ConfigError, TierbedError};

// 설정
pub use config::{EntitySpec, Plan, PlanKind, PolicyConfig, TierbedConfig, WaitConfig};

// 백엔드
pub use backend::Backend;
pub use backend::memory::MemoryBackend;

// 식별
pub use identity::{EntityId, EntityIdentity, ManagedList};

// 도메인 타입
pub use types::{
    CreateOptions, DocFill, EntityKind, Phase, PhaseSnapshot, Resolved, StepKey, mounted_name,
};
