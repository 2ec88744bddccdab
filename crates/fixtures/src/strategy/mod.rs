//! 엔티티 종류별 생성 전략
//!
//! 각 전략은 [`KindStrategy`](crate::manager::KindStrategy)를 구현합니다.
//! 티어 이동이 필요한 인덱스와 데이터 스트림 전략만
//! [`TierMigrator`](tierbed_lifecycle::TierMigrator)를 가집니다.

mod component;
mod data_stream;
mod index;
mod policy;
mod snapshot;
mod template;

pub use component::ComponentStrategy;
pub use data_stream::DataStreamStrategy;
pub use index::IndexStrategy;
pub use policy::PolicyStrategy;
pub use snapshot::SnapshotStrategy;
pub use template::TemplateStrategy;
