use tierbed_core::backend::{Backend, backing_stream, policy_snapshot_source};
use tierbed_core::error::BackendError;
use tierbed_core::identity::{EntityId, ManagedList};
use tierbed_core::types::EntityKind;

use crate::error::FixtureError;
use crate::manager::KindStrategy;
use crate::naming::Namer;

/// 스냅샷 원장
///
/// 직접 만드는 스냅샷은 없습니다. 티어 이동이 만든 스냅샷을
/// [`EntityManager::track`](crate::manager::EntityManager::track)으로 넘겨받습니다.
///
/// 정책이 만든 스냅샷(`{source}-{policy}-snapshot`)은 스냅샷 이름 공간 밖에
/// 있으므로 [`with_policy_snapshots`](Self::with_policy_snapshots)로 원본
/// 이름 공간을 알려 주어야 재조정 때 회수됩니다.
#[derive(Debug, Clone)]
pub struct SnapshotStrategy {
    repository: Option<String>,
    policy_snapshots: Option<PolicySnapshots>,
}

/// 정책 스냅샷의 소유 판정 기준
#[derive(Debug, Clone)]
struct PolicySnapshots {
    policy: String,
    sources: Namer,
    data_stream: bool,
}

impl SnapshotStrategy {
    pub fn new(repository: Option<String>) -> Self {
        Self {
            repository,
            policy_snapshots: None,
        }
    }

    /// `policy`가 `sources` 이름 공간의 엔티티에서 만든 스냅샷도 소유합니다.
    ///
    /// `data_stream`이면 원본은 `sources` 데이터 스트림의 백킹 인덱스입니다.
    pub fn with_policy_snapshots(
        mut self,
        policy: &str,
        sources: Namer,
        data_stream: bool,
    ) -> Self {
        self.policy_snapshots = Some(PolicySnapshots {
            policy: policy.to_owned(),
            sources,
            data_stream,
        });
        self
    }
}

impl PolicySnapshots {
    fn pattern(&self) -> String {
        format!("*{}-*-{}-snapshot", self.sources.base(), self.policy)
    }

    fn owns(&self, snapshot: &str) -> bool {
        let Some(source) = policy_snapshot_source(snapshot, &self.policy) else {
            return false;
        };
        if self.data_stream {
            backing_stream(source).is_some_and(|stream| self.sources.owns(stream))
        } else {
            self.sources.owns(source)
        }
    }
}

impl<B: Backend> KindStrategy<B> for SnapshotStrategy {
    fn kind(&self) -> EntityKind {
        EntityKind::Snapshot
    }

    fn build_count(&self) -> usize {
        0
    }

    fn scan_patterns(&self) -> Vec<String> {
        self.policy_snapshots.iter().map(PolicySnapshots::pattern).collect()
    }

    fn owns(&self, name: &str) -> bool {
        self.policy_snapshots.as_ref().is_some_and(|p| p.owns(name))
    }

    async fn create(&mut self, _backend: &B, name: &str, _position: usize) -> Result<(), FixtureError> {
        Err(BackendError::Rejected {
            kind: EntityKind::Snapshot,
            name: name.to_owned(),
            reason: "snapshots are only created by tier migrations".to_owned(),
        }
        .into())
    }

    /// 설정된 저장소가 실제로 있는지 확인합니다.
    async fn finalize(
        &mut self,
        backend: &B,
        _list: &mut ManagedList,
        _created: &[EntityId],
    ) -> Result<(), FixtureError> {
        if let Some(repository) = self.repository.as_deref()
            && !backend.exists(EntityKind::Repository, repository).await?
        {
            return Err(BackendError::NotFound {
                kind: EntityKind::Repository,
                name: repository.to_owned(),
            }
            .into());
        }
        Ok(())
    }
}
