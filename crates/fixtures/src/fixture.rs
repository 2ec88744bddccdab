//! 픽스처 레지스트리: 매니저 등록, setup/teardown 순서 관리
//!
//! [`Fixture`] trait은 RPITIT를 사용하므로 `dyn Fixture`가 불가합니다.
//! [`DynFixture`]는 [`BoxFuture`]를 반환하여 종류가 다른 매니저를
//! `Vec<Box<dyn DynFixture>>` 하나로 관리할 수 있게 합니다.
//!
//! # 순서
//! ```text
//! setup_all:    등록 순서, 첫 실패에서 중단 (fail-fast)
//! teardown_all: 역순, 실패해도 계속 진행
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tierbed_core::backend::Backend;
use tierbed_core::types::EntityKind;
use tierbed_lifecycle::{LifecycleError, SnapshotLedger};
use tokio::sync::Mutex;

use crate::error::FixtureError;
use crate::manager::{EntityManager, KindStrategy, TeardownReport};
use crate::strategy::SnapshotStrategy;

/// 박싱된 Send future
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// 레지스트리에 등록되는 매니저 하나
pub trait Fixture: Send + Sync {
    /// 관리하는 엔티티 종류
    fn kind(&self) -> EntityKind;

    /// 엔티티를 생성합니다.
    fn setup(&mut self) -> impl Future<Output = Result<(), FixtureError>> + Send;

    /// 엔티티를 삭제합니다. 실패는 보고서에 남기고 에러를 던지지 않습니다.
    fn teardown(&mut self) -> impl Future<Output = TeardownReport> + Send;

    /// 현재 추적 중인 이름
    fn tracked(&self) -> impl Future<Output = Vec<(EntityKind, String)>> + Send;
}

/// dyn-compatible 픽스처 trait
pub trait DynFixture: Send + Sync {
    fn kind(&self) -> EntityKind;
    fn setup(&mut self) -> BoxFuture<'_, Result<(), FixtureError>>;
    fn teardown(&mut self) -> BoxFuture<'_, TeardownReport>;
    fn tracked(&self) -> BoxFuture<'_, Vec<(EntityKind, String)>>;
}

/// Fixture를 구현한 타입은 자동으로 DynFixture도 구현됩니다.
impl<T: Fixture> DynFixture for T {
    fn kind(&self) -> EntityKind {
        Fixture::kind(self)
    }

    fn setup(&mut self) -> BoxFuture<'_, Result<(), FixtureError>> {
        Box::pin(Fixture::setup(self))
    }

    fn teardown(&mut self) -> BoxFuture<'_, TeardownReport> {
        Box::pin(Fixture::teardown(self))
    }

    fn tracked(&self) -> BoxFuture<'_, Vec<(EntityKind, String)>> {
        Box::pin(Fixture::tracked(self))
    }
}

impl<B: Backend, S: KindStrategy<B>> Fixture for EntityManager<B, S> {
    fn kind(&self) -> EntityKind {
        EntityManager::kind(self)
    }

    async fn setup(&mut self) -> Result<(), FixtureError> {
        EntityManager::setup(self).await
    }

    async fn teardown(&mut self) -> TeardownReport {
        self.teardown_report().await
    }

    async fn tracked(&self) -> Vec<(EntityKind, String)> {
        EntityManager::tracked(self)
    }
}

// ─── SnapshotHandle ──────────────────────────────────────────────────

/// 스냅샷 매니저 공유 핸들
///
/// 레지스트리와 티어 이동기(`TierMigrator`)가 같은 스냅샷 매니저를 씁니다.
/// 이동 중 만들어진 스냅샷은 [`SnapshotLedger`]를 통해 이 매니저에 기록되고,
/// 인덱스가 삭제된 뒤에 정리됩니다.
pub struct SnapshotHandle<B> {
    inner: Arc<Mutex<EntityManager<B, SnapshotStrategy>>>,
}

impl<B> Clone for SnapshotHandle<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: Backend> SnapshotHandle<B> {
    pub fn new(manager: EntityManager<B, SnapshotStrategy>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(manager)),
        }
    }

    /// 스캔 패턴 (`*{prefix}-snp-{uniq}-*`)
    pub async fn pattern(&self) -> String {
        self.inner.lock().await.pattern()
    }
}

impl<B: Backend> SnapshotLedger for SnapshotHandle<B> {
    async fn next_snapshot_name(&self) -> String {
        self.inner.lock().await.next_name()
    }

    async fn record(&self, snapshot: &str) -> Result<(), LifecycleError> {
        let mut manager = self.inner.lock().await;
        manager.track(snapshot).await?;
        Ok(())
    }
}

impl<B: Backend> Fixture for SnapshotHandle<B> {
    fn kind(&self) -> EntityKind {
        EntityKind::Snapshot
    }

    async fn setup(&mut self) -> Result<(), FixtureError> {
        self.inner.lock().await.setup().await
    }

    async fn teardown(&mut self) -> TeardownReport {
        self.inner.lock().await.teardown_report().await
    }

    async fn tracked(&self) -> Vec<(EntityKind, String)> {
        self.inner.lock().await.tracked()
    }
}

// ─── FixtureRegistry ─────────────────────────────────────────────────

/// 픽스처 레지스트리
///
/// 등록 순서가 의존 순서입니다. 참조되는 쪽(정책)을 먼저,
/// 참조하는 쪽(인덱스)을 나중에 등록합니다.
#[derive(Default)]
pub struct FixtureRegistry {
    fixtures: Vec<Box<dyn DynFixture>>,
}

impl FixtureRegistry {
    /// 빈 레지스트리를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 픽스처를 등록합니다.
    pub fn register(&mut self, fixture: Box<dyn DynFixture>) {
        self.fixtures.push(fixture);
    }

    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }

    /// 등록된 종류 (등록 순서)
    pub fn kinds(&self) -> Vec<EntityKind> {
        self.fixtures.iter().map(|f| f.kind()).collect()
    }

    /// 모든 픽스처를 등록 순서대로 setup합니다.
    ///
    /// 첫 번째 실패 시 즉시 반환합니다 (fail-fast).
    /// 이미 만든 엔티티는 롤백하지 않으므로, 호출자가 `teardown_all`을 호출해야 합니다.
    pub async fn setup_all(&mut self) -> Result<(), FixtureError> {
        for fixture in &mut self.fixtures {
            fixture.setup().await?;
        }
        Ok(())
    }

    /// 모든 픽스처를 역순으로 teardown합니다.
    ///
    /// 한 픽스처가 실패해도 나머지를 계속 정리합니다.
    /// 보고서는 teardown 순서대로 반환합니다.
    pub async fn teardown_all(&mut self) -> Vec<TeardownReport> {
        let mut reports = Vec::with_capacity(self.fixtures.len());
        for fixture in self.fixtures.iter_mut().rev() {
            reports.push(fixture.teardown().await);
        }
        reports
    }

    /// 종류별 추적 이름 (등록 순서)
    pub async fn tracked_all(&self) -> Vec<(EntityKind, String)> {
        let mut tracked = Vec::new();
        for fixture in &self.fixtures {
            tracked.extend(fixture.tracked().await);
        }
        tracked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder {
        kind: EntityKind,
        fail_setup: bool,
        log: Arc<std::sync::Mutex<Vec<String>>>,
    }

    impl Recorder {
        fn boxed(
            kind: EntityKind,
            fail_setup: bool,
            log: &Arc<std::sync::Mutex<Vec<String>>>,
        ) -> Box<dyn DynFixture> {
            Box::new(Self {
                kind,
                fail_setup,
                log: Arc::clone(log),
            })
        }

        fn note(&self, what: &str) {
            self.log.lock().unwrap().push(format!("{what}:{}", self.kind));
        }
    }

    impl Fixture for Recorder {
        fn kind(&self) -> EntityKind {
            self.kind
        }

        async fn setup(&mut self) -> Result<(), FixtureError> {
            self.note("setup");
            if self.fail_setup {
                return Err(FixtureError::Unverified {
                    kind: self.kind,
                    name: "x".to_owned(),
                });
            }
            Ok(())
        }

        async fn teardown(&mut self) -> TeardownReport {
            self.note("teardown");
            TeardownReport::new(self.kind)
        }

        async fn tracked(&self) -> Vec<(EntityKind, String)> {
            vec![(self.kind, "x".to_owned())]
        }
    }

    #[tokio::test]
    async fn setup_is_fail_fast_and_teardown_reversed() {
        let log = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut registry = FixtureRegistry::new();
        registry.register(Recorder::boxed(EntityKind::Policy, false, &log));
        registry.register(Recorder::boxed(EntityKind::Template, true, &log));
        registry.register(Recorder::boxed(EntityKind::Index, false, &log));
        assert_eq!(registry.len(), 3);

        assert!(registry.setup_all().await.is_err());
        let reports = registry.teardown_all().await;

        let kinds: Vec<_> = reports.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            [EntityKind::Index, EntityKind::Template, EntityKind::Policy]
        );
        assert_eq!(
            *log.lock().unwrap(),
            [
                "setup:policy",
                "setup:template",
                "teardown:index",
                "teardown:template",
                "teardown:policy",
            ]
        );
    }

    #[tokio::test]
    async fn tracked_all_follows_registration_order() {
        let log = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut registry = FixtureRegistry::new();
        registry.register(Recorder::boxed(EntityKind::Component, false, &log));
        registry.register(Recorder::boxed(EntityKind::Snapshot, false, &log));

        let tracked = registry.tracked_all().await;
        assert_eq!(tracked[0].0, EntityKind::Component);
        assert_eq!(tracked[1].0, EntityKind::Snapshot);
        assert_eq!(registry.kinds(), [EntityKind::Component, EntityKind::Snapshot]);
    }
}
