//! Orchestrator 통합 테스트: 계획 하나로 전체 setup/teardown

mod helpers;

use serde_json::json;
use tierbed_core::backend::memory::{Call, MemoryBackend};
use tierbed_core::backend::{Backend, policy_snapshot_name};
use tierbed_core::config::PlanKind;
use tierbed_core::types::{CreateOptions, EntityKind, Phase};
use tierbed_fixtures::{FixtureError, Orchestrator};
use tierbed_lifecycle::Waiter;

use helpers::{PREFIX, name};

fn tracked_of(tracked: &[(EntityKind, String)], kind: EntityKind) -> Vec<String> {
    tracked
        .iter()
        .filter(|(k, _)| *k == kind)
        .map(|(_, n)| n.clone())
        .collect()
}

fn created_kinds(backend: &MemoryBackend) -> Vec<EntityKind> {
    backend
        .journal()
        .iter()
        .filter_map(|c| match c {
            Call::Create { kind, .. } => Some(*kind),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn index_plan_migrates_and_cleans_up() {
    let backend = helpers::backend();
    let plan = helpers::plan(PlanKind::Index, &[Phase::Frozen, Phase::Cold, Phase::Hot]);
    let mut orchestrator = Orchestrator::build(backend.clone(), &plan, Waiter::default()).unwrap();

    orchestrator.setup().await.unwrap();

    assert_eq!(
        created_kinds(&backend),
        [
            EntityKind::Policy,
            EntityKind::Component,
            EntityKind::Component,
            EntityKind::Template,
            EntityKind::Index,
        ]
    );

    let tracked = orchestrator.tracked().await;
    let indices = tracked_of(&tracked, EntityKind::Index);
    let frozen = format!("partial-{}", name("idx", 1));
    let cold = format!("restored-{}", name("idx", 2));
    assert_eq!(indices, [frozen.clone(), cold.clone(), name("idx", 3)]);
    assert_eq!(backend.peek_phase(&frozen).unwrap().phase, Phase::Frozen);
    assert_eq!(backend.peek_phase(&cold).unwrap().phase, Phase::Cold);
    assert_eq!(backend.doc_count(&frozen), Some(5));

    // 쓰기 대상은 이동하지 않습니다.
    assert!(backend.peek_phase(&name("idx", 3)).is_some());
    assert!(
        !backend
            .journal()
            .iter()
            .any(|c| matches!(c, Call::MovePhase { name, .. } if *name == helpers::name("idx", 3)))
    );

    let snapshots = tracked_of(&tracked, EntityKind::Snapshot);
    assert_eq!(snapshots.len(), 2);
    assert_eq!(tracked_of(&tracked, EntityKind::Policy), [name("ilm", 1)]);

    assert!(orchestrator.teardown().await);
    assert!(backend.leftovers().is_empty(), "{:?}", backend.leftovers());
}

#[tokio::test(start_paused = true)]
async fn warm_target_stays_under_its_name() {
    let backend = helpers::backend();
    let plan = helpers::plan(PlanKind::Index, &[Phase::Warm, Phase::Hot]);
    let mut orchestrator = Orchestrator::build(backend.clone(), &plan, Waiter::default()).unwrap();

    orchestrator.setup().await.unwrap();

    assert_eq!(backend.peek_phase(&name("idx", 1)).unwrap().phase, Phase::Warm);
    assert!(orchestrator.teardown().await);
    assert!(backend.leftovers().is_empty());
}

#[tokio::test(start_paused = true)]
async fn data_stream_plan_migrates_backing_indices() {
    let backend = helpers::backend();
    let plan = helpers::plan(PlanKind::DataStream, &[Phase::Frozen, Phase::Hot]);
    let mut orchestrator = Orchestrator::build(backend.clone(), &plan, Waiter::default()).unwrap();

    orchestrator.setup().await.unwrap();

    let stream = name("ds", 1);
    let tracked = orchestrator.tracked().await;
    assert_eq!(tracked_of(&tracked, EntityKind::DataStream), [stream.clone()]);
    assert_eq!(
        tracked_of(&tracked, EntityKind::Index),
        [
            format!("partial-.ds-{stream}-000001"),
            format!(".ds-{stream}-000002"),
        ]
    );
    assert_eq!(tracked_of(&tracked, EntityKind::Snapshot).len(), 1);

    assert!(orchestrator.teardown().await);
    assert!(backend.leftovers().is_empty(), "{:?}", backend.leftovers());
}

#[tokio::test(start_paused = true)]
async fn unmanaged_plan_uses_manual_snapshots() {
    let backend = helpers::backend();
    let plan = helpers::unmanaged_plan(&[Phase::Cold, Phase::Hot]);
    let mut orchestrator = Orchestrator::build(backend.clone(), &plan, Waiter::default()).unwrap();

    orchestrator.setup().await.unwrap();

    let tracked = orchestrator.tracked().await;
    assert!(tracked_of(&tracked, EntityKind::Policy).is_empty());
    assert_eq!(
        tracked_of(&tracked, EntityKind::Index),
        [format!("restored-{}", name("idx", 1)), name("idx", 2)]
    );
    assert_eq!(tracked_of(&tracked, EntityKind::Snapshot), [name("snp", 1)]);
    assert_eq!(backend.move_count(), 0);

    assert!(orchestrator.teardown().await);
    assert!(backend.leftovers().is_empty());
}

#[tokio::test(start_paused = true)]
async fn contradictory_plan_creates_nothing() {
    let backend = helpers::backend();
    let mut plan = helpers::plan(PlanKind::Index, &[Phase::Cold]);
    plan.policy.repository.clear();

    let err = Orchestrator::build(backend.clone(), &plan, Waiter::default())
        .err()
        .expect("storage tier without repository");
    assert!(matches!(err, FixtureError::Config(_)));
    assert!(backend.journal().is_empty());
}

#[tokio::test(start_paused = true)]
async fn empty_uniq_is_generated() {
    let backend = helpers::backend();
    let mut plan = helpers::plan(PlanKind::Index, &[Phase::Hot]);
    plan.uniq.clear();

    let orchestrator = Orchestrator::build(backend, &plan, Waiter::default()).unwrap();
    assert_eq!(orchestrator.uniq().len(), 8);
    let (_, index_pattern) = orchestrator.patterns().last().unwrap();
    assert_eq!(
        *index_pattern,
        format!("*{PREFIX}-idx-{}-*", orchestrator.uniq())
    );
}

#[tokio::test(start_paused = true)]
async fn neighbouring_run_is_neither_templated_nor_collected() {
    let backend = helpers::backend();
    let plan = helpers::plan(PlanKind::Index, &[Phase::Frozen, Phase::Hot]);
    let mut orchestrator = Orchestrator::build(backend.clone(), &plan, Waiter::default()).unwrap();
    orchestrator.setup().await.unwrap();

    // 이웃 실행 `t10`의 인덱스는 이 실행의 템플릿 정책을 받지 않음
    let neighbour = format!("{PREFIX}-idx-{}0-000001", helpers::UNIQ);
    backend
        .create(EntityKind::Index, &neighbour, &CreateOptions::default())
        .await
        .unwrap();
    assert_eq!(backend.peek_phase(&neighbour).unwrap().policy, None);

    // 추적되지 않은 이 실행의 정책 스냅샷과 이웃 접두어의 정책 스냅샷
    let repository = CreateOptions::with_body(json!({ "repository": helpers::REPO }));
    let stray = policy_snapshot_name(&name("idx", 7), &name("ilm", 1));
    let foreign = policy_snapshot_name(&format!("x{}", name("idx", 1)), &name("ilm", 1));
    for snapshot in [&stray, &foreign] {
        backend
            .create(EntityKind::Snapshot, snapshot, &repository)
            .await
            .unwrap();
    }

    assert!(orchestrator.teardown().await);
    assert_eq!(
        backend.leftovers(),
        [
            (EntityKind::Index, neighbour),
            (EntityKind::Snapshot, foreign),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn failed_setup_reports_leak() {
    // 저장소가 없으면 정책 생성이 거부됩니다.
    let backend = std::sync::Arc::new(MemoryBackend::new());
    let plan = helpers::plan(PlanKind::Index, &[Phase::Hot]);
    let mut orchestrator = Orchestrator::build(backend.clone(), &plan, Waiter::default()).unwrap();

    assert!(orchestrator.setup().await.is_err());
    assert!(!orchestrator.teardown().await);
    assert!(backend.leftovers().is_empty());
}

#[tokio::test(start_paused = true)]
async fn leaked_index_blocks_its_policy_only() {
    let backend = helpers::backend();
    let plan = helpers::plan(PlanKind::Index, &[Phase::Hot, Phase::Hot]);
    let mut orchestrator = Orchestrator::build(backend.clone(), &plan, Waiter::default()).unwrap();
    orchestrator.setup().await.unwrap();
    backend.fail_delete(&name("idx", 1));

    let reports = orchestrator.teardown_reports().await;

    let kinds: Vec<_> = reports.iter().map(|r| r.kind).collect();
    assert_eq!(
        kinds,
        [
            EntityKind::Index,
            EntityKind::Snapshot,
            EntityKind::Template,
            EntityKind::Component,
            EntityKind::Policy,
        ]
    );
    assert_eq!(reports[0].failed.len(), 1);
    assert_eq!(reports[0].deleted, [name("idx", 2)]);
    assert!(reports[2].is_clean() && reports[3].is_clean());
    assert!(reports[4].failed[0].1.contains(&name("idx", 1)));
    assert_eq!(
        backend.leftovers(),
        [
            (EntityKind::Policy, name("ilm", 1)),
            (EntityKind::Index, name("idx", 1)),
        ]
    );
}
