//! 생명주기 통합 테스트 공용 헬퍼

#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use serde_json::{Value, json};
use tierbed_core::backend::Backend;
use tierbed_core::backend::memory::MemoryBackend;
use tierbed_core::types::{CreateOptions, EntityKind, Phase};
use tierbed_lifecycle::{LifecycleError, SnapshotLedger};

pub const POLICY: &str = "tb-ilm-t-000001";
pub const REPO: &str = "repo";

/// 주어진 단계로 정책 본문을 만듭니다. cold/frozen은 `REPO`에서 마운트합니다.
pub fn policy_body(phases: &[Phase]) -> Value {
    let mut map = serde_json::Map::new();
    for phase in phases {
        let actions = if phase.is_storage_migration() {
            json!({ "searchable_snapshot": { "snapshot_repository": REPO } })
        } else {
            json!({})
        };
        map.insert(phase.to_string(), json!({ "actions": actions }));
    }
    json!({ "policy": { "phases": map } })
}

pub async fn create_policy(backend: &MemoryBackend, phases: &[Phase]) {
    backend
        .create(EntityKind::Policy, POLICY, &CreateOptions::with_body(policy_body(phases)))
        .await
        .expect("policy");
}

pub async fn create_managed(backend: &MemoryBackend, name: &str, alias: Option<&str>) {
    backend
        .create(
            EntityKind::Index,
            name,
            &CreateOptions::default()
                .policy(Some(POLICY.to_owned()))
                .alias(alias.map(str::to_owned)),
        )
        .await
        .expect("index");
}

/// 기록만 하는 스냅샷 원장
#[derive(Debug, Default)]
pub struct RecordingLedger {
    counter: AtomicU32,
    recorded: Mutex<Vec<String>>,
}

impl RecordingLedger {
    pub fn recorded(&self) -> Vec<String> {
        self.recorded.lock().expect("lock").clone()
    }
}

impl SnapshotLedger for RecordingLedger {
    async fn next_snapshot_name(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("tb-snp-t-{n:06}")
    }

    async fn record(&self, snapshot: &str) -> Result<(), LifecycleError> {
        let mut recorded = self.recorded.lock().expect("lock");
        if !recorded.iter().any(|s| s == snapshot) {
            recorded.push(snapshot.to_owned());
        }
        Ok(())
    }
}
