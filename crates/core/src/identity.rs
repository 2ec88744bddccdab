//! 엔티티 식별: 안정적인 내부 ID와 교체 가능한 외부 이름
//!
//! 티어 이동은 엔티티의 외부 이름을 바꿉니다. 다른 구성 요소는 원시 이름 대신
//! [`EntityId`]로 엔티티를 참조하고, [`ManagedList`]가 ID를 현재 이름으로
//! 매핑합니다.
//!
//! # 불변 조건
//! - `current_name`은 백엔드가 현재 이 엔티티를 노출하는 유일한 이름
//! - `name_history`는 추가만 가능
//! - 재마운트는 값을 수정하지 않고 새 [`EntityIdentity`]로 통째로 교체

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::EntityKind;

/// 관리 목록 내부의 안정적인 엔티티 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 엔티티의 식별 정보 (불변 값)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityIdentity {
    kind: EntityKind,
    current_name: String,
    name_history: Vec<String>,
    policy: Option<String>,
}

impl EntityIdentity {
    pub fn new(kind: EntityKind, name: impl Into<String>, policy: Option<String>) -> Self {
        Self {
            kind,
            current_name: name.into(),
            name_history: Vec::new(),
            policy,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn current_name(&self) -> &str {
        &self.current_name
    }

    /// 이전 이름들 (오래된 순)
    pub fn name_history(&self) -> &[String] {
        &self.name_history
    }

    pub fn policy(&self) -> Option<&str> {
        self.policy.as_deref()
    }

    /// 최초 생성 시의 이름
    pub fn original_name(&self) -> &str {
        self.name_history
            .first()
            .map_or(self.current_name.as_str(), String::as_str)
    }

    /// 재마운트 후의 식별 정보를 새 값으로 만듭니다.
    ///
    /// 현재 이름은 기록에 추가되고 `new_name`이 현재 이름이 됩니다.
    pub fn remounted(&self, new_name: impl Into<String>) -> Self {
        let mut name_history = self.name_history.clone();
        name_history.push(self.current_name.clone());
        Self {
            kind: self.kind,
            current_name: new_name.into(),
            name_history,
            policy: self.policy.clone(),
        }
    }
}

/// 하나의 관리자가 소유하는 순서 있는 엔티티 목록
///
/// 삽입 순서가 보존되며, 마지막 원소가 롤오버 그룹의 현재 쓰기 대상입니다.
#[derive(Debug, Clone, Default)]
pub struct ManagedList {
    next_id: u64,
    order: Vec<EntityId>,
    slots: BTreeMap<EntityId, EntityIdentity>,
}

impl ManagedList {
    pub fn new() -> Self {
        Self::default()
    }

    /// 엔티티를 목록 끝에 추가하고 새 ID를 반환합니다.
    pub fn push(&mut self, identity: EntityIdentity) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        self.order.push(id);
        self.slots.insert(id, identity);
        id
    }

    pub fn get(&self, id: EntityId) -> Option<&EntityIdentity> {
        self.slots.get(&id)
    }

    /// 현재 이름으로 엔티티를 찾습니다.
    pub fn find(&self, name: &str) -> Option<EntityId> {
        self.order
            .iter()
            .copied()
            .find(|id| self.slots.get(id).is_some_and(|e| e.current_name() == name))
    }

    /// 재마운트된 엔티티의 식별 정보를 교체합니다.
    ///
    /// 존재하지 않는 ID면 `None`을 반환합니다.
    pub fn remount(&mut self, id: EntityId, new_name: &str) -> Option<&EntityIdentity> {
        let replaced = self.slots.get(&id)?.remounted(new_name);
        self.slots.insert(id, replaced);
        self.slots.get(&id)
    }

    /// 엔티티를 목록에서 제거합니다.
    pub fn remove(&mut self, id: EntityId) -> Option<EntityIdentity> {
        let removed = self.slots.remove(&id)?;
        self.order.retain(|existing| *existing != id);
        Some(removed)
    }

    /// 삽입 순서대로 ID를 반환합니다.
    pub fn ids(&self) -> Vec<EntityId> {
        self.order.clone()
    }

    /// 삽입 순서대로 (ID, 식별 정보)를 순회합니다.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &EntityIdentity)> {
        self.order
            .iter()
            .filter_map(|id| self.slots.get(id).map(|e| (*id, e)))
    }

    /// 현재 이름 목록 (삽입 순서)
    pub fn names(&self) -> Vec<String> {
        self.iter().map(|(_, e)| e.current_name().to_owned()).collect()
    }

    /// 마지막 원소 (롤오버 그룹의 쓰기 대상)
    pub fn last(&self) -> Option<&EntityIdentity> {
        self.order.last().and_then(|id| self.slots.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
