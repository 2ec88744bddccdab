//! 도메인 타입: 시스템 전역에서 사용되는 공통 타입
//!
//! 단계([`Phase`]), 엔티티 종류([`EntityKind`]), 백엔드와 주고받는
//! 단계 상태 및 생성 옵션을 정의합니다.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 티어 이동으로 마운트된 복사본의 이름 접두어 (cold)
pub const RESTORED_PREFIX: &str = "restored-";

/// 티어 이동으로 마운트된 복사본의 이름 접두어 (frozen)
pub const PARTIAL_PREFIX: &str = "partial-";

/// 작업/스텝이 끝났음을 나타내는 값
pub const COMPLETE: &str = "complete";

/// 생명주기 단계
///
/// `Ord` 구현은 전역 순위를 따릅니다 (`New < Hot < Warm < Cold < Frozen < Delete`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// 정책 적용 전 초기 단계
    #[default]
    New,
    Hot,
    Warm,
    Cold,
    Frozen,
    /// 종료 단계, 이후 이동 없음
    Delete,
}

impl Phase {
    /// 순위 순서대로 나열한 전체 단계
    pub const ALL: [Phase; 6] = [
        Phase::New,
        Phase::Hot,
        Phase::Warm,
        Phase::Cold,
        Phase::Frozen,
        Phase::Delete,
    ];

    /// 단계의 전역 순위 (0..=5)
    pub fn rank(self) -> u8 {
        match self {
            Self::New => 0,
            Self::Hot => 1,
            Self::Warm => 2,
            Self::Cold => 3,
            Self::Frozen => 4,
            Self::Delete => 5,
        }
    }

    /// 순위로부터 단계를 찾습니다.
    pub fn from_rank(rank: u8) -> Option<Self> {
        Self::ALL.get(usize::from(rank)).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Hot => "hot",
            Self::Warm => "warm",
            Self::Cold => "cold",
            Self::Frozen => "frozen",
            Self::Delete => "delete",
        }
    }

    /// warm보다 순위가 높은 단계에서는 물리적 재마운트가 일어납니다.
    pub fn is_storage_migration(self) -> bool {
        self.rank() > Phase::Warm.rank()
    }

    /// 더 이상 진행하지 않는 단계인지 확인합니다.
    pub fn is_terminal(self) -> bool {
        self == Self::Delete
    }

    /// 이 티어로 마운트된 복사본에 붙는 이름 접두어
    ///
    /// 마운트가 없는 티어는 빈 문자열을 반환합니다.
    pub fn mount_prefix(self) -> &'static str {
        match self {
            Self::Cold => RESTORED_PREFIX,
            Self::Frozen => PARTIAL_PREFIX,
            _ => "",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s.trim().to_ascii_lowercase())
            .ok_or_else(|| format!("unknown phase '{s}'"))
    }
}

/// 마운트 접두어를 모두 제거한 원래 이름
pub fn strip_mount_prefix(name: &str) -> &str {
    let mut base = name;
    loop {
        if let Some(rest) = base.strip_prefix(RESTORED_PREFIX) {
            base = rest;
        } else if let Some(rest) = base.strip_prefix(PARTIAL_PREFIX) {
            base = rest;
        } else {
            return base;
        }
    }
}

/// 티어 이동 후 백엔드가 엔티티를 노출하는 이름
///
/// `tier.mount_prefix() + 원래 이름` 규칙을 따르는 순수 함수입니다.
/// 이미 마운트된 이름이 들어와도 기존 접두어를 떼고 다시 붙입니다.
pub fn mounted_name(name: &str, tier: Phase) -> String {
    format!("{}{}", tier.mount_prefix(), strip_mount_prefix(name))
}

/// 엔티티 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// 생명주기 정책
    Policy,
    /// 컴포넌트 템플릿
    Component,
    /// 인덱스 템플릿
    Template,
    Index,
    DataStream,
    Snapshot,
    /// 스냅샷 저장소 (관리 대상 아님, 존재 확인용)
    Repository,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Policy => "policy",
            Self::Component => "component",
            Self::Template => "template",
            Self::Index => "index",
            Self::DataStream => "data_stream",
            Self::Snapshot => "snapshot",
            Self::Repository => "repository",
        }
    }

    /// 생성 이름에 들어가는 종류 태그
    pub fn tag(self) -> &'static str {
        match self {
            Self::Policy => "ilm",
            Self::Component => "comp",
            Self::Template => "tmpl",
            Self::Index => "idx",
            Self::DataStream => "ds",
            Self::Snapshot => "snp",
            Self::Repository => "repo",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 백엔드가 보고하는 엔티티의 단계 상태
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseSnapshot {
    pub phase: Phase,
    pub action: String,
    pub step: String,
    /// 적용된 정책 (없으면 관리 대상 아님)
    pub policy: Option<String>,
}

impl PhaseSnapshot {
    /// 정책이 없는 엔티티의 상태
    pub fn unmanaged() -> Self {
        Self {
            phase: Phase::New,
            action: COMPLETE.to_owned(),
            step: COMPLETE.to_owned(),
            policy: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.action == COMPLETE && self.step == COMPLETE
    }
}

impl fmt::Display for PhaseSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "phase={} action={} step={}",
            self.phase, self.action, self.step
        )
    }
}

/// 단계 이동 요청의 스텝 키
///
/// `action`과 `step`이 없으면 단계 전체를 가리킵니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepKey {
    pub phase: Phase,
    pub action: Option<String>,
    pub step: Option<String>,
}

impl StepKey {
    /// 단계만 지정한 스텝 키
    pub fn phase(phase: Phase) -> Self {
        Self {
            phase,
            action: None,
            step: None,
        }
    }

    /// 현재 상태를 정확히 가리키는 스텝 키
    pub fn exact(snapshot: &PhaseSnapshot) -> Self {
        Self {
            phase: snapshot.phase,
            action: Some(snapshot.action.clone()),
            step: Some(snapshot.step.clone()),
        }
    }
}

/// 이름 해석 결과
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolved {
    /// 이름이 가리키는 물리 인덱스
    pub indices: Vec<String>,
    /// 이름과 일치하는 별칭
    pub aliases: Vec<String>,
    /// 이름과 일치하는 데이터 스트림
    pub data_streams: Vec<String>,
}

impl Resolved {
    /// 별칭이나 데이터 스트림 같은 그룹 이름인지 확인합니다.
    pub fn is_group(&self) -> bool {
        !self.aliases.is_empty() || !self.data_streams.is_empty()
    }
}

/// 생성 시 채울 문서 설정
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocFill {
    /// 문서 수
    pub count: u64,
    /// 검색 조건에 일치하는 문서로 채울지 여부
    pub matching: bool,
}

/// 엔티티 생성 옵션
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateOptions {
    /// 종류별 요청 본문 (정책 단계, 템플릿 패턴 등)
    pub body: serde_json::Value,
    /// 명시적으로 적용할 정책 (없으면 템플릿에서 결정)
    pub policy: Option<String>,
    /// 쓰기 대상으로 붙일 롤오버 별칭
    pub alias: Option<String>,
    /// 생성 직후 채울 문서
    pub docs: Option<DocFill>,
}

impl CreateOptions {
    pub fn with_body(body: serde_json::Value) -> Self {
        Self {
            body,
            ..Self::default()
        }
    }

    pub fn policy(mut self, policy: Option<String>) -> Self {
        self.policy = policy;
        self
    }

    pub fn alias(mut self, alias: Option<String>) -> Self {
        self.alias = alias;
        self
    }

    pub fn docs(mut self, docs: Option<DocFill>) -> Self {
        self.docs = docs;
        self
    }
}
