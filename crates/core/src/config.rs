//! 설정 관리: tierbed.toml 파싱 및 런타임 설정
//!
//! [`TierbedConfig`]는 로깅, 대기 상한, 픽스처 계획을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. 환경변수 (`TIERBED_PLAN_PREFIX=ci` 형식)
//! 2. 설정 파일 (`tierbed.toml`)
//! 3. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), tierbed_core::error::TierbedError> {
//! use tierbed_core::config::TierbedConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = TierbedConfig::load("tierbed.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = TierbedConfig::parse("[plan]\nprefix = \"ci\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, TierbedError};
use crate::types::{DocFill, EntityKind, PARTIAL_PREFIX, Phase, RESTORED_PREFIX};

/// 대기 간격 상한 (밀리초)
const MAX_WAIT_INTERVAL_MS: u64 = 60_000;
/// 대기 반복 횟수 상한
const MAX_WAIT_ITERATIONS: u32 = 100_000;
/// 자동 생성 고유 토큰 길이
const GENERATED_UNIQ_LEN: usize = 8;

/// tierbed 통합 설정
///
/// `tierbed.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TierbedConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 폴링 대기 설정
    #[serde(default)]
    pub wait: WaitConfig,
    /// 픽스처 계획
    #[serde(default)]
    pub plan: Plan,
}

impl TierbedConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, TierbedError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, TierbedError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TierbedError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                TierbedError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, TierbedError> {
        toml::from_str(toml_str).map_err(|e| {
            TierbedError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `TIERBED_{SECTION}_{FIELD}`
    /// 예: `TIERBED_POLICY_REPOSITORY=ci-snapshots`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "TIERBED_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "TIERBED_GENERAL_LOG_FORMAT");

        // Wait
        override_u64(&mut self.wait.interval_ms, "TIERBED_WAIT_INTERVAL_MS");
        override_u32(&mut self.wait.max_iterations, "TIERBED_WAIT_MAX_ITERATIONS");
        override_u64(&mut self.wait.timeout_secs, "TIERBED_WAIT_TIMEOUT_SECS");

        // Plan
        override_string(&mut self.plan.prefix, "TIERBED_PLAN_PREFIX");
        override_string(&mut self.plan.uniq, "TIERBED_PLAN_UNIQ");
        override_bool(&mut self.plan.policy.enabled, "TIERBED_POLICY_ENABLED");
        override_string(
            &mut self.plan.policy.repository,
            "TIERBED_POLICY_REPOSITORY",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), TierbedError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            )
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            )
            .into());
        }

        self.wait.validate()?;
        self.plan.validate()?;
        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 폴링 대기 설정
///
/// 모든 수렴 대기는 같은 상한을 공유합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitConfig {
    /// 폴링 간격 (밀리초)
    pub interval_ms: u64,
    /// 최대 반복 횟수
    pub max_iterations: u32,
    /// 전체 대기 시간 상한 (초, 0이면 반복 횟수만 적용)
    pub timeout_secs: u64,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            interval_ms: 2_500,
            max_iterations: 480,
            timeout_secs: 0,
        }
    }
}

impl WaitConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// 전체 대기 시간 상한 (설정되지 않았으면 `None`)
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_ms == 0 || self.interval_ms > MAX_WAIT_INTERVAL_MS {
            return Err(invalid(
                "wait.interval_ms",
                format!("must be 1-{MAX_WAIT_INTERVAL_MS}"),
            ));
        }
        if self.max_iterations == 0 || self.max_iterations > MAX_WAIT_ITERATIONS {
            return Err(invalid(
                "wait.max_iterations",
                format!("must be 1-{MAX_WAIT_ITERATIONS}"),
            ));
        }
        Ok(())
    }
}

/// 계획에서 만드는 주 엔티티 종류
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanKind {
    /// 인덱스 (정책이 있으면 롤오버 별칭으로 묶음)
    #[default]
    Index,
    /// 데이터 스트림
    DataStream,
}

impl PlanKind {
    pub fn entity_kind(self) -> EntityKind {
        match self {
            Self::Index => EntityKind::Index,
            Self::DataStream => EntityKind::DataStream,
        }
    }
}

/// 엔티티 하나의 생성 계획
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntitySpec {
    /// 채울 문서 수
    pub doc_count: u64,
    /// 검색 조건에 일치하는 문서로 채울지 여부
    pub match_docs: bool,
    /// 최종 목표 티어
    pub target_tier: Phase,
}

impl Default for EntitySpec {
    fn default() -> Self {
        Self {
            doc_count: 10,
            match_docs: true,
            target_tier: Phase::Hot,
        }
    }
}

impl EntitySpec {
    pub fn doc_fill(&self) -> Option<DocFill> {
        (self.doc_count > 0).then_some(DocFill {
            count: self.doc_count,
            matching: self.match_docs,
        })
    }
}

/// 생명주기 정책 계획
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// 정책 사용 여부
    pub enabled: bool,
    /// 정책 단계 (순위 오름차순)
    pub phases: Vec<Phase>,
    /// 스냅샷 저장소 (비어 있으면 없음)
    pub repository: String,
    /// 강제 병합 액션 포함 여부
    pub forcemerge: bool,
    /// 강제 병합 후 세그먼트 수
    pub max_num_segments: u32,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            phases: vec![Phase::Hot, Phase::Delete],
            repository: String::new(),
            forcemerge: false,
            max_num_segments: 1,
        }
    }
}

impl PolicyConfig {
    /// 저장소 이름 (설정되지 않았으면 `None`)
    pub fn repository(&self) -> Option<&str> {
        let repo = self.repository.trim();
        (!repo.is_empty()).then_some(repo)
    }

    /// 정책이 켜져 있고 해당 단계를 포함하는지 확인합니다.
    pub fn has_phase(&self, phase: Phase) -> bool {
        self.enabled && self.phases.contains(&phase)
    }
}

/// 픽스처 계획 (읽기 전용 입력)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Plan {
    /// 이름 접두어
    pub prefix: String,
    /// 실행마다 다른 고유 토큰 (비어 있으면 자동 생성)
    pub uniq: String,
    /// 주 엔티티 종류
    pub kind: PlanKind,
    /// 순서 있는 엔티티 생성 목록
    pub entities: Vec<EntitySpec>,
    /// 정책 계획
    pub policy: PolicyConfig,
}

impl Default for Plan {
    fn default() -> Self {
        Self {
            prefix: "tierbed".to_owned(),
            uniq: String::new(),
            kind: PlanKind::Index,
            entities: vec![EntitySpec::default(); 3],
            policy: PolicyConfig::default(),
        }
    }
}

impl Plan {
    /// 고유 토큰이 비어 있으면 새로 생성합니다.
    ///
    /// 이미 값이 있으면 그대로 둡니다. 결정된 토큰을 반환합니다.
    pub fn resolve_uniq(&mut self) -> &str {
        if self.uniq.trim().is_empty() {
            let token = uuid::Uuid::new_v4().simple().to_string();
            self.uniq = token[..GENERATED_UNIQ_LEN].to_owned();
        }
        &self.uniq
    }

    /// 계획의 유효성을 검증합니다.
    ///
    /// 모순된 계획(저장소 없이 저장 티어를 요청하는 경우 등)은 여기서 거부되며,
    /// 아무것도 생성되지 않습니다.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_token("plan.prefix", &self.prefix, false)?;
        validate_token("plan.uniq", &self.uniq, true)?;
        // 재마운트 접두어와 겹치면 원래 이름을 되찾을 수 없음
        if let Some(mount) = [RESTORED_PREFIX, PARTIAL_PREFIX]
            .into_iter()
            .find(|mount| self.prefix.starts_with(mount))
        {
            return Err(invalid("plan.prefix", format!("must not start with '{mount}'")));
        }

        if self.entities.is_empty() {
            return Err(invalid("plan.entities", "must contain at least one entity"));
        }

        for (i, entity) in self.entities.iter().enumerate() {
            if matches!(entity.target_tier, Phase::New | Phase::Delete) {
                return Err(invalid(
                    &format!("plan.entities[{i}].target_tier"),
                    "must be one of: hot, warm, cold, frozen",
                ));
            }
        }

        if self.kind == PlanKind::DataStream && !self.policy.enabled {
            // 데이터 스트림의 백킹 인덱스는 정책으로만 티어를 옮깁니다.
            if let Some(i) = self
                .entities
                .iter()
                .position(|e| e.target_tier.is_storage_migration())
            {
                return Err(invalid(
                    &format!("plan.entities[{i}].target_tier"),
                    "data stream tier migration requires an enabled policy",
                ));
            }
        }

        if !self.policy.enabled
            && let Some(i) = self
                .entities
                .iter()
                .position(|e| e.target_tier == Phase::Warm)
        {
            return Err(invalid(
                &format!("plan.entities[{i}].target_tier"),
                "'warm' is only reachable through an enabled policy",
            ));
        }

        if self.policy.enabled {
            self.validate_phases()?;
            for (i, entity) in self.entities.iter().enumerate() {
                let tier = entity.target_tier;
                if tier != Phase::Hot && !self.policy.phases.contains(&tier) {
                    return Err(invalid(
                        &format!("plan.entities[{i}].target_tier"),
                        format!("policy has no '{tier}' phase"),
                    ));
                }
            }
        }

        if self.needs_repository() && self.policy.repository().is_none() {
            return Err(invalid(
                "plan.policy.repository",
                "required when a cold or frozen tier is requested",
            ));
        }

        if self.policy.forcemerge && self.policy.max_num_segments == 0 {
            return Err(invalid("plan.policy.max_num_segments", "must be at least 1"));
        }

        Ok(())
    }

    /// 스냅샷 저장소가 필요한 계획인지 확인합니다.
    pub fn needs_repository(&self) -> bool {
        let policy_mounts = self.policy.has_phase(Phase::Cold) || self.policy.has_phase(Phase::Frozen);
        let entity_mounts = self
            .entities
            .iter()
            .any(|e| e.target_tier.is_storage_migration());
        policy_mounts || entity_mounts
    }

    fn validate_phases(&self) -> Result<(), ConfigError> {
        let phases = &self.policy.phases;
        if !phases.contains(&Phase::Hot) {
            return Err(invalid("plan.policy.phases", "must include 'hot'"));
        }
        if phases.contains(&Phase::New) {
            return Err(invalid("plan.policy.phases", "'new' is not a policy phase"));
        }
        if phases.windows(2).any(|w| w[0] >= w[1]) {
            return Err(invalid(
                "plan.policy.phases",
                "must be unique and ordered hot, warm, cold, frozen, delete",
            ));
        }
        Ok(())
    }
}

fn validate_token(field: &str, value: &str, allow_empty: bool) -> Result<(), ConfigError> {
    if value.is_empty() {
        if allow_empty {
            return Ok(());
        }
        return Err(invalid(field, "must not be empty"));
    }
    if value.starts_with(['-', '_', '+', '.']) {
        return Err(invalid(field, "must not start with '-', '_', '+' or '.'"));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        return Err(invalid(
            field,
            "must contain only lowercase letters, digits, '-' and '_'",
        ));
    }
    Ok(())
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
}

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
