//! 엔티티 이름 생성
//!
//! 모든 픽스처 이름은 `{prefix}-{tag}-{uniq}-{NNNNNN}` 형식입니다.
//! 접미 번호는 6자리 0 채움이며, 한 실행 안에서 절대 재사용되지 않습니다.

use tierbed_core::types::{EntityKind, Phase};

/// 접미 번호 자릿수
pub const SUFFIX_WIDTH: usize = 6;

/// 종류 하나의 이름 공간
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namer {
    base: String,
    issued: u32,
}

impl Namer {
    pub fn new(prefix: &str, kind: EntityKind, uniq: &str) -> Self {
        Self {
            base: format!("{prefix}-{}-{uniq}", kind.tag()),
            issued: 0,
        }
    }

    /// 접미 번호를 뺀 이름 (`{prefix}-{tag}-{uniq}`)
    ///
    /// 롤오버 별칭 이름과 템플릿 패턴의 기준으로도 쓰입니다.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// 다음 이름을 발급합니다.
    pub fn next_name(&mut self) -> String {
        self.issued += 1;
        self.name_at(self.issued)
    }

    /// 발급하지 않고 `offset`번째 뒤의 이름을 미리 봅니다.
    ///
    /// `peek(1)`은 다음 `next_name()`이 돌려줄 이름입니다.
    pub fn peek(&self, offset: u32) -> String {
        self.name_at(self.issued + offset)
    }

    /// 이 이름 공간을 찾는 스캔 패턴 (`*{base}-*`)
    ///
    /// 앞쪽 와일드카드는 `partial-…`처럼 재마운트된 이름도 포함합니다.
    /// 패턴은 다른 이름 공간(`x{prefix}`, `{uniq}0` 등)과도 겹칠 수 있으므로
    /// 스캔 결과는 반드시 [`owns`](Self::owns)로 걸러야 합니다.
    pub fn pattern(&self) -> String {
        format!("*{}-*", self.base)
    }

    /// 이 이름 공간이 발급한 이름인지 확인합니다.
    ///
    /// `{base}-{숫자}` 이거나, 그 앞에 마운트 접두어가 하나 붙은 경우만 해당합니다.
    pub fn owns(&self, name: &str) -> bool {
        let issued = [Phase::Cold, Phase::Frozen]
            .into_iter()
            .find_map(|tier| name.strip_prefix(tier.mount_prefix()))
            .unwrap_or(name);
        issued
            .strip_prefix(self.base.as_str())
            .and_then(|rest| rest.strip_prefix('-'))
            .is_some_and(|suffix| {
                suffix.len() >= SUFFIX_WIDTH && suffix.bytes().all(|b| b.is_ascii_digit())
            })
    }

    /// 지금까지 발급한 이름 수
    pub fn issued(&self) -> u32 {
        self.issued
    }

    fn name_at(&self, n: u32) -> String {
        format!("{}-{n:0width$}", self.base, width = SUFFIX_WIDTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tierbed_core::backend::wildcard_match;
    use tierbed_core::types::mounted_name;

    #[test]
    fn first_name_has_suffix_one() {
        let mut namer = Namer::new("tb", EntityKind::Index, "u1");
        assert_eq!(namer.next_name(), "tb-idx-u1-000001");
        assert_eq!(namer.next_name(), "tb-idx-u1-000002");
        assert_eq!(namer.issued(), 2);
    }

    #[test]
    fn peek_does_not_issue() {
        let mut namer = Namer::new("tb", EntityKind::Component, "u1");
        assert_eq!(namer.peek(1), "tb-comp-u1-000001");
        assert_eq!(namer.peek(2), "tb-comp-u1-000002");
        assert_eq!(namer.next_name(), "tb-comp-u1-000001");
    }

    #[test]
    fn pattern_covers_remounted_names() {
        let mut namer = Namer::new("tb", EntityKind::Index, "u1");
        let name = namer.next_name();
        let pattern = namer.pattern();
        assert_eq!(pattern, "*tb-idx-u1-*");
        assert!(wildcard_match(&pattern, &name));
        assert!(wildcard_match(&pattern, &mounted_name(&name, Phase::Frozen)));
        assert!(!wildcard_match(&pattern, "tb-ds-u1-000001"));
        assert!(!wildcard_match(&pattern, "tb-idx-u10-000001"));
    }

    #[test]
    fn owns_only_its_own_namespace() {
        let mut namer = Namer::new("tb", EntityKind::Component, "run1");
        let name = namer.next_name();
        assert!(namer.owns(&name));
        assert!(namer.owns(&mounted_name(&name, Phase::Cold)));
        assert!(namer.owns(&mounted_name(&name, Phase::Frozen)));

        // 패턴에는 걸리지만 다른 실행의 이름
        for sibling in [
            "xtb-comp-run1-000001",
            "tb-comp-run10-000001",
            "tb-comp-run1-b-000001",
            "partial-xtb-comp-run1-000001",
        ] {
            assert!(!namer.owns(sibling), "{sibling} belongs to another run");
        }
        assert!(!namer.owns("tb-comp-run1-"));
        assert!(!namer.owns("tb-comp-run1-000001-tb-ilm-run1-000001-snapshot"));
        assert!(!namer.owns("tb-comp-run1"));
    }

    proptest! {
        #[test]
        fn suffix_is_six_digits_and_increasing(count in 1usize..200) {
            let mut namer = Namer::new("tb", EntityKind::Snapshot, "x");
            let mut previous = 0u32;
            for _ in 0..count {
                let name = namer.next_name();
                let suffix = name.rsplit('-').next().unwrap_or_default();
                prop_assert_eq!(suffix.len(), SUFFIX_WIDTH);
                let n: u32 = suffix.parse().unwrap();
                prop_assert!(n > previous);
                previous = n;
            }
        }

        #[test]
        fn extended_uniq_or_prefix_is_never_owned(
            uniq in "[a-z][a-z0-9]{0,7}",
            extra in "[a-z0-9_-]{1,4}",
            n in 1u32..1000,
        ) {
            let namer = Namer::new("tb", EntityKind::Index, &uniq);
            let longer_uniq = Namer::new("tb", EntityKind::Index, &format!("{uniq}{extra}"));
            let longer_prefix = Namer::new(&format!("x{extra}tb"), EntityKind::Index, &uniq);
            prop_assert!(namer.owns(&namer.peek(n)));
            prop_assert!(!namer.owns(&longer_uniq.peek(n)));
            prop_assert!(!namer.owns(&longer_prefix.peek(n)));
        }
    }
}
