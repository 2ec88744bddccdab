#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tierbed_core::backend::wildcard_match;
use tierbed_core::types::{Phase, mounted_name, strip_mount_prefix};

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    pattern: String,
    name: String,
    frozen: bool,
}

fuzz_target!(|input: FuzzInput| {
    let _ = wildcard_match(&input.pattern, &input.name);

    // 별표 없는 패턴은 완전 일치
    if !input.pattern.contains('*') {
        assert_eq!(
            wildcard_match(&input.pattern, &input.name),
            input.pattern == input.name
        );
    }

    // 앞뒤 별표 패턴은 재마운트된 이름도 찾아야 함
    if !input.name.contains('*') {
        let tier = if input.frozen { Phase::Frozen } else { Phase::Cold };
        let base = strip_mount_prefix(&input.name);
        let mounted = mounted_name(&input.name, tier);
        assert!(wildcard_match(&format!("*{base}*"), &mounted));
        assert_eq!(strip_mount_prefix(&mounted), strip_mount_prefix(&input.name));
    }
});
