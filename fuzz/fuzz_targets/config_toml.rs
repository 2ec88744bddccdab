#![no_main]

use libfuzzer_sys::fuzz_target;
use tierbed_core::config::TierbedConfig;

fuzz_target!(|data: &[u8]| {
    if let Ok(content) = std::str::from_utf8(data) {
        if let Ok(mut config) = TierbedConfig::parse(content) {
            if config.validate().is_ok() {
                // 검증을 통과한 계획은 토큰 생성 후에도 유효해야 함
                config.plan.resolve_uniq();
                assert!(config.plan.validate().is_ok());
            }
        }
    }
});
