#![no_main]

use libfuzzer_sys::fuzz_target;
use tierbed_core::types::Phase;
use tierbed_lifecycle::{next_phase, next_target};

fuzz_target!(|data: &[u8]| {
    let Some((&start, ranks)) = data.split_first() else {
        return;
    };
    let Some(current) = Phase::from_rank(start % 6) else {
        return;
    };
    let phases: Vec<Phase> = ranks.iter().filter_map(|r| Phase::from_rank(r % 6)).collect();

    if let Some(next) = next_phase(&phases, current) {
        assert!(next > current);
        assert!(phases.contains(&next));
    }
    assert!(next_target(&phases, current) >= current);
});
