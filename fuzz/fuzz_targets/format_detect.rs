#![no_main]

use ironscope_engine::{Analyzer, EngineConfig, FormatDecision};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(analyzer) = Analyzer::new(EngineConfig::default()) else {
        return;
    };
    match analyzer.detect_format(data) {
        FormatDecision::Tabular(report) | FormatDecision::Rejected(report) => {
            assert!(report.confidence <= 100);
            // 필수 그룹이 빠지면 valid일 수 없음
            if report.missing_groups.iter().any(|g| g.is_mandatory()) {
                assert!(!report.valid);
            }
        }
        FormatDecision::Block { markers } => assert!(markers <= 5),
    }
});
