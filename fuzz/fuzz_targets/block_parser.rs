#![no_main]

use ironscope_engine::{BlockParser, ParseLimits, ProgressSender};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let parser = BlockParser::new(ParseLimits::default());
    if let Ok(output) = parser.parse(&text, &ProgressSender::disabled()) {
        assert_eq!(
            output.stats.total,
            output.stats.valid + output.stats.invalid
        );
        assert_eq!(output.events.len(), output.stats.valid);
        assert!(output.events.iter().all(|e| e.validate().is_ok()));
    }
});
