#![no_main]

use arbitrary::Arbitrary;
use ironscope_engine::{ParseLimits, ProgressSender, TabularParser};
use libfuzzer_sys::fuzz_target;

/// 퍼저용 구조적 입력
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    delimiter: FuzzDelimiter,
    row_budget: u8,
    strict: bool,
    body: Vec<u8>,
}

#[derive(Arbitrary, Debug)]
enum FuzzDelimiter {
    Comma,
    Tab,
    Semicolon,
    Pipe,
}

impl FuzzDelimiter {
    fn byte(&self) -> u8 {
        match self {
            FuzzDelimiter::Comma => b',',
            FuzzDelimiter::Tab => b'\t',
            FuzzDelimiter::Semicolon => b';',
            FuzzDelimiter::Pipe => b'|',
        }
    }
}

fuzz_target!(|input: FuzzInput| {
    let limits = ParseLimits {
        row_budget: usize::from(input.row_budget).max(1),
        strict: input.strict,
        ..ParseLimits::default()
    };
    let parser = TabularParser::new(input.delimiter.byte(), limits);
    let total = input.body.len() as u64;
    if let Ok(output) = parser.parse(
        "fuzz.csv",
        input.body.as_slice(),
        total,
        &ProgressSender::disabled(),
    ) {
        assert!(output.stats.total <= limits.row_budget);
        assert_eq!(output.events.len(), output.stats.valid);
        assert!(output.errors.len() <= output.stats.invalid);
    }
});
