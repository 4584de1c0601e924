#![no_main]

use std::sync::Arc;

use arbitrary::Arbitrary;
use ironscope_core::{CanonicalField, Event};
use ironscope_engine::{RuleEngine, RuleSet};
use libfuzzer_sys::fuzz_target;

/// 퍼저용 구조적 입력 (이벤트 최대 16개)
#[derive(Arbitrary, Debug)]
struct FuzzEvent {
    event_type: u8,
    image: String,
    command_line: String,
    target_object: String,
    query_name: String,
}

fuzz_target!(|events: Vec<FuzzEvent>| {
    let Ok(rules) = RuleSet::builtin() else {
        return;
    };
    let events: Vec<Event> = events
        .into_iter()
        .take(16)
        .map(|f| {
            let mut event = Event::new(u32::from(f.event_type), "2024-01-01 00:00:00");
            event.set(CanonicalField::Image, f.image);
            event.set(CanonicalField::CommandLine, f.command_line);
            event.set(CanonicalField::TargetObject, f.target_object);
            event.set(CanonicalField::QueryName, f.query_name);
            event
        })
        .collect();

    let engine = RuleEngine::new(Arc::new(rules), 10);
    for detection in engine.evaluate(&events) {
        assert!(detection.count >= 1 && detection.count <= events.len());
        assert!(detection.samples.len() <= 10);
        assert!(!detection.indicators.is_empty());
    }
});
