//! 이벤트 모델 벤치마크
//!
//! Event 필드 조회, 검증, 직렬화 성능을 측정합니다.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use ironscope_core::event::{CanonicalField, Event};

fn create_process_event() -> Event {
    let mut event = Event::new(1, "2024-01-15 10:00:00.123");
    event.set(CanonicalField::RecordId, "4242");
    event.set(CanonicalField::Host, "WS01.corp.local");
    event.set(CanonicalField::Image, r"C:\Windows\System32\WindowsPowerShell\v1.0\powershell.exe");
    event.set(
        CanonicalField::CommandLine,
        "powershell.exe -nop -w hidden -enc SQBFAFgAIAAoAE4AZQB3AC0ATwBiAGoAZQBjAHQA",
    );
    event.set(CanonicalField::ParentImage, r"C:\Program Files\Microsoft Office\WINWORD.EXE");
    event.set(CanonicalField::User, r"CORP\alice");
    event
        .extra
        .insert("ProcessGuid".to_owned(), "{5770385f-c22a-43e0-bf4c-06f5698ffbd9}".to_owned());
    event
        .extra
        .insert("IntegrityLevel".to_owned(), "Medium".to_owned());
    event
}

fn bench_field_lookup(c: &mut Criterion) {
    let event = create_process_event();

    let mut group = c.benchmark_group("event_field_lookup");
    group.throughput(Throughput::Elements(1));

    group.bench_function("canonical", |b| {
        b.iter(|| black_box(event.field(black_box("CommandLine"))))
    });

    group.bench_function("canonical_lowercase", |b| {
        b.iter(|| black_box(event.field(black_box("commandline"))))
    });

    group.bench_function("extra_fallback", |b| {
        b.iter(|| black_box(event.field(black_box("IntegrityLevel"))))
    });

    group.bench_function("missing", |b| {
        b.iter(|| black_box(event.field(black_box("QueryName"))))
    });

    group.finish();
}

fn bench_validate(c: &mut Criterion) {
    let event = create_process_event();
    c.bench_function("event_validate", |b| {
        b.iter(|| black_box(black_box(&event).validate()))
    });
}

fn bench_serialization(c: &mut Criterion) {
    let event = create_process_event();
    let json = serde_json::to_string(&event).unwrap_or_default();

    let mut group = c.benchmark_group("event_serialization");
    group.bench_function("to_json", |b| {
        b.iter(|| serde_json::to_string(black_box(&event)))
    });
    group.bench_function("from_json", |b| {
        b.iter(|| serde_json::from_str::<Event>(black_box(&json)))
    });
    group.finish();
}

criterion_group!(benches, bench_field_lookup, bench_validate, bench_serialization);
criterion_main!(benches);
