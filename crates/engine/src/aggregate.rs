//! 탐지/이벤트 집계
//!
//! 결과 요약에 들어가는 심각도 합계, 상위 전술, 이벤트 타입 분포를 계산합니다.
//! 모든 함수는 순수 함수입니다.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use ironscope_core::event::Event;
use ironscope_core::types::{EventType, Severity};

use crate::rule::Detection;

/// 심각도별 탐지 이벤트 합계 (`count` 합)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityTotals {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl SeverityTotals {
    /// 심각도별 값
    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
        }
    }

    /// 전체 합계
    pub fn total(&self) -> usize {
        self.high + self.medium + self.low
    }
}

/// 전술별 합계
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TacticCount {
    pub tactic: String,
    pub count: usize,
}

/// 이벤트 타입 분포
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTypeHistogram {
    pub process_create: usize,
    pub network_connect: usize,
    pub file_create: usize,
    /// 레지스트리 (12, 13, 14)
    pub registry: usize,
    pub dns_query: usize,
    pub other: usize,
}

impl EventTypeHistogram {
    /// 전체 이벤트 수
    pub fn total(&self) -> usize {
        self.process_create
            + self.network_connect
            + self.file_create
            + self.registry
            + self.dns_query
            + self.other
    }
}

/// 범주별 이벤트 수
///
/// 네트워크 = 3, 22 / 파일 = 11, 15, 23 / 레지스트리 = 12-14
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub network: usize,
    pub file: usize,
    pub registry: usize,
}

/// 심각도별 `count` 합계를 계산합니다.
pub fn severity_totals(detections: &[Detection]) -> SeverityTotals {
    let mut totals = SeverityTotals::default();
    for detection in detections {
        match detection.severity {
            Severity::High => totals.high += detection.count,
            Severity::Medium => totals.medium += detection.count,
            Severity::Low => totals.low += detection.count,
        }
    }
    totals
}

/// 전술별 `count` 합계 상위 `limit`개 (건수 내림차순, 동률이면 이름 오름차순)
pub fn top_tactics(detections: &[Detection], limit: usize) -> Vec<TacticCount> {
    let mut by_tactic: HashMap<&str, usize> = HashMap::new();
    for detection in detections {
        *by_tactic.entry(detection.tactic.as_str()).or_insert(0) += detection.count;
    }

    let mut tactics: Vec<TacticCount> = by_tactic
        .into_iter()
        .map(|(tactic, count)| TacticCount {
            tactic: tactic.to_owned(),
            count,
        })
        .collect();
    tactics.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tactic.cmp(&b.tactic)));
    tactics.truncate(limit);
    tactics
}

/// 이벤트 타입 분포를 계산합니다.
pub fn event_type_histogram(events: &[Event]) -> EventTypeHistogram {
    let mut histogram = EventTypeHistogram::default();
    for event in events {
        match event.kind() {
            EventType::ProcessCreate => histogram.process_create += 1,
            EventType::NetworkConnect => histogram.network_connect += 1,
            EventType::FileCreate => histogram.file_create += 1,
            EventType::DnsQuery => histogram.dns_query += 1,
            kind if kind.is_registry() => histogram.registry += 1,
            _ => histogram.other += 1,
        }
    }
    histogram
}

/// 범주별 이벤트 수를 계산합니다.
pub fn category_counts(events: &[Event]) -> CategoryCounts {
    let mut counts = CategoryCounts::default();
    for event in events {
        match event.event_type {
            3 | 22 => counts.network += 1,
            11 | 15 | 23 => counts.file += 1,
            12..=14 => counts.registry += 1,
            _ => {}
        }
    }
    counts
}

/// 스트림 순서 기준 첫/마지막 타임스탬프 (원본 문자열 그대로)
pub fn timestamp_bounds(events: &[Event]) -> (Option<String>, Option<String>) {
    let first = events.first().map(|e| e.timestamp.clone());
    let last = events.last().map(|e| e.timestamp.clone());
    (first, last)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(tactic: &str, severity: Severity, count: usize) -> Detection {
        Detection {
            rule_id: format!("{tactic}-{count}"),
            name: String::new(),
            technique: "T0000".to_owned(),
            tactic: tactic.to_owned(),
            severity,
            description: String::new(),
            confidence: 50,
            count,
            indicators: vec![],
            samples: vec![],
            mitre: None,
        }
    }

    fn events(codes: &[u32]) -> Vec<Event> {
        codes
            .iter()
            .enumerate()
            .map(|(i, code)| Event::new(*code, format!("t{i}")))
            .collect()
    }

    #[test]
    fn severity_totals_sum_counts() {
        let totals = severity_totals(&[
            detection("a", Severity::High, 2),
            detection("b", Severity::High, 3),
            detection("c", Severity::Low, 1),
        ]);
        assert_eq!(totals, SeverityTotals { high: 5, medium: 0, low: 1 });
        assert_eq!(totals.total(), 6);
        assert_eq!(totals.get(Severity::Medium), 0);
    }

    #[test]
    fn empty_detections_are_zero_filled() {
        assert_eq!(severity_totals(&[]), SeverityTotals::default());
        assert!(top_tactics(&[], 5).is_empty());
    }

    #[test]
    fn top_tactics_sorted_and_limited() {
        let detections = vec![
            detection("execution", Severity::Low, 2),
            detection("persistence", Severity::Low, 4),
            detection("discovery", Severity::Low, 2),
            detection("execution", Severity::Low, 1),
            detection("impact", Severity::Low, 1),
        ];
        let top = top_tactics(&detections, 3);
        let names: Vec<(&str, usize)> =
            top.iter().map(|t| (t.tactic.as_str(), t.count)).collect();
        assert_eq!(
            names,
            vec![("persistence", 4), ("execution", 3), ("discovery", 2)]
        );
    }

    #[test]
    fn histogram_buckets() {
        let h = event_type_histogram(&events(&[1, 1, 3, 11, 12, 13, 14, 22, 5, 99]));
        assert_eq!(h.process_create, 2);
        assert_eq!(h.network_connect, 1);
        assert_eq!(h.file_create, 1);
        assert_eq!(h.registry, 3);
        assert_eq!(h.dns_query, 1);
        assert_eq!(h.other, 2);
        assert_eq!(h.total(), 10);
    }

    #[test]
    fn category_counts_follow_code_groups() {
        let c = category_counts(&events(&[3, 22, 11, 15, 23, 12, 13, 14, 1, 7]));
        assert_eq!(c, CategoryCounts { network: 2, file: 3, registry: 3 });
    }

    #[test]
    fn timestamp_bounds_use_stream_order() {
        let evs = vec![Event::new(1, "2024-02-01"), Event::new(1, "2024-01-01")];
        let (first, last) = timestamp_bounds(&evs);
        assert_eq!(first.as_deref(), Some("2024-02-01"));
        assert_eq!(last.as_deref(), Some("2024-01-01"));
        assert_eq!(timestamp_bounds(&[]), (None, None));
    }
}
