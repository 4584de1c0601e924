//! 메트릭 상수 및 설명 등록
//!
//! 분석 엔진이 기록하는 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 엔진은 이 상수를 사용하여 `metrics::counter!()`, `metrics::histogram!()`
//! 매크로를 호출합니다. 레코더가 설치되지 않은 경우 매크로는 아무 일도 하지 않습니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `ironscope_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(ironscope_core::metrics::EVENTS_PARSED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 심각도 레이블 키 (high, medium, low)
pub const LABEL_SEVERITY: &str = "severity";

/// 입력 형식 레이블 키 (sysmon_csv, event_log_csv, unknown_csv, sysmon_text)
pub const LABEL_FORMAT: &str = "format";

/// 결과 레이블 키 (success, 또는 실패 분류)
pub const LABEL_RESULT: &str = "result";

// ─── 분석 메트릭 ───────────────────────────────────────────────────

/// 완료된 분석 수 (counter, label: result)
pub const ANALYSES_TOTAL: &str = "ironscope_analyses_total";

/// 분석 소요 시간 (histogram, 초, label: format)
pub const ANALYSIS_DURATION_SECONDS: &str = "ironscope_analysis_duration_seconds";

/// 파싱된 유효 이벤트 수 (counter, label: format)
pub const EVENTS_PARSED_TOTAL: &str = "ironscope_events_parsed_total";

/// 버려진 잘못된 레코드 수 (counter, label: format)
pub const EVENTS_INVALID_TOTAL: &str = "ironscope_events_invalid_total";

/// 생성된 탐지 수 (counter, label: severity)
pub const DETECTIONS_TOTAL: &str = "ironscope_detections_total";

/// 형식 검증에서 거부된 입력 수 (counter, label: format)
pub const FORMAT_REJECTIONS_TOTAL: &str = "ironscope_format_rejections_total";

// ─── 히스토그램 버킷 ───────────────────────────────────────────────

/// 분석 소요 시간 히스토그램 버킷 (초)
pub const ANALYSIS_DURATION_BUCKETS: [f64; 9] = [0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 레코더를 설치한 직후 한 번 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_histogram};

    describe_counter!(ANALYSES_TOTAL, "Completed analyses by result");
    describe_histogram!(
        ANALYSIS_DURATION_SECONDS,
        "End-to-end analysis latency in seconds"
    );
    describe_counter!(EVENTS_PARSED_TOTAL, "Valid events produced by the parsers");
    describe_counter!(
        EVENTS_INVALID_TOTAL,
        "Raw records dropped because they failed validation"
    );
    describe_counter!(DETECTIONS_TOTAL, "Detections emitted by the rule engine");
    describe_counter!(
        FORMAT_REJECTIONS_TOTAL,
        "Inputs rejected by the format detector"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_METRIC_NAMES: &[&str] = &[
        ANALYSES_TOTAL,
        ANALYSIS_DURATION_SECONDS,
        EVENTS_PARSED_TOTAL,
        EVENTS_INVALID_TOTAL,
        DETECTIONS_TOTAL,
        FORMAT_REJECTIONS_TOTAL,
    ];

    #[test]
    fn all_metrics_start_with_ironscope_prefix() {
        for name in ALL_METRIC_NAMES {
            assert!(
                name.starts_with("ironscope_"),
                "Metric '{}' does not start with 'ironscope_' prefix",
                name
            );
        }
    }

    #[test]
    fn counters_end_with_total() {
        for name in ALL_METRIC_NAMES {
            assert!(name.ends_with("_total") || name.ends_with("_seconds"));
        }
    }

    #[test]
    fn describe_all_does_not_panic() {
        // 레코더가 없어도 패닉하지 않아야 함
        describe_all();
    }

    #[test]
    fn label_keys_are_lowercase() {
        for label in [LABEL_SEVERITY, LABEL_FORMAT, LABEL_RESULT] {
            assert_eq!(label.to_lowercase(), label);
        }
    }

    #[test]
    fn duration_buckets_are_sorted() {
        let buckets = ANALYSIS_DURATION_BUCKETS;
        for i in 1..buckets.len() {
            assert!(
                buckets[i] > buckets[i - 1],
                "Bucket values must be in ascending order"
            );
        }
    }
}
