//! 로그 파싱 모듈 -- 표 형식(CSV)과 블록 형식(텍스트 내보내기) 파서
//!
//! 두 파서는 구조가 전혀 다른 입력을 같은 계약으로 정규화합니다:
//! 입력 → [`ParseOutput`] (`Event` 목록, 행 에러 목록, 통계).
//!
//! # 지원 형식
//! - 헤더가 있는 구분자 형식 ([`TabularParser`]): Sysmon CSV, 이벤트 로그 CSV
//! - `Event[N]:` 블록 형식 ([`BlockParser`]): `wevtutil qe /f:text` 출력
//!
//! 레코드 검증, 예산, strict 모드, 에러 기록 정책은 두 파서가
//! [`RecordCollector`]를 통해 공유합니다.

pub mod block;
pub mod fields;
pub mod tabular;

pub use block::BlockParser;
pub use tabular::TabularParser;

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use ironscope_core::event::{CanonicalField, Event, EventValidationError};

use crate::config::EngineConfig;
use crate::error::{AnalysisError, RowError};
use crate::progress::{AnalysisStage, ProgressSender};

/// 파서 공통 제한 및 정책
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseLimits {
    /// 처리할 최대 레코드 수
    pub row_budget: usize,
    /// 첫 번째 잘못된 레코드에서 중단
    pub strict: bool,
    /// 잘못된 레코드를 에러 목록에 기록하지 않음
    pub skip_invalid_silently: bool,
    /// 기록할 최대 에러 수
    pub max_recorded_errors: usize,
    /// 진행 상황 보고 간격 (레코드 수)
    pub progress_every_rows: usize,
}

impl Default for ParseLimits {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for ParseLimits {
    fn from(config: &EngineConfig) -> Self {
        Self {
            row_budget: config.row_budget,
            strict: config.strict,
            skip_invalid_silently: config.skip_invalid_silently,
            max_recorded_errors: config.max_recorded_errors,
            progress_every_rows: config.progress_every_rows.max(1),
        }
    }
}

/// 파싱 통계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseStats {
    /// 처리한 레코드 수
    pub total: usize,
    /// 유효한 이벤트 수
    pub valid: usize,
    /// 잘못된 레코드 수
    pub invalid: usize,
    /// 소요 시간 (밀리초)
    pub elapsed_ms: u64,
}

/// 파서 출력
#[derive(Debug, Clone, Default)]
pub struct ParseOutput {
    /// 유효한 이벤트 (입력 순서 유지)
    pub events: Vec<Event>,
    /// 기록된 레코드 에러
    pub errors: Vec<RowError>,
    /// 통계
    pub stats: ParseStats,
    /// 예산에 도달하여 조기 종료했는지 여부
    pub truncated: bool,
}

/// 레코드 수집기 -- 검증 결과 누적, 예산, 진행 상황 보고
pub(crate) struct RecordCollector<'a> {
    limits: ParseLimits,
    progress: &'a ProgressSender,
    total_bytes: u64,
    last_percent: Option<u8>,
    started: Instant,
    output: ParseOutput,
}

impl<'a> RecordCollector<'a> {
    pub(crate) fn new(limits: ParseLimits, progress: &'a ProgressSender, total_bytes: u64) -> Self {
        Self {
            limits,
            progress,
            total_bytes,
            last_percent: None,
            started: Instant::now(),
            output: ParseOutput::default(),
        }
    }

    /// 예산에 도달했는지 여부
    pub(crate) fn budget_reached(&self) -> bool {
        self.output.stats.total >= self.limits.row_budget
    }

    /// 레코드 하나의 결과를 기록합니다.
    ///
    /// strict 모드에서 잘못된 레코드는 `AnalysisError::Row`로 반환됩니다.
    pub(crate) fn record(
        &mut self,
        outcome: Result<Event, EventValidationError>,
        make_error: impl FnOnce(String) -> RowError,
    ) -> Result<(), AnalysisError> {
        self.output.stats.total += 1;
        match outcome {
            Ok(event) => {
                self.output.stats.valid += 1;
                self.output.events.push(event);
            }
            Err(reason) => {
                self.output.stats.invalid += 1;
                let error = make_error(reason.to_string());
                if self.limits.strict {
                    return Err(AnalysisError::Row(error));
                }
                debug!(error = %error, "skipping invalid record");
                if !self.limits.skip_invalid_silently
                    && self.output.errors.len() < self.limits.max_recorded_errors
                {
                    self.output.errors.push(error);
                }
            }
        }
        Ok(())
    }

    /// 처리한 바이트 위치를 기준으로 진행 상황을 보고합니다.
    ///
    /// `progress_every_rows` 레코드마다, 정수 백분율이 바뀐 경우에만 전송합니다.
    pub(crate) fn maybe_report(&mut self, consumed_bytes: u64) {
        if self.output.stats.total % self.limits.progress_every_rows != 0 {
            return;
        }
        let percent = if self.total_bytes == 0 {
            100
        } else {
            (consumed_bytes.min(self.total_bytes) * 100 / self.total_bytes) as u8
        };
        if self.last_percent != Some(percent) {
            self.last_percent = Some(percent);
            self.progress.report(AnalysisStage::Parsing, percent);
        }
    }

    /// 수집을 마치고 출력을 반환합니다.
    pub(crate) fn finish(mut self, truncated: bool) -> ParseOutput {
        self.output.truncated = truncated;
        self.output.stats.elapsed_ms = self.started.elapsed().as_millis() as u64;
        if self.output.stats.invalid > 0 {
            warn!(
                invalid = self.output.stats.invalid,
                recorded = self.output.errors.len(),
                "invalid records were skipped"
            );
        }
        if truncated {
            warn!(
                row_budget = self.limits.row_budget,
                "row budget reached, remaining input ignored"
            );
        }
        self.progress.report(AnalysisStage::Parsing, 100);
        self.output
    }
}

/// 원본 필드를 이벤트에 채웁니다.
///
/// 정규 필드에 해당하면 비어 있는 경우에만 설정하고(먼저 나온 값 우선),
/// 아니면 `extra`에 원래 이름으로 보존합니다. `EventID`가 숫자로 해석되면
/// `true`를 반환합니다.
pub(crate) fn apply_field(event: &mut Event, name: &str, value: &str) -> bool {
    match fields::canonical_field(name) {
        Some(CanonicalField::EventId) => match value.parse::<u32>() {
            Ok(code) => {
                event.event_type = code;
                true
            }
            Err(_) => {
                event
                    .extra
                    .entry(name.to_owned())
                    .or_insert_with(|| value.to_owned());
                false
            }
        },
        Some(field) => {
            if event.get(field).is_none() {
                event.set(field, value);
            }
            false
        }
        None => {
            event
                .extra
                .entry(name.to_owned())
                .or_insert_with(|| value.to_owned());
            false
        }
    }
}

/// 여러 줄 `Key: Value` 텍스트(예: 이벤트 로그 CSV의 `Message` 열)에서
/// 비어 있는 정규 필드만 채웁니다.
pub(crate) fn fill_from_key_values(event: &mut Event, text: &str) {
    for line in text.lines() {
        let Some((key, Some(value))) = fields::split_key_value(line) else {
            continue;
        };
        match fields::canonical_field(key) {
            Some(CanonicalField::EventId) | None => {}
            Some(field) => {
                if event.get(field).is_none() {
                    event.set(field, value);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_event() -> Event {
        let mut event = Event::new(1, "2024-01-15 10:00:00");
        event.set(CanonicalField::Image, "cmd.exe");
        event
    }

    #[test]
    fn collector_counts_valid_and_invalid() {
        let progress = ProgressSender::disabled();
        let mut collector = RecordCollector::new(ParseLimits::default(), &progress, 100);
        collector
            .record(Ok(valid_event()), |r| RowError::row(2, r))
            .unwrap();
        collector
            .record(Err(EventValidationError::MissingTimestamp), |r| {
                RowError::row(3, r)
            })
            .unwrap();
        let output = collector.finish(false);
        assert_eq!(output.stats.total, 2);
        assert_eq!(output.stats.valid, 1);
        assert_eq!(output.stats.invalid, 1);
        assert_eq!(output.errors[0].to_string(), "Row 3: missing timestamp");
    }

    #[test]
    fn collector_strict_mode_aborts() {
        let progress = ProgressSender::disabled();
        let limits = ParseLimits {
            strict: true,
            ..ParseLimits::default()
        };
        let mut collector = RecordCollector::new(limits, &progress, 100);
        let err = collector
            .record(Err(EventValidationError::MissingEventType), |r| {
                RowError::row(2, r)
            })
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Row(ref e) if e.row == 2));
    }

    #[test]
    fn collector_silent_skip_records_no_errors() {
        let progress = ProgressSender::disabled();
        let limits = ParseLimits {
            skip_invalid_silently: true,
            ..ParseLimits::default()
        };
        let mut collector = RecordCollector::new(limits, &progress, 100);
        collector
            .record(Err(EventValidationError::MissingIdentity), |r| {
                RowError::row(2, r)
            })
            .unwrap();
        let output = collector.finish(false);
        assert_eq!(output.stats.invalid, 1);
        assert!(output.errors.is_empty());
    }

    #[test]
    fn collector_caps_recorded_errors() {
        let progress = ProgressSender::disabled();
        let limits = ParseLimits {
            max_recorded_errors: 2,
            ..ParseLimits::default()
        };
        let mut collector = RecordCollector::new(limits, &progress, 100);
        for row in 2..7 {
            collector
                .record(Err(EventValidationError::MissingTimestamp), |r| {
                    RowError::row(row, r)
                })
                .unwrap();
        }
        let output = collector.finish(false);
        assert_eq!(output.stats.invalid, 5);
        assert_eq!(output.errors.len(), 2);
    }

    #[test]
    fn collector_budget() {
        let progress = ProgressSender::disabled();
        let limits = ParseLimits {
            row_budget: 1,
            ..ParseLimits::default()
        };
        let mut collector = RecordCollector::new(limits, &progress, 100);
        assert!(!collector.budget_reached());
        collector
            .record(Ok(valid_event()), |r| RowError::row(2, r))
            .unwrap();
        assert!(collector.budget_reached());
    }

    #[test]
    fn apply_field_keeps_first_value_and_preserves_unknown() {
        let mut event = Event::default();
        assert!(apply_field(&mut event, "Event ID", "3"));
        assert!(!apply_field(&mut event, "UtcTime", "t1"));
        apply_field(&mut event, "Date", "t2");
        apply_field(&mut event, "Hashes", "SHA256=abc");
        assert_eq!(event.event_type, 3);
        assert_eq!(event.timestamp, "t1");
        assert_eq!(event.extra["Hashes"], "SHA256=abc");
    }

    #[test]
    fn apply_field_non_numeric_event_id_is_not_accepted() {
        let mut event = Event::default();
        assert!(!apply_field(&mut event, "EventID", "Process Create"));
        assert_eq!(event.extra["EventID"], "Process Create");
    }

    #[test]
    fn fill_from_key_values_only_fills_gaps() {
        let mut event = Event::new(1, "t");
        event.set(CanonicalField::Image, "explicit.exe");
        fill_from_key_values(
            &mut event,
            "Process Create:\r\nImage: C:\\other.exe\r\nCommandLine: other.exe /x\r\nUser: -",
        );
        assert_eq!(event.image.as_deref(), Some("explicit.exe"));
        assert_eq!(event.command_line.as_deref(), Some("other.exe /x"));
        assert!(event.user.is_none());
    }
}
