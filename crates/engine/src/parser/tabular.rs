//! 표 형식(구분자 + 헤더) 파서
//!
//! `csv` 크레이트로 입력을 한 번의 스트리밍 패스로 읽습니다. 행은 중간 테이블로
//! 모으지 않고 읽는 즉시 [`Event`]로 변환됩니다.
//!
//! 행 번호는 헤더를 1행으로 셉니다 (첫 데이터 행 = 2행).

use std::io::Read;

use csv::{ReaderBuilder, StringRecord};
use tracing::{debug, info};

use ironscope_core::event::{Event, EventValidationError};

use super::fields::{clean_value, normalize_key};
use super::{ParseLimits, ParseOutput, RecordCollector, apply_field, fill_from_key_values};
use crate::error::{AnalysisError, RowError};
use crate::progress::ProgressSender;

/// 메시지 본문 열 (정규화된 이름)
const MESSAGE_COLUMN: &str = "message";

/// 표 형식 파서
#[derive(Debug, Clone)]
pub struct TabularParser {
    /// 필드 구분자
    delimiter: u8,
    /// 공통 제한
    limits: ParseLimits,
}

impl TabularParser {
    /// 새 파서를 생성합니다.
    pub fn new(delimiter: u8, limits: ParseLimits) -> Self {
        Self { delimiter, limits }
    }

    /// 입력 스트림을 파싱합니다.
    ///
    /// `total_bytes`는 진행률 계산에만 사용됩니다 (모르면 0).
    /// 스트림 읽기 실패는 `AnalysisError::Io`로 전체 파싱을 실패시킵니다.
    pub fn parse<R: Read>(
        &self,
        source_name: &str,
        reader: R,
        total_bytes: u64,
        progress: &ProgressSender,
    ) -> Result<ParseOutput, AnalysisError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers = reader
            .headers()
            .map_err(|e| csv_error(source_name, e))?
            .clone();
        let message_column = headers
            .iter()
            .position(|h| normalize_key(h) == MESSAGE_COLUMN);

        debug!(
            columns = headers.len(),
            delimiter = %char::from(self.delimiter),
            "tabular header parsed"
        );

        let mut collector = RecordCollector::new(self.limits, progress, total_bytes);
        let mut record = StringRecord::new();
        let mut row = 1usize;
        let mut truncated = false;

        loop {
            if collector.budget_reached() {
                truncated = true;
                break;
            }
            let more = match reader.read_record(&mut record) {
                Ok(more) => more,
                Err(e) if e.is_io_error() => return Err(csv_error(source_name, e)),
                Err(e) => {
                    // 인코딩 등 행 단위 문제는 해당 행만 무효 처리
                    row += 1;
                    let reason = e.to_string();
                    collector.record(Err(EventValidationError::MissingEventType), |_| {
                        RowError::row(row, reason)
                    })?;
                    continue;
                }
            };
            if !more {
                break;
            }
            row += 1;

            let outcome = build_event(&headers, &record, message_column);
            collector.record(outcome, |reason| RowError::row(row, reason))?;
            collector.maybe_report(reader.position().byte());
        }

        let output = collector.finish(truncated);
        info!(
            total = output.stats.total,
            valid = output.stats.valid,
            invalid = output.stats.invalid,
            elapsed_ms = output.stats.elapsed_ms,
            "tabular parse complete"
        );
        Ok(output)
    }
}

/// 한 행을 이벤트로 변환합니다.
fn build_event(
    headers: &StringRecord,
    record: &StringRecord,
    message_column: Option<usize>,
) -> Result<Event, EventValidationError> {
    let mut event = Event::default();
    let mut has_event_id = false;

    for (name, raw) in headers.iter().zip(record.iter()) {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        if let Some(value) = clean_value(raw) {
            has_event_id |= apply_field(&mut event, name, value);
        }
    }

    if let Some(message) = message_column.and_then(|idx| record.get(idx)) {
        fill_from_key_values(&mut event, message);
    }

    if !has_event_id {
        return Err(EventValidationError::MissingEventType);
    }
    event.validate()?;
    Ok(event)
}

fn csv_error(source_name: &str, err: csv::Error) -> AnalysisError {
    let source = match err.into_kind() {
        csv::ErrorKind::Io(io) => io,
        other => std::io::Error::new(std::io::ErrorKind::InvalidData, format!("{other:?}")),
    };
    AnalysisError::Io {
        path: source_name.to_owned(),
        source,
    }
}
