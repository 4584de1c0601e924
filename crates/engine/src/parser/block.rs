//! 블록 형식 파서 -- `wevtutil qe /f:text` 스타일 텍스트 내보내기
//!
//! ```text
//! Event[0]:
//!   Log Name: Microsoft-Windows-Sysmon/Operational
//!   Source: Microsoft-Windows-Sysmon
//!   Date: 2024-01-15T10:00:00.123
//!   Event ID: 1
//!   Task: Process Create (rule: ProcessCreate)
//!   Computer: WS01
//!   Description:
//! Process Create:
//! UtcTime: 2024-01-15 10:00:00.123
//! Image: C:\Windows\System32\cmd.exe
//! ```
//!
//! 블록은 `Event[N]:` 헤더로 나누고, 헤더가 없으면 빈 줄로 나눕니다.
//! `Description:` 이전 줄은 봉투(envelope) 메타데이터, 이후 줄은 페이로드입니다.
//! 병합 시 페이로드 값이 우선하며 봉투 값은 빈 필드만 채웁니다.

use tracing::{debug, info};

use ironscope_core::event::{Event, EventValidationError};

use super::fields::{event_id_from_task, split_key_value};
use super::{ParseLimits, ParseOutput, RecordCollector, apply_field};
use crate::error::{AnalysisError, RowError};
use crate::progress::ProgressSender;

/// 페이로드 시작 마커
const PAYLOAD_MARKER: &str = "Description";

/// 이벤트 타입 대체 필드
const TASK_KEY: &str = "Task";

/// 블록 형식 파서
#[derive(Debug, Clone)]
pub struct BlockParser {
    limits: ParseLimits,
}

impl BlockParser {
    /// 새 파서를 생성합니다.
    pub fn new(limits: ParseLimits) -> Self {
        Self { limits }
    }

    /// 텍스트에 나타나는 블록 형식 마커 종류 수를 셉니다 (0-5).
    ///
    /// 페이로드 마커(`Description:`), ID 마커(`Event ID:`), 타임스탬프 마커(`Date:`),
    /// 공급자 이름(`Microsoft-Windows-Sysmon`), `Source:`/`Log Name:` 줄의
    /// `Microsoft-Windows-` 공급자를 각각 한 번씩 셉니다.
    pub fn count_markers(text: &str) -> usize {
        let mut payload = false;
        let mut event_id = false;
        let mut date = false;
        let mut provider_line = false;

        for line in text.lines() {
            let Some((key, value)) = split_key_value(line) else {
                continue;
            };
            match key {
                "Description" => payload = true,
                "Event ID" => event_id = true,
                "Date" => date = true,
                "Source" | "Log Name" => {
                    if value.is_some_and(|v| v.starts_with("Microsoft-Windows-")) {
                        provider_line = true;
                    }
                }
                _ => {}
            }
            if payload && event_id && date && provider_line {
                break;
            }
        }

        let sysmon = text.contains("Microsoft-Windows-Sysmon");
        [payload, event_id, date, sysmon, provider_line]
            .into_iter()
            .filter(|hit| *hit)
            .count()
    }

    /// 마커 수가 임계값 이상이면 블록 형식으로 판정합니다.
    pub fn looks_like_block_export(text: &str, threshold: usize) -> bool {
        Self::count_markers(text) >= threshold
    }

    /// 블록 형식 텍스트를 파싱합니다.
    pub fn parse(&self, text: &str, progress: &ProgressSender) -> Result<ParseOutput, AnalysisError> {
        let blocks = split_blocks(text);
        debug!(blocks = blocks.len(), "block export split");

        let mut collector = RecordCollector::new(self.limits, progress, text.len() as u64);
        let mut truncated = false;

        for (index, block) in blocks.iter().enumerate() {
            if collector.budget_reached() {
                truncated = true;
                break;
            }
            let number = index + 1;
            let outcome = parse_block(block.body);
            collector.record(outcome, |reason| RowError::block(number, reason))?;
            collector.maybe_report((block.offset + block.body.len()) as u64);
        }

        let output = collector.finish(truncated);
        info!(
            total = output.stats.total,
            valid = output.stats.valid,
            invalid = output.stats.invalid,
            elapsed_ms = output.stats.elapsed_ms,
            "block parse complete"
        );
        Ok(output)
    }
}

/// 블록 하나 (본문과 원본 내 바이트 오프셋)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Block<'a> {
    offset: usize,
    body: &'a str,
}

/// `Event[N]:` 헤더 줄 여부
fn is_record_header(line: &str) -> bool {
    let Some(inner) = line
        .trim()
        .strip_prefix("Event[")
        .and_then(|rest| rest.strip_suffix("]:"))
    else {
        return false;
    };
    !inner.is_empty() && inner.chars().all(|c| c.is_ascii_digit())
}

/// 텍스트를 블록으로 나눕니다.
///
/// `Event[N]:` 헤더가 하나라도 있으면 헤더 기준으로 나누고 첫 헤더 이전 내용은
/// 버립니다. 헤더가 없으면 빈 줄 묶음을 경계로 나눕니다. 공백뿐인 블록은 제외합니다.
fn split_blocks(text: &str) -> Vec<Block<'_>> {
    // (줄 시작 오프셋, 줄) 목록
    let mut lines = Vec::new();
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        lines.push((offset, line));
        offset += line.len();
    }

    let has_headers = lines.iter().any(|(_, line)| is_record_header(line));
    let mut blocks = Vec::new();
    let mut start: Option<usize> = None;

    for (line_start, line) in &lines {
        if has_headers {
            if is_record_header(line) {
                close_block(text, start, *line_start, &mut blocks);
                start = Some(*line_start + line.len());
            }
        } else if line.trim().is_empty() {
            close_block(text, start, *line_start, &mut blocks);
            start = None;
        } else if start.is_none() {
            start = Some(*line_start);
        }
    }
    close_block(text, start, text.len(), &mut blocks);
    blocks
}

fn close_block<'a>(text: &'a str, start: Option<usize>, end: usize, blocks: &mut Vec<Block<'a>>) {
    let Some(begin) = start else {
        return;
    };
    let body = &text[begin..end];
    if !body.trim().is_empty() {
        blocks.push(Block {
            offset: begin,
            body,
        });
    }
}

/// 블록 하나를 이벤트로 변환합니다.
fn parse_block(body: &str) -> Result<Event, EventValidationError> {
    let mut envelope: Vec<(&str, &str)> = Vec::new();
    let mut payload: Vec<(&str, &str)> = Vec::new();
    let mut payload_title: Option<&str> = None;
    let mut in_payload = false;

    for line in body.lines() {
        let Some((key, value)) = split_key_value(line) else {
            continue;
        };
        if !in_payload {
            if key == PAYLOAD_MARKER {
                in_payload = true;
                // `Description: Process Create:` 처럼 같은 줄에 이어지는 경우
                if let Some(rest) = value {
                    match split_key_value(rest) {
                        Some((inner_key, Some(inner_value))) => {
                            payload.push((inner_key, inner_value))
                        }
                        Some((inner_key, None)) => payload_title = Some(inner_key),
                        None => {}
                    }
                }
            } else if let Some(value) = value {
                envelope.push((key, value));
            }
            continue;
        }
        match value {
            Some(value) => payload.push((key, value)),
            None if payload.is_empty() && payload_title.is_none() => payload_title = Some(key),
            None => {}
        }
    }

    let mut event = Event::default();
    let mut has_event_id = false;
    // 페이로드 우선, 봉투는 빈 필드만 채움
    for (key, value) in payload.iter().chain(envelope.iter()) {
        if apply_field(&mut event, key, value) {
            has_event_id = true;
        }
    }

    // 숫자 ID가 없으면 Task 값 또는 페이로드 제목으로 대체
    if !has_event_id {
        let task = payload
            .iter()
            .chain(envelope.iter())
            .find(|(key, _)| *key == TASK_KEY)
            .map(|(_, value)| *value);
        if let Some(code) = task.and_then(event_id_from_task).or_else(|| {
            payload_title.and_then(event_id_from_task)
        }) {
            event.event_type = code;
            has_event_id = true;
        }
    }

    if !has_event_id {
        return Err(EventValidationError::MissingEventType);
    }
    event.validate()?;
    Ok(event)
}
