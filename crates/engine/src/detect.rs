//! 형식 탐지기 -- 입력 앞부분으로 로그 형식과 신뢰도를 판정
//!
//! 첫 줄만 구분자 헤더로 파싱하여 필드 그룹 존재 여부로 점수를 매깁니다.
//!
//! | 필드 그룹 | 점수 |
//! |-----------|------|
//! | 이벤트 ID | 40 |
//! | 타임스탬프 | 30 |
//! | 프로세스 식별 (`Image` 또는 `CommandLine`) | 15 |
//! | 호스트 | 10 |
//! | Sysmon 마커 열 3개 이상 | 5 |
//!
//! 이벤트 ID와 타임스탬프는 필수이며, 하나라도 없으면 점수와 관계없이 `valid = false`입니다.

use std::fmt;

use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use tracing::debug;

use ironscope_core::event::CanonicalField;

use crate::parser::fields::{canonical_field, normalize_key, spellings};

/// 구분자 후보 (동률이면 앞쪽 우선)
const DELIMITER_CANDIDATES: [u8; 4] = [b',', b'\t', b';', b'|'];

/// UTF-8 BOM
const UTF8_BOM: &str = "\u{feff}";

/// Sysmon 고유 열 (정규화된 이름)
const SYSMON_MARKERS: &[&str] = &[
    "processguid",
    "commandline",
    "parentimage",
    "rulename",
    "hashes",
    "utctime",
    "targetfilename",
    "integritylevel",
];

/// 일반 이벤트 로그 내보내기 열 (정규화된 이름)
const EVENT_LOG_MARKERS: &[&str] = &[
    "level",
    "source",
    "taskcategory",
    "keywords",
    "message",
    "provider",
];

/// Sysmon 형식 판정 최소 마커 수
const SYSMON_MARKER_MIN: usize = 3;

/// 이벤트 로그 형식 판정 최소 마커 수
const EVENT_LOG_MARKER_MIN: usize = 2;

/// 로그 형식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Sysmon 열 구성을 갖춘 CSV
    SysmonCsv,
    /// 일반 이벤트 로그 CSV 내보내기
    EventLogCsv,
    /// 인식하지 못한 구분자 형식
    UnknownCsv,
    /// `Event[N]:` 블록 텍스트 내보내기
    SysmonText,
}

impl LogFormat {
    /// 안정적인 snake_case 레이블
    pub fn label(self) -> &'static str {
        match self {
            Self::SysmonCsv => "sysmon_csv",
            Self::EventLogCsv => "event_log_csv",
            Self::UnknownCsv => "unknown_csv",
            Self::SysmonText => "sysmon_text",
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SysmonCsv => "Sysmon CSV",
            Self::EventLogCsv => "Event log CSV",
            Self::UnknownCsv => "Unrecognized CSV",
            Self::SysmonText => "Sysmon text export",
        };
        f.write_str(name)
    }
}

/// 점수 산정 필드 그룹
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldGroup {
    EventId,
    Timestamp,
    ProcessIdentity,
    Host,
}

impl FieldGroup {
    /// 전체 그룹 (점수 순)
    pub const ALL: [FieldGroup; 4] = [
        Self::EventId,
        Self::Timestamp,
        Self::ProcessIdentity,
        Self::Host,
    ];

    /// 그룹 이름
    pub fn label(self) -> &'static str {
        match self {
            Self::EventId => "event id",
            Self::Timestamp => "timestamp",
            Self::ProcessIdentity => "process identity",
            Self::Host => "host",
        }
    }

    /// 그룹 점수
    pub fn weight(self) -> u8 {
        match self {
            Self::EventId => 40,
            Self::Timestamp => 30,
            Self::ProcessIdentity => 15,
            Self::Host => 10,
        }
    }

    /// 필수 그룹 여부
    pub fn is_mandatory(self) -> bool {
        matches!(self, Self::EventId | Self::Timestamp)
    }

    /// 그룹에 속하는 정규 필드
    fn fields(self) -> &'static [CanonicalField] {
        match self {
            Self::EventId => &[CanonicalField::EventId],
            Self::Timestamp => &[CanonicalField::Timestamp],
            Self::ProcessIdentity => &[CanonicalField::Image, CanonicalField::CommandLine],
            Self::Host => &[CanonicalField::Host],
        }
    }

    /// 허용 표기 목록 (안내 메시지용)
    pub fn spellings(self) -> Vec<&'static str> {
        self.fields()
            .iter()
            .flat_map(|field| spellings(*field).iter().copied())
            .collect()
    }
}

impl fmt::Display for FieldGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// 형식 탐지 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatReport {
    /// 필수 그룹이 모두 존재하는지 여부
    pub valid: bool,
    /// 판정된 형식
    pub format: LogFormat,
    /// 헤더 열 (원본 표기)
    pub headers: Vec<String>,
    /// 누락된 필드 그룹
    pub missing_groups: Vec<FieldGroup>,
    /// 신뢰도 (0-100)
    pub confidence: u8,
    /// 사용자 안내 메시지
    pub suggestions: Vec<String>,
    /// 감지된 구분자
    pub delimiter: char,
}

impl FormatReport {
    /// 유효하고 신뢰도가 기준 이상이면 `true`
    pub fn is_usable(&self, min_confidence: u8) -> bool {
        self.valid && self.confidence >= min_confidence
    }

    /// 구분자 바이트
    pub fn delimiter_byte(&self) -> u8 {
        u8::try_from(self.delimiter).unwrap_or(b',')
    }

    /// 누락 그룹 이름 목록
    pub fn missing_labels(&self) -> Vec<String> {
        self.missing_groups
            .iter()
            .map(|g| g.label().to_owned())
            .collect()
    }
}

/// 형식 탐지기
#[derive(Debug, Clone)]
pub struct FormatDetector {
    /// 검사할 최대 바이트 수
    sniff_bytes: usize,
    /// 안내 메시지 기준 신뢰도
    min_confidence: u8,
}

impl FormatDetector {
    /// 새 탐지기를 생성합니다.
    pub fn new(sniff_bytes: usize, min_confidence: u8) -> Self {
        Self {
            sniff_bytes,
            min_confidence,
        }
    }

    /// 입력 앞부분을 검사합니다.
    ///
    /// `sniff_bytes`를 넘는 부분은 무시합니다.
    pub fn detect(&self, input: &[u8]) -> FormatReport {
        let prefix = &input[..input.len().min(self.sniff_bytes)];
        let decoded = String::from_utf8_lossy(prefix);
        let text = decoded
            .strip_prefix(UTF8_BOM)
            .unwrap_or(decoded.as_ref());

        let delimiter = sniff_delimiter(first_line(text));
        let headers = read_header(text, delimiter);

        let report = self.score(headers, delimiter);
        debug!(
            format = report.format.label(),
            confidence = report.confidence,
            valid = report.valid,
            delimiter = %report.delimiter.escape_debug(),
            "format detected"
        );
        report
    }

    fn score(&self, headers: Vec<String>, delimiter: u8) -> FormatReport {
        let delimiter = char::from(delimiter);
        if headers.is_empty() {
            return FormatReport {
                valid: false,
                format: LogFormat::UnknownCsv,
                headers,
                missing_groups: FieldGroup::ALL.to_vec(),
                confidence: 0,
                suggestions: vec![
                    "input is empty or has no header line; export the log with column headers"
                        .to_owned(),
                ],
                delimiter,
            };
        }

        let resolved: Vec<Option<CanonicalField>> =
            headers.iter().map(|h| canonical_field(h)).collect();
        let normalized: Vec<String> = headers.iter().map(|h| normalize_key(h)).collect();

        let mut confidence = 0u8;
        let mut missing_groups = Vec::new();
        for group in FieldGroup::ALL {
            let present = resolved
                .iter()
                .flatten()
                .any(|field| group.fields().contains(field));
            if present {
                confidence += group.weight();
            } else {
                missing_groups.push(group);
            }
        }

        let sysmon_markers = count_markers(&normalized, SYSMON_MARKERS);
        if sysmon_markers >= SYSMON_MARKER_MIN {
            confidence += 5;
        }

        let valid = !missing_groups.iter().any(|g| g.is_mandatory());
        let format = if sysmon_markers >= SYSMON_MARKER_MIN {
            LogFormat::SysmonCsv
        } else if valid && count_markers(&normalized, EVENT_LOG_MARKERS) >= EVENT_LOG_MARKER_MIN {
            LogFormat::EventLogCsv
        } else {
            LogFormat::UnknownCsv
        };

        let mut suggestions: Vec<String> = missing_groups
            .iter()
            .map(|group| {
                let kind = if group.is_mandatory() {
                    "required"
                } else {
                    "optional"
                };
                format!(
                    "add a {} column ({kind}); accepted names: {}",
                    group.label(),
                    group.spellings().join(", ")
                )
            })
            .collect();
        if confidence < self.min_confidence {
            suggestions.push(format!(
                "confidence {confidence}% is below the minimum of {}%; \
                 check that the first line is the column header",
                self.min_confidence
            ));
        }

        FormatReport {
            valid,
            format,
            headers,
            missing_groups,
            confidence: confidence.min(100),
            suggestions,
            delimiter,
        }
    }
}

impl Default for FormatDetector {
    fn default() -> Self {
        Self::new(ironscope_core::config::DEFAULT_SNIFF_BYTES, 50)
    }
}

/// 첫 번째 비어 있지 않은 줄
fn first_line(text: &str) -> &str {
    text.lines()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("")
}

/// 따옴표 밖에서 가장 많이 나타나는 구분자 (없거나 동률이면 쉼표)
fn sniff_delimiter(line: &str) -> u8 {
    let mut counts = [0usize; DELIMITER_CANDIDATES.len()];
    let mut in_quotes = false;
    for byte in line.bytes() {
        if byte == b'"' {
            in_quotes = !in_quotes;
            continue;
        }
        if in_quotes {
            continue;
        }
        if let Some(idx) = DELIMITER_CANDIDATES.iter().position(|d| *d == byte) {
            counts[idx] += 1;
        }
    }

    let mut best = 0;
    for (idx, count) in counts.iter().enumerate().skip(1) {
        if *count > counts[best] {
            best = idx;
        }
    }
    DELIMITER_CANDIDATES[best]
}

/// 첫 번째 레코드를 헤더로 읽습니다.
fn read_header(text: &str, delimiter: u8) -> Vec<String> {
    let body = text.trim_start_matches(['\r', '\n']);
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut record = csv::StringRecord::new();
    match reader.read_record(&mut record) {
        Ok(true) => record
            .iter()
            .map(|h| h.trim().to_owned())
            .filter(|h| !h.is_empty())
            .collect(),
        Ok(false) => Vec::new(),
        Err(e) => {
            debug!(error = %e, "header line could not be parsed");
            Vec::new()
        }
    }
}

fn count_markers(normalized: &[String], markers: &[&str]) -> usize {
    markers
        .iter()
        .filter(|marker| normalized.iter().any(|h| h == *marker))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SYSMON_HEADER: &str = "UtcTime,EventID,Computer,ProcessGuid,Image,CommandLine,ParentImage,User,Hashes,RuleName\n";

    fn detect(text: &str) -> FormatReport {
        FormatDetector::default().detect(text.as_bytes())
    }

    #[test]
    fn canonical_sysmon_header_is_high_confidence() {
        let report = detect(SYSMON_HEADER);
        assert!(report.valid);
        assert_eq!(report.format, LogFormat::SysmonCsv);
        assert!(report.confidence >= 90, "{}", report.confidence);
        assert_eq!(report.confidence, 100);
        assert!(report.missing_groups.is_empty());
        assert!(report.suggestions.is_empty());
        assert!(report.is_usable(50));
    }

    #[test]
    fn missing_timestamp_is_invalid_regardless_of_score() {
        let report = detect("EventID,Computer,ProcessGuid,Image,CommandLine,ParentImage,Hashes\n");
        assert!(!report.valid);
        assert_eq!(report.confidence, 70);
        assert_eq!(report.missing_groups, vec![FieldGroup::Timestamp]);
        assert!(!report.is_usable(50));
        assert!(report.suggestions[0].contains("UtcTime"));
    }

    #[test]
    fn generic_log_header_is_rejected() {
        let report = detect("Message,Source,Level\nhello,app,Information\n");
        assert!(!report.valid);
        assert!(report.confidence < 50);
        assert_eq!(report.format, LogFormat::UnknownCsv);
        assert_eq!(report.missing_groups.len(), 4);
        assert!(report.suggestions.iter().any(|s| s.contains("below the minimum")));
    }

    #[test]
    fn event_log_export_is_recognized() {
        let report = detect("Level,Date and Time,Source,Event ID,Task Category,Message\n");
        assert!(report.valid);
        assert_eq!(report.format, LogFormat::EventLogCsv);
        assert_eq!(report.confidence, 70);
        assert_eq!(
            report.missing_groups,
            vec![FieldGroup::ProcessIdentity, FieldGroup::Host]
        );
    }

    #[test]
    fn synonyms_are_case_and_space_insensitive() {
        let report = detect("event_id,TIMESTAMP,computername,command line\n");
        assert!(report.valid);
        assert_eq!(report.confidence, 95);
    }

    #[test]
    fn quoted_header_with_delimiter() {
        let report = detect("\"Event ID\",\"Date, UTC\",UtcTime,Image\n");
        assert_eq!(report.headers, vec!["Event ID", "Date, UTC", "UtcTime", "Image"]);
        assert!(report.valid);
    }

    #[test]
    fn sniffs_tab_and_semicolon_delimiters() {
        let report = detect("EventID\tUtcTime\tImage\n1\tt\tcmd.exe\n");
        assert_eq!(report.delimiter, '\t');
        assert!(report.valid);

        let report = detect("EventID;UtcTime;Image\n");
        assert_eq!(report.delimiter, ';');
        assert_eq!(report.delimiter_byte(), b';');
    }

    #[test]
    fn comma_wins_delimiter_ties() {
        assert_eq!(sniff_delimiter("a,b;c"), b',');
        assert_eq!(sniff_delimiter("abc"), b',');
        assert_eq!(sniff_delimiter("\"a;b;c\",d"), b',');
    }

    #[test]
    fn bom_is_stripped() {
        let input = format!("{UTF8_BOM}EventID,UtcTime\n");
        let report = detect(&input);
        assert_eq!(report.headers[0], "EventID");
        assert!(report.valid);
    }

    #[test]
    fn empty_input_has_zero_confidence() {
        let report = detect("");
        assert!(!report.valid);
        assert_eq!(report.confidence, 0);
        assert!(report.suggestions[0].contains("empty"));

        let report = detect("\n\n  \n");
        assert_eq!(report.confidence, 0);
    }

    #[test]
    fn only_sniff_prefix_is_examined() {
        let detector = FormatDetector::new(8, 50);
        let report = detector.detect(SYSMON_HEADER.as_bytes());
        // "UtcTime," 까지만 보임
        assert_eq!(report.headers, vec!["UtcTime"]);
        assert!(!report.valid);
    }

    #[test]
    fn format_labels() {
        assert_eq!(LogFormat::SysmonCsv.label(), "sysmon_csv");
        assert_eq!(LogFormat::SysmonText.to_string(), "Sysmon text export");
        assert_eq!(
            serde_json::to_string(&LogFormat::EventLogCsv).unwrap(),
            "\"event_log_csv\""
        );
    }
}
