//! 분석 엔진 에러 타입
//!
//! [`AnalysisError`]는 분석 중 발생하는 모든 파일 수준 실패를 표현합니다.
//! 개별 레코드 실패는 [`RowError`]로 누적되며 분석을 중단하지 않습니다
//! (strict 모드 제외).
//!
//! `From<AnalysisError> for IronscopeError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use std::fmt;

use serde::{Deserialize, Serialize};

use ironscope_core::error::IronscopeError;

/// 레코드 단위 (에러 메시지 접두어)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordUnit {
    /// 표 형식의 행 (헤더가 1행)
    Row,
    /// 블록 형식의 이벤트 블록 (1부터 시작)
    Block,
}

impl fmt::Display for RecordUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Row => f.write_str("Row"),
            Self::Block => f.write_str("Block"),
        }
    }
}

/// 레코드 하나의 검증 실패
///
/// `Row N: reason` 형식으로 표시됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    /// 레코드 단위
    pub unit: RecordUnit,
    /// 레코드 번호
    pub row: usize,
    /// 실패 사유
    pub reason: String,
}

impl RowError {
    /// 표 형식 행 에러를 생성합니다.
    pub fn row(row: usize, reason: impl Into<String>) -> Self {
        Self {
            unit: RecordUnit::Row,
            row,
            reason: reason.into(),
        }
    }

    /// 블록 에러를 생성합니다.
    pub fn block(block: usize, reason: impl Into<String>) -> Self {
        Self {
            unit: RecordUnit::Block,
            row: block,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.unit, self.row, self.reason)
    }
}

impl std::error::Error for RowError {}

/// 분석 엔진 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// 입력을 읽을 수 없음
    #[error("failed to read '{path}': {source}")]
    Io {
        /// 입력 경로 또는 이름
        path: String,
        /// 원인
        #[source]
        source: std::io::Error,
    },

    /// 입력 크기 초과
    #[error("input is {size} bytes, exceeding the {max} byte limit")]
    InputTooLarge {
        /// 입력 크기 (바이트)
        size: u64,
        /// 허용 최대 크기 (바이트)
        max: u64,
    },

    /// 형식 검증 실패 (필수 필드 누락 또는 낮은 신뢰도)
    #[error(
        "unrecognized log format ({format}, confidence {confidence}%){}",
        missing_suffix(.missing)
    )]
    FormatValidation {
        /// 탐지된 형식 레이블
        format: String,
        /// 신뢰도 (0-100)
        confidence: u8,
        /// 누락된 필드 그룹
        missing: Vec<String>,
        /// 사용자 안내 메시지
        suggestions: Vec<String>,
    },

    /// 유효한 이벤트가 하나도 없음
    #[error("no valid events found ({total} records seen, {invalid} invalid)")]
    EmptyResult {
        /// 처리한 레코드 수
        total: usize,
        /// 잘못된 레코드 수
        invalid: usize,
    },

    /// strict 모드에서 잘못된 레코드 발견
    #[error("strict mode: {0}")]
    Row(RowError),

    /// 규칙 정의 검증 실패
    #[error("rule validation error: rule '{rule_id}': {reason}")]
    RuleValidation {
        /// 문제가 된 룰 ID
        rule_id: String,
        /// 검증 실패 사유
        reason: String,
    },

    /// 엔진 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 그 밖의 처리 실패
    #[error("processing error: {0}")]
    Processing(String),
}

fn missing_suffix(missing: &[String]) -> String {
    if missing.is_empty() {
        String::new()
    } else {
        format!(": missing {}", missing.join(", "))
    }
}

impl AnalysisError {
    /// 안정적인 snake_case 실패 분류 레이블
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Io { .. } => "io",
            Self::InputTooLarge { .. } => "input_too_large",
            Self::FormatValidation { .. } => "format_validation",
            Self::EmptyResult { .. } => "empty_result",
            Self::Row(_) => "row",
            Self::RuleValidation { .. } => "rule_validation",
            Self::Config { .. } => "config",
            Self::Processing(_) => "processing",
        }
    }
}

impl From<AnalysisError> for IronscopeError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::Io { source, .. } => IronscopeError::Io(source),
            other => IronscopeError::Analysis {
                kind: other.kind().to_owned(),
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_error_display() {
        let err = RowError::row(7, "missing timestamp");
        assert_eq!(err.to_string(), "Row 7: missing timestamp");

        let err = RowError::block(2, "missing or non-numeric event id");
        assert_eq!(err.to_string(), "Block 2: missing or non-numeric event id");
    }

    #[test]
    fn format_validation_display_lists_missing_groups() {
        let err = AnalysisError::FormatValidation {
            format: "unknown_csv".to_owned(),
            confidence: 0,
            missing: vec!["event id".to_owned(), "timestamp".to_owned()],
            suggestions: vec![],
        };
        let msg = err.to_string();
        assert!(msg.contains("unknown_csv"));
        assert!(msg.contains("0%"));
        assert!(msg.contains("event id, timestamp"));
    }

    #[test]
    fn kind_labels_are_stable() {
        assert_eq!(
            AnalysisError::EmptyResult {
                total: 3,
                invalid: 3
            }
            .kind(),
            "empty_result"
        );
        assert_eq!(
            AnalysisError::Row(RowError::row(2, "x")).kind(),
            "row"
        );
        assert_eq!(
            AnalysisError::Processing("boom".to_owned()).kind(),
            "processing"
        );
    }

    #[test]
    fn converts_to_ironscope_error() {
        let err = AnalysisError::EmptyResult {
            total: 10,
            invalid: 10,
        };
        let top: IronscopeError = err.into();
        assert!(matches!(
            top,
            IronscopeError::Analysis { ref kind, .. } if kind == "empty_result"
        ));
    }

    #[test]
    fn io_error_converts_to_io_variant() {
        let err = AnalysisError::Io {
            path: "/tmp/missing.csv".to_owned(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(err.to_string().contains("/tmp/missing.csv"));
        let top: IronscopeError = err.into();
        assert!(matches!(top, IronscopeError::Io(_)));
    }
}
