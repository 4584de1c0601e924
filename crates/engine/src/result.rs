//! 분석 결과
//!
//! [`AnalysisResult`]는 분석 한 번의 전체 출력이며 호출자가 소유합니다.
//! JSON 직렬화 필드와 텍스트 보고서([`crate::report`]) 항목은 일대일로 대응합니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregate::{EventTypeHistogram, SeverityTotals, TacticCount};
use crate::detect::LogFormat;
use crate::rule::Detection;

/// 분석 결과
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// 입력 파일 이름
    pub file_name: String,
    /// 탐지된 형식
    pub format: LogFormat,
    /// 처리한 레코드 수
    pub total_events: usize,
    /// 유효한 이벤트 수
    pub valid_events: usize,
    /// 잘못된 레코드 수
    pub invalid_events: usize,
    /// 기록된 레코드 에러 (`Row N: reason`)
    pub parse_errors: Vec<String>,
    /// 행 예산에 도달하여 입력 일부를 건너뛰었는지 여부
    #[serde(default)]
    pub truncated: bool,
    /// 분석 시각 (UTC)
    pub analyzed_at: DateTime<Utc>,
    /// 소요 시간 (밀리초)
    pub elapsed_ms: u64,
    /// 첫 이벤트 타임스탬프 (스트림 순서, 원본 문자열)
    pub first_timestamp: Option<String>,
    /// 마지막 이벤트 타임스탬프
    pub last_timestamp: Option<String>,
    /// 네트워크 이벤트 수 (3, 22)
    pub network_events: usize,
    /// 파일 이벤트 수 (11, 15, 23)
    pub file_events: usize,
    /// 레지스트리 이벤트 수 (12-14)
    pub registry_events: usize,
    /// 탐지 목록 (정렬됨)
    pub detections: Vec<Detection>,
    /// 심각도별 합계
    pub severity_totals: SeverityTotals,
    /// 상위 전술
    pub top_tactics: Vec<TacticCount>,
    /// 이벤트 타입 분포
    pub event_types: EventTypeHistogram,
}

impl AnalysisResult {
    /// 탐지가 하나라도 있는지 여부
    pub fn has_detections(&self) -> bool {
        !self.detections.is_empty()
    }

    /// 가장 높은 심각도의 탐지
    pub fn top_detection(&self) -> Option<&Detection> {
        self.detections.first()
    }
}
