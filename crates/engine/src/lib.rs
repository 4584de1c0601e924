#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`detect`]: 헤더 기반 형식 탐지 및 신뢰도 점수
//! - [`parser`]: 표 형식(CSV/TSV) 스트리밍 파서와 `Event[N]:` 블록 파서
//! - [`rule`]: 내장 탐지 규칙 엔진 (정규식/부분 문자열 조건, OR 결합)
//! - [`enrich`]: MITRE ATT&CK 기법 메타데이터 보강
//! - [`aggregate`]: 심각도 합계, 상위 전술, 이벤트 타입 분포
//! - [`analyzer`]: 전체 분석 오케스트레이션
//! - [`progress`]: 비차단 진행 상황 채널
//! - [`result`], [`report`]: 분석 결과와 텍스트 보고서
//! - [`config`]: 엔진 설정 (core 설정 확장)
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! bytes -> FormatDetector -> TabularParser | BlockParser -> RuleEngine -> enrich -> aggregate
//!              |                   |                           |             |
//!         confidence gate     Vec<Event>               Vec<Detection>   AnalysisResult
//! ```

pub mod aggregate;
pub mod analyzer;
pub mod config;
pub mod detect;
pub mod enrich;
pub mod error;
pub mod progress;
pub mod report;
pub mod result;

pub mod parser;
pub mod rule;

// --- 주요 타입 re-export ---

// 분석기
pub use analyzer::{AnalysisOptions, Analyzer, FormatDecision};

// 설정
pub use config::{EngineConfig, EngineConfigBuilder};

// 에러
pub use error::{AnalysisError, RecordUnit, RowError};

// 형식 탐지
pub use detect::{FieldGroup, FormatDetector, FormatReport, LogFormat};

// 파서
pub use parser::{BlockParser, ParseLimits, ParseOutput, ParseStats, TabularParser};

// 규칙 엔진
pub use rule::{Detection, DetectionRule, RuleEngine, RuleSet};

// 보강
pub use enrich::MitreTechnique;

// 결과
pub use aggregate::{CategoryCounts, EventTypeHistogram, SeverityTotals, TacticCount};
pub use progress::{AnalysisStage, Progress, ProgressSender};
pub use result::AnalysisResult;
