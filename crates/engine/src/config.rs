//! 분석 엔진 설정
//!
//! [`EngineConfig`]는 core의 [`EngineSection`](ironscope_core::config::EngineSection)을
//! 기반으로 엔진 내부에서 사용하는 설정을 제공합니다.
//!
//! # 사용 예시
//! ```ignore
//! use ironscope_core::config::IronscopeConfig;
//! use ironscope_engine::config::EngineConfig;
//!
//! let core_config = IronscopeConfig::default();
//! let config = EngineConfig::from_core(&core_config.engine);
//! ```

use serde::{Deserialize, Serialize};

use ironscope_core::config::{DEFAULT_MAX_INPUT_BYTES, DEFAULT_SNIFF_BYTES, EngineSection};

use crate::error::AnalysisError;

/// 진행 상황 채널 기본 용량
const DEFAULT_PROGRESS_CAPACITY: usize = 64;

/// 블록 분류기가 검사하는 마커 종류 수
const BLOCK_MARKER_KINDS: usize = 5;

/// 분석 엔진 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// 입력 파일 최대 크기 (바이트)
    pub max_input_bytes: u64,
    /// 형식 탐지에 사용할 앞부분 크기 (바이트)
    pub sniff_bytes: usize,
    /// 처리할 최대 레코드 수
    pub row_budget: usize,
    /// 형식 탐지 최소 신뢰도 (0-100)
    pub min_confidence: u8,
    /// 블록 형식 판정 최소 마커 수
    pub block_marker_threshold: usize,
    /// 탐지당 샘플 이벤트 수
    pub max_samples: usize,
    /// 결과에 기록할 최대 행 에러 수
    pub max_recorded_errors: usize,
    /// 진행 상황 보고 간격 (레코드 수)
    pub progress_every_rows: usize,
    /// 상위 전술 목록 크기
    pub top_tactics: usize,
    /// 첫 번째 잘못된 레코드에서 중단
    pub strict: bool,
    /// 잘못된 레코드를 에러 목록에 기록하지 않음
    pub skip_invalid_silently: bool,

    // --- 확장 설정 (core에 없는 추가 필드) ---
    /// 진행 상황 채널 용량 (CLI가 채널 생성 시 사용)
    pub progress_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            sniff_bytes: DEFAULT_SNIFF_BYTES,
            row_budget: 500_000,
            min_confidence: 50,
            block_marker_threshold: 3,
            max_samples: 10,
            max_recorded_errors: 1_000,
            progress_every_rows: 1_000,
            top_tactics: 5,
            strict: false,
            skip_invalid_silently: false,
            progress_capacity: DEFAULT_PROGRESS_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// core의 `EngineSection`에서 엔진 설정을 생성합니다.
    ///
    /// core 설정에 없는 확장 필드는 기본값이 적용됩니다.
    pub fn from_core(core: &EngineSection) -> Self {
        Self {
            max_input_bytes: core.max_input_bytes,
            sniff_bytes: core.sniff_bytes,
            row_budget: core.row_budget,
            min_confidence: core.min_confidence,
            block_marker_threshold: core.block_marker_threshold,
            max_samples: core.max_samples,
            max_recorded_errors: core.max_recorded_errors,
            progress_every_rows: core.progress_every_rows,
            top_tactics: core.top_tactics,
            strict: core.strict,
            skip_invalid_silently: core.skip_invalid_silently,
            ..Self::default()
        }
    }

    /// 빌더를 생성합니다.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::new()
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.max_input_bytes == 0 {
            return Err(config_error("max_input_bytes", "must be greater than 0"));
        }
        if self.sniff_bytes == 0 {
            return Err(config_error("sniff_bytes", "must be greater than 0"));
        }
        if self.row_budget == 0 {
            return Err(config_error("row_budget", "must be greater than 0"));
        }
        if self.min_confidence > 100 {
            return Err(config_error("min_confidence", "must be at most 100"));
        }
        if self.block_marker_threshold == 0 || self.block_marker_threshold > BLOCK_MARKER_KINDS {
            return Err(config_error(
                "block_marker_threshold",
                &format!("must be 1-{BLOCK_MARKER_KINDS}"),
            ));
        }
        if self.progress_every_rows == 0 {
            return Err(config_error("progress_every_rows", "must be greater than 0"));
        }
        if self.top_tactics == 0 {
            return Err(config_error("top_tactics", "must be greater than 0"));
        }
        if self.progress_capacity == 0 {
            return Err(config_error("progress_capacity", "must be greater than 0"));
        }
        Ok(())
    }
}

fn config_error(field: &str, reason: &str) -> AnalysisError {
    AnalysisError::Config {
        field: field.to_owned(),
        reason: reason.to_owned(),
    }
}

/// 엔진 설정 빌더
#[derive(Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 입력 파일 최대 크기를 설정합니다.
    pub fn max_input_bytes(mut self, bytes: u64) -> Self {
        self.config.max_input_bytes = bytes;
        self
    }

    /// 형식 탐지 앞부분 크기를 설정합니다.
    pub fn sniff_bytes(mut self, bytes: usize) -> Self {
        self.config.sniff_bytes = bytes;
        self
    }

    /// 레코드 예산을 설정합니다.
    pub fn row_budget(mut self, rows: usize) -> Self {
        self.config.row_budget = rows;
        self
    }

    /// 최소 신뢰도를 설정합니다.
    pub fn min_confidence(mut self, confidence: u8) -> Self {
        self.config.min_confidence = confidence;
        self
    }

    /// 블록 마커 임계값을 설정합니다.
    pub fn block_marker_threshold(mut self, threshold: usize) -> Self {
        self.config.block_marker_threshold = threshold;
        self
    }

    /// 탐지당 샘플 수를 설정합니다.
    pub fn max_samples(mut self, samples: usize) -> Self {
        self.config.max_samples = samples;
        self
    }

    /// 기록할 최대 행 에러 수를 설정합니다.
    pub fn max_recorded_errors(mut self, errors: usize) -> Self {
        self.config.max_recorded_errors = errors;
        self
    }

    /// 진행 상황 보고 간격을 설정합니다.
    pub fn progress_every_rows(mut self, rows: usize) -> Self {
        self.config.progress_every_rows = rows;
        self
    }

    /// 상위 전술 목록 크기를 설정합니다.
    pub fn top_tactics(mut self, limit: usize) -> Self {
        self.config.top_tactics = limit;
        self
    }

    /// strict 모드를 설정합니다.
    pub fn strict(mut self, strict: bool) -> Self {
        self.config.strict = strict;
        self
    }

    /// 잘못된 레코드의 에러 기록 생략 여부를 설정합니다.
    pub fn skip_invalid_silently(mut self, skip: bool) -> Self {
        self.config.skip_invalid_silently = skip;
        self
    }

    /// 진행 상황 채널 용량을 설정합니다.
    pub fn progress_capacity(mut self, capacity: usize) -> Self {
        self.config.progress_capacity = capacity;
        self
    }

    /// 설정을 검증하고 `EngineConfig`를 생성합니다.
    pub fn build(self) -> Result<EngineConfig, AnalysisError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
