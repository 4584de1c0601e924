//! 설정 관리 -- ironscope.toml 파싱 및 런타임 설정
//!
//! [`IronscopeConfig`]는 CLI와 분석 엔진이 공유하는 최상위 설정 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`IRONSCOPE_ENGINE_ROW_BUDGET=100000` 형식)
//! 3. 설정 파일 (`ironscope.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), ironscope_core::error::IronscopeError> {
//! use ironscope_core::config::IronscopeConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = IronscopeConfig::load("ironscope.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = IronscopeConfig::parse("[engine]\nstrict = true")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, IronscopeError};

/// 입력 파일 최대 크기 기본값 (50 MiB)
pub const DEFAULT_MAX_INPUT_BYTES: u64 = 50 * 1024 * 1024;

/// 형식 탐지에 사용할 앞부분 크기 기본값 (10 KiB)
pub const DEFAULT_SNIFF_BYTES: usize = 10 * 1024;

/// 허용 가능한 최대 입력 크기 상한 (1 GiB)
const MAX_INPUT_BYTES_CEILING: u64 = 1024 * 1024 * 1024;

/// 블록 형식 분류기가 검사하는 마커 종류 수
const BLOCK_MARKER_KINDS: usize = 5;

/// Ironscope 통합 설정
///
/// `ironscope.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IronscopeConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 분석 엔진 설정
    #[serde(default)]
    pub engine: EngineSection,
}

impl IronscopeConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 설정 로딩 순서:
    /// 1. TOML 파일 파싱
    /// 2. 환경변수 오버라이드 적용
    /// 3. 유효성 검증
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, IronscopeError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, IronscopeError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                IronscopeError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                IronscopeError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, IronscopeError> {
        toml::from_str(toml_str).map_err(|e| {
            IronscopeError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `IRONSCOPE_{SECTION}_{FIELD}`
    /// 예: `IRONSCOPE_ENGINE_STRICT=true`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "IRONSCOPE_GENERAL_LOG_LEVEL");
        override_string(
            &mut self.general.log_format,
            "IRONSCOPE_GENERAL_LOG_FORMAT",
        );

        // Engine
        override_u64(
            &mut self.engine.max_input_bytes,
            "IRONSCOPE_ENGINE_MAX_INPUT_BYTES",
        );
        override_usize(&mut self.engine.sniff_bytes, "IRONSCOPE_ENGINE_SNIFF_BYTES");
        override_usize(&mut self.engine.row_budget, "IRONSCOPE_ENGINE_ROW_BUDGET");
        override_u8(
            &mut self.engine.min_confidence,
            "IRONSCOPE_ENGINE_MIN_CONFIDENCE",
        );
        override_usize(
            &mut self.engine.block_marker_threshold,
            "IRONSCOPE_ENGINE_BLOCK_MARKER_THRESHOLD",
        );
        override_usize(&mut self.engine.max_samples, "IRONSCOPE_ENGINE_MAX_SAMPLES");
        override_usize(
            &mut self.engine.max_recorded_errors,
            "IRONSCOPE_ENGINE_MAX_RECORDED_ERRORS",
        );
        override_usize(
            &mut self.engine.progress_every_rows,
            "IRONSCOPE_ENGINE_PROGRESS_EVERY_ROWS",
        );
        override_usize(&mut self.engine.top_tactics, "IRONSCOPE_ENGINE_TOP_TACTICS");
        override_bool(&mut self.engine.strict, "IRONSCOPE_ENGINE_STRICT");
        override_bool(
            &mut self.engine.skip_invalid_silently,
            "IRONSCOPE_ENGINE_SKIP_INVALID_SILENTLY",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), IronscopeError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        self.engine.validate()
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 분석 엔진 설정
///
/// 엔진 크레이트는 이 섹션에서 `EngineConfig`를 생성합니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    /// 입력 파일 최대 크기 (바이트)
    pub max_input_bytes: u64,
    /// 형식 탐지에 사용할 앞부분 크기 (바이트)
    pub sniff_bytes: usize,
    /// 처리할 최대 레코드 수
    pub row_budget: usize,
    /// 형식 탐지 최소 신뢰도 (0-100)
    pub min_confidence: u8,
    /// 블록 형식으로 판정하기 위한 최소 마커 수 (1-5)
    pub block_marker_threshold: usize,
    /// 탐지당 보관할 샘플 이벤트 수
    pub max_samples: usize,
    /// 결과에 기록할 최대 행 에러 수
    pub max_recorded_errors: usize,
    /// 진행 상황 보고 간격 (레코드 수)
    pub progress_every_rows: usize,
    /// 상위 전술 목록 크기
    pub top_tactics: usize,
    /// 첫 번째 잘못된 레코드에서 분석 중단
    pub strict: bool,
    /// 잘못된 레코드를 에러 목록에 기록하지 않음
    pub skip_invalid_silently: bool,
}

impl Default for EngineSection {
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
        }
    }
}

impl EngineSection {
    /// 엔진 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), IronscopeError> {
        if self.max_input_bytes == 0 || self.max_input_bytes > MAX_INPUT_BYTES_CEILING {
            return Err(invalid(
                "engine.max_input_bytes",
                format!("must be between 1 and {MAX_INPUT_BYTES_CEILING}"),
            ));
        }

        if self.sniff_bytes == 0 {
            return Err(invalid("engine.sniff_bytes", "must be greater than 0"));
        }

        if self.row_budget == 0 {
            return Err(invalid("engine.row_budget", "must be greater than 0"));
        }

        if self.min_confidence > 100 {
            return Err(invalid("engine.min_confidence", "must be at most 100"));
        }

        if self.block_marker_threshold == 0 || self.block_marker_threshold > BLOCK_MARKER_KINDS {
            return Err(invalid(
                "engine.block_marker_threshold",
                format!("must be between 1 and {BLOCK_MARKER_KINDS}"),
            ));
        }

        if self.progress_every_rows == 0 {
            return Err(invalid(
                "engine.progress_every_rows",
                "must be greater than 0",
            ));
        }

        if self.top_tactics == 0 {
            return Err(invalid("engine.top_tactics", "must be greater than 0"));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> IronscopeError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u8(target: &mut u8, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u8>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u8 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
