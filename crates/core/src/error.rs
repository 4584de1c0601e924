//! 에러 타입 -- 도메인별 에러 정의

/// Ironscope 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum IronscopeError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 분석 실패 (엔진 에러를 문자열화하여 전달)
    #[error("analysis failed ({kind}): {message}")]
    Analysis {
        /// 실패 분류 (io, format_validation, empty_result 등)
        kind: String,
        /// 사람이 읽을 수 있는 메시지
        message: String,
    },

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}
