//! CLI-specific error types and exit code mapping

use ironscope_core::error::IronscopeError;
use ironscope_engine::AnalysisError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to standard Unix exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// The input was not recognized as a supported log format.
    #[error("{0}")]
    FormatRejected(String),

    /// The input contained no valid events.
    #[error("{0}")]
    EmptyResult(String),

    /// Any other analysis failure (size limit, strict mode, rule table).
    #[error("analysis error: {0}")]
    Analysis(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from ironscope-core.
    #[error("{0}")]
    Core(#[from] IronscopeError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                               |
    /// |------|---------------------------------------|
    /// | 0    | Success                               |
    /// | 1    | General / command / analysis error    |
    /// | 2    | Configuration error                   |
    /// | 3    | Input format rejected                 |
    /// | 4    | No valid events in the input          |
    /// | 10   | IO error                              |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Core(IronscopeError::Config(_)) => 2,
            Self::FormatRejected(_) => 3,
            Self::EmptyResult(_) => 4,
            Self::Io(_) | Self::Core(IronscopeError::Io(_)) => 10,
            Self::Command(_)
            | Self::Analysis(_)
            | Self::JsonSerialize(_)
            | Self::Core(IronscopeError::Analysis { .. }) => 1,
        }
    }
}

impl From<AnalysisError> for CliError {
    fn from(e: AnalysisError) -> Self {
        match e {
            AnalysisError::Io { ref path, ref source } => Self::Io(std::io::Error::new(
                source.kind(),
                format!("{path}: {source}"),
            )),
            AnalysisError::FormatValidation {
                ref suggestions, ..
            } => {
                let mut message = e.to_string();
                for hint in suggestions {
                    message.push_str("\n  hint: ");
                    message.push_str(hint);
                }
                Self::FormatRejected(message)
            }
            AnalysisError::EmptyResult { .. } => Self::EmptyResult(e.to_string()),
            AnalysisError::Config { .. } => Self::Config(e.to_string()),
            other => Self::Analysis(other.to_string()),
        }
    }
}
