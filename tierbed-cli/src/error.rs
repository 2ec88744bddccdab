//! CLI-specific error types and exit code mapping

use tierbed_core::error::TierbedError;
use tierbed_fixtures::FixtureError;

/// CLI-specific error type.
///
/// `exit_code()` maps each variant to a process exit code.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// Fixture setup failed against the backend.
    #[error("setup failed: {0}")]
    Setup(String),

    /// Teardown left entities behind.
    #[error("fixtures leaked: {0}")]
    Leaked(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from tierbed-core.
    #[error("{0}")]
    Core(#[from] TierbedError),
}

impl From<FixtureError> for CliError {
    fn from(e: FixtureError) -> Self {
        match e {
            FixtureError::Config(config) => Self::Config(config.to_string()),
            other => Self::Setup(other.to_string()),
        }
    }
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                      |
    /// |------|------------------------------|
    /// | 0    | Success                      |
    /// | 1    | General error                |
    /// | 2    | Configuration error          |
    /// | 3    | Setup failed                 |
    /// | 4    | Teardown left entities behind |
    /// | 10   | IO error                     |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Core(TierbedError::Config(_)) => 2,
            Self::Setup(_) => 3,
            Self::Leaked(_) => 4,
            Self::Io(_) => 10,
            Self::JsonSerialize(_) | Self::Core(_) => 1,
        }
    }
}
