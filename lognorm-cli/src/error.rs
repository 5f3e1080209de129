//! CLI-specific error types and exit code mapping

use lognorm_core::error::LognormError;
use lognorm_normalizer::NormalizerError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// Rule set loading or lookup failed.
    #[error("rule error: {0}")]
    Rule(String),

    /// One or more rule sets failed validation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from lognorm-core.
    #[error("{0}")]
    Core(#[from] LognormError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                       |
    /// |------|-------------------------------|
    /// | 0    | Success                       |
    /// | 1    | General / rule error          |
    /// | 2    | Configuration error           |
    /// | 4    | Rule set validation failed    |
    /// | 10   | IO error                      |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Core(LognormError::Config(_)) => 2,
            Self::Validation(_) => 4,
            Self::Io(_) | Self::Core(LognormError::Io(_)) => 10,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Rule(_) | Self::Core(_) => 1,
        }
    }
}

impl From<NormalizerError> for CliError {
    fn from(e: NormalizerError) -> Self {
        match e {
            NormalizerError::Io(io) => Self::Io(io),
            other => Self::Rule(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lognorm_core::error::ConfigError;

    #[test]
    fn test_exit_code_config_error() {
        let err = CliError::Config("test error".to_owned());
        assert_eq!(err.exit_code(), 2, "config error should return exit code 2");
    }

    #[test]
    fn test_exit_code_core_config_error() {
        let err: CliError = LognormError::Config(ConfigError::FileNotFound {
            path: "lognorm.toml".to_owned(),
        })
        .into();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_exit_code_validation_error() {
        let err = CliError::Validation("2 invalid rule sets".to_owned());
        assert_eq!(err.exit_code(), 4, "validation error should return exit code 4");
    }

    #[test]
    fn test_exit_code_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = CliError::Io(io_err);
        assert_eq!(err.exit_code(), 10, "io error should return exit code 10");
    }

    #[test]
    fn test_exit_code_rule_error() {
        let err = CliError::Rule("unknown rule set".to_owned());
        assert_eq!(err.exit_code(), 1, "rule error should return exit code 1");
    }

    #[test]
    fn test_exit_code_json_serialize_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid json")
            .expect_err("should fail parsing");
        let err = CliError::JsonSerialize(json_err);
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_from_normalizer_not_found() {
        let err: CliError = NormalizerError::NotFound("nope-1.0".to_owned()).into();
        assert!(matches!(err, CliError::Rule(ref msg) if msg.contains("nope-1.0")));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_from_normalizer_io_keeps_io_exit_code() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: CliError = NormalizerError::Io(io_err).into();
        assert_eq!(err.exit_code(), 10);
    }

    #[test]
    fn test_error_display_config() {
        let err = CliError::Config("invalid TOML syntax".to_owned());
        let display_str = err.to_string();
        assert!(display_str.contains("configuration error"));
        assert!(display_str.contains("invalid TOML syntax"));
    }

    #[test]
    fn test_error_display_command() {
        let err = CliError::Command("execution failed".to_owned());
        assert_eq!(err.to_string(), "execution failed");
    }
}
