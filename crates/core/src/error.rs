//! 에러 타입: 도메인별 에러 정의

/// lognorm 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum LognormError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 룰셋 정의/로딩 에러
    #[error("rule set error: {0}")]
    RuleSet(#[from] RuleSetError),

    /// 정규화 실행 에러
    #[error("normalization error: {0}")]
    Normalization(#[from] NormalizationError),

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

/// 룰셋 정의/로딩 에러
#[derive(Debug, thiserror::Error)]
pub enum RuleSetError {
    /// 룰셋 파일 로드 실패
    #[error("load failed: {0}")]
    Load(String),

    /// 룰셋 정의가 유효하지 않음
    #[error("invalid rule set: {0}")]
    Invalid(String),

    /// 공용 라이브러리 또는 디렉토리 누락
    #[error("pool construction failed: {0}")]
    Construction(String),

    /// 알 수 없는 룰셋 ID
    #[error("rule set not found: {0}")]
    NotFound(String),
}

/// 정규화 실행 에러
#[derive(Debug, thiserror::Error)]
pub enum NormalizationError {
    /// 콜백 실행 실패
    #[error("callback '{callback}' failed in pattern '{pattern}': {reason}")]
    Callback {
        callback: String,
        pattern: String,
        reason: String,
    },

    /// 예제 자가 검증 실패
    #[error("example self-test failed: {0}")]
    ExampleMismatch(String),
}
