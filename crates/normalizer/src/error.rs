//! 정규화 엔진 에러 타입
//!
//! [`NormalizerError`]는 룰셋 로딩, 컴파일, 매칭, 풀 구성 중 발생하는 모든 에러를 표현합니다.
//! `From<NormalizerError> for LognormError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use lognorm_core::error::{LognormError, NormalizationError, RuleSetError};

/// 정규화 엔진 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum NormalizerError {
    /// 정규식 컴파일 실패
    #[error("invalid pattern '{name}': {reason}")]
    InvalidPattern {
        /// 태그 타입 또는 패턴 이름
        name: String,
        /// 실패 사유
        reason: String,
    },

    /// 룰셋 파일 로딩 실패
    #[error("rule set load error: {path}: {reason}")]
    RuleSetLoad {
        /// 룰셋 파일 경로
        path: String,
        /// 로딩 실패 사유
        reason: String,
    },

    /// 룰셋 유효성 검증 실패
    #[error("rule set validation error: rule set '{rule_set}': {reason}")]
    RuleSetValidation {
        /// 문제가 된 룰셋 이름
        rule_set: String,
        /// 검증 실패 사유
        reason: String,
    },

    /// 콜백 실행 실패
    #[error("callback '{callback}' failed in pattern '{pattern}': {reason}")]
    Callback {
        /// 콜백 이름
        callback: String,
        /// 콜백을 호출한 패턴 이름 (최종 콜백은 룰셋 이름)
        pattern: String,
        /// 실패 사유
        reason: String,
    },

    /// 예제 자가 검증 실패
    #[error(
        "example mismatch in '{rule_set}' pattern '{pattern}': sample \"{example}\": expected {tag} -> {expected}, got {actual}"
    )]
    ExampleMismatch {
        rule_set: String,
        pattern: String,
        example: String,
        tag: String,
        expected: String,
        actual: String,
    },

    /// 룰셋 디렉토리가 아님
    #[error("invalid normalizer directory: {0}")]
    InvalidDirectory(String),

    /// 공용 라이브러리 파일 누락
    #[error("missing shared library file: {0}")]
    MissingLibrary(String),

    /// 알 수 없는 룰셋 ID
    #[error("rule set not found: {0}")]
    NotFound(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<NormalizerError> for LognormError {
    fn from(err: NormalizerError) -> Self {
        match err {
            NormalizerError::InvalidPattern { .. } | NormalizerError::RuleSetValidation { .. } => {
                LognormError::RuleSet(RuleSetError::Invalid(err.to_string()))
            }
            NormalizerError::RuleSetLoad { .. } => {
                LognormError::RuleSet(RuleSetError::Load(err.to_string()))
            }
            NormalizerError::InvalidDirectory(_) | NormalizerError::MissingLibrary(_) => {
                LognormError::RuleSet(RuleSetError::Construction(err.to_string()))
            }
            NormalizerError::NotFound(id) => LognormError::RuleSet(RuleSetError::NotFound(id)),
            NormalizerError::Callback {
                callback,
                pattern,
                reason,
            } => LognormError::Normalization(NormalizationError::Callback {
                callback,
                pattern,
                reason,
            }),
            NormalizerError::ExampleMismatch { .. } => LognormError::Normalization(
                NormalizationError::ExampleMismatch(err.to_string()),
            ),
            NormalizerError::Io(e) => LognormError::Io(e),
        }
    }
}
