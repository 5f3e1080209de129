//! 설정 관리: lognorm.toml 파싱 및 런타임 설정
//!
//! [`LognormConfig`]는 CLI와 정규화 풀이 읽는 최상위 설정 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`LOGNORM_NORMALIZER_PATHS=/a,/b` 형식)
//! 3. 설정 파일 (`lognorm.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), lognorm_core::error::LognormError> {
//! use lognorm_core::config::LognormConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = LognormConfig::load("lognorm.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = LognormConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, LognormError};

/// 정규화 룰셋이 설치되는 기본 디렉토리
pub const DEFAULT_NORMALIZERS_PATH: &str = "/usr/share/lognorm/normalizers";

/// 콜백 스크립트 1회 실행당 기본 연산 한도
pub const DEFAULT_MAX_SCRIPT_OPERATIONS: u64 = 100_000;

/// 타임존 이름을 담는 기본 레코드 필드
pub const DEFAULT_TIMEZONE_FIELD: &str = "_timezone";

/// lognorm 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LognormConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 정규화 풀 설정
    #[serde(default)]
    pub normalizer: NormalizerConfig,
}

impl LognormConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, LognormError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, LognormError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LognormError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                LognormError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, LognormError> {
        toml::from_str(toml_str).map_err(|e| {
            LognormError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `LOGNORM_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "LOGNORM_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "LOGNORM_GENERAL_LOG_FORMAT");

        // Normalizer
        override_csv(&mut self.normalizer.paths, "LOGNORM_NORMALIZER_PATHS");
        override_u64(
            &mut self.normalizer.max_script_operations,
            "LOGNORM_NORMALIZER_MAX_SCRIPT_OPERATIONS",
        );
        override_string(
            &mut self.normalizer.timezone_field,
            "LOGNORM_NORMALIZER_TIMEZONE_FIELD",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LognormError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.normalizer.paths.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "normalizer.paths".to_owned(),
                reason: "at least one rule directory is required".to_owned(),
            }
            .into());
        }

        if self.normalizer.paths.iter().any(|p| p.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "normalizer.paths".to_owned(),
                reason: "paths must not contain empty entries".to_owned(),
            }
            .into());
        }

        if self.normalizer.max_script_operations == 0 {
            return Err(ConfigError::InvalidValue {
                field: "normalizer.max_script_operations".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        if self.normalizer.timezone_field.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "normalizer.timezone_field".to_owned(),
                reason: "must not be empty".to_owned(),
            }
            .into());
        }

        Ok(())
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

/// 정규화 풀 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// 룰셋 디렉토리 목록 (뒤쪽 디렉토리의 공용 라이브러리가 우선)
    pub paths: Vec<String>,
    /// 콜백 1회 실행당 최대 연산 수
    pub max_script_operations: u64,
    /// 타임존 이름을 읽을 레코드 필드
    pub timezone_field: String,
    /// 명시적 활성화 맵 (룰셋 ID → 활성 여부)
    ///
    /// 비어 있으면 모든 룰셋이 활성화됩니다.
    pub active: BTreeMap<String, bool>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            paths: vec![DEFAULT_NORMALIZERS_PATH.to_owned()],
            max_script_operations: DEFAULT_MAX_SCRIPT_OPERATIONS,
            timezone_field: DEFAULT_TIMEZONE_FIELD.to_owned(),
            active: BTreeMap::new(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
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

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val.split(',').map(|s| s.trim().to_owned()).collect();
    }
}
