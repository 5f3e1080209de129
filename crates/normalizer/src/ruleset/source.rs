//! 룰셋 소스 모델 -- YAML 문서를 역직렬화하는 스키마
//!
//! 모든 구조체는 `deny_unknown_fields`로 선언되어 알 수 없는 키를 거부합니다.
//! 역직렬화 후 [`RuleSetSource::validate`]가 구조적 규칙을 검사하며,
//! 정규식 컴파일과 콜백 참조 해석은 룰셋 컴파일 단계에서 수행됩니다.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use lognorm_core::types::RAW_FIELD;

use crate::description::Descriptions;
use crate::pattern::{DEFAULT_QUOTECHAR, DEFAULT_SEPARATOR, MatchType};
use crate::tag_type::{ANYTHING, DEFAULT_VALUE_KIND, RegexFlags};

/// 룰셋 이름 최대 길이
pub const MAX_NAME_LEN: usize = 256;

/// 룰셋 기본 버전
pub const DEFAULT_VERSION: f64 = 1.0;

fn default_version() -> f64 {
    DEFAULT_VERSION
}

fn default_applied_to() -> String {
    RAW_FIELD.to_owned()
}

fn default_value_kind() -> String {
    DEFAULT_VALUE_KIND.to_owned()
}

fn default_tag_type() -> String {
    ANYTHING.to_owned()
}

fn default_separator() -> String {
    DEFAULT_SEPARATOR.to_string()
}

fn default_quotechar() -> String {
    DEFAULT_QUOTECHAR.to_string()
}

/// 룰셋 소스 문서
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSetSource {
    /// 룰셋 이름 (필수)
    pub name: String,
    /// 버전 -- ID는 `name-version`
    #[serde(default = "default_version")]
    pub version: f64,
    /// 매칭 대상 필드
    #[serde(default = "default_applied_to")]
    pub applied_to: String,
    #[serde(default)]
    pub match_type: MatchType,
    #[serde(default)]
    pub flags: RegexFlags,
    #[serde(default)]
    pub taxonomy: Option<String>,
    #[serde(default)]
    pub description: Descriptions,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub tag_types: Vec<TagTypeSource>,
    #[serde(default)]
    pub callbacks: Vec<CallbackSource>,
    /// 필드 이름 → 정규식. 모두 시작 위치에서 매칭되어야 룰셋이 적용됩니다.
    #[serde(default)]
    pub prerequisites: BTreeMap<String, String>,
    pub patterns: Vec<PatternSource>,
    #[serde(default)]
    pub common_tags: BTreeMap<String, String>,
    /// 룰셋 매칭 후 실행되는 콜백 이름 목록
    #[serde(default)]
    pub final_callbacks: Vec<String>,
}

/// 태그 타입 정의
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TagTypeSource {
    pub name: String,
    /// 값 종류 (참고용)
    #[serde(default = "default_value_kind")]
    pub ttype: String,
    pub regexp: String,
    #[serde(default)]
    pub description: Descriptions,
}

/// 콜백 정의
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CallbackSource {
    pub name: String,
    /// Rhai 스크립트
    pub code: String,
    #[serde(default)]
    pub description: Descriptions,
}

/// 구분자 패턴 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CsvSource {
    #[serde(default = "default_separator")]
    pub separator: String,
    #[serde(default = "default_quotechar")]
    pub quotechar: String,
}

impl Default for CsvSource {
    fn default() -> Self {
        Self {
            separator: default_separator(),
            quotechar: default_quotechar(),
        }
    }
}

/// 패턴 정의
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatternSource {
    pub name: String,
    pub text: String,
    /// 있으면 구분자 패턴
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub csv: Option<CsvSource>,
    #[serde(default)]
    pub description: Descriptions,
    #[serde(default)]
    pub tags: Vec<TagSource>,
    #[serde(default)]
    pub common_tags: BTreeMap<String, String>,
    #[serde(default)]
    pub examples: Vec<ExampleSource>,
}

/// 태그 정의
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TagSource {
    pub name: String,
    #[serde(default = "default_tag_type")]
    pub tag_type: String,
    pub substitute: String,
    #[serde(default)]
    pub callbacks: Vec<String>,
    #[serde(default)]
    pub description: Descriptions,
}

/// 예제 정의
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExampleSource {
    pub text: String,
    #[serde(default)]
    pub expected_tags: BTreeMap<String, String>,
    #[serde(default)]
    pub description: Descriptions,
}

/// 단일 ASCII 문자 설정값을 해석합니다.
pub(crate) fn single_ascii_char(value: &str) -> Option<char> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() => Some(c),
        _ => None,
    }
}

/// 룰셋 소스 검증 실패
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceValidation {
    /// 룰셋 이름 (비어 있을 수 있음)
    pub rule_set: String,
    /// 실패 사유
    pub reason: String,
}

impl RuleSetSource {
    /// YAML 문자열을 파싱합니다. 구조 검증은 수행하지 않습니다.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// YAML 문자열로 직렬화합니다.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(self)
    }

    /// 실제 적용되는 버전. `0`은 기본 버전으로 취급합니다.
    pub fn effective_version(&self) -> f64 {
        if self.version == 0.0 {
            DEFAULT_VERSION
        } else {
            self.version
        }
    }

    /// 룰셋 ID (`name-version`)
    pub fn id(&self) -> String {
        format!("{}-{}", self.name, format_version(self.effective_version()))
    }

    /// 구조적 규칙을 검사합니다.
    pub fn validate(&self) -> Result<(), SourceValidation> {
        let fail = |reason: String| SourceValidation {
            rule_set: self.name.clone(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(fail("name must not be empty".to_owned()));
        }
        if self.name.len() > MAX_NAME_LEN {
            return Err(fail(format!(
                "name is too long: {} chars (max: {MAX_NAME_LEN})",
                self.name.len()
            )));
        }
        if !self.version.is_finite() || self.version < 0.0 {
            return Err(fail(format!("invalid version: {}", self.version)));
        }
        if self.applied_to.is_empty() {
            return Err(fail("applied_to must not be empty".to_owned()));
        }
        if self.patterns.is_empty() {
            return Err(fail("at least one pattern is required".to_owned()));
        }

        let mut seen = HashSet::new();
        for tag_type in &self.tag_types {
            if tag_type.name.is_empty() {
                return Err(fail("tag type name must not be empty".to_owned()));
            }
            if !seen.insert(tag_type.name.as_str()) {
                return Err(fail(format!("duplicate tag type '{}'", tag_type.name)));
            }
        }

        seen.clear();
        for callback in &self.callbacks {
            if callback.name.is_empty() {
                return Err(fail("callback name must not be empty".to_owned()));
            }
            if !seen.insert(callback.name.as_str()) {
                return Err(fail(format!("duplicate callback '{}'", callback.name)));
            }
        }

        seen.clear();
        for pattern in &self.patterns {
            if pattern.name.is_empty() {
                return Err(fail("pattern name must not be empty".to_owned()));
            }
            if !seen.insert(pattern.name.as_str()) {
                return Err(fail(format!("duplicate pattern '{}'", pattern.name)));
            }
            pattern.validate().map_err(|reason| {
                fail(format!("pattern '{}': {reason}", pattern.name))
            })?;
        }

        Ok(())
    }
}

impl PatternSource {
    fn validate(&self) -> Result<(), String> {
        if self.text.is_empty() {
            return Err("text must not be empty".to_owned());
        }

        if let Some(csv) = &self.csv {
            if single_ascii_char(&csv.separator).is_none() {
                return Err(format!(
                    "separator must be a single ASCII character, got '{}'",
                    csv.separator
                ));
            }
            if single_ascii_char(&csv.quotechar).is_none() {
                return Err(format!(
                    "quotechar must be a single ASCII character, got '{}'",
                    csv.quotechar
                ));
            }
        }

        let mut names = HashSet::new();
        for tag in &self.tags {
            if tag.name.is_empty() {
                return Err("tag name must not be empty".to_owned());
            }
            if !names.insert(tag.name.as_str()) {
                return Err(format!("duplicate tag '{}'", tag.name));
            }
            if tag.substitute.is_empty() {
                return Err(format!("tag '{}' has an empty substitute", tag.name));
            }
        }
        Ok(())
    }
}

/// 버전을 ID 표기로 바꿉니다. 정수 버전은 `1.0`처럼 소수점 한 자리로 표기합니다.
pub fn format_version(version: f64) -> String {
    if version.fract() == 0.0 {
        format!("{version:.1}")
    } else {
        format!("{version}")
    }
}
