//! 태그 타입 -- 태그 값이 만족해야 하는 정규식
//!
//! [`TagType`]은 이름 붙은 정규식입니다. 정규식 패턴의 치환 토큰 자리에 그대로 삽입되며,
//! 구분자(CSV) 패턴에서는 필드 값 검증에 사용됩니다.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::description::{Descriptions, localized};
use crate::error::NormalizerError;

/// 태그 타입을 찾지 못했을 때 사용하는 기본 태그 타입 이름
pub const ANYTHING: &str = "Anything";

/// 기본 값 종류 (참고용)
pub const DEFAULT_VALUE_KIND: &str = "string";

/// 정규식 컴파일 플래그
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegexFlags {
    /// 유니코드 문자 클래스 (`\w`, `\d`, `\s`, `\b`)
    ///
    /// 꺼져 있으면 이 클래스들은 ASCII만 매칭합니다. `.` 등은 항상 문자 단위입니다.
    pub unicode: bool,
    /// 대소문자 무시
    pub ignore_case: bool,
    /// `^`/`$`가 줄 경계에서도 매칭
    pub multiline: bool,
}

impl RegexFlags {
    /// 공용 라이브러리 태그 타입에 적용되는 플래그
    pub const SHARED: Self = Self {
        unicode: true,
        ignore_case: true,
        multiline: false,
    };

    /// 이 플래그로 정규식을 컴파일합니다.
    ///
    /// 매칭은 항상 문자(UTF-8 코드 포인트) 단위입니다.
    pub fn compile(self, pattern: &str) -> Result<Regex, regex::Error> {
        let pattern = if self.unicode {
            pattern.to_owned()
        } else {
            ascii_classes(pattern)
        };
        RegexBuilder::new(&pattern)
            .case_insensitive(self.ignore_case)
            .multi_line(self.multiline)
            .build()
    }
}

/// `\w`, `\d`, `\s`와 부정형, `\b`를 ASCII 전용 표현으로 바꿉니다.
///
/// 치환 결과는 문자 클래스 안팎 어디서나 유효한 대괄호 클래스입니다.
/// `\B`는 ASCII 버전이 UTF-8 경계 밖에서 매칭될 수 있어 그대로 둡니다.
fn ascii_classes(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();
    let mut in_class = 0usize;

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                let Some(next) = chars.next() else {
                    out.push(c);
                    break;
                };
                let replacement = match next {
                    'd' => Some("[0-9]"),
                    'D' => Some("[^0-9]"),
                    'w' => Some("[0-9A-Za-z_]"),
                    'W' => Some("[^0-9A-Za-z_]"),
                    's' => Some("[\\t\\n\\x0B\\f\\r ]"),
                    'S' => Some("[^\\t\\n\\x0B\\f\\r ]"),
                    'b' if in_class == 0 => Some("(?-u:\\b)"),
                    _ => None,
                };
                match replacement {
                    Some(r) => out.push_str(r),
                    None => {
                        out.push(c);
                        out.push(next);
                    }
                }
            }
            '[' => {
                out.push(c);
                // `[:alpha:]` 같은 ASCII 클래스는 중첩으로 세지 않음
                if chars.peek() == Some(&':') && in_class > 0 {
                    for c in chars.by_ref() {
                        out.push(c);
                        if c == ']' {
                            break;
                        }
                    }
                    continue;
                }
                in_class += 1;
                // 여는 괄호 바로 뒤의 `]`(또는 `^]`)는 리터럴
                if chars.peek() == Some(&'^') {
                    out.push('^');
                    chars.next();
                }
                if chars.peek() == Some(&']') {
                    out.push(']');
                    chars.next();
                }
            }
            ']' if in_class > 0 => {
                in_class -= 1;
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

/// 태그 타입
#[derive(Debug, Clone)]
pub struct TagType {
    name: String,
    value_kind: String,
    regexp: String,
    /// 값 앞부분에 고정된 정규식
    anchored: Regex,
    /// 플래그 없이 컴파일된 고정 정규식 (구분자 필드 검증용)
    unflagged: Regex,
    description: Descriptions,
}

impl TagType {
    /// 태그 타입을 생성합니다.
    ///
    /// # Errors
    /// 정규식이 컴파일되지 않으면 [`NormalizerError::InvalidPattern`]
    pub fn new(
        name: impl Into<String>,
        value_kind: impl Into<String>,
        regexp: impl Into<String>,
        flags: RegexFlags,
    ) -> Result<Self, NormalizerError> {
        let name = name.into();
        let regexp = regexp.into();

        let invalid = |e: regex::Error| NormalizerError::InvalidPattern {
            name: name.clone(),
            reason: format!("invalid regular expression {regexp:?}: {e}"),
        };

        flags.compile(&regexp).map_err(invalid)?;
        let anchored_source = format!(r"\A(?:{regexp})");
        let anchored = flags.compile(&anchored_source).map_err(invalid)?;
        let unflagged = RegexFlags::default()
            .compile(&anchored_source)
            .map_err(invalid)?;

        Ok(Self {
            name,
            value_kind: value_kind.into(),
            regexp,
            anchored,
            unflagged,
            description: Descriptions::new(),
        })
    }

    /// 모든 값을 허용하는 `Anything` 태그 타입
    pub fn anything() -> Result<Self, NormalizerError> {
        Self::new(ANYTHING, DEFAULT_VALUE_KIND, ".*", RegexFlags::SHARED)
    }

    pub fn with_description(mut self, description: Descriptions) -> Self {
        self.description = description;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_kind(&self) -> &str {
        &self.value_kind
    }

    /// 컴파일 전 정규식 원문
    pub fn regexp(&self) -> &str {
        &self.regexp
    }

    pub fn description(&self, lang: &str) -> &str {
        localized(&self.description, lang)
    }

    /// 값의 앞부분이 이 태그 타입의 정규식과 매칭되는지 확인합니다.
    pub fn matches(&self, value: &str) -> bool {
        self.anchored.is_match(value)
    }

    /// 정의된 플래그를 무시하고 값의 앞부분을 검사합니다.
    ///
    /// 구분자 패턴의 필드 검증은 대소문자 무시나 유니코드 클래스 없이 수행됩니다.
    pub fn matches_unflagged(&self, value: &str) -> bool {
        self.unflagged.is_match(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SYSLOG_DATE: &str = r"[A-Z][a-z]{2} [ 0-9]\d \d{2}:\d{2}:\d{2}";

    #[test]
    fn invalid_regexp_is_rejected() {
        let err = TagType::new("Broken", "string", "a)(b", RegexFlags::default()).unwrap_err();
        assert!(matches!(err, NormalizerError::InvalidPattern { ref name, .. } if name == "Broken"));
    }

    #[test]
    fn matches_is_anchored_at_start_only() {
        let tt = TagType::new("SyslogDate", "datetime", SYSLOG_DATE, RegexFlags::default()).unwrap();
        assert!(tt.matches("Jul 18 08:55:35"));
        assert!(tt.matches("Oct  6 23:05:10"));
        assert!(tt.matches("Jul 18 08:55:35 trailing"));
        assert!(!tt.matches("2011 Jul 18 08:55:35"));
    }

    #[test]
    fn shared_flags_ignore_case() {
        let tt = TagType::new("Word", "string", "[a-z]+", RegexFlags::SHARED).unwrap();
        assert!(tt.matches("HELLO"));
        let strict = TagType::new("Word", "string", "[a-z]+", RegexFlags::default()).unwrap();
        assert!(!strict.matches("HELLO"));
    }

    #[test]
    fn unflagged_match_ignores_definition_flags() {
        let tt = TagType::new("Word", "string", "[a-z]+", RegexFlags::SHARED).unwrap();
        assert!(tt.matches("HELLO"));
        assert!(!tt.matches_unflagged("HELLO"));
        assert!(tt.matches_unflagged("hello"));
    }

    #[test]
    fn dot_matches_whole_characters_without_unicode_flag() {
        let one = TagType::new("One", "string", r".\z", RegexFlags::default()).unwrap();
        assert!(one.matches("é"));
        let three = TagType::new("Three", "string", r".{3}\z", RegexFlags::default()).unwrap();
        assert!(three.matches("héé"));
        assert!(!three.matches("hé"));
    }

    #[test]
    fn unicode_flag_controls_perl_classes() {
        let ascii = TagType::new("Word", "string", r"\w+\z", RegexFlags::default()).unwrap();
        assert!(ascii.matches("naruto_42"));
        assert!(!ascii.matches("héé"));

        let flags = RegexFlags {
            unicode: true,
            ..RegexFlags::default()
        };
        let unicode = TagType::new("Word", "string", r"\w+\z", flags).unwrap();
        assert!(unicode.matches("héé"));
    }

    #[test]
    fn ascii_classes_rewrite_inside_and_outside_brackets() {
        assert_eq!(ascii_classes(r"\d+"), "[0-9]+");
        assert_eq!(ascii_classes(r"[\w.-]+"), "[[0-9A-Za-z_].-]+");
        assert_eq!(ascii_classes(r"\\d"), r"\\d");
        assert_eq!(ascii_classes(r"\bx\B"), r"(?-u:\b)x\B");
        assert_eq!(ascii_classes(r"[]\d]"), "[][0-9]]");
        assert_eq!(ascii_classes(r"[[:digit:]\s]"), r"[[:digit:][\t\n\x0B\f\r ]]");

        let negated = TagType::new("NotDigit", "string", r"\D\z", RegexFlags::default()).unwrap();
        assert!(negated.matches("é"));
        assert!(!negated.matches("7"));
    }

    #[test]
    fn anything_matches_empty_and_arbitrary_values() {
        let tt = TagType::anything().unwrap();
        assert_eq!(tt.name(), ANYTHING);
        assert!(tt.matches(""));
        assert!(tt.matches("start listening on 127.0.0.1, pam auth started"));
    }

    #[test]
    fn description_defaults_to_not_available() {
        let tt = TagType::anything().unwrap();
        assert_eq!(tt.description("en"), "N/A");
    }
}
