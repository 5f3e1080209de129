//! 패턴 -- 정규식 패턴과 구분자(CSV) 패턴
//!
//! [`Pattern`]은 공통 정보(이름, 텍스트, 태그, 공통 태그, 예제)와 변형별 배치
//! [`PatternKind`]로 구성됩니다.
//!
//! - [`PatternKind::Regex`]: 치환 토큰이 캡처 그룹으로 바뀌어 룰셋의 통합 정규식에 합쳐집니다.
//! - [`PatternKind::Delimited`]: 구분자로 나눈 필드를 열 이름에 대응시킵니다.

mod delimited;
mod regex;

pub use self::delimited::{DEFAULT_QUOTECHAR, DEFAULT_SEPARATOR, DelimitedLayout, split_delimited};
pub use self::regex::{MatchType, RegexLayout};

pub(crate) use self::regex::{UnionMatch, UnionRegex};

use std::collections::BTreeMap;

use serde::Serialize;

use lognorm_core::types::{FieldValue, Record};

use crate::callback::ScriptEngine;
use crate::description::{Descriptions, localized};
use crate::error::NormalizerError;
use crate::tag::Tag;

/// 패턴 예제 -- 자가 검증에 사용되는 샘플 로그와 기대 태그
#[derive(Debug, Clone, Serialize)]
pub struct Example {
    /// 샘플 로그 라인
    pub text: String,
    /// 태그 이름 → 기대 값 (정규 문자열 형식)
    pub expected_tags: BTreeMap<String, String>,
    /// 다국어 설명
    #[serde(skip)]
    pub description: Descriptions,
}

/// 패턴 변형
#[derive(Debug, Clone)]
pub enum PatternKind {
    /// 정규식 패턴
    Regex(RegexLayout),
    /// 구분자(CSV) 패턴
    Delimited(DelimitedLayout),
}

/// 컴파일된 패턴
#[derive(Debug, Clone)]
pub struct Pattern {
    name: String,
    text: String,
    kind: PatternKind,
    tags: Vec<Tag>,
    common_tags: BTreeMap<String, String>,
    examples: Vec<Example>,
    description: Descriptions,
}

impl Pattern {
    /// 정규식 패턴을 생성합니다.
    ///
    /// # Errors
    /// 치환 토큰이 텍스트에 두 번 이상 나오면 [`NormalizerError::InvalidPattern`]
    pub fn regex(
        name: impl Into<String>,
        text: impl Into<String>,
        tags: Vec<Tag>,
    ) -> Result<Self, NormalizerError> {
        let name = name.into();
        let text = text.into();
        let layout = RegexLayout::parse(&text, &tags)
            .map_err(|reason| NormalizerError::InvalidPattern {
                name: name.clone(),
                reason,
            })?;
        Ok(Self::with_kind(name, text, PatternKind::Regex(layout), tags))
    }

    /// 구분자 패턴을 생성합니다.
    pub fn delimited(
        name: impl Into<String>,
        text: impl Into<String>,
        separator: char,
        quotechar: char,
        tags: Vec<Tag>,
    ) -> Self {
        let text = text.into();
        let layout = DelimitedLayout::new(&text, separator, quotechar);
        Self::with_kind(name.into(), text, PatternKind::Delimited(layout), tags)
    }

    fn with_kind(name: String, text: String, kind: PatternKind, tags: Vec<Tag>) -> Self {
        Self {
            name,
            text,
            kind,
            tags,
            common_tags: BTreeMap::new(),
            examples: Vec::new(),
            description: Descriptions::new(),
        }
    }

    pub fn with_common_tags(mut self, common_tags: BTreeMap<String, String>) -> Self {
        self.common_tags = common_tags;
        self
    }

    pub fn with_examples(mut self, examples: Vec<Example>) -> Self {
        self.examples = examples;
        self
    }

    pub fn with_description(mut self, description: Descriptions) -> Self {
        self.description = description;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 패턴 텍스트 원문
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn kind(&self) -> &PatternKind {
        &self.kind
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn common_tags(&self) -> &BTreeMap<String, String> {
        &self.common_tags
    }

    pub fn examples(&self) -> &[Example] {
        &self.examples
    }

    pub fn description(&self, lang: &str) -> &str {
        localized(&self.description, lang)
    }

    pub fn is_delimited(&self) -> bool {
        matches!(self.kind, PatternKind::Delimited(_))
    }

    pub(crate) fn regex_layout(&self) -> Option<&RegexLayout> {
        match &self.kind {
            PatternKind::Regex(layout) => Some(layout),
            PatternKind::Delimited(_) => None,
        }
    }

    /// 패턴 공통 태그를 레코드에 추가합니다.
    pub(crate) fn add_common_tags(&self, record: &mut Record) {
        for (name, value) in &self.common_tags {
            record.insert(name.clone(), value.as_str());
        }
    }

    /// 통합 정규식 매칭 결과를 스테이징 레코드에 적용합니다.
    ///
    /// 참여한 태그마다 값을 기록하고 태그 콜백을 실행합니다(빈 값 포함).
    /// 임시 태그는 모든 콜백이 끝난 뒤 제거됩니다.
    pub(crate) fn apply_captures(
        &self,
        hit: &UnionMatch,
        staging: &mut Record,
        engine: &ScriptEngine,
    ) -> Result<(), NormalizerError> {
        for (tag_idx, value) in &hit.values {
            let Some(tag) = self.tags.get(*tag_idx) else {
                continue;
            };
            staging.insert(tag.name(), value.as_str());
            tag.run_callbacks(engine, &self.name, value, staging)?;
        }
        staging.strip_temporary();
        Ok(())
    }

    /// 구분자 패턴으로 값을 매칭합니다.
    ///
    /// 반환되는 레코드에는 태그 이름으로 바뀐 필드, 나머지 열, 패턴 공통 태그가 담깁니다.
    /// 임시 필드와 빈 필드는 제거됩니다. 정규식 패턴이면 항상 `None`.
    ///
    /// # Errors
    /// 태그 콜백 실패 시 [`NormalizerError::Callback`]
    pub fn try_match_delimited(
        &self,
        value: &str,
        engine: &ScriptEngine,
    ) -> Result<Option<Record>, NormalizerError> {
        let PatternKind::Delimited(layout) = &self.kind else {
            return Ok(None);
        };
        let Some(pairs) = layout.split(value) else {
            return Ok(None);
        };

        let mut data: Record = pairs
            .into_iter()
            .map(|(column, field)| (column, FieldValue::Text(field)))
            .collect();

        for tag in &self.tags {
            let Some(field) = data.text(tag.substitute()).map(str::to_owned) else {
                continue;
            };
            if !tag.tag_type().matches_unflagged(&field) {
                tracing::debug!(
                    pattern = %self.name,
                    tag = tag.name(),
                    "field rejected by tag type"
                );
                return Ok(None);
            }
            data.remove(tag.substitute());
            data.insert(tag.name(), field.as_str());
            if field.is_empty() {
                continue;
            }
            tag.run_callbacks(engine, &self.name, &field, &mut data)?;
        }

        data.strip_temporary();
        data.retain(|_, value| !value.is_empty());
        self.add_common_tags(&mut data);
        Ok(Some(data))
    }

    /// 문서화용 요약
    pub fn summary(&self, lang: &str) -> PatternSummary {
        let (kind, separator, quotechar) = match &self.kind {
            PatternKind::Regex(_) => ("regex", None, None),
            PatternKind::Delimited(layout) => (
                "delimited",
                Some(layout.separator().to_string()),
                Some(layout.quotechar().to_string()),
            ),
        };
        PatternSummary {
            name: self.name.clone(),
            pattern: self.text.clone(),
            kind,
            separator,
            quotechar,
            description: self.description(lang).to_owned(),
            tags: self
                .tags
                .iter()
                .map(|t| (t.name().to_owned(), t.description(lang).to_owned()))
                .collect(),
            substitutes: self
                .tags
                .iter()
                .map(|t| (t.substitute().to_owned(), t.name().to_owned()))
                .collect(),
            common_tags: self.common_tags.clone(),
            examples: self
                .examples
                .iter()
                .map(|e| ExampleSummary {
                    sample: e.text.clone(),
                    description: localized(&e.description, lang).to_owned(),
                    normalization: e.expected_tags.clone(),
                })
                .collect(),
        }
    }
}

/// 패턴 요약
#[derive(Debug, Clone, Serialize)]
pub struct PatternSummary {
    pub name: String,
    pub pattern: String,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub separator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quotechar: Option<String>,
    pub description: String,
    /// 태그 이름 → 설명
    pub tags: BTreeMap<String, String>,
    /// 치환 토큰 → 태그 이름
    pub substitutes: BTreeMap<String, String>,
    pub common_tags: BTreeMap<String, String>,
    pub examples: Vec<ExampleSummary>,
}

/// 예제 요약
#[derive(Debug, Clone, Serialize)]
pub struct ExampleSummary {
    pub sample: String,
    pub description: String,
    pub normalization: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::callback::Callback;
    use crate::tag_type::{RegexFlags, TagType};

    const SYSLOG_DATE: &str = r"[A-Z][a-z]{2} [ 0-9]\d \d{2}:\d{2}:\d{2}";

    fn anything() -> Arc<TagType> {
        Arc::new(TagType::anything().unwrap())
    }

    fn plain_tag(name: &str, substitute: &str, tt: Arc<TagType>) -> Tag {
        Tag::new(name, tt, substitute, vec![], Descriptions::new())
    }

    fn csv_pattern(date_type: Arc<TagType>) -> Pattern {
        Pattern::delimited(
            "csv-001",
            "DATE,ID,MSG",
            ',',
            '"',
            vec![
                plain_tag("date", "DATE", date_type),
                plain_tag("id", "ID", anything()),
                plain_tag("msg", "MSG", anything()),
            ],
        )
    }

    #[test]
    fn delimited_match_renames_columns() {
        let engine = ScriptEngine::default();
        let pattern = csv_pattern(anything());
        let line = r#"Jul 18 08:55:35,83,"start listening on 127.0.0.1, pam auth started""#;
        let data = pattern.try_match_delimited(line, &engine).unwrap().unwrap();
        assert_eq!(data.text("date"), Some("Jul 18 08:55:35"));
        assert_eq!(data.text("id"), Some("83"));
        assert_eq!(
            data.text("msg"),
            Some("start listening on 127.0.0.1, pam auth started")
        );
        assert_eq!(data.len(), 3);
    }

    #[test]
    fn delimited_wrong_column_count_is_no_match() {
        let engine = ScriptEngine::default();
        let pattern = csv_pattern(anything());
        assert!(pattern
            .try_match_delimited("Jul 18 08:55:35,83", &engine)
            .unwrap()
            .is_none());
    }

    #[test]
    fn delimited_tag_type_rejects_value() {
        let engine = ScriptEngine::default();
        let date = Arc::new(
            TagType::new("syslogDate", "datetime", SYSLOG_DATE, RegexFlags::default()).unwrap(),
        );
        let pattern = csv_pattern(date);
        assert!(pattern
            .try_match_delimited("2011 Jul 18 08:55:35,83,msg", &engine)
            .unwrap()
            .is_none());
        assert!(pattern
            .try_match_delimited("Jul 18 08:55:35,83,msg", &engine)
            .unwrap()
            .is_some());
    }

    #[test]
    fn delimited_tag_type_check_ignores_definition_flags() {
        let engine = ScriptEngine::default();
        let lower =
            Arc::new(TagType::new("Lower", "string", "[a-z]+$", RegexFlags::SHARED).unwrap());
        let pattern = Pattern::delimited(
            "csv-004",
            "WORD,REST",
            ',',
            '"',
            vec![plain_tag("word", "WORD", lower)],
        );
        assert!(pattern
            .try_match_delimited("HELLO,x", &engine)
            .unwrap()
            .is_none());
        let data = pattern.try_match_delimited("hello,x", &engine).unwrap().unwrap();
        assert_eq!(data.text("word"), Some("hello"));
    }

    #[test]
    fn delimited_strips_empty_and_temporary_fields_and_adds_common_tags() {
        let engine = ScriptEngine::default();
        let pattern = Pattern::delimited(
            "csv-002",
            "A,__B,C",
            ',',
            '"',
            vec![plain_tag("a", "A", anything()), plain_tag("__b", "__B", anything())],
        )
        .with_common_tags(BTreeMap::from([("vendor".to_owned(), "acme".to_owned())]));

        let data = pattern.try_match_delimited("x,tmp,", &engine).unwrap().unwrap();
        assert_eq!(data.text("a"), Some("x"));
        assert!(!data.contains_key("__b"));
        assert!(!data.contains_key("__B"));
        assert!(!data.contains_key("C"));
        assert_eq!(data.text("vendor"), Some("acme"));
    }

    #[test]
    fn delimited_callbacks_skip_empty_values() {
        let engine = ScriptEngine::default();
        let cb = Arc::new(
            Callback::compile(&engine, "t", "mark", r#"log.marked = "yes";"#).unwrap(),
        );
        let tag = Tag::new("a", anything(), "A", vec![cb], Descriptions::new());
        let pattern = Pattern::delimited("csv-003", "A,B", ',', '"', vec![tag]);

        let data = pattern.try_match_delimited(",b", &engine).unwrap().unwrap();
        assert!(!data.contains_key("marked"));
        let data = pattern.try_match_delimited("a,b", &engine).unwrap().unwrap();
        assert_eq!(data.text("marked"), Some("yes"));
    }

    #[test]
    fn delimited_callback_failure_names_pattern() {
        let engine = ScriptEngine::default();
        let cb = Arc::new(Callback::compile(&engine, "t", "boom", r#"throw "x";"#).unwrap());
        let tag = Tag::new("a", anything(), "A", vec![cb], Descriptions::new());
        let pattern = Pattern::delimited("csv-004", "A,B", ',', '"', vec![tag]);

        let err = pattern.try_match_delimited("a,b", &engine).unwrap_err();
        assert!(matches!(
            err,
            NormalizerError::Callback { ref pattern, .. } if pattern == "csv-004"
        ));
    }

    #[test]
    fn regex_pattern_rejects_duplicate_substitute() {
        let err = Pattern::regex(
            "dup",
            "ID ID",
            vec![plain_tag("id", "ID", anything())],
        )
        .unwrap_err();
        assert!(matches!(err, NormalizerError::InvalidPattern { ref name, .. } if name == "dup"));
    }

    #[test]
    fn summary_lists_substitutes_and_examples() {
        let pattern = csv_pattern(anything()).with_examples(vec![Example {
            text: "a,b,c".to_owned(),
            expected_tags: BTreeMap::from([("id".to_owned(), "b".to_owned())]),
            description: Descriptions::new(),
        }]);
        let summary = pattern.summary("en");
        assert_eq!(summary.kind, "delimited");
        assert_eq!(summary.substitutes.get("ID").map(String::as_str), Some("id"));
        assert_eq!(summary.examples.len(), 1);
        assert_eq!(summary.description, "N/A");
    }
}
