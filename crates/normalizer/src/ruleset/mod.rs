//! 룰셋 -- 하나의 로그 형식을 정규화하는 패턴 모음
//!
//! [`RuleSet`]은 [`RuleSetSource`]를 컴파일한 결과입니다.
//!
//! # 매칭 흐름
//! 1. 전제 조건(prerequisites)을 모두 만족하는지 확인
//! 2. `applied_to` 필드 값에 통합 정규식을 적용
//! 3. 매칭되지 않으면 구분자 패턴을 이름 순서로 시도
//! 4. 매칭되면 태그와 공통 태그, 분류(taxonomy)를 추가하고 최종 콜백 실행
//!
//! 룰셋의 기여분은 모두 복사본에서 만들어진 뒤 성공 시에만 레코드에 반영됩니다.
//! 콜백이 실패하면 레코드는 변경되지 않고 에러가 반환됩니다.

pub mod loader;
pub mod source;

pub use loader::{LoadedSource, RuleSetLoader};
pub use source::{RuleSetSource, SourceValidation};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::Regex;
use serde::Serialize;

use lognorm_core::error::LognormError;
use lognorm_core::pipeline::Normalize;
use lognorm_core::types::{Record, TAXONOMY_FIELD};

use crate::callback::{Callback, ScriptEngine};
use crate::description::{Descriptions, localized};
use crate::error::NormalizerError;
use crate::library::SharedLibrary;
use crate::pattern::{Example, MatchType, Pattern, PatternSummary, UnionRegex};
use crate::tag::Tag;
use crate::tag_type::{ANYTHING, RegexFlags, TagType};

use self::source::{PatternSource, format_version, single_ascii_char};

/// 예제 검증에서 값이 없을 때 표시하는 문자열
const ABSENT: &str = "(absent)";

/// 컴파일된 룰셋
#[derive(Debug, Clone)]
pub struct RuleSet {
    id: String,
    name: String,
    version: f64,
    applied_to: String,
    match_type: MatchType,
    flags: RegexFlags,
    taxonomy: Option<String>,
    description: Descriptions,
    authors: Vec<String>,
    prerequisites: Vec<(String, Regex)>,
    /// 이름 순으로 정렬된 패턴
    patterns: Vec<Pattern>,
    union: Option<UnionRegex>,
    tag_types: BTreeMap<String, Arc<TagType>>,
    callbacks: BTreeMap<String, Arc<Callback>>,
    common_tags: BTreeMap<String, String>,
    final_callbacks: Vec<Arc<Callback>>,
    engine: Arc<ScriptEngine>,
    source_text: String,
    path: Option<PathBuf>,
}

impl RuleSet {
    /// 소스를 컴파일합니다.
    ///
    /// 태그 타입은 룰셋 로컬 정의, 공용 라이브러리, `Anything` 순으로 해석되며
    /// 콜백은 로컬 정의, 공용 라이브러리 순으로 해석됩니다.
    ///
    /// # Errors
    /// - 구조 검증 실패, 해석할 수 없는 콜백: [`NormalizerError::RuleSetValidation`]
    /// - 정규식 컴파일 실패: [`NormalizerError::InvalidPattern`]
    pub fn compile(
        source: RuleSetSource,
        library: &SharedLibrary,
        engine: Arc<ScriptEngine>,
    ) -> Result<Self, NormalizerError> {
        source
            .validate()
            .map_err(|v| NormalizerError::RuleSetValidation {
                rule_set: v.rule_set,
                reason: v.reason,
            })?;

        let version = source.effective_version();
        let id = source.id();
        let invalid = |reason: String| NormalizerError::RuleSetValidation {
            rule_set: source.name.clone(),
            reason,
        };

        let mut tag_types = BTreeMap::new();
        for tt in &source.tag_types {
            let tag_type = TagType::new(&tt.name, &tt.ttype, &tt.regexp, source.flags)?
                .with_description(tt.description.clone());
            tag_types.insert(tt.name.clone(), Arc::new(tag_type));
        }

        let mut callbacks = BTreeMap::new();
        for cb in &source.callbacks {
            let callback = Callback::compile(&engine, &source.name, &cb.name, &cb.code)?;
            callbacks.insert(cb.name.clone(), Arc::new(callback));
        }

        let resolve_callback = |name: &str| -> Result<Arc<Callback>, NormalizerError> {
            callbacks
                .get(name)
                .cloned()
                .or_else(|| library.callback(name))
                .ok_or_else(|| invalid(format!("unknown callback '{name}'")))
        };

        let resolve_tag_type = |name: &str| -> Result<Arc<TagType>, NormalizerError> {
            if let Some(tt) = tag_types.get(name).cloned().or_else(|| library.tag_type(name)) {
                return Ok(tt);
            }
            tracing::debug!(
                rule_set = %source.name,
                tag_type = name,
                "unknown tag type, using Anything"
            );
            match library.tag_type(ANYTHING) {
                Some(tt) => Ok(tt),
                None => Ok(Arc::new(TagType::anything()?)),
            }
        };

        let mut prerequisites = Vec::with_capacity(source.prerequisites.len());
        for (field, re) in &source.prerequisites {
            let compiled = source
                .flags
                .compile(&format!(r"\A(?:{re})"))
                .map_err(|e| NormalizerError::InvalidPattern {
                    name: format!("{}: prerequisite '{field}'", source.name),
                    reason: e.to_string(),
                })?;
            prerequisites.push((field.clone(), compiled));
        }

        let mut patterns = Vec::with_capacity(source.patterns.len());
        for ps in &source.patterns {
            let mut tags = Vec::with_capacity(ps.tags.len());
            for ts in &ps.tags {
                let tag_callbacks = ts
                    .callbacks
                    .iter()
                    .map(|name| resolve_callback(name))
                    .collect::<Result<Vec<_>, _>>()?;
                tags.push(Tag::new(
                    &ts.name,
                    resolve_tag_type(&ts.tag_type)?,
                    &ts.substitute,
                    tag_callbacks,
                    ts.description.clone(),
                ));
            }
            patterns.push(build_pattern(ps, tags)?);
        }
        patterns.sort_by(|a, b| a.name().cmp(b.name()));

        let final_callbacks = source
            .final_callbacks
            .iter()
            .map(|name| resolve_callback(name))
            .collect::<Result<Vec<_>, _>>()?;

        let union = UnionRegex::build(&source.name, &patterns, source.flags, source.match_type)?;
        let source_text = source.to_yaml().unwrap_or_default();

        Ok(Self {
            id,
            name: source.name,
            version,
            applied_to: source.applied_to,
            match_type: source.match_type,
            flags: source.flags,
            taxonomy: source.taxonomy,
            description: source.description,
            authors: source.authors,
            prerequisites,
            patterns,
            union,
            tag_types,
            callbacks,
            common_tags: source.common_tags,
            final_callbacks,
            engine,
            source_text,
            path: None,
        })
    }

    /// 원본 YAML 텍스트와 파일 경로를 기록합니다.
    pub fn with_origin(mut self, text: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.source_text = text.into();
        self.path = Some(path.into());
        self
    }

    /// 룰셋 ID (`name-version`)
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> f64 {
        self.version
    }

    /// 매칭 대상 필드 이름
    pub fn applied_to(&self) -> &str {
        &self.applied_to
    }

    pub fn match_type(&self) -> MatchType {
        self.match_type
    }

    pub fn flags(&self) -> RegexFlags {
        self.flags
    }

    pub fn taxonomy(&self) -> Option<&str> {
        self.taxonomy.as_deref()
    }

    pub fn authors(&self) -> &[String] {
        &self.authors
    }

    pub fn description(&self, lang: &str) -> &str {
        localized(&self.description, lang)
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    /// 룰셋 로컬 태그 타입
    pub fn tag_type(&self, name: &str) -> Option<&TagType> {
        self.tag_types.get(name).map(Arc::as_ref)
    }

    /// 룰셋 로컬 콜백
    pub fn callback(&self, name: &str) -> Option<&Callback> {
        self.callbacks.get(name).map(Arc::as_ref)
    }

    pub fn common_tags(&self) -> &BTreeMap<String, String> {
        &self.common_tags
    }

    /// 통합 정규식 원문 (정규식 패턴이 없으면 `None`)
    pub fn combined_regex(&self) -> Option<&str> {
        self.union.as_ref().map(UnionRegex::as_str)
    }

    /// 룰셋 소스 YAML
    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    /// 룰셋 파일 경로 (파일에서 로드된 경우)
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// 모든 전제 조건을 만족하는지 확인합니다.
    ///
    /// 필드가 없거나 값이 텍스트가 아니면 빈 문자열로 검사합니다.
    pub fn prerequisites_met(&self, record: &Record) -> bool {
        self.prerequisites.iter().all(|(field, re)| {
            let value = record.text(field).unwrap_or("");
            re.is_match(value)
        })
    }

    /// 전제 조건을 확인한 뒤 레코드를 정규화합니다.
    ///
    /// 매칭되면 `Ok(true)`. 매칭되지 않으면 레코드는 그대로입니다.
    ///
    /// # Errors
    /// 콜백 실패 시 [`NormalizerError::Callback`]. 이 경우에도 레코드는 그대로입니다.
    pub fn normalize(&self, record: &mut Record) -> Result<bool, NormalizerError> {
        if !self.prerequisites_met(record) {
            tracing::debug!(rule_set = %self.id, "prerequisites not met");
            return Ok(false);
        }
        self.normalize_unchecked(record)
    }

    /// 전제 조건을 건너뛰고 레코드를 정규화합니다.
    pub fn normalize_unchecked(&self, record: &mut Record) -> Result<bool, NormalizerError> {
        let Some(value) = record.text(&self.applied_to).map(str::to_owned) else {
            return Ok(false);
        };

        if let Some(hit) = self.union.as_ref().and_then(|u| u.find(&value)) {
            let Some(pattern) = self.patterns.get(hit.pattern) else {
                return Ok(false);
            };
            let mut staging = record.clone();
            pattern.apply_captures(&hit, &mut staging, &self.engine)?;

            let mut out = record.clone();
            out.merge(staging);
            pattern.add_common_tags(&mut out);
            self.finish(&mut out)?;

            tracing::debug!(rule_set = %self.id, pattern = pattern.name(), "matched");
            *record = out;
            return Ok(true);
        }

        for pattern in self.patterns.iter().filter(|p| p.is_delimited()) {
            if let Some(data) = pattern.try_match_delimited(&value, &self.engine)? {
                let mut out = record.clone();
                out.merge(data);
                self.finish(&mut out)?;

                tracing::debug!(rule_set = %self.id, pattern = pattern.name(), "matched");
                *record = out;
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// 룰셋 공통 태그와 분류를 추가하고 최종 콜백을 실행합니다.
    fn finish(&self, record: &mut Record) -> Result<(), NormalizerError> {
        for (name, value) in &self.common_tags {
            record.insert(name.clone(), value.as_str());
        }
        if let Some(taxonomy) = &self.taxonomy {
            record.insert(TAXONOMY_FIELD, taxonomy.as_str());
        }
        for callback in &self.final_callbacks {
            callback.invoke(&self.engine, &self.name, None, record)?;
        }
        Ok(())
    }

    /// 모든 패턴 예제를 실행해 기대 태그와 비교합니다.
    ///
    /// 정규식 패턴 예제는 룰셋 전체(전제 조건 제외)로, 구분자 패턴 예제는
    /// 해당 패턴만으로 정규화한 뒤 룰셋 공통 태그와 최종 콜백을 적용합니다.
    ///
    /// # Errors
    /// 첫 번째 불일치에서 [`NormalizerError::ExampleMismatch`]
    pub fn validate_examples(&self) -> Result<(), NormalizerError> {
        for pattern in &self.patterns {
            for example in pattern.examples() {
                let record = self.run_example(pattern, example)?;
                for (tag, expected) in &example.expected_tags {
                    let actual = record
                        .get(tag)
                        .and_then(|v| v.canonical())
                        .unwrap_or_else(|| ABSENT.to_owned());
                    if &actual != expected {
                        return Err(NormalizerError::ExampleMismatch {
                            rule_set: self.id.clone(),
                            pattern: pattern.name().to_owned(),
                            example: example.text.clone(),
                            tag: tag.clone(),
                            expected: expected.clone(),
                            actual,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn run_example(&self, pattern: &Pattern, example: &Example) -> Result<Record, NormalizerError> {
        let mut record = Record::with_field(self.applied_to.clone(), example.text.as_str());
        if pattern.is_delimited() {
            if let Some(data) = pattern.try_match_delimited(&example.text, &self.engine)? {
                record.merge(data);
                self.finish(&mut record)?;
            }
        } else {
            self.normalize_unchecked(&mut record)?;
        }
        Ok(record)
    }

    /// 문서화용 요약
    pub fn summary(&self, lang: &str) -> RuleSetSummary {
        RuleSetSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            version: format_version(self.version),
            applied_to: self.applied_to.clone(),
            match_type: self.match_type,
            authors: self.authors.clone(),
            description: self.description(lang).to_owned(),
            taxonomy: self.taxonomy.clone(),
            prerequisites: self
                .prerequisites
                .iter()
                .map(|(field, re)| (field.clone(), re.as_str().to_owned()))
                .collect(),
            common_tags: self.common_tags.clone(),
            final_callbacks: self
                .final_callbacks
                .iter()
                .map(|cb| cb.name().to_owned())
                .collect(),
            path: self.path.as_ref().map(|p| p.display().to_string()),
            patterns: self.patterns.iter().map(|p| p.summary(lang)).collect(),
        }
    }
}

impl Normalize for RuleSet {
    fn id(&self) -> &str {
        &self.id
    }

    fn normalize(&self, record: &mut Record) -> Result<bool, LognormError> {
        RuleSet::normalize(self, record).map_err(LognormError::from)
    }
}

fn build_pattern(source: &PatternSource, tags: Vec<Tag>) -> Result<Pattern, NormalizerError> {
    let pattern = match &source.csv {
        Some(csv) => {
            let invalid = |what: &str, value: &str| NormalizerError::InvalidPattern {
                name: source.name.clone(),
                reason: format!("{what} must be a single ASCII character, got '{value}'"),
            };
            let separator =
                single_ascii_char(&csv.separator).ok_or_else(|| invalid("separator", &csv.separator))?;
            let quotechar =
                single_ascii_char(&csv.quotechar).ok_or_else(|| invalid("quotechar", &csv.quotechar))?;
            Pattern::delimited(&source.name, &source.text, separator, quotechar, tags)
        }
        None => Pattern::regex(&source.name, &source.text, tags)?,
    };

    let examples = source
        .examples
        .iter()
        .map(|e| Example {
            text: e.text.clone(),
            expected_tags: e.expected_tags.clone(),
            description: e.description.clone(),
        })
        .collect();

    Ok(pattern
        .with_common_tags(source.common_tags.clone())
        .with_examples(examples)
        .with_description(source.description.clone()))
}

/// 룰셋 요약
#[derive(Debug, Clone, Serialize)]
pub struct RuleSetSummary {
    pub id: String,
    pub name: String,
    pub version: String,
    pub applied_to: String,
    pub match_type: MatchType,
    pub authors: Vec<String>,
    pub description: String,
    pub taxonomy: Option<String>,
    /// 필드 → 앵커가 붙은 정규식
    pub prerequisites: BTreeMap<String, String>,
    pub common_tags: BTreeMap<String, String>,
    pub final_callbacks: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub patterns: Vec<PatternSummary>,
}
