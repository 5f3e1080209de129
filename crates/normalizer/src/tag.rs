//! 태그 -- 패턴에서 추출되는 이름 붙은 필드

use std::sync::Arc;

use lognorm_core::types::{Record, TEMPORARY_TAG_PREFIX};

use crate::callback::{Callback, ScriptEngine};
use crate::description::{Descriptions, localized};
use crate::error::NormalizerError;
use crate::tag_type::TagType;

/// 컴파일된 태그
///
/// 태그 타입과 콜백은 룰셋 로컬 정의 또는 공용 라이브러리에서 해석된 뒤 공유됩니다.
#[derive(Debug, Clone)]
pub struct Tag {
    name: String,
    tag_type: Arc<TagType>,
    substitute: String,
    callbacks: Vec<Arc<Callback>>,
    description: Descriptions,
}

impl Tag {
    pub fn new(
        name: impl Into<String>,
        tag_type: Arc<TagType>,
        substitute: impl Into<String>,
        callbacks: Vec<Arc<Callback>>,
        description: Descriptions,
    ) -> Self {
        Self {
            name: name.into(),
            tag_type,
            substitute: substitute.into(),
            callbacks,
            description,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag_type(&self) -> &TagType {
        &self.tag_type
    }

    /// 패턴 텍스트에서 이 태그를 나타내는 치환 토큰
    pub fn substitute(&self) -> &str {
        &self.substitute
    }

    pub fn callbacks(&self) -> &[Arc<Callback>] {
        &self.callbacks
    }

    pub fn description(&self, lang: &str) -> &str {
        localized(&self.description, lang)
    }

    /// `__`로 시작하는 임시 태그 여부
    pub fn is_temporary(&self) -> bool {
        self.name.starts_with(TEMPORARY_TAG_PREFIX)
    }

    /// 태그의 콜백을 선언 순서대로 실행합니다.
    pub(crate) fn run_callbacks(
        &self,
        engine: &ScriptEngine,
        pattern: &str,
        value: &str,
        record: &mut Record,
    ) -> Result<(), NormalizerError> {
        for callback in &self.callbacks {
            callback.invoke(engine, pattern, Some(value), record)?;
        }
        Ok(())
    }
}
