//! 공용 라이브러리 -- 모든 룰셋이 참조할 수 있는 태그 타입과 콜백
//!
//! 룰 디렉토리마다 `common_tag_types.yml`과 `common_callbacks.yml`이 있을 수 있습니다.
//! 여러 디렉토리에 있으면 나중 디렉토리의 파일이 앞선 파일을 대체하며,
//! 두 파일 모두 적어도 한 디렉토리에 있어야 합니다.
//!
//! 공용 태그 타입은 룰셋 플래그와 무관하게 [`RegexFlags::SHARED`]로 컴파일됩니다.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::callback::{Callback, ScriptEngine};
use crate::error::NormalizerError;
use crate::ruleset::source::{CallbackSource, TagTypeSource};
use crate::tag_type::{ANYTHING, RegexFlags, TagType};

/// 공용 태그 타입 파일 이름
pub const COMMON_TAG_TYPES_FILE: &str = "common_tag_types.yml";

/// 공용 콜백 파일 이름
pub const COMMON_CALLBACKS_FILE: &str = "common_callbacks.yml";

/// 라이브러리 소유자 이름 (에러 메시지용)
const LIBRARY_OWNER: &str = "shared library";

/// 공용 태그 타입 파일 스키마
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TagTypesFile {
    #[serde(default)]
    tag_types: Vec<TagTypeSource>,
}

/// 공용 콜백 파일 스키마
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CallbacksFile {
    #[serde(default)]
    callbacks: Vec<CallbackSource>,
}

/// 공용 태그 타입과 콜백 모음
#[derive(Debug, Clone)]
pub struct SharedLibrary {
    tag_types: HashMap<String, Arc<TagType>>,
    callbacks: HashMap<String, Arc<Callback>>,
}

impl SharedLibrary {
    /// 내장 `Anything` 태그 타입만 가진 라이브러리를 생성합니다.
    pub fn new() -> Result<Self, NormalizerError> {
        let mut tag_types = HashMap::new();
        tag_types.insert(ANYTHING.to_owned(), Arc::new(TagType::anything()?));
        Ok(Self {
            tag_types,
            callbacks: HashMap::new(),
        })
    }

    /// 룰 디렉토리 목록에서 공용 라이브러리를 로드합니다.
    ///
    /// # Errors
    /// - 어느 디렉토리에도 라이브러리 파일이 없으면 [`NormalizerError::MissingLibrary`]
    /// - 파일을 읽거나 파싱할 수 없으면 [`NormalizerError::RuleSetLoad`]
    /// - 정규식이나 콜백이 컴파일되지 않으면 해당 에러
    pub async fn load(paths: &[PathBuf], engine: &ScriptEngine) -> Result<Self, NormalizerError> {
        let tag_types_path = last_existing(paths, COMMON_TAG_TYPES_FILE)
            .await
            .ok_or_else(|| NormalizerError::MissingLibrary(COMMON_TAG_TYPES_FILE.to_owned()))?;
        let callbacks_path = last_existing(paths, COMMON_CALLBACKS_FILE)
            .await
            .ok_or_else(|| NormalizerError::MissingLibrary(COMMON_CALLBACKS_FILE.to_owned()))?;

        let tag_types: TagTypesFile = read_yaml(&tag_types_path).await?;
        let callbacks: CallbacksFile = read_yaml(&callbacks_path).await?;

        let mut library = Self::new()?;
        library.add_tag_types(&tag_types.tag_types)?;
        library.add_callbacks(engine, &callbacks.callbacks)?;

        tracing::info!(
            tag_types = library.tag_types.len(),
            callbacks = library.callbacks.len(),
            tag_types_file = %tag_types_path.display(),
            callbacks_file = %callbacks_path.display(),
            "loaded shared library"
        );

        Ok(library)
    }

    /// 태그 타입 정의를 컴파일해 추가합니다. 같은 이름은 대체됩니다.
    pub fn add_tag_types(&mut self, sources: &[TagTypeSource]) -> Result<(), NormalizerError> {
        for source in sources {
            let tag_type = TagType::new(
                &source.name,
                &source.ttype,
                &source.regexp,
                RegexFlags::SHARED,
            )?
            .with_description(source.description.clone());
            self.tag_types.insert(source.name.clone(), Arc::new(tag_type));
        }
        Ok(())
    }

    /// 콜백 정의를 컴파일해 추가합니다. 같은 이름은 대체됩니다.
    pub fn add_callbacks(
        &mut self,
        engine: &ScriptEngine,
        sources: &[CallbackSource],
    ) -> Result<(), NormalizerError> {
        for source in sources {
            let callback = Callback::compile(engine, LIBRARY_OWNER, &source.name, &source.code)?;
            self.callbacks.insert(source.name.clone(), Arc::new(callback));
        }
        Ok(())
    }

    pub fn tag_type(&self, name: &str) -> Option<Arc<TagType>> {
        self.tag_types.get(name).cloned()
    }

    pub fn callback(&self, name: &str) -> Option<Arc<Callback>> {
        self.callbacks.get(name).cloned()
    }

    /// 태그 타입 이름 목록 (정렬됨)
    pub fn tag_type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tag_types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// 콜백 이름 목록 (정렬됨)
    pub fn callback_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.callbacks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// 디렉토리 목록 중 파일이 있는 마지막 디렉토리의 파일 경로
async fn last_existing(paths: &[PathBuf], file_name: &str) -> Option<PathBuf> {
    let mut found = None;
    for dir in paths {
        let candidate = dir.join(file_name);
        if tokio::fs::metadata(&candidate)
            .await
            .is_ok_and(|m| m.is_file())
        {
            found = Some(candidate);
        }
    }
    found
}

async fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, NormalizerError> {
    let content =
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| NormalizerError::RuleSetLoad {
                path: path.display().to_string(),
                reason: format!("failed to read file: {e}"),
            })?;
    serde_yaml::from_str(&content).map_err(|e| NormalizerError::RuleSetLoad {
        path: path.display().to_string(),
        reason: format!("YAML parse error: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAG_TYPES: &str = r#"
tag_types:
  - name: Integer
    ttype: integer
    regexp: '\d+'
  - name: Anything
    regexp: '.+'
"#;

    const CALLBACKS: &str = r#"
callbacks:
  - name: upper
    code: 'log.upper = value.to_upper();'
"#;

    fn write_library(dir: &Path, tag_types: &str, callbacks: &str) {
        std::fs::write(dir.join(COMMON_TAG_TYPES_FILE), tag_types).unwrap();
        std::fs::write(dir.join(COMMON_CALLBACKS_FILE), callbacks).unwrap();
    }

    #[test]
    fn new_library_has_anything() {
        let library = SharedLibrary::new().unwrap();
        let anything = library.tag_type(ANYTHING).unwrap();
        assert!(anything.matches(""));
        assert!(library.callback_names().is_empty());
    }

    #[test]
    fn shared_tag_types_ignore_case() {
        let mut library = SharedLibrary::new().unwrap();
        library
            .add_tag_types(&[TagTypeSource {
                name: "Month".to_owned(),
                ttype: "string".to_owned(),
                regexp: "jul".to_owned(),
                description: Default::default(),
            }])
            .unwrap();
        assert!(library.tag_type("Month").unwrap().matches("JUL"));
    }

    #[tokio::test]
    async fn load_reads_both_files() {
        let dir = tempfile::tempdir().unwrap();
        write_library(dir.path(), TAG_TYPES, CALLBACKS);

        let engine = ScriptEngine::default();
        let library = SharedLibrary::load(&[dir.path().to_path_buf()], &engine)
            .await
            .unwrap();
        assert_eq!(library.tag_type_names(), vec!["Anything", "Integer"]);
        assert_eq!(library.callback_names(), vec!["upper"]);
        // 파일의 Anything이 내장 정의를 대체
        assert!(!library.tag_type(ANYTHING).unwrap().matches(""));
    }

    #[tokio::test]
    async fn later_directory_overrides_earlier() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        write_library(first.path(), TAG_TYPES, CALLBACKS);
        std::fs::write(
            second.path().join(COMMON_CALLBACKS_FILE),
            "callbacks:\n  - name: lower\n    code: 'log.lower = value.to_lower();'\n",
        )
        .unwrap();

        let engine = ScriptEngine::default();
        let library = SharedLibrary::load(
            &[first.path().to_path_buf(), second.path().to_path_buf()],
            &engine,
        )
        .await
        .unwrap();
        assert_eq!(library.callback_names(), vec!["lower"]);
        assert!(library.tag_type("Integer").is_some());
    }

    #[tokio::test]
    async fn missing_library_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(COMMON_TAG_TYPES_FILE), TAG_TYPES).unwrap();

        let engine = ScriptEngine::default();
        let err = SharedLibrary::load(&[dir.path().to_path_buf()], &engine)
            .await
            .unwrap_err();
        assert!(matches!(err, NormalizerError::MissingLibrary(ref f) if f == COMMON_CALLBACKS_FILE));
    }

    #[tokio::test]
    async fn invalid_regexp_in_library_fails() {
        let dir = tempfile::tempdir().unwrap();
        write_library(
            dir.path(),
            "tag_types:\n  - name: Broken\n    regexp: '(unclosed'\n",
            CALLBACKS,
        );

        let engine = ScriptEngine::default();
        let err = SharedLibrary::load(&[dir.path().to_path_buf()], &engine)
            .await
            .unwrap_err();
        assert!(matches!(err, NormalizerError::InvalidPattern { ref name, .. } if name == "Broken"));
    }
}
