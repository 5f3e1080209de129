//! 룰셋 파일 로더 -- YAML 룰셋 파일을 디스크에서 로드합니다.
//!
//! 룰 디렉토리를 재귀적으로 스캔해 `.yml`/`.yaml` 파일을 파싱하고 컴파일합니다.
//! 공용 라이브러리 파일(`common_tag_types*`, `common_callbacks*`)은 제외됩니다.
//! 개별 파일 로딩 실패는 경고 로그를 남기고 건너뜁니다.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lognorm_core::metrics as m;

use crate::callback::ScriptEngine;
use crate::error::NormalizerError;
use crate::library::SharedLibrary;

use super::RuleSet;
use super::source::RuleSetSource;

/// 룰셋 파일 로더 설정
const MAX_RULE_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10MB
const MAX_RULE_SETS_COUNT: usize = 10_000;

/// 라이브러리 파일 이름 접두사
const LIBRARY_PREFIXES: [&str; 2] = ["common_tag_types", "common_callbacks"];

/// 파일에서 읽은 룰셋 소스
#[derive(Debug, Clone)]
pub struct LoadedSource {
    pub path: PathBuf,
    /// 파일 원문
    pub text: String,
    pub source: RuleSetSource,
}

/// 룰셋 파일 로더
pub struct RuleSetLoader;

impl RuleSetLoader {
    /// 룰셋 파일인지 확인합니다.
    pub fn is_rule_file(path: &Path) -> bool {
        let is_yaml = path
            .extension()
            .is_some_and(|ext| ext == "yml" || ext == "yaml");
        let is_library = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| LIBRARY_PREFIXES.iter().any(|p| n.starts_with(p)));
        is_yaml && !is_library
    }

    /// 디렉토리 아래의 모든 룰셋 파일 경로를 정렬된 순서로 반환합니다.
    ///
    /// # Errors
    /// 디렉토리를 읽을 수 없는 경우
    pub async fn rule_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, NormalizerError> {
        let dir = dir.as_ref();
        let mut files = Vec::new();
        let mut pending = vec![dir.to_path_buf()];

        while let Some(current) = pending.pop() {
            let mut entries =
                tokio::fs::read_dir(&current)
                    .await
                    .map_err(|e| NormalizerError::RuleSetLoad {
                        path: current.display().to_string(),
                        reason: format!("failed to read directory: {e}"),
                    })?;

            while let Some(entry) =
                entries
                    .next_entry()
                    .await
                    .map_err(|e| NormalizerError::RuleSetLoad {
                        path: current.display().to_string(),
                        reason: format!("failed to read directory entry: {e}"),
                    })?
            {
                let path = entry.path();
                let is_dir = entry.file_type().await.is_ok_and(|t| t.is_dir());
                if is_dir {
                    pending.push(path);
                } else if Self::is_rule_file(&path) {
                    files.push(path);
                }
            }
        }

        files.sort();
        Ok(files)
    }

    /// 여러 디렉토리에서 룰셋을 로드하고 컴파일합니다.
    ///
    /// 파싱, 검증, 컴파일에 실패한 파일과 ID가 중복된 룰셋은 경고 후 건너뜁니다.
    ///
    /// # Errors
    /// - 디렉토리를 읽을 수 없는 경우
    /// - 룰셋 수가 `MAX_RULE_SETS_COUNT`를 초과하는 경우
    pub async fn load_directories(
        paths: &[PathBuf],
        library: &SharedLibrary,
        engine: &Arc<ScriptEngine>,
    ) -> Result<Vec<RuleSet>, NormalizerError> {
        let mut rule_sets = Vec::new();
        let mut seen_ids = HashSet::new();

        for dir in paths {
            for path in Self::rule_files(dir).await? {
                let rule_set = match Self::load_file(&path).await.and_then(|loaded| {
                    RuleSet::compile(loaded.source, library, Arc::clone(engine))
                        .map(|rs| rs.with_origin(loaded.text, loaded.path))
                }) {
                    Ok(rule_set) => rule_set,
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "failed to load rule set, skipping"
                        );
                        metrics::counter!(m::NORMALIZER_RULE_SETS_SKIPPED_TOTAL).increment(1);
                        continue;
                    }
                };

                // 중복 ID 검사
                if !seen_ids.insert(rule_set.id().to_owned()) {
                    tracing::warn!(
                        rule_set = %rule_set.id(),
                        path = %path.display(),
                        "duplicate rule set id, skipping"
                    );
                    metrics::counter!(m::NORMALIZER_RULE_SETS_SKIPPED_TOTAL).increment(1);
                    continue;
                }
                rule_sets.push(rule_set);

                if rule_sets.len() > MAX_RULE_SETS_COUNT {
                    return Err(NormalizerError::RuleSetLoad {
                        path: dir.display().to_string(),
                        reason: format!("too many rule sets: max {MAX_RULE_SETS_COUNT}"),
                    });
                }
            }
        }

        tracing::info!(count = rule_sets.len(), "loaded rule sets");
        Ok(rule_sets)
    }

    /// 단일 YAML 파일에서 룰셋 소스를 로드합니다.
    pub async fn load_file(path: impl AsRef<Path>) -> Result<LoadedSource, NormalizerError> {
        let path = path.as_ref();

        // 파일 크기 검증
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| NormalizerError::RuleSetLoad {
                path: path.display().to_string(),
                reason: format!("failed to read file metadata: {e}"),
            })?;

        if metadata.len() > MAX_RULE_FILE_SIZE {
            return Err(NormalizerError::RuleSetLoad {
                path: path.display().to_string(),
                reason: format!(
                    "file too large: {} bytes (max: {MAX_RULE_FILE_SIZE})",
                    metadata.len()
                ),
            });
        }

        let text =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| NormalizerError::RuleSetLoad {
                    path: path.display().to_string(),
                    reason: format!("failed to read file: {e}"),
                })?;

        let source = Self::parse_yaml(&text, &path.display().to_string())?;
        Ok(LoadedSource {
            path: path.to_path_buf(),
            text,
            source,
        })
    }

    /// YAML 문자열을 파싱하고 구조를 검증합니다.
    pub fn parse_yaml(yaml_str: &str, origin: &str) -> Result<RuleSetSource, NormalizerError> {
        let source = RuleSetSource::from_yaml(yaml_str).map_err(|e| NormalizerError::RuleSetLoad {
            path: origin.to_owned(),
            reason: format!("YAML parse error: {e}"),
        })?;

        // 유효성 검증
        source
            .validate()
            .map_err(|v| NormalizerError::RuleSetValidation {
                rule_set: v.rule_set,
                reason: v.reason,
            })?;

        Ok(source)
    }
}
