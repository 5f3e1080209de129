//! 정규화 풀 -- 여러 룰셋을 우선순위 순서로 적용하는 엔진
//!
//! [`NormalizerPool`]은 룰 디렉토리에서 공용 라이브러리와 룰셋을 로드하고,
//! 활성화된 룰셋을 정해진 순서로 모두 적용합니다. 첫 매칭에서 멈추지 않으므로
//! 한 레코드가 여러 룰셋에 의해 보강될 수 있습니다.
//!
//! # 적용 순서
//! `raw` 필드 룰셋, `body` 필드 룰셋, 나머지 필드 룰셋 순이며
//! 각 그룹 안에서는 (대상 필드, 이름, 버전) 순입니다.
//!
//! # 세대 교체
//! 로드된 룰셋과 활성 목록은 하나의 세대(generation)로 묶여 `Arc`로 공유됩니다.
//! 리로드와 활성화 변경은 새 세대를 만든 뒤 한 번에 교체하므로,
//! 진행 중인 정규화 호출은 항상 일관된 한 세대만 봅니다.
//! 디스크를 읽는 재구성(리로드, 룰셋 추가)은 하나씩만 실행되며, 활성화 맵은
//! 교체 시점의 쓰기 잠금 안에서 읽으므로 동시에 바뀐 활성화 상태를 잃지 않습니다.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use tokio::sync::Mutex;

use lognorm_core::config::{DEFAULT_MAX_SCRIPT_OPERATIONS, DEFAULT_TIMEZONE_FIELD, NormalizerConfig};
use lognorm_core::error::LognormError;
use lognorm_core::metrics as m;
use lognorm_core::pipeline::Normalize;
use lognorm_core::types::{BODY_FIELD, RAW_FIELD, Record, UUID_FIELD};

use crate::callback::ScriptEngine;
use crate::error::NormalizerError;
use crate::geo::{GeoLocator, NoopGeoLocator};
use crate::library::SharedLibrary;
use crate::ruleset::{RuleSet, RuleSetLoader};
use crate::timezone::DatetimeSnapshot;

/// 기본 룰셋 파일 확장자
const RULE_FILE_EXTENSION: &str = "yml";

/// 풀 구성 옵션
#[derive(Clone)]
pub struct PoolOptions {
    /// 명시적 활성화 맵. `None`이면 모든 룰셋이 활성입니다.
    pub active: Option<BTreeMap<String, bool>>,
    /// 콜백 실행당 최대 연산 수
    pub max_script_operations: u64,
    /// 시간대 이름을 담는 레코드 필드
    pub timezone_field: String,
    /// `country_code` 콜백 헬퍼에 쓰이는 GeoIP 조회기
    pub geo: Arc<dyn GeoLocator>,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            active: None,
            max_script_operations: DEFAULT_MAX_SCRIPT_OPERATIONS,
            timezone_field: DEFAULT_TIMEZONE_FIELD.to_owned(),
            geo: Arc::new(NoopGeoLocator),
        }
    }
}

impl std::fmt::Debug for PoolOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolOptions")
            .field("active", &self.active)
            .field("max_script_operations", &self.max_script_operations)
            .field("timezone_field", &self.timezone_field)
            .finish_non_exhaustive()
    }
}

/// 한 세대의 풀 상태
#[derive(Debug)]
struct Generation {
    library: Arc<SharedLibrary>,
    rule_sets: BTreeMap<String, Arc<RuleSet>>,
    /// 명시적 활성화 맵 (없으면 전체 활성)
    explicit: Option<BTreeMap<String, bool>>,
    /// 적용 순서대로 정렬된 활성 룰셋
    active: Vec<Arc<RuleSet>>,
}

impl Generation {
    fn new(
        library: Arc<SharedLibrary>,
        rule_sets: BTreeMap<String, Arc<RuleSet>>,
        explicit: Option<BTreeMap<String, bool>>,
    ) -> Self {
        let mut active: Vec<Arc<RuleSet>> = rule_sets
            .values()
            .filter(|rs| is_active(explicit.as_ref(), rs.id()))
            .cloned()
            .collect();
        active.sort_by(|a, b| order_key(a).cmp(&order_key(b)));

        Self {
            library,
            rule_sets,
            explicit,
            active,
        }
    }
}

fn is_active(explicit: Option<&BTreeMap<String, bool>>, id: &str) -> bool {
    match explicit {
        Some(map) => map.get(id).copied().unwrap_or(false),
        None => true,
    }
}

/// 적용 순서 키: raw → body → 나머지, 그룹 안에서는 (대상 필드, 이름, 버전)
fn order_key(rule_set: &RuleSet) -> (u8, &str, &str, String) {
    let group = match rule_set.applied_to() {
        RAW_FIELD => 0,
        BODY_FIELD => 1,
        _ => 2,
    };
    (
        group,
        rule_set.applied_to(),
        rule_set.name(),
        format!("{:020.6}", rule_set.version()),
    )
}

/// 정규화 풀
pub struct NormalizerPool {
    paths: Vec<PathBuf>,
    engine: Arc<ScriptEngine>,
    timezone_field: String,
    generation: RwLock<Arc<Generation>>,
    /// 디스크 재구성 직렬화
    rebuild: Mutex<()>,
}

impl NormalizerPool {
    /// 기본 옵션으로 풀을 생성합니다.
    ///
    /// # Errors
    /// - 경로가 없거나 디렉토리가 아니면 [`NormalizerError::InvalidDirectory`]
    /// - 공용 라이브러리 파일이 없으면 [`NormalizerError::MissingLibrary`]
    pub async fn new<P: Into<PathBuf>>(
        paths: impl IntoIterator<Item = P>,
    ) -> Result<Self, NormalizerError> {
        Self::with_options(paths, PoolOptions::default()).await
    }

    /// 설정 섹션으로 풀을 생성합니다. 빈 활성화 맵은 "전체 활성"을 뜻합니다.
    pub async fn from_config(
        config: &NormalizerConfig,
        geo: Arc<dyn GeoLocator>,
    ) -> Result<Self, NormalizerError> {
        let options = PoolOptions {
            active: (!config.active.is_empty()).then(|| config.active.clone()),
            max_script_operations: config.max_script_operations,
            timezone_field: config.timezone_field.clone(),
            geo,
        };
        Self::with_options(config.paths.iter().map(PathBuf::from), options).await
    }

    /// 옵션을 지정해 풀을 생성합니다.
    pub async fn with_options<P: Into<PathBuf>>(
        paths: impl IntoIterator<Item = P>,
        options: PoolOptions,
    ) -> Result<Self, NormalizerError> {
        let paths: Vec<PathBuf> = paths.into_iter().map(Into::into).collect();
        if paths.is_empty() {
            return Err(NormalizerError::InvalidDirectory(
                "no normalizer directory given".to_owned(),
            ));
        }
        for path in &paths {
            let is_dir = tokio::fs::metadata(path)
                .await
                .is_ok_and(|meta| meta.is_dir());
            if !is_dir {
                return Err(NormalizerError::InvalidDirectory(
                    path.display().to_string(),
                ));
            }
        }

        let engine = Arc::new(ScriptEngine::new(options.max_script_operations, options.geo));
        let (library, rule_sets) = Self::load_rule_sets(&paths, &engine).await?;
        let generation = Generation::new(library, rule_sets, options.active);
        log_loaded(&generation);

        Ok(Self {
            paths,
            engine,
            timezone_field: options.timezone_field,
            generation: RwLock::new(Arc::new(generation)),
            rebuild: Mutex::new(()),
        })
    }

    async fn load_rule_sets(
        paths: &[PathBuf],
        engine: &Arc<ScriptEngine>,
    ) -> Result<(Arc<SharedLibrary>, BTreeMap<String, Arc<RuleSet>>), NormalizerError> {
        let library = Arc::new(SharedLibrary::load(paths, engine).await?);
        let rule_sets = RuleSetLoader::load_directories(paths, &library, engine)
            .await?
            .into_iter()
            .map(|rs| (rs.id().to_owned(), Arc::new(rs)))
            .collect();
        Ok((library, rule_sets))
    }

    fn current(&self) -> Arc<Generation> {
        Arc::clone(
            &self
                .generation
                .read()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    /// 쓰기 잠금 안에서 현재 세대로부터 새 세대를 만들어 교체합니다.
    fn swap(&self, next: impl FnOnce(&Generation) -> Generation) -> Arc<Generation> {
        let mut slot = self
            .generation
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let generation = Arc::new(next(&**slot));
        *slot = Arc::clone(&generation);
        generation
    }

    /// 디스크에서 라이브러리와 룰셋을 다시 로드합니다. 활성화 맵은 유지됩니다.
    ///
    /// 로드된 룰셋 수를 반환합니다.
    pub async fn reload(&self) -> Result<usize, NormalizerError> {
        let _guard = self.rebuild.lock().await;
        self.reload_locked().await
    }

    /// `rebuild` 잠금을 잡은 상태에서 호출해야 합니다.
    async fn reload_locked(&self) -> Result<usize, NormalizerError> {
        let (library, rule_sets) = Self::load_rule_sets(&self.paths, &self.engine).await?;
        let generation = self.swap(|current| {
            Generation::new(library, rule_sets, current.explicit.clone())
        });
        log_loaded(&generation);
        Ok(generation.rule_sets.len())
    }

    /// 레코드를 정규화합니다.
    ///
    /// 새 `uuid`를 부여한 뒤 활성 룰셋을 순서대로 모두 적용하고,
    /// 시간대 필드가 있으면 이번 호출에서 생기거나 바뀐 날짜를 UTC로 변환합니다.
    /// 룰셋 실패는 경고 후 건너뛰며, 매칭된 룰셋 수를 반환합니다.
    pub fn normalize(&self, record: &mut Record) -> usize {
        self.run(record, true)
    }

    /// 전제 조건을 건너뛰고 레코드를 정규화합니다.
    pub fn normalize_unchecked(&self, record: &mut Record) -> usize {
        self.run(record, false)
    }

    fn run(&self, record: &mut Record, check_prerequisites: bool) -> usize {
        let started = Instant::now();
        let generation = self.current();

        record.insert(UUID_FIELD, uuid::Uuid::new_v4().to_string());
        let snapshot = DatetimeSnapshot::capture(record);

        let mut matched = 0;
        for rule_set in &generation.active {
            let result = if check_prerequisites {
                rule_set.normalize(record)
            } else {
                rule_set.normalize_unchecked(record)
            };
            match result {
                Ok(true) => {
                    matched += 1;
                    metrics::counter!(
                        m::NORMALIZER_RULE_SET_MATCHES_TOTAL,
                        m::LABEL_RULE_SET => rule_set.id().to_owned()
                    )
                    .increment(1);
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(
                        rule_set = %rule_set.id(),
                        error = %e,
                        "rule set failed, skipping"
                    );
                    metrics::counter!(
                        m::NORMALIZER_CALLBACK_ERRORS_TOTAL,
                        m::LABEL_RULE_SET => rule_set.id().to_owned()
                    )
                    .increment(1);
                }
            }
        }

        if let Some(zone) = record.text(&self.timezone_field).map(str::to_owned) {
            snapshot.convert_changed(record, &zone);
        }

        let result = if matched > 0 { "matched" } else { "unmatched" };
        metrics::counter!(m::NORMALIZER_LINES_TOTAL, m::LABEL_RESULT => result).increment(1);
        metrics::histogram!(m::NORMALIZER_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());

        matched
    }

    /// 로드된 모든 룰셋의 활성 여부
    pub fn active_rule_sets(&self) -> BTreeMap<String, bool> {
        let generation = self.current();
        generation
            .rule_sets
            .keys()
            .map(|id| (id.clone(), is_active(generation.explicit.as_ref(), id)))
            .collect()
    }

    /// 활성화 맵을 교체하고 적용 순서를 다시 만듭니다.
    ///
    /// 맵에 없는 룰셋은 비활성이 됩니다.
    pub fn set_active_rule_sets(&self, active: BTreeMap<String, bool>) {
        let generation = self.swap(|current| {
            Generation::new(
                Arc::clone(&current.library),
                current.rule_sets.clone(),
                Some(active),
            )
        });
        tracing::info!(active = generation.active.len(), "rule set activation changed");
    }

    /// 적용 순서대로 정렬된 활성 룰셋 ID
    pub fn ordered_active_ids(&self) -> Vec<String> {
        self.current()
            .active
            .iter()
            .map(|rs| rs.id().to_owned())
            .collect()
    }

    /// 룰셋 소스를 검증해 룰 디렉토리에 저장하고 풀을 다시 로드합니다.
    ///
    /// 파일 이름을 주지 않으면 `<name>.yml`, 디렉토리를 주지 않으면 첫 번째 경로에 저장합니다.
    /// 저장된 룰셋 ID를 반환합니다.
    ///
    /// # Errors
    /// - 파싱, 검증, 컴파일 실패
    /// - 파일 이름에 경로 구분자가 포함된 경우 [`NormalizerError::RuleSetLoad`]
    pub async fn add_or_update_rule_set(
        &self,
        yaml: &str,
        file_name: Option<&str>,
        dir: Option<&Path>,
    ) -> Result<String, NormalizerError> {
        let _guard = self.rebuild.lock().await;

        let source = RuleSetLoader::parse_yaml(yaml, file_name.unwrap_or("<input>"))?;
        let library = Arc::clone(&self.current().library);
        let compiled = RuleSet::compile(source.clone(), &library, Arc::clone(&self.engine))?;
        let id = compiled.id().to_owned();

        let file_name = match file_name {
            Some(name) if name.contains('/') || name.contains('\\') || name.is_empty() => {
                return Err(NormalizerError::RuleSetLoad {
                    path: name.to_owned(),
                    reason: "file name must not contain a path".to_owned(),
                });
            }
            Some(name) if Path::new(name).extension().is_some() => name.to_owned(),
            Some(name) => format!("{name}.{RULE_FILE_EXTENSION}"),
            None => format!("{}.{RULE_FILE_EXTENSION}", source.name),
        };
        let dir = match dir {
            Some(dir) => dir.to_path_buf(),
            None => self.paths.first().cloned().ok_or_else(|| {
                NormalizerError::InvalidDirectory("no normalizer directory given".to_owned())
            })?,
        };

        let path = dir.join(file_name);
        tokio::fs::write(&path, yaml).await?;
        tracing::info!(rule_set = %id, path = %path.display(), "rule set written");

        self.reload_locked().await?;
        Ok(id)
    }

    /// ID로 룰셋을 찾습니다.
    pub fn rule_set(&self, id: &str) -> Result<Arc<RuleSet>, NormalizerError> {
        self.current()
            .rule_sets
            .get(id)
            .cloned()
            .ok_or_else(|| NormalizerError::NotFound(id.to_owned()))
    }

    /// 룰셋 소스 YAML
    pub fn source_of(&self, id: &str) -> Result<String, NormalizerError> {
        Ok(self.rule_set(id)?.source_text().to_owned())
    }

    /// 룰셋 파일 경로
    pub fn path_of(&self, id: &str) -> Result<PathBuf, NormalizerError> {
        self.rule_set(id)?
            .path()
            .map(Path::to_path_buf)
            .ok_or_else(|| NormalizerError::NotFound(id.to_owned()))
    }

    /// 로드된 모든 룰셋 (ID 순)
    pub fn rule_sets(&self) -> Vec<Arc<RuleSet>> {
        self.current().rule_sets.values().cloned().collect()
    }

    /// 로드된 룰셋 수
    pub fn len(&self) -> usize {
        self.current().rule_sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 디스크의 룰셋 파일 수 (로드 실패한 파일 포함)
    pub async fn source_count(&self) -> Result<usize, NormalizerError> {
        let mut count = 0;
        for dir in &self.paths {
            count += RuleSetLoader::rule_files(dir).await?.len();
        }
        Ok(count)
    }

    /// 현재 공용 라이브러리
    pub fn library(&self) -> Arc<SharedLibrary> {
        Arc::clone(&self.current().library)
    }

    /// 룰 디렉토리 목록
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn timezone_field(&self) -> &str {
        &self.timezone_field
    }
}

fn log_loaded(generation: &Generation) {
    metrics::gauge!(m::NORMALIZER_RULE_SETS_LOADED).set(generation.rule_sets.len() as f64);
    tracing::info!(
        loaded = generation.rule_sets.len(),
        active = generation.active.len(),
        "normalizer pool ready"
    );
}

impl Normalize for NormalizerPool {
    fn id(&self) -> &str {
        "pool"
    }

    fn normalize(&self, record: &mut Record) -> Result<bool, LognormError> {
        Ok(NormalizerPool::normalize(self, record) > 0)
    }
}

impl std::fmt::Debug for NormalizerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NormalizerPool")
            .field("paths", &self.paths)
            .field("timezone_field", &self.timezone_field)
            .field("rule_sets", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{COMMON_CALLBACKS_FILE, COMMON_TAG_TYPES_FILE};

    const KV: &str = r#"
name: kv
patterns:
  - name: kv-001
    text: 'KEY=VALUE'
    tags:
      - { name: key, substitute: KEY, tag_type: Word }
      - { name: value, substitute: VALUE, tag_type: Word }
"#;

    const BODY: &str = r#"
name: body-words
applied_to: body
patterns:
  - name: body-001
    text: 'WORD'
    tags:
      - { name: first_word, substitute: WORD, tag_type: Word }
"#;

    const SPLIT: &str = r#"
name: split
patterns:
  - name: split-001
    text: 'HEAD BODY'
    tags:
      - { name: head, substitute: HEAD, tag_type: Word }
      - { name: body, substitute: BODY }
"#;

    fn rule_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(COMMON_TAG_TYPES_FILE),
            "tag_types:\n  - { name: Word, regexp: '\\w+' }\n",
        )
        .unwrap();
        std::fs::write(dir.path().join(COMMON_CALLBACKS_FILE), "callbacks: []\n").unwrap();
        dir
    }

    #[tokio::test]
    async fn invalid_directory_is_rejected() {
        let err = NormalizerPool::new(["/nonexistent/lognorm"]).await.unwrap_err();
        assert!(matches!(err, NormalizerError::InvalidDirectory(_)));

        let err = NormalizerPool::new(Vec::<PathBuf>::new()).await.unwrap_err();
        assert!(matches!(err, NormalizerError::InvalidDirectory(_)));
    }

    #[tokio::test]
    async fn missing_library_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = NormalizerPool::new([dir.path()]).await.unwrap_err();
        assert!(matches!(err, NormalizerError::MissingLibrary(_)));
    }

    #[tokio::test]
    async fn raw_rule_sets_run_before_body_rule_sets() {
        let dir = rule_dir();
        std::fs::write(dir.path().join("body.yml"), BODY).unwrap();
        std::fs::write(dir.path().join("split.yml"), SPLIT).unwrap();
        let pool = NormalizerPool::new([dir.path()]).await.unwrap();

        assert_eq!(pool.ordered_active_ids(), vec!["split-1.0", "body-words-1.0"]);

        let mut record = Record::with_field("raw", "head rest of line");
        assert_eq!(pool.normalize(&mut record), 2);
        assert_eq!(record.text("head"), Some("head"));
        assert_eq!(record.text("body"), Some("rest of line"));
        assert_eq!(record.text("first_word"), Some("rest"));
        assert!(record.contains_key("uuid"));
    }

    #[tokio::test]
    async fn uuid_is_fresh_on_every_call() {
        let dir = rule_dir();
        std::fs::write(dir.path().join("kv.yml"), KV).unwrap();
        let pool = NormalizerPool::new([dir.path()]).await.unwrap();

        let mut record = Record::with_field("raw", "a=b");
        pool.normalize(&mut record);
        let first = record.text("uuid").unwrap().to_owned();
        pool.normalize(&mut record);
        assert_ne!(record.text("uuid"), Some(first.as_str()));
        assert_eq!(record.text("key"), Some("a"));
    }

    #[tokio::test]
    async fn explicit_activation_disables_unlisted_rule_sets() {
        let dir = rule_dir();
        std::fs::write(dir.path().join("kv.yml"), KV).unwrap();
        std::fs::write(dir.path().join("split.yml"), SPLIT).unwrap();
        let pool = NormalizerPool::new([dir.path()]).await.unwrap();
        assert!(pool.active_rule_sets().values().all(|active| *active));

        pool.set_active_rule_sets(BTreeMap::from([("kv-1.0".to_owned(), true)]));
        let active = pool.active_rule_sets();
        assert_eq!(active.get("kv-1.0"), Some(&true));
        assert_eq!(active.get("split-1.0"), Some(&false));
        assert_eq!(pool.ordered_active_ids(), vec!["kv-1.0"]);

        // 리로드 후에도 활성화 맵 유지
        pool.reload().await.unwrap();
        assert_eq!(pool.ordered_active_ids(), vec!["kv-1.0"]);
    }

    #[tokio::test]
    async fn activation_change_during_reload_is_kept() {
        let dir = rule_dir();
        std::fs::write(dir.path().join("kv.yml"), KV).unwrap();
        std::fs::write(dir.path().join("split.yml"), SPLIT).unwrap();
        let pool = NormalizerPool::new([dir.path()]).await.unwrap();

        // 리로드가 디스크를 읽는 동안 활성화 맵이 바뀜
        let reload = pool.reload();
        tokio::pin!(reload);
        let finished_early = tokio::select! {
            biased;
            result = &mut reload => Some(result),
            () = std::future::ready(()) => None,
        };
        pool.set_active_rule_sets(BTreeMap::from([("kv-1.0".to_owned(), true)]));
        match finished_early {
            Some(result) => assert_eq!(result.unwrap(), 2),
            None => assert_eq!(reload.await.unwrap(), 2),
        }

        assert_eq!(pool.ordered_active_ids(), vec!["kv-1.0"]);
        assert_eq!(pool.active_rule_sets().get("split-1.0"), Some(&false));
    }

    #[tokio::test]
    async fn concurrent_writers_keep_every_rule_set() {
        let dir = rule_dir();
        let pool = NormalizerPool::new([dir.path()]).await.unwrap();

        let (kv, split) = tokio::join!(
            pool.add_or_update_rule_set(KV, None, None),
            pool.add_or_update_rule_set(SPLIT, None, None),
        );
        assert_eq!(kv.unwrap(), "kv-1.0");
        assert_eq!(split.unwrap(), "split-1.0");
        assert_eq!(pool.len(), 2);
    }

    #[tokio::test]
    async fn add_or_update_writes_file_and_reloads() {
        let dir = rule_dir();
        let pool = NormalizerPool::new([dir.path()]).await.unwrap();
        assert!(pool.is_empty());

        let id = pool.add_or_update_rule_set(KV, None, None).await.unwrap();
        assert_eq!(id, "kv-1.0");
        assert!(dir.path().join("kv.yml").exists());
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.source_of("kv-1.0").unwrap(), KV);
        assert_eq!(pool.path_of("kv-1.0").unwrap(), dir.path().join("kv.yml"));
        assert_eq!(pool.source_count().await.unwrap(), 1);

        pool.add_or_update_rule_set(SPLIT, Some("custom"), None)
            .await
            .unwrap();
        assert!(dir.path().join("custom.yml").exists());
        assert_eq!(pool.len(), 2);
    }

    #[tokio::test]
    async fn add_or_update_rejects_invalid_source_without_writing() {
        let dir = rule_dir();
        let pool = NormalizerPool::new([dir.path()]).await.unwrap();

        let err = pool
            .add_or_update_rule_set("name: broken\npatterns: []\n", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, NormalizerError::RuleSetValidation { .. }));
        assert!(!dir.path().join("broken.yml").exists());

        let err = pool
            .add_or_update_rule_set(KV, Some("../escape.yml"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, NormalizerError::RuleSetLoad { .. }));
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let dir = rule_dir();
        let pool = NormalizerPool::new([dir.path()]).await.unwrap();
        assert!(matches!(pool.rule_set("nope-1.0"), Err(NormalizerError::NotFound(_))));
        assert!(matches!(pool.source_of("nope-1.0"), Err(NormalizerError::NotFound(_))));
        assert!(matches!(pool.path_of("nope-1.0"), Err(NormalizerError::NotFound(_))));
    }

    #[tokio::test]
    async fn failing_rule_set_does_not_stop_the_pipeline() {
        let dir = rule_dir();
        std::fs::write(
            dir.path().join("boom.yml"),
            r#"
name: boom
patterns:
  - name: boom-001
    text: 'KEY=VALUE'
    tags:
      - { name: never, substitute: KEY, tag_type: Word, callbacks: [explode] }
callbacks:
  - { name: explode, code: 'throw "boom";' }
"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("kv.yml"), KV).unwrap();
        let pool = NormalizerPool::new([dir.path()]).await.unwrap();

        let mut record = Record::with_field("raw", "a=b");
        assert_eq!(pool.normalize(&mut record), 1);
        assert!(!record.contains_key("never"));
        assert_eq!(record.text("value"), Some("b"));
    }

    #[tokio::test]
    async fn timezone_field_converts_extracted_dates() {
        let dir = rule_dir();
        std::fs::write(
            dir.path().join("dated.yml"),
            r#"
name: dated
patterns:
  - name: dated-001
    text: 'STAMP'
    tags:
      - { name: __stamp, substitute: STAMP, callbacks: [to_date] }
callbacks:
  - name: to_date
    code: 'log.date = parse_date(value, "%Y-%m-%d %H:%M:%S");'
"#,
        )
        .unwrap();
        let pool = NormalizerPool::new([dir.path()]).await.unwrap();

        let mut record = Record::with_field("raw", "2024-07-18 08:55:35");
        record.insert("_timezone", "Europe/Paris");
        pool.normalize(&mut record);
        assert_eq!(
            record.get("date").and_then(|v| v.canonical()).as_deref(),
            Some("2024-07-18 06:55:35")
        );

        let mut record = Record::with_field("raw", "2024-07-18 08:55:35");
        record.insert("_timezone", "Not/AZone");
        pool.normalize(&mut record);
        assert_eq!(
            record.get("date").and_then(|v| v.canonical()).as_deref(),
            Some("2024-07-18 08:55:35")
        );
    }
}
