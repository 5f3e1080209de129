//! 콜백 샌드박스 엔진
//!
//! Rhai 엔진 하나를 풀 전체가 공유합니다. 모듈 import와 `eval`은 막혀 있고,
//! 실행은 연산 수 한도로 제한됩니다.

use std::sync::Arc;

use rhai::module_resolvers::DummyModuleResolver;
use rhai::{AST, Dynamic, Engine, ImmutableString, Map, Scope};

use lognorm_core::config::DEFAULT_MAX_SCRIPT_OPERATIONS;
use lognorm_core::types::Record;

use super::builtin;
use super::conversion::{map_to_record, record_to_map};
use crate::geo::{GeoLocator, NoopGeoLocator};

/// 스크립트에서 캡처된 값을 담는 변수 이름
pub const VALUE_VAR: &str = "value";

/// 스크립트에서 레코드를 담는 변수 이름
pub const LOG_VAR: &str = "log";

const MAX_CALL_LEVELS: usize = 32;
const MAX_EXPR_DEPTH: usize = 64;
const MAX_FN_EXPR_DEPTH: usize = 32;
const MAX_STRING_SIZE: usize = 1024 * 1024;
const MAX_COLLECTION_SIZE: usize = 10_000;

/// 콜백 실행 엔진
pub struct ScriptEngine {
    engine: Engine,
}

impl ScriptEngine {
    /// 연산 한도와 GeoIP 조회기를 지정해 엔진을 생성합니다.
    pub fn new(max_operations: u64, geo: Arc<dyn GeoLocator>) -> Self {
        let mut engine = Engine::new();

        engine.set_module_resolver(DummyModuleResolver::new());
        engine.disable_symbol("eval");
        engine.disable_symbol("import");

        engine.set_max_operations(max_operations);
        engine.set_max_call_levels(MAX_CALL_LEVELS);
        engine.set_max_expr_depths(MAX_EXPR_DEPTH, MAX_FN_EXPR_DEPTH);
        engine.set_max_string_size(MAX_STRING_SIZE);
        engine.set_max_array_size(MAX_COLLECTION_SIZE);
        engine.set_max_map_size(MAX_COLLECTION_SIZE);

        engine.on_print(|text| tracing::debug!(output = text, "callback print"));
        engine.on_debug(|text, source, pos| {
            tracing::debug!(
                callback = source.unwrap_or("?"),
                position = %pos,
                output = text,
                "callback debug"
            );
        });

        builtin::register_all(&mut engine, geo);

        Self { engine }
    }

    /// 콜백 소스를 컴파일합니다. AST의 source에는 콜백 이름이 기록됩니다.
    pub fn compile(&self, name: &str, code: &str) -> Result<AST, String> {
        let mut ast = self.engine.compile(code).map_err(|e| e.to_string())?;
        ast.set_source(name);
        Ok(ast)
    }

    /// 컴파일된 콜백을 실행합니다.
    ///
    /// 스크립트는 `value`(문자열 또는 unit)와 `log`(맵)를 볼 수 있고,
    /// 실행 후의 `log`가 레코드를 대체합니다. 실패 시 레코드는 변경되지 않습니다.
    pub fn run(&self, ast: &AST, value: Option<&str>, record: &mut Record) -> Result<(), String> {
        let mut scope = Scope::new();
        let value = match value {
            Some(v) => Dynamic::from(ImmutableString::from(v)),
            None => Dynamic::UNIT,
        };
        scope.push_dynamic(VALUE_VAR, value);
        scope.push(LOG_VAR, record_to_map(record));

        self.engine
            .run_ast_with_scope(&mut scope, ast)
            .map_err(|e| e.to_string())?;

        let log = scope
            .get_value::<Map>(LOG_VAR)
            .ok_or_else(|| format!("callback replaced '{LOG_VAR}' with a non-map value"))?;
        *record = map_to_record(log);
        Ok(())
    }
}

impl Default for ScriptEngine {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SCRIPT_OPERATIONS, Arc::new(NoopGeoLocator))
    }
}

impl std::fmt::Debug for ScriptEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptEngine").finish_non_exhaustive()
    }
}
