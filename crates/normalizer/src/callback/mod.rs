//! 콜백 -- 태그 값이 추출된 뒤 레코드를 변형하는 스크립트
//!
//! 콜백 소스는 Rhai 스크립트이며 정의 시점에 한 번 컴파일됩니다.
//! 실행 시에는 캡처된 값(`value`)과 레코드(`log`)를 받아 레코드를 변경합니다.
//!
//! ```text
//! callbacks:
//!   - name: decode_pid
//!     code: 'log.pid_num = parse_int(value);'
//! ```

mod builtin;
mod conversion;
mod engine;

pub use engine::{LOG_VAR, ScriptEngine, VALUE_VAR};

use rhai::AST;

use lognorm_core::types::Record;

use crate::error::NormalizerError;

/// 컴파일된 콜백
#[derive(Debug, Clone)]
pub struct Callback {
    name: String,
    code: String,
    ast: AST,
}

impl Callback {
    /// 콜백 소스를 컴파일합니다.
    ///
    /// `owner`는 에러 메시지에 사용되는 소유 룰셋(또는 공용 라이브러리) 이름입니다.
    pub fn compile(
        engine: &ScriptEngine,
        owner: &str,
        name: impl Into<String>,
        code: impl Into<String>,
    ) -> Result<Self, NormalizerError> {
        let name = name.into();
        let code = code.into();
        let ast = engine
            .compile(&name, &code)
            .map_err(|reason| NormalizerError::RuleSetValidation {
                rule_set: owner.to_owned(),
                reason: format!("callback '{name}' does not compile: {reason}"),
            })?;
        Ok(Self { name, code, ast })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 콜백 소스 원문
    pub fn code(&self) -> &str {
        &self.code
    }

    /// 콜백을 실행합니다.
    ///
    /// 실패 시 레코드는 변경되지 않으며, 에러에는 콜백과 호출한 패턴 이름이 담깁니다.
    pub fn invoke(
        &self,
        engine: &ScriptEngine,
        pattern: &str,
        value: Option<&str>,
        record: &mut Record,
    ) -> Result<(), NormalizerError> {
        engine
            .run(&self.ast, value, record)
            .map_err(|reason| NormalizerError::Callback {
                callback: self.name.clone(),
                pattern: pattern.to_owned(),
                reason,
            })
    }
}
