#![no_main]

use std::sync::Arc;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use lognorm_core::types::{RAW_FIELD, Record};
use lognorm_normalizer::{RuleSet, RuleSetSource, ScriptEngine, SharedLibrary};

/// 퍼저용 구조적 입력
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    /// 태그 타입 정규식
    tag_regexp: String,
    /// 패턴 템플릿 (`VALUE` 토큰이 치환됨)
    template: String,
    search: bool,
    line: String,
}

fuzz_target!(|input: FuzzInput| {
    let yaml = format!(
        "name: fuzz\nmatch_type: {}\ntag_types:\n  - {{ name: T, regexp: {:?} }}\npatterns:\n  - name: fuzz-001\n    text: {:?}\n    tags:\n      - {{ name: value, tag_type: T, substitute: VALUE }}\n",
        if input.search { "search" } else { "match" },
        input.tag_regexp,
        input.template,
    );

    let Ok(source) = RuleSetSource::from_yaml(&yaml) else {
        return;
    };
    let Ok(library) = SharedLibrary::new() else {
        return;
    };

    // 컴파일이 실패해도 크래시는 안 됨
    let Ok(rule_set) = RuleSet::compile(source, &library, Arc::new(ScriptEngine::default())) else {
        return;
    };

    let mut record = Record::with_field(RAW_FIELD, input.line);
    let _ = rule_set.normalize(&mut record);
});
