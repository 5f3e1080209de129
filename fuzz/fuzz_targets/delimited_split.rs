#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use lognorm_normalizer::pattern::split_delimited;

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    line: String,
    separator: char,
    quotechar: char,
}

fuzz_target!(|input: FuzzInput| {
    if input.separator == input.quotechar {
        return;
    }

    // 분리 결과가 있으면 따옴표 없는 입력의 필드 수는 구분자 수 + 1
    if let Some(fields) = split_delimited(&input.line, input.separator, input.quotechar) {
        let plain = !input.line.contains(input.quotechar)
            && !input.line.contains(['\n', '\r'])
            && !input.line.is_empty();
        if plain {
            assert_eq!(fields.len(), input.line.matches(input.separator).count() + 1);
        }
    }
});
