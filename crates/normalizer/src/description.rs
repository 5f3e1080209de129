//! 다국어 설명

use std::collections::BTreeMap;

/// 언어 코드 → 설명 문자열
pub type Descriptions = BTreeMap<String, String>;

/// 설명이 없을 때 표시하는 값
pub const NOT_AVAILABLE: &str = "N/A";

/// 요청한 언어의 설명을 반환합니다. 없으면 `"N/A"`.
pub fn localized<'a>(descriptions: &'a Descriptions, lang: &str) -> &'a str {
    descriptions
        .get(lang)
        .map(String::as_str)
        .unwrap_or(NOT_AVAILABLE)
}
