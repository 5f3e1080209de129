//! Record <-> Rhai 값 변환

use chrono::NaiveDateTime;
use rhai::{Dynamic, ImmutableString, Map};

use lognorm_core::types::{FieldValue, Record};

/// 레코드를 스크립트의 `log` 맵으로 변환합니다.
pub(crate) fn record_to_map(record: &Record) -> Map {
    record
        .iter()
        .map(|(name, value)| (name.as_str().into(), field_to_dynamic(value)))
        .collect()
}

/// 스크립트 실행 후의 `log` 맵을 레코드로 되돌립니다.
pub(crate) fn map_to_record(map: Map) -> Record {
    map.into_iter()
        .map(|(name, value)| (name.to_string(), dynamic_to_field(value)))
        .collect()
}

pub(crate) fn field_to_dynamic(value: &FieldValue) -> Dynamic {
    match value {
        FieldValue::Text(s) => Dynamic::from(ImmutableString::from(s.as_str())),
        FieldValue::DateTime(dt) => Dynamic::from(*dt),
        FieldValue::Null => Dynamic::UNIT,
    }
}

/// 문자열/날짜시각/unit 이외의 값(정수, 실수, 불리언 등)은 문자열로 저장됩니다.
pub(crate) fn dynamic_to_field(value: Dynamic) -> FieldValue {
    if value.is_unit() {
        return FieldValue::Null;
    }
    if value.is::<NaiveDateTime>() {
        return value
            .try_cast::<NaiveDateTime>()
            .map_or(FieldValue::Null, FieldValue::DateTime);
    }
    if value.is_string() {
        return match value.into_immutable_string() {
            Ok(s) => FieldValue::Text(s.to_string()),
            Err(type_name) => FieldValue::Text(type_name.to_owned()),
        };
    }
    FieldValue::Text(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn record_roundtrips_through_map() {
        let dt = NaiveDate::from_ymd_opt(2011, 7, 18)
            .unwrap()
            .and_hms_opt(8, 55, 35)
            .unwrap();
        let mut record = Record::with_field("raw", "line");
        record.insert("date", dt);
        record.insert("gone", FieldValue::Null);

        let back = map_to_record(record_to_map(&record));
        assert_eq!(back, record);
    }

    #[test]
    fn numbers_become_decimal_strings() {
        assert_eq!(
            dynamic_to_field(Dynamic::from(3245_i64)),
            FieldValue::Text("3245".to_owned())
        );
        assert_eq!(
            dynamic_to_field(Dynamic::from(true)),
            FieldValue::Text("true".to_owned())
        );
    }
}
