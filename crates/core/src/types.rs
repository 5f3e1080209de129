//! 도메인 타입: 정규화 레코드와 필드 값
//!
//! 정규화 엔진은 한 줄의 로그를 [`Record`]로 받아 필드를 추가/변경합니다.
//! 필드 값은 문자열, 파싱된 날짜시각, 또는 비어 있음(`Null`) 중 하나입니다.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fmt;

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// 원본 로그 라인이 담기는 필드
pub const RAW_FIELD: &str = "raw";

/// 본문 필드 (syslog 등 상위 룰셋이 추출)
pub const BODY_FIELD: &str = "body";

/// 정규화 호출마다 새로 부여되는 고유 식별자 필드
pub const UUID_FIELD: &str = "uuid";

/// 룰셋 분류 레이블 필드
pub const TAXONOMY_FIELD: &str = "taxonomy";

/// 이 접두사로 시작하는 태그는 콜백에서만 쓰이고 결과에서 제거됩니다.
pub const TEMPORARY_TAG_PREFIX: &str = "__";

/// 날짜시각 필드의 정규 문자열 형식 (마이크로초가 0이면 생략)
pub fn format_datetime(dt: &NaiveDateTime) -> String {
    if dt.nanosecond() / 1_000 == 0 {
        dt.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        dt.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
    }
}

/// 레코드 필드 값
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// 문자열 값
    Text(String),
    /// 파싱된 날짜시각 (타임존 없음)
    DateTime(NaiveDateTime),
    /// 값 없음
    Null,
}

impl FieldValue {
    /// 문자열 값이면 참조를 반환합니다.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// 날짜시각 값이면 반환합니다.
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Self::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    /// 빈 문자열이거나 `Null`이면 true
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.is_empty(),
            Self::DateTime(_) => false,
            Self::Null => true,
        }
    }

    /// 비교/출력용 정규 문자열. `Null`은 `None`.
    pub fn canonical(&self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s.clone()),
            Self::DateTime(dt) => Some(format_datetime(dt)),
            Self::Null => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::DateTime(dt) => f.write_str(&format_datetime(dt)),
            Self::Null => Ok(()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<NaiveDateTime> for FieldValue {
    fn from(value: NaiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Text(s) => serializer.serialize_str(s),
            Self::DateTime(dt) => serializer.serialize_str(&format_datetime(dt)),
            Self::Null => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<String>::deserialize(deserializer)? {
            Some(s) => Self::Text(s),
            None => Self::Null,
        })
    }
}

/// 정규화 대상 레코드
///
/// 필드 이름 → 값 매핑입니다. 키 순서가 결정적이도록 `BTreeMap`을 사용합니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    /// 빈 레코드를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 필드 하나를 가진 레코드를 생성합니다.
    ///
    /// ```
    /// use lognorm_core::types::{RAW_FIELD, Record};
    ///
    /// let record = Record::with_field(RAW_FIELD, "Jul 18 08:55:35 naruto app[3245]: hi");
    /// assert_eq!(record.text(RAW_FIELD), Some("Jul 18 08:55:35 naruto app[3245]: hi"));
    /// ```
    pub fn with_field(name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        let mut record = Self::new();
        record.insert(name, value);
        record
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// 문자열 필드 값을 반환합니다. 문자열이 아니거나 없으면 `None`.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(FieldValue::as_text)
    }

    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<FieldValue>,
    ) -> Option<FieldValue> {
        self.fields.insert(name.into(), value.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, FieldValue> {
        self.fields.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn retain(&mut self, f: impl FnMut(&String, &mut FieldValue) -> bool) {
        self.fields.retain(f);
    }

    /// 다른 레코드의 필드를 덮어쓰며 병합합니다.
    pub fn merge(&mut self, other: Record) {
        self.fields.extend(other.fields);
    }

    /// `__`로 시작하는 임시 필드를 제거합니다.
    pub fn strip_temporary(&mut self) {
        self.fields
            .retain(|name, _| !name.starts_with(TEMPORARY_TAG_PREFIX));
    }
}

impl FromIterator<(String, FieldValue)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Record {
    type Item = (String, FieldValue);
    type IntoIter = btree_map::IntoIter<String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = (&'a String, &'a FieldValue);
    type IntoIter = btree_map::Iter<'a, String, FieldValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}
