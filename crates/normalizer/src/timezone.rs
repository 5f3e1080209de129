//! 시간대 보정 -- 추출된 날짜를 레코드의 시간대 필드 기준으로 UTC로 변환합니다.
//!
//! 파이프라인 실행 전 날짜 필드를 스냅샷으로 저장해 두고, 실행 후 새로 생기거나
//! 바뀐 날짜 필드만 변환합니다. 알 수 없는 시간대 이름이면 값을 그대로 둡니다.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use jiff::civil;
use jiff::tz::TimeZone;

use lognorm_core::types::{FieldValue, Record};

/// 파이프라인 실행 전의 날짜 필드
#[derive(Debug, Default)]
pub struct DatetimeSnapshot(BTreeMap<String, NaiveDateTime>);

impl DatetimeSnapshot {
    /// 레코드의 날짜 필드를 저장합니다.
    pub fn capture(record: &Record) -> Self {
        Self(
            record
                .iter()
                .filter_map(|(name, value)| value.as_datetime().map(|dt| (name.clone(), dt)))
                .collect(),
        )
    }

    /// 스냅샷 이후 새로 생기거나 바뀐 날짜 필드를 `zone`에서 UTC로 변환합니다.
    ///
    /// 변환한 필드 수를 반환합니다.
    pub fn convert_changed(&self, record: &mut Record, zone: &str) -> usize {
        let tz = match TimeZone::get(zone) {
            Ok(tz) => tz,
            Err(e) => {
                tracing::debug!(zone, error = %e, "unknown time zone, leaving dates unchanged");
                return 0;
            }
        };

        let changed: Vec<(String, NaiveDateTime)> = record
            .iter()
            .filter_map(|(name, value)| {
                let dt = value.as_datetime()?;
                (self.0.get(name) != Some(&dt)).then(|| (name.clone(), dt))
            })
            .collect();

        let mut converted = 0;
        for (name, dt) in changed {
            if let Some(utc) = zoned_to_utc(dt, &tz) {
                record.insert(name, FieldValue::DateTime(utc));
                converted += 1;
            }
        }
        converted
    }
}

/// 시간대 이름으로 지정된 지역 시각을 UTC로 변환합니다.
pub fn to_utc(dt: NaiveDateTime, zone: &str) -> Option<NaiveDateTime> {
    let tz = TimeZone::get(zone).ok()?;
    zoned_to_utc(dt, &tz)
}

fn zoned_to_utc(dt: NaiveDateTime, tz: &TimeZone) -> Option<NaiveDateTime> {
    let date = dt.date();
    let time = dt.time();
    let local = civil::DateTime::new(
        i16::try_from(date.year()).ok()?,
        i8::try_from(date.month()).ok()?,
        i8::try_from(date.day()).ok()?,
        i8::try_from(time.hour()).ok()?,
        i8::try_from(time.minute()).ok()?,
        i8::try_from(time.second()).ok()?,
        i32::try_from(time.nanosecond()).ok()?,
    )
    .ok()?;

    let utc = local.to_zoned(tz.clone()).ok()?.with_time_zone(TimeZone::UTC);
    let out = utc.datetime();

    NaiveDate::from_ymd_opt(
        i32::from(out.year()),
        u32::try_from(out.month()).ok()?,
        u32::try_from(out.day()).ok()?,
    )?
    .and_hms_nano_opt(
        u32::try_from(out.hour()).ok()?,
        u32::try_from(out.minute()).ok()?,
        u32::try_from(out.second()).ok()?,
        u32::try_from(out.subsec_nanosecond()).ok()?,
    )
}
