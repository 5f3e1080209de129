//! 콜백 스크립트에 노출되는 허용 목록 함수
//!
//! 날짜/시각, 정규식, URL, GeoIP 헬퍼만 등록합니다.
//! 파일/네트워크/프로세스 접근 함수는 없습니다.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::net::IpAddr;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, NaiveDateTime, Timelike, Utc};
use regex::Regex;
use rhai::{Array, Dynamic, Engine, EvalAltResult, ImmutableString};

use lognorm_core::types::format_datetime;

use crate::geo::GeoLocator;

type RhaiResult<T> = Result<T, Box<EvalAltResult>>;

/// 스크립트 정규식 캐시 최대 크기
const MAX_CACHED_REGEXES: usize = 256;

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// 모든 헬퍼 함수를 엔진에 등록합니다.
pub(crate) fn register_all(engine: &mut Engine, geo: Arc<dyn GeoLocator>) {
    register_datetime(engine);
    register_regex(engine);
    register_url(engine);
    register_geo(engine, geo);
}

fn script_error(msg: impl Into<String>) -> Box<EvalAltResult> {
    let msg: String = msg.into();
    msg.into()
}

fn to_u32(value: i64, what: &str) -> RhaiResult<u32> {
    u32::try_from(value).map_err(|_| script_error(format!("{what} out of range: {value}")))
}

fn build_datetime(y: i64, mo: i64, d: i64, h: i64, mi: i64, s: i64) -> RhaiResult<NaiveDateTime> {
    let year = i32::try_from(y).map_err(|_| script_error(format!("year out of range: {y}")))?;
    let (month, day) = (to_u32(mo, "month")?, to_u32(d, "day")?);
    let (hour, minute, second) = (to_u32(h, "hour")?, to_u32(mi, "minute")?, to_u32(s, "second")?);
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|date| date.and_hms_opt(hour, minute, second))
        .ok_or_else(|| script_error(format!("invalid date {y}-{mo}-{d} {h}:{mi}:{s}")))
}

/// 연도 없는 날짜에 가장 그럴듯한 연도를 붙입니다.
///
/// 올해로 해석한 값이 `now`보다 미래이면 작년으로 되돌립니다.
pub(crate) fn sensible_year(
    now: NaiveDateTime,
    month: i64,
    day: i64,
    hour: i64,
    minute: i64,
    second: i64,
) -> RhaiResult<NaiveDateTime> {
    let year = i64::from(now.year());
    let candidate = build_datetime(year, month, day, hour, minute, second)?;
    if candidate > now {
        build_datetime(year - 1, month, day, hour, minute, second)
    } else {
        Ok(candidate)
    }
}

fn month_index(name: &str) -> RhaiResult<i64> {
    let key = name.trim().to_ascii_lowercase();
    MONTHS
        .iter()
        .position(|m| key.starts_with(m))
        .map(|idx| idx as i64 + 1)
        .ok_or_else(|| script_error(format!("unknown month name: {name}")))
}

fn parse_date(text: &str, fmt: &str) -> RhaiResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, fmt)
        .or_else(|_| NaiveDate::parse_from_str(text, fmt).map(|d| d.and_time(chrono::NaiveTime::MIN)))
        .map_err(|e| script_error(format!("cannot parse {text:?} with {fmt:?}: {e}")))
}

fn from_epoch(secs: f64) -> RhaiResult<NaiveDateTime> {
    if !secs.is_finite() {
        return Err(script_error(format!("invalid epoch value: {secs}")));
    }
    let mut whole = secs.floor() as i64;
    let mut micros = ((secs - secs.floor()) * 1_000_000.0).round() as u32;
    // 반올림으로 1초가 되면 다음 초로 올림
    if micros >= 1_000_000 {
        whole += 1;
        micros -= 1_000_000;
    }
    DateTime::<Utc>::from_timestamp(whole, micros * 1_000)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| script_error(format!("epoch value out of range: {secs}")))
}

fn strftime(dt: &NaiveDateTime, fmt: &str) -> RhaiResult<String> {
    let mut out = String::new();
    write!(out, "{}", dt.format(fmt))
        .map_err(|_| script_error(format!("invalid date format: {fmt:?}")))?;
    Ok(out)
}

fn register_datetime(engine: &mut Engine) {
    engine.register_type_with_name::<NaiveDateTime>("DateTime");

    engine.register_fn("datetime", build_datetime);
    engine.register_fn("datetime", |y: i64, mo: i64, d: i64| build_datetime(y, mo, d, 0, 0, 0));
    engine.register_fn("now", || Local::now().naive_local());
    engine.register_fn("utcnow", || Utc::now().naive_utc());
    engine.register_fn(
        "sensible_year_date",
        |month: i64, day: i64, hour: i64, minute: i64, second: i64| {
            sensible_year(Local::now().naive_local(), month, day, hour, minute, second)
        },
    );
    engine.register_fn("month_index", |name: &str| month_index(name));
    engine.register_fn("parse_date", |text: &str, fmt: &str| parse_date(text, fmt));
    engine.register_fn("from_epoch", from_epoch);
    engine.register_fn("from_epoch", |secs: i64| from_epoch(secs as f64));
    engine.register_fn("from_epoch", |secs: &str| {
        let parsed = secs
            .trim()
            .parse::<f64>()
            .map_err(|_| script_error(format!("invalid epoch value: {secs:?}")))?;
        from_epoch(parsed)
    });
    engine.register_fn("strftime", |dt: &mut NaiveDateTime, fmt: &str| strftime(dt, fmt));

    engine.register_get("year", |dt: &mut NaiveDateTime| i64::from(dt.year()));
    engine.register_get("month", |dt: &mut NaiveDateTime| i64::from(dt.month()));
    engine.register_get("day", |dt: &mut NaiveDateTime| i64::from(dt.day()));
    engine.register_get("hour", |dt: &mut NaiveDateTime| i64::from(dt.hour()));
    engine.register_get("minute", |dt: &mut NaiveDateTime| i64::from(dt.minute()));
    engine.register_get("second", |dt: &mut NaiveDateTime| i64::from(dt.second()));
    engine.register_get("microsecond", |dt: &mut NaiveDateTime| {
        i64::from(dt.nanosecond() / 1_000)
    });

    engine.register_fn("add_seconds", |dt: NaiveDateTime, secs: i64| -> RhaiResult<NaiveDateTime> {
        Duration::try_seconds(secs)
            .and_then(|d| dt.checked_add_signed(d))
            .ok_or_else(|| script_error("datetime overflow"))
    });
    engine.register_fn("add_days", |dt: NaiveDateTime, days: i64| -> RhaiResult<NaiveDateTime> {
        Duration::try_days(days)
            .and_then(|d| dt.checked_add_signed(d))
            .ok_or_else(|| script_error("datetime overflow"))
    });

    engine.register_fn("==", |a: NaiveDateTime, b: NaiveDateTime| a == b);
    engine.register_fn("!=", |a: NaiveDateTime, b: NaiveDateTime| a != b);
    engine.register_fn("<", |a: NaiveDateTime, b: NaiveDateTime| a < b);
    engine.register_fn("<=", |a: NaiveDateTime, b: NaiveDateTime| a <= b);
    engine.register_fn(">", |a: NaiveDateTime, b: NaiveDateTime| a > b);
    engine.register_fn(">=", |a: NaiveDateTime, b: NaiveDateTime| a >= b);

    engine.register_fn("to_string", |dt: &mut NaiveDateTime| format_datetime(dt));
    engine.register_fn("to_debug", |dt: &mut NaiveDateTime| format_datetime(dt));
}

/// 스크립트에서 반복 사용되는 정규식 캐시
#[derive(Default)]
struct RegexCache {
    entries: RwLock<HashMap<String, Regex>>,
}

impl RegexCache {
    fn get(&self, pattern: &str) -> RhaiResult<Regex> {
        {
            let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
            if let Some(re) = entries.get(pattern) {
                return Ok(re.clone());
            }
        }
        let re = Regex::new(pattern)
            .map_err(|e| script_error(format!("invalid regular expression {pattern:?}: {e}")))?;
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if entries.len() >= MAX_CACHED_REGEXES {
            entries.clear();
        }
        entries.insert(pattern.to_owned(), re.clone());
        Ok(re)
    }
}

fn register_regex(engine: &mut Engine) {
    let cache = Arc::new(RegexCache::default());

    let c = Arc::clone(&cache);
    engine.register_fn("re_match", move |pattern: &str, text: &str| -> RhaiResult<bool> {
        let re = c.get(pattern)?;
        Ok(re.find(text).is_some_and(|m| m.start() == 0))
    });

    let c = Arc::clone(&cache);
    engine.register_fn("re_search", move |pattern: &str, text: &str| -> RhaiResult<bool> {
        Ok(c.get(pattern)?.is_match(text))
    });

    let c = Arc::clone(&cache);
    engine.register_fn("re_captures", move |pattern: &str, text: &str| -> RhaiResult<Dynamic> {
        let re = c.get(pattern)?;
        let Some(caps) = re.captures(text) else {
            return Ok(Dynamic::UNIT);
        };
        let groups: Array = caps
            .iter()
            .map(|m| match m {
                Some(m) => Dynamic::from(ImmutableString::from(m.as_str())),
                None => Dynamic::UNIT,
            })
            .collect();
        Ok(Dynamic::from_array(groups))
    });

    let c = Arc::clone(&cache);
    engine.register_fn(
        "re_replace",
        move |pattern: &str, text: &str, replacement: &str| -> RhaiResult<String> {
            Ok(c.get(pattern)?.replace_all(text, replacement).into_owned())
        },
    );
}

fn url_part(text: &str, part: impl Fn(&url::Url) -> Option<String>) -> Dynamic {
    match url::Url::parse(text).ok().and_then(|u| part(&u)) {
        Some(s) => Dynamic::from(ImmutableString::from(s)),
        None => Dynamic::UNIT,
    }
}

fn register_url(engine: &mut Engine) {
    engine.register_fn("url_scheme", |text: &str| {
        url_part(text, |u| Some(u.scheme().to_owned()))
    });
    engine.register_fn("url_host", |text: &str| {
        url_part(text, |u| u.host_str().map(str::to_owned))
    });
    engine.register_fn("url_path", |text: &str| {
        url_part(text, |u| Some(u.path().to_owned()))
    });
    engine.register_fn("url_query", |text: &str| {
        url_part(text, |u| u.query().map(str::to_owned))
    });
}

fn register_geo(engine: &mut Engine, geo: Arc<dyn GeoLocator>) {
    engine.register_fn("country_code", move |ip: &str| {
        match ip.trim().parse::<IpAddr>().ok().and_then(|ip| geo.country_code(ip)) {
            Some(code) => Dynamic::from(ImmutableString::from(code)),
            None => Dynamic::UNIT,
        }
    });
}
