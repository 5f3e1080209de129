//! 메트릭 이름 상수
//!
//! 모든 메트릭 이름을 한 곳에 모아 관리합니다.
//! 익스포터는 설치하지 않으며, 호스트 애플리케이션이 `metrics` 레코더를 설치하면
//! 그대로 수집됩니다.

// ─── 레이블 키 ──────────────────────────────────────────────────────

/// 룰셋 ID 레이블
pub const LABEL_RULE_SET: &str = "rule_set";

/// 결과 레이블 (matched, unmatched)
pub const LABEL_RESULT: &str = "result";

// ─── Normalizer ─────────────────────────────────────────────────────

/// 정규화된 로그 라인 수 (counter, labels: result)
pub const NORMALIZER_LINES_TOTAL: &str = "lognorm_normalizer_lines_total";

/// 룰셋 매칭 수 (counter, labels: rule_set)
pub const NORMALIZER_RULE_SET_MATCHES_TOTAL: &str = "lognorm_normalizer_rule_set_matches_total";

/// 콜백 실행 실패 수 (counter, labels: rule_set)
pub const NORMALIZER_CALLBACK_ERRORS_TOTAL: &str = "lognorm_normalizer_callback_errors_total";

/// 로드된 룰셋 수 (gauge)
pub const NORMALIZER_RULE_SETS_LOADED: &str = "lognorm_normalizer_rule_sets_loaded";

/// 로드 중 건너뛴 룰셋 수 (counter)
pub const NORMALIZER_RULE_SETS_SKIPPED_TOTAL: &str = "lognorm_normalizer_rule_sets_skipped_total";

/// 한 라인 정규화 소요 시간 (histogram, 초)
pub const NORMALIZER_DURATION_SECONDS: &str = "lognorm_normalizer_duration_seconds";

// ─── 히스토그램 버킷 정의 ────────────────────────────────────────────

/// 정규화 지연 시간 히스토그램 버킷 (초)
///
/// 10us ~ 100ms 범위
pub const NORMALIZE_DURATION_BUCKETS: [f64; 8] =
    [0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.1];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    describe_counter!(
        NORMALIZER_LINES_TOTAL,
        "Total number of log lines passed through the normalizer pool"
    );
    describe_counter!(
        NORMALIZER_RULE_SET_MATCHES_TOTAL,
        "Total number of rule set matches"
    );
    describe_counter!(
        NORMALIZER_CALLBACK_ERRORS_TOTAL,
        "Total number of callback failures that aborted a rule set contribution"
    );
    describe_gauge!(
        NORMALIZER_RULE_SETS_LOADED,
        "Number of rule sets currently loaded in the pool"
    );
    describe_counter!(
        NORMALIZER_RULE_SETS_SKIPPED_TOTAL,
        "Total number of rule set files skipped while loading"
    );
    describe_histogram!(
        NORMALIZER_DURATION_SECONDS,
        "Time to normalize a single record in seconds"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_METRIC_NAMES: &[&str] = &[
        NORMALIZER_LINES_TOTAL,
        NORMALIZER_RULE_SET_MATCHES_TOTAL,
        NORMALIZER_CALLBACK_ERRORS_TOTAL,
        NORMALIZER_RULE_SETS_LOADED,
        NORMALIZER_RULE_SETS_SKIPPED_TOTAL,
        NORMALIZER_DURATION_SECONDS,
    ];

    #[test]
    fn all_metrics_start_with_lognorm_prefix() {
        for name in ALL_METRIC_NAMES {
            assert!(
                name.starts_with("lognorm_"),
                "Metric '{}' does not start with 'lognorm_' prefix",
                name
            );
        }
    }

    #[test]
    fn describe_all_does_not_panic() {
        describe_all();
    }

    #[test]
    fn label_keys_are_lowercase() {
        for label in [LABEL_RULE_SET, LABEL_RESULT] {
            assert_eq!(label.to_lowercase(), label);
        }
    }

    #[test]
    fn normalize_duration_buckets_are_sorted() {
        let buckets = NORMALIZE_DURATION_BUCKETS;
        for i in 1..buckets.len() {
            assert!(
                buckets[i] > buckets[i - 1],
                "Bucket values must be in ascending order"
            );
        }
    }
}
