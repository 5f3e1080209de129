//! lognorm 정규화 엔진
//!
//! 비정형 로그 라인을 YAML 룰셋으로 정규화합니다. 여러 룰셋 중 매칭되는 패턴을 찾아
//! 태그를 추출하고, 태그 타입으로 검증하고, 콜백으로 값을 변환한 뒤 레코드에 합칩니다.
//!
//! # 모듈 구성
//!
//! - [`tag_type`]: 태그 값이 만족해야 하는 이름 붙은 정규식
//! - [`callback`]: 태그 값을 변환하는 샌드박스 스크립트 (Rhai)
//! - [`tag`]: 패턴에서 추출되는 이름 붙은 필드
//! - [`pattern`]: 정규식 패턴과 구분자(CSV) 패턴
//! - [`ruleset`]: 룰셋 소스 모델, 컴파일, 매칭, 예제 자가 검증, 파일 로더
//! - [`library`]: 룰셋들이 공유하는 태그 타입과 콜백
//! - [`pool`]: 활성 룰셋을 우선순위 순서로 적용하는 정규화 풀
//! - [`timezone`]: 추출된 날짜의 UTC 변환
//! - [`geo`]: 주입형 GeoIP 조회
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! Record{raw} -> NormalizerPool -> [RuleSet (raw)] -> [RuleSet (body)] -> [RuleSet (기타)] -> Record
//!                    |                  |
//!              SharedLibrary     UnionRegex / Delimited -> Tag callbacks -> final callbacks
//! ```

pub mod callback;
pub mod description;
pub mod error;
pub mod geo;
pub mod library;
pub mod pattern;
pub mod pool;
pub mod ruleset;
pub mod tag;
pub mod tag_type;
pub mod timezone;

// --- 주요 타입 re-export ---

// 풀
pub use pool::{NormalizerPool, PoolOptions};

// 룰셋
pub use ruleset::{RuleSet, RuleSetLoader, RuleSetSource, RuleSetSummary};

// 구성 요소
pub use callback::{Callback, ScriptEngine};
pub use library::SharedLibrary;
pub use pattern::{Pattern, PatternKind};
pub use tag::Tag;
pub use tag_type::{RegexFlags, TagType};

// GeoIP
pub use geo::{GeoLocator, NoopGeoLocator};

// 에러
pub use error::NormalizerError;
