//! lognorm 공통 크레이트
//!
//! 정규화 엔진과 CLI가 공유하는 레코드 타입, 에러 계층, 설정,
//! 메트릭 이름, 그리고 [`Normalize`] trait을 제공합니다.

pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, LognormError, NormalizationError, RuleSetError};

// 설정
pub use config::LognormConfig;

// 파이프라인 trait
pub use pipeline::Normalize;

// 도메인 타입
pub use types::{FieldValue, Record};
