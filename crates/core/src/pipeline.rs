//! 파이프라인 trait: 정규화 확장 포인트 정의

use crate::error::LognormError;
use crate::types::Record;

/// 레코드를 정규화하는 단위
///
/// 룰셋 하나가 이 trait을 구현하며, 풀은 활성 룰셋을 우선순위 순서로
/// 차례대로 호출합니다.
pub trait Normalize: Send + Sync {
    /// 정규화기 식별자
    fn id(&self) -> &str;

    /// 레코드에 매칭되면 필드를 병합하고 `true`를 반환합니다.
    ///
    /// 매칭되지 않으면 레코드를 건드리지 않고 `false`를 반환합니다.
    /// 콜백 실패 시 레코드를 건드리지 않고 에러를 반환합니다.
    fn normalize(&self, record: &mut Record) -> Result<bool, LognormError>;
}
