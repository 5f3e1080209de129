//! GeoIP 조회 -- 콜백의 `country_code(ip)` 헬퍼가 사용하는 주입형 기능

use std::net::IpAddr;

/// IP 주소 → 국가 코드 조회
///
/// GeoIP 데이터베이스를 가진 호스트 애플리케이션이 구현해 풀에 주입합니다.
pub trait GeoLocator: Send + Sync {
    /// ISO 3166-1 alpha-2 국가 코드. 알 수 없으면 `None`.
    fn country_code(&self, ip: IpAddr) -> Option<String>;
}

/// 항상 `None`을 반환하는 기본 구현
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopGeoLocator;

impl GeoLocator for NoopGeoLocator {
    fn country_code(&self, _ip: IpAddr) -> Option<String> {
        None
    }
}
