//! 일봉 가격 바와 티커 커버리지.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Yahoo 차트 API에서 수집한 가격 바의 출처 라벨.
pub const YAHOO_SOURCE: &str = "Yahoo";

/// 한 티커의 하루치 OHLCV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    /// 대문자 티커 (예: "AAPL")
    pub ticker: String,
    /// UTC 기준 거래일
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: i64,
    /// 데이터 출처
    pub source: String,
    /// 수집 시각
    pub scraped_at: DateTime<Utc>,
}

impl PriceBar {
    /// 저장소의 `high >= low` 제약을 만족하는지 확인합니다.
    pub fn is_consistent(&self) -> bool {
        self.high >= self.low
    }
}

/// Unix 초 타임스탬프를 UTC 거래일로 절삭합니다.
pub fn utc_day(unix_secs: i64) -> Option<NaiveDate> {
    DateTime::<Utc>::from_timestamp(unix_secs, 0).map(|ts| ts.date_naive())
}

/// 티커별 레이팅 이벤트 보고 기간 (저장하지 않고 조회 시 계산).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerCoverage {
    pub ticker: String,
    /// 가장 이른 reported_at
    pub first_reported_at: DateTime<Utc>,
    /// 가장 늦은 reported_at
    pub last_reported_at: DateTime<Utc>,
}

impl TickerCoverage {
    /// 가격 갱신 구간 `[first - back_pad, last]`.
    ///
    /// 일 단위 절삭으로 경계 바가 빠지지 않도록 시작 시각을 앞당깁니다.
    pub fn refresh_window(&self, back_pad: Duration) -> (DateTime<Utc>, DateTime<Utc>) {
        (self.first_reported_at - back_pad, self.last_reported_at)
    }
}
