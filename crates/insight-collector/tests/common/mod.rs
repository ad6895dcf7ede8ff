//! 수집기 통합 테스트 공용 도우미.

#![allow(dead_code)]

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use insight_core::{normalize_broker_rating, NewRatingEvent, PriceBar, YAHOO_SOURCE};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 10, 14, 30, 0).unwrap()
}

/// `offset_min`분 뒤에 보고된 레이팅 이벤트
pub fn rating(ticker: &str, offset_min: i64) -> NewRatingEvent {
    NewRatingEvent {
        ticker: ticker.to_string(),
        company: format!("{ticker} Inc."),
        brokerage: "Goldman Sachs".to_string(),
        action: "upgraded by".to_string(),
        rating_from: "Neutral".to_string(),
        rating_to: "Buy".to_string(),
        normalized_rating_from: normalize_broker_rating("Neutral"),
        normalized_rating_to: normalize_broker_rating("Buy"),
        target_from: dec!(150.00),
        target_to: dec!(180.00),
        reported_at: base_time() + Duration::minutes(offset_min),
    }
}

/// `n`개의 이벤트 (티커 순환)
pub fn ratings(n: usize, offset: i64) -> Vec<NewRatingEvent> {
    (0..n)
        .map(|i| rating(["AAPL", "MSFT", "NVDA"][i % 3], offset + i as i64))
        .collect()
}

pub fn bar(ticker: &str, date: NaiveDate, close: Decimal) -> PriceBar {
    PriceBar {
        ticker: ticker.to_string(),
        date,
        open: close,
        high: close + dec!(1),
        low: close - dec!(1),
        close,
        volume: 1_000_000,
        source: YAHOO_SOURCE.to_string(),
        scraped_at: base_time(),
    }
}

/// `start`부터 `n`일 연속 일봉
pub fn bars(ticker: &str, start: NaiveDate, n: usize) -> Vec<PriceBar> {
    (0..n)
        .map(|i| bar(ticker, start + Duration::days(i as i64), dec!(100) + Decimal::from(i)))
        .collect()
}
