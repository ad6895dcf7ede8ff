//! 메모리 저장소.
//!
//! PostgreSQL과 같은 고유 키 (ticker, reported_at) / (ticker, date)와
//! `high >= low` 제약을 검사합니다. 오케스트레이터와 쿼리 엔진 테스트에 사용합니다.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use insight_core::{BrokerWeight, NewRatingEvent, PriceBar, RatingEvent, TickerCoverage};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{BulkUpsertReport, PriceStore, RatingStore};
use crate::error::{DataError, Result};

#[derive(Debug, Default)]
pub(crate) struct Tables {
    pub ratings: BTreeMap<(String, DateTime<Utc>), RatingEvent>,
    pub prices: BTreeMap<(String, NaiveDate), PriceBar>,
    pub broker_weights: HashMap<String, f64>,
}

/// 메모리 저장소.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    unavailable: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 연결 장애를 흉내 냅니다. 켜져 있으면 모든 연산이 `ConnectionError`로 실패합니다.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// 브로커 가중치를 설정합니다.
    pub async fn set_broker_weight(&self, weight: BrokerWeight) {
        self.tables
            .write()
            .await
            .broker_weights
            .insert(weight.brokerage, weight.weight_score);
    }

    /// 저장된 레이팅 이벤트 (ticker, reported_at 순).
    pub async fn ratings(&self) -> Vec<RatingEvent> {
        self.tables.read().await.ratings.values().cloned().collect()
    }

    /// 저장된 일봉 수.
    pub async fn price_bar_count(&self) -> usize {
        self.tables.read().await.prices.len()
    }

    pub(crate) async fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.ensure_available()?;
        Ok(self.tables.read().await)
    }

    fn ensure_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DataError::ConnectionError(
                "메모리 저장소 사용 불가".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl RatingStore for InMemoryStore {
    async fn upsert_rating(&self, event: &NewRatingEvent) -> Result<Uuid> {
        self.ensure_available()?;
        if event.ticker.trim().is_empty() {
            return Err(DataError::Insert("ticker가 비어 있습니다".to_string()));
        }

        let mut tables = self.tables.write().await;
        let key = (event.ticker.clone(), event.reported_at);
        let id = tables
            .ratings
            .get(&key)
            .map(|existing| existing.id)
            .unwrap_or_else(Uuid::new_v4);

        tables
            .ratings
            .insert(key, RatingEvent::from_new(id, event.clone()));

        debug!(ticker = %event.ticker, id = %id, "레이팅 저장");
        Ok(id)
    }

    async fn ticker_coverage(&self) -> Result<Vec<TickerCoverage>> {
        let tables = self.read().await?;

        let mut coverage: BTreeMap<&str, TickerCoverage> = BTreeMap::new();
        for event in tables.ratings.values() {
            coverage
                .entry(event.ticker.as_str())
                .and_modify(|c| {
                    c.first_reported_at = c.first_reported_at.min(event.reported_at);
                    c.last_reported_at = c.last_reported_at.max(event.reported_at);
                })
                .or_insert_with(|| TickerCoverage {
                    ticker: event.ticker.clone(),
                    first_reported_at: event.reported_at,
                    last_reported_at: event.reported_at,
                });
        }

        Ok(coverage.into_values().collect())
    }
}

#[async_trait]
impl PriceStore for InMemoryStore {
    async fn upsert_price_bars(&self, bars: &[PriceBar]) -> Result<BulkUpsertReport> {
        self.ensure_available()?;

        let mut report = BulkUpsertReport::default();
        let mut tables = self.tables.write().await;

        for bar in bars {
            if !bar.is_consistent() {
                warn!(
                    ticker = %bar.ticker,
                    date = %bar.date,
                    high = %bar.high,
                    low = %bar.low,
                    "high < low 제약 위반, 건너뜀"
                );
                report.skipped += 1;
                continue;
            }

            tables
                .prices
                .insert((bar.ticker.clone(), bar.date), bar.clone());
            report.written += 1;
        }

        Ok(report)
    }

    async fn price_bars(
        &self,
        ticker: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PriceBar>> {
        if from > to {
            return Ok(Vec::new());
        }

        let tables = self.read().await?;
        Ok(tables
            .prices
            .range((ticker.to_string(), from)..=(ticker.to_string(), to))
            .map(|(_, bar)| bar.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use insight_core::NormalizedRating;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn event(ticker: &str, hour: u32, target_to: Decimal) -> NewRatingEvent {
        NewRatingEvent {
            ticker: ticker.to_string(),
            company: format!("{} Corp", ticker),
            brokerage: "Barclays".to_string(),
            action: "reiterated by".to_string(),
            rating_from: "Overweight".to_string(),
            rating_to: "Overweight".to_string(),
            normalized_rating_from: NormalizedRating::Buy,
            normalized_rating_to: NormalizedRating::Buy,
            target_from: dec!(100),
            target_to,
            reported_at: Utc.with_ymd_and_hms(2025, 2, 3, hour, 0, 0).unwrap(),
        }
    }

    fn bar(day: u32, high: Decimal, low: Decimal) -> PriceBar {
        PriceBar {
            ticker: "AAPL".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 1, day).unwrap(),
            open: dec!(10),
            high,
            low,
            close: dec!(10.5),
            volume: 100,
            source: "Yahoo".to_string(),
            scraped_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_upsert_rating_updates_in_place() {
        let store = InMemoryStore::new();

        let first = store.upsert_rating(&event("AAPL", 9, dec!(120))).await.unwrap();
        let second = store.upsert_rating(&event("AAPL", 9, dec!(135))).await.unwrap();

        assert_eq!(first, second);
        let ratings = store.ratings().await;
        assert_eq!(ratings.len(), 1);
        assert_eq!(ratings[0].target_to, dec!(135));
    }

    #[tokio::test]
    async fn test_ticker_coverage_min_max() {
        let store = InMemoryStore::new();
        store.upsert_rating(&event("MSFT", 15, dec!(1))).await.unwrap();
        store.upsert_rating(&event("AAPL", 12, dec!(1))).await.unwrap();
        store.upsert_rating(&event("AAPL", 8, dec!(1))).await.unwrap();

        let coverage = store.ticker_coverage().await.unwrap();
        assert_eq!(coverage.len(), 2);
        assert_eq!(coverage[0].ticker, "AAPL");
        assert_eq!(coverage[0].first_reported_at.format("%H").to_string(), "08");
        assert_eq!(coverage[0].last_reported_at.format("%H").to_string(), "12");
        assert_eq!(coverage[1].ticker, "MSFT");
    }

    #[tokio::test]
    async fn test_bulk_upsert_skips_invalid_row() {
        let store = InMemoryStore::new();
        let bars: Vec<PriceBar> = (1..=10)
            .map(|day| {
                if day == 4 {
                    bar(day, dec!(9), dec!(11))
                } else {
                    bar(day, dec!(11), dec!(9))
                }
            })
            .collect();

        let report = store.upsert_price_bars(&bars).await.unwrap();
        assert_eq!(report, BulkUpsertReport { written: 9, skipped: 1 });
        assert_eq!(store.price_bar_count().await, 9);

        // 재실행해도 (ticker, date)당 한 행
        store.upsert_price_bars(&bars).await.unwrap();
        assert_eq!(store.price_bar_count().await, 9);
    }

    #[tokio::test]
    async fn test_bulk_upsert_transaction_failure_writes_nothing() {
        let store = InMemoryStore::new();
        store.set_unavailable(true);

        let bars = vec![bar(1, dec!(11), dec!(9)), bar(2, dec!(11), dec!(9))];
        assert!(store.upsert_price_bars(&bars).await.is_err());

        store.set_unavailable(false);
        assert_eq!(store.price_bar_count().await, 0);
    }

    #[tokio::test]
    async fn test_price_bars_range() {
        let store = InMemoryStore::new();
        let bars: Vec<PriceBar> = (1..=5).map(|d| bar(d, dec!(11), dec!(9))).collect();
        store.upsert_price_bars(&bars).await.unwrap();

        let from = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        let to = NaiveDate::from_ymd_opt(2025, 1, 4).unwrap();
        let found = store.price_bars("AAPL", from, to).await.unwrap();
        assert_eq!(found.len(), 3);
        assert_eq!(found[0].date, from);
        assert!(store.price_bars("MSFT", from, to).await.unwrap().is_empty());
    }
}
