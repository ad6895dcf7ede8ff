//! 가격 갱신 오케스트레이터 테스트.

mod common;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use insight_collector::modules::PriceRefresh;
use insight_collector::CollectorError;
use insight_core::PriceBar;
use insight_data::{
    DataError, InMemoryStore, ManualClock, PriceScraper, PriceStore, RatingStore, ScraperConfig,
    YahooChartScraper,
};
use mockito::Matcher;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const THROTTLE: Duration = Duration::from_millis(500);

#[derive(Clone)]
enum Scripted {
    Bars(Vec<PriceBar>),
    NoData,
    Fail,
}

/// 티커별로 정해진 결과를 돌려주고 호출 구간을 기록하는 스크래퍼
#[derive(Default)]
struct ScriptedScraper {
    results: HashMap<String, Scripted>,
    calls: Mutex<Vec<(String, DateTime<Utc>, DateTime<Utc>)>>,
    cancel_on_call: Option<CancellationToken>,
}

impl ScriptedScraper {
    fn with(mut self, ticker: &str, result: Scripted) -> Self {
        self.results.insert(ticker.to_string(), result);
        self
    }

    fn calls(&self) -> Vec<(String, DateTime<Utc>, DateTime<Utc>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PriceScraper for ScriptedScraper {
    async fn get_historical_data(
        &self,
        ticker: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> insight_data::Result<Vec<PriceBar>> {
        self.calls.lock().unwrap().push((ticker.to_string(), from, to));
        if let Some(token) = &self.cancel_on_call {
            token.cancel();
        }
        match self.results.get(ticker) {
            Some(Scripted::Bars(bars)) => Ok(bars.clone()),
            Some(Scripted::NoData) | None => Err(DataError::NoData(ticker.to_string())),
            Some(Scripted::Fail) => Err(DataError::HttpStatus {
                status: 500,
                body: "internal".into(),
            }),
        }
    }
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

async fn store_with(tickers: &[(&str, i64)]) -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    for (ticker, offset) in tickers {
        store
            .upsert_rating(&common::rating(ticker, *offset))
            .await
            .unwrap();
    }
    store
}

fn refresh(
    store: &Arc<InMemoryStore>,
    scraper: Arc<dyn PriceScraper>,
    clock: &Arc<ManualClock>,
) -> PriceRefresh {
    PriceRefresh::new(store.clone(), scraper, store.clone(), clock.clone(), THROTTLE)
}

#[tokio::test]
async fn test_failure_does_not_stop_other_tickers() {
    let store = store_with(&[("AAPL", 0), ("MSFT", 0), ("NVDA", 0)]).await;
    let scraper = Arc::new(
        ScriptedScraper::default()
            .with("AAPL", Scripted::Bars(common::bars("AAPL", day(2025, 1, 6), 5)))
            .with("MSFT", Scripted::Fail)
            .with("NVDA", Scripted::NoData),
    );
    let clock = Arc::new(ManualClock::new(common::base_time()));

    let stats = refresh(&store, scraper.clone(), &clock)
        .run(&CancellationToken::new())
        .await
        .unwrap();

    let called: Vec<String> = scraper.calls().into_iter().map(|(t, _, _)| t).collect();
    assert_eq!(called, vec!["AAPL", "MSFT", "NVDA"]);

    assert_eq!(stats.total, 3);
    assert_eq!(stats.success, 1);
    assert_eq!(stats.errors, 1);
    assert_eq!(stats.empty, 1);
    assert_eq!(stats.total_records, 5);
    assert_eq!(store.price_bar_count().await, 5);

    // 티커마다 한 번씩 대기
    assert_eq!(clock.sleeps(), vec![THROTTLE; 3]);
}

#[tokio::test]
async fn test_window_starts_one_hour_early() {
    let store = store_with(&[("AAPL", 0), ("AAPL", 90), ("AAPL", 30)]).await;
    let scraper = Arc::new(ScriptedScraper::default());
    let clock = Arc::new(ManualClock::new(common::base_time()));

    refresh(&store, scraper.clone(), &clock)
        .run(&CancellationToken::new())
        .await
        .unwrap();

    let calls = scraper.calls();
    assert_eq!(calls.len(), 1);
    let (_, from, to) = &calls[0];
    assert_eq!(*from, common::base_time() - ChronoDuration::hours(1));
    assert_eq!(*to, common::base_time() + ChronoDuration::minutes(90));
}

#[tokio::test]
async fn test_inconsistent_row_is_skipped() {
    let store = store_with(&[("AAPL", 0)]).await;
    let mut bars = common::bars("AAPL", day(2025, 1, 1), 10);
    bars[3].high = dec!(90);
    bars[3].low = dec!(95);

    let scraper = Arc::new(ScriptedScraper::default().with("AAPL", Scripted::Bars(bars)));
    let clock = Arc::new(ManualClock::new(common::base_time()));

    let stats = refresh(&store, scraper, &clock)
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(stats.success, 1);
    assert_eq!(stats.total_records, 9);
    assert_eq!(stats.skipped_records, 1);

    let stored = store
        .price_bars("AAPL", day(2025, 1, 1), day(2025, 1, 10))
        .await
        .unwrap();
    assert_eq!(stored.len(), 9);
    assert!(stored.iter().all(|b| b.date != day(2025, 1, 4)));
}

#[tokio::test]
async fn test_coverage_failure_is_fatal() {
    let store = store_with(&[("AAPL", 0)]).await;
    store.set_unavailable(true);
    let scraper = Arc::new(ScriptedScraper::default());
    let clock = Arc::new(ManualClock::new(common::base_time()));

    let err = refresh(&store, scraper.clone(), &clock)
        .run(&CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CollectorError::Data(DataError::ConnectionError(_))
    ));
    assert!(scraper.calls().is_empty());
}

#[tokio::test]
async fn test_no_tickers_is_noop() {
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(ManualClock::new(common::base_time()));

    let stats = refresh(&store, Arc::new(ScriptedScraper::default()), &clock)
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(stats.total, 0);
    assert!(clock.sleeps().is_empty());
}

#[tokio::test]
async fn test_cancel_stops_after_current_ticker() {
    let store = store_with(&[("AAPL", 0), ("MSFT", 0)]).await;
    let cancel = CancellationToken::new();
    let scraper = Arc::new(ScriptedScraper {
        cancel_on_call: Some(cancel.clone()),
        ..Default::default()
    }
    .with("AAPL", Scripted::Bars(common::bars("AAPL", day(2025, 1, 6), 2))));
    let clock = Arc::new(ManualClock::new(common::base_time()));

    let stats = refresh(&store, scraper.clone(), &clock)
        .run(&cancel)
        .await
        .unwrap();

    assert!(stats.cancelled);
    assert_eq!(stats.total, 1);
    assert_eq!(scraper.calls().len(), 1);
    // 현재 티커의 저장은 끝난 상태
    assert_eq!(store.price_bar_count().await, 2);
}

/// 2025-01-10, 2025-01-13 두 거래일
const TWO_DAYS: &str = r#"{"chart": {"result": [{
    "timestamp": [1736519400, 1736778600],
    "indicators": {"quote": [{
        "open": [236.0, 233.5],
        "high": [237.25, 234.75],
        "low": [234.5, 229.75],
        "close": [236.75, 234.25],
        "volume": [61710900, 49630700]
    }]}
}], "error": null}}"#;

#[tokio::test]
async fn test_refresh_against_chart_server_is_idempotent() {
    let mut server = mockito::Server::new_async().await;
    // 구간 시작 = 첫 보고 시각(2025-01-10 14:30 UTC) - 1시간
    let chart = server
        .mock("GET", "/v8/finance/chart/AAPL")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("period1".into(), "1736515800".into()),
            Matcher::UrlEncoded("period2".into(), "1736519400".into()),
            Matcher::UrlEncoded("interval".into(), "1d".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(TWO_DAYS)
        .expect(2)
        .create_async()
        .await;

    let store = store_with(&[("AAPL", 0)]).await;
    let clock = Arc::new(ManualClock::new(common::base_time()));
    let config = ScraperConfig {
        base_url: server.url(),
        ..Default::default()
    };
    let scraper: Arc<dyn PriceScraper> = Arc::new(
        YahooChartScraper::new(config, clock.clone(), StdRng::seed_from_u64(42)).unwrap(),
    );

    for _ in 0..2 {
        let stats = refresh(&store, scraper.clone(), &clock)
            .run(&CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(stats.success, 1);
        assert_eq!(stats.total_records, 2);
    }

    chart.assert_async().await;
    assert_eq!(store.price_bar_count().await, 2);

    let stored = store
        .price_bars("AAPL", day(2025, 1, 10), day(2025, 1, 13))
        .await
        .unwrap();
    assert_eq!(stored[0].date, day(2025, 1, 10));
    assert_eq!(stored[1].close, dec!(234.25));
}
