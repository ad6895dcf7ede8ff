//! 외부 데이터 소스.
//!
//! - [`HttpRatingSource`]: 커서 기반 애널리스트 레이팅 피드
//! - [`YahooChartScraper`]: Yahoo 차트 API 일봉 스크래퍼 (429 재시도)

pub mod rating_feed;
pub mod yahoo_chart;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use insight_core::{NewRatingEvent, PriceBar};

use crate::error::Result;

pub use rating_feed::HttpRatingSource;
pub use yahoo_chart::{ScraperConfig, YahooChartScraper, DEFAULT_USER_AGENTS};

/// 레이팅 피드 한 페이지.
#[derive(Debug, Clone, Default)]
pub struct RatingPage {
    pub events: Vec<NewRatingEvent>,
    /// 다음 페이지 커서 (`None`이면 스트림 끝)
    pub next_cursor: Option<String>,
}

/// 커서 기반 레이팅 소스.
#[async_trait]
pub trait RatingSource: Send + Sync {
    /// 한 페이지를 가져옵니다. `cursor`가 `None`이면 처음부터 시작합니다.
    async fn fetch_page(&self, cursor: Option<&str>) -> Result<RatingPage>;
}

/// 일봉 가격 스크래퍼.
#[async_trait]
pub trait PriceScraper: Send + Sync {
    /// `[from, to]` 구간의 일봉을 가져옵니다.
    async fn get_historical_data(
        &self,
        ticker: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<PriceBar>>;
}
