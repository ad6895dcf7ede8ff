//! Yahoo Finance 차트 API 일봉 스크래퍼.
//!
//! `GET {base}/v8/finance/chart/{TICKER}?period1=..&period2=..&interval=1d` 를 호출하고
//! 429 응답에는 지수 백오프로 재시도합니다. 그 밖의 실패는 즉시 종료합니다.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use insight_core::{utc_day, PriceBar, YAHOO_SOURCE};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use reqwest::header::USER_AGENT;
use reqwest::{StatusCode, Url};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use super::PriceScraper;
use crate::clock::Clock;
use crate::error::{DataError, Result};

/// 기본 차트 API 주소.
pub const DEFAULT_CHART_BASE_URL: &str = "https://query2.finance.yahoo.com";

/// 요청마다 무작위로 고르는 기본 User-Agent 목록.
pub const DEFAULT_USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64)",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7)",
    "Mozilla/5.0 (X11; Linux x86_64)",
];

/// 스크래퍼 설정.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// 차트 API 주소 (테스트에서는 mock 서버 주소)
    pub base_url: String,
    /// User-Agent 후보 (비어 있으면 안 됨)
    pub user_agents: Vec<String>,
    /// 429 재시도 횟수 (총 시도 = max_retries + 1)
    pub max_retries: u32,
    /// 첫 백오프 대기 시간
    pub initial_backoff: Duration,
    /// 백오프 상한
    pub max_backoff: Duration,
    /// 요청 타임아웃
    pub timeout: Duration,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_CHART_BASE_URL.to_string(),
            user_agents: DEFAULT_USER_AGENTS.iter().map(|ua| ua.to_string()).collect(),
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            timeout: Duration::from_secs(30),
        }
    }
}

// ==================== 응답 구조 ====================

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    indicators: Indicators,
}

#[derive(Debug, Default, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

/// Yahoo는 거래가 없는 날의 값을 `null`로 내려줍니다.
#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<i64>>,
}

// ==================== 스크래퍼 ====================

/// Yahoo 차트 API 스크래퍼.
pub struct YahooChartScraper {
    client: reqwest::Client,
    config: ScraperConfig,
    base_url: Url,
    clock: Arc<dyn Clock>,
    rng: Mutex<StdRng>,
}

impl YahooChartScraper {
    /// 새 스크래퍼를 생성합니다.
    ///
    /// `rng`는 User-Agent 선택에만 사용합니다. 테스트에서는 시드를 고정하세요.
    pub fn new(config: ScraperConfig, clock: Arc<dyn Clock>, rng: StdRng) -> Result<Self> {
        if config.user_agents.is_empty() {
            return Err(DataError::InvalidInput(
                "User-Agent 목록이 비어 있습니다".to_string(),
            ));
        }

        let base_url = Url::parse(&config.base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| {
                DataError::ConfigError(format!("잘못된 차트 API 주소: {}", config.base_url))
            })?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DataError::ConfigError(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(Self {
            client,
            config,
            base_url,
            clock,
            rng: Mutex::new(rng),
        })
    }

    /// 티커는 경로 세그먼트 하나로 인코딩됩니다 (`/`, `?`, `#`, 공백 포함).
    fn chart_url(&self, ticker: &str, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                DataError::ConfigError(format!("잘못된 차트 API 주소: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", ticker]);
        url.query_pairs_mut()
            .append_pair("period1", &from.timestamp().to_string())
            .append_pair("period2", &to.timestamp().to_string())
            .append_pair("interval", "1d")
            .append_pair("events", "history")
            .append_pair("includeAdjustedClose", "true");
        Ok(url)
    }

    fn pick_user_agent(&self) -> String {
        let mut rng = self.rng.lock().unwrap_or_else(|p| p.into_inner());
        self.config
            .user_agents
            .choose(&mut *rng)
            .cloned()
            .unwrap_or_else(|| DEFAULT_USER_AGENTS[0].to_string())
    }

    /// 응답 본문을 일봉 목록으로 변환합니다.
    fn parse_chart(&self, ticker: &str, body: &str) -> Result<Vec<PriceBar>> {
        let trimmed = body.trim_start();
        if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
            return Err(DataError::Decode(format!(
                "{}: JSON이 아닌 응답: {}",
                ticker,
                truncate(body, 120)
            )));
        }

        let response: ChartResponse = serde_json::from_str(trimmed)?;
        if let Some(error) = response.chart.error.filter(|e| !e.is_null()) {
            debug!(ticker = ticker, error = %error, "차트 API 오류 필드 포함");
        }

        let result = response
            .chart
            .result
            .and_then(|results| results.into_iter().next())
            .filter(|r| !r.timestamp.is_empty())
            .ok_or_else(|| DataError::NoData(ticker.to_string()))?;

        let quote = result
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| DataError::NoData(ticker.to_string()))?;

        let rows = [
            result.timestamp.len(),
            quote.open.len(),
            quote.high.len(),
            quote.low.len(),
            quote.close.len(),
            quote.volume.len(),
        ]
        .into_iter()
        .min()
        .unwrap_or(0);

        let scraped_at = self.clock.now();
        let mut bars = Vec::with_capacity(rows);

        for i in 0..rows {
            let ts = result.timestamp[i];
            let values = (
                quote.open[i].and_then(Decimal::from_f64),
                quote.high[i].and_then(Decimal::from_f64),
                quote.low[i].and_then(Decimal::from_f64),
                quote.close[i].and_then(Decimal::from_f64),
                quote.volume[i],
                utc_day(ts),
            );

            let (Some(open), Some(high), Some(low), Some(close), Some(volume), Some(date)) = values
            else {
                debug!(ticker = ticker, timestamp = ts, "null 값이 포함된 행 건너뜀");
                continue;
            };

            bars.push(PriceBar {
                ticker: ticker.to_string(),
                date,
                open,
                high,
                low,
                close,
                volume,
                source: YAHOO_SOURCE.to_string(),
                scraped_at,
            });
        }

        Ok(bars)
    }
}

#[async_trait]
impl PriceScraper for YahooChartScraper {
    #[instrument(skip(self, from, to))]
    async fn get_historical_data(
        &self,
        ticker: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<PriceBar>> {
        let ticker = ticker.trim().to_uppercase();
        if ticker.is_empty() {
            return Err(DataError::InvalidInput("빈 티커".to_string()));
        }

        let url = self.chart_url(&ticker, from, to)?;
        debug!(url = %url, "차트 API 요청");

        let max_retries = self.config.max_retries;
        let mut delay = self.config.initial_backoff;

        for attempt in 0..=max_retries {
            let response = self
                .client
                .get(url.clone())
                .header(USER_AGENT, self.pick_user_agent())
                .send()
                .await
                .map_err(|e| DataError::Network(format!("{}: {}", ticker, e)))?;

            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| DataError::Network(format!("{}: {}", ticker, e)))?;

            if status == StatusCode::TOO_MANY_REQUESTS {
                if attempt == max_retries {
                    warn!(attempts = attempt + 1, "429 재시도 한도 초과");
                    return Err(DataError::RateLimited {
                        target: ticker,
                        attempts: attempt + 1,
                    });
                }

                warn!(
                    attempt = attempt + 1,
                    max_retries = max_retries,
                    delay_ms = delay.as_millis() as u64,
                    "429 응답, 백오프 후 재시도"
                );
                self.clock.sleep(delay).await;
                delay = (delay * 2).min(self.config.max_backoff);
                continue;
            }

            if !status.is_success() {
                return Err(DataError::HttpStatus {
                    status: status.as_u16(),
                    body: truncate(&body, 200),
                });
            }

            let bars = self.parse_chart(&ticker, &body)?;
            info!(bars = bars.len(), attempts = attempt + 1, "일봉 수집 완료");
            return Ok(bars);
        }

        Err(DataError::RateLimited {
            target: ticker,
            attempts: max_retries + 1,
        })
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
