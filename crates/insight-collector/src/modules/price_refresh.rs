//! 일봉 가격 갱신 모듈.
//!
//! 레이팅 이벤트가 있는 티커마다 보고 기간 `[first - 1h, last]`의 일봉을
//! 스크래핑해 일괄 업서트합니다. 티커 하나의 실패는 다음 티커로 넘어갑니다.

use crate::{CollectionStats, CollectorError, Result};
use insight_core::{ticker_span, TickerCoverage};
use insight_data::{Clock, DataError, PriceScraper, PriceStore, RatingStore};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// 구간 시작을 앞당기는 기본 여유 시간 (시간)
pub const DEFAULT_BACK_PAD_HOURS: i64 = 1;

/// 티커 하나의 처리 결과
enum TickerOutcome {
    Saved { written: usize, skipped: usize },
    Empty,
    Failed,
}

/// 가격 갱신 작업
pub struct PriceRefresh {
    coverage: Arc<dyn RatingStore>,
    scraper: Arc<dyn PriceScraper>,
    prices: Arc<dyn PriceStore>,
    clock: Arc<dyn Clock>,
    throttle: Duration,
    back_pad: chrono::Duration,
}

impl PriceRefresh {
    pub fn new(
        coverage: Arc<dyn RatingStore>,
        scraper: Arc<dyn PriceScraper>,
        prices: Arc<dyn PriceStore>,
        clock: Arc<dyn Clock>,
        throttle: Duration,
    ) -> Self {
        Self {
            coverage,
            scraper,
            prices,
            clock,
            throttle,
            back_pad: chrono::Duration::hours(DEFAULT_BACK_PAD_HOURS),
        }
    }

    /// 모든 티커를 한 번 갱신합니다.
    ///
    /// 커버리지 조회 실패만 실행 전체를 실패시킵니다.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<CollectionStats> {
        let start = Instant::now();
        let mut stats = CollectionStats::new();

        tracing::info!("가격 갱신 시작");

        let coverage = self.coverage.ticker_coverage().await.map_err(|e| {
            tracing::error!(error = %e, "티커 커버리지 조회 실패");
            CollectorError::Data(e)
        })?;

        if coverage.is_empty() {
            tracing::warn!("갱신할 티커가 없습니다");
            stats.elapsed = start.elapsed();
            return Ok(stats);
        }

        tracing::info!(tickers = coverage.len(), "티커 커버리지 조회 완료");

        for (idx, ticker) in coverage.iter().enumerate() {
            if cancel.is_cancelled() {
                tracing::warn!(processed = idx, "취소 요청, 가격 갱신 중단");
                stats.cancelled = true;
                break;
            }

            stats.total += 1;
            tracing::debug!(
                ticker = %ticker.ticker,
                progress = format!("{}/{}", idx + 1, coverage.len()),
                "갱신 시작"
            );

            let outcome = self
                .refresh_ticker(ticker)
                .instrument(ticker_span!("price_refresh", ticker.ticker))
                .await;

            match outcome {
                TickerOutcome::Saved { written, skipped } => {
                    stats.success += 1;
                    stats.total_records += written;
                    stats.skipped_records += skipped;
                }
                TickerOutcome::Empty => stats.empty += 1,
                TickerOutcome::Failed => stats.errors += 1,
            }

            // Rate limiting
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::warn!(processed = idx + 1, "취소 요청, 가격 갱신 중단");
                    stats.cancelled = true;
                    break;
                }
                _ = self.clock.sleep(self.throttle) => {}
            }
        }

        stats.elapsed = start.elapsed();
        Ok(stats)
    }

    async fn refresh_ticker(&self, coverage: &TickerCoverage) -> TickerOutcome {
        let (from, to) = coverage.refresh_window(self.back_pad);

        let bars = match self
            .scraper
            .get_historical_data(&coverage.ticker, from, to)
            .await
        {
            Ok(bars) => bars,
            Err(DataError::NoData(_)) => {
                tracing::info!(from = %from, to = %to, "일봉 데이터 없음");
                return TickerOutcome::Empty;
            }
            Err(e) => {
                tracing::error!(error = %e, "일봉 스크래핑 실패");
                return TickerOutcome::Failed;
            }
        };

        if bars.is_empty() {
            tracing::info!("저장할 일봉 없음");
            return TickerOutcome::Empty;
        }

        match self.prices.upsert_price_bars(&bars).await {
            Ok(report) => {
                tracing::info!(
                    bars = bars.len(),
                    written = report.written,
                    skipped = report.skipped,
                    "일봉 저장 완료"
                );
                TickerOutcome::Saved {
                    written: report.written,
                    skipped: report.skipped,
                }
            }
            Err(e) => {
                tracing::error!(bars = bars.len(), error = %e, "일봉 일괄 저장 실패");
                TickerOutcome::Failed
            }
        }
    }
}
