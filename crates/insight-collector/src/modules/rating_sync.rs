//! 레이팅 피드 동기화 모듈.
//!
//! 커서가 빌 때까지 페이지를 가져와 이벤트마다 업서트합니다.
//! 개별 이벤트 저장 실패는 로그만 남기고 계속 진행하며,
//! 페이지 조회 실패는 커서를 진행할 수 없으므로 실행 전체를 중단합니다.

use crate::{CollectionStats, CollectorError, Result};
use insight_data::{Clock, RatingSource, RatingStore};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// 레이팅 동기화 작업
pub struct RatingSync {
    source: Arc<dyn RatingSource>,
    store: Arc<dyn RatingStore>,
    clock: Arc<dyn Clock>,
    page_delay: Option<Duration>,
}

impl RatingSync {
    pub fn new(
        source: Arc<dyn RatingSource>,
        store: Arc<dyn RatingStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            store,
            clock,
            page_delay: None,
        }
    }

    /// 페이지 사이 대기 시간 설정 (dev 환경)
    pub fn with_page_delay(mut self, page_delay: Option<Duration>) -> Self {
        self.page_delay = page_delay;
        self
    }

    /// 피드 전체를 한 번 동기화합니다.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<CollectionStats> {
        let start = Instant::now();
        let mut stats = CollectionStats::new();
        let mut cursor: Option<String> = None;

        tracing::info!("레이팅 동기화 시작");

        loop {
            if cancel.is_cancelled() {
                tracing::warn!(pages = stats.pages, "취소 요청, 레이팅 동기화 중단");
                stats.cancelled = true;
                break;
            }

            let page = self
                .source
                .fetch_page(cursor.as_deref())
                .await
                .map_err(|e| {
                    tracing::error!(
                        page = stats.pages + 1,
                        cursor = cursor.as_deref().unwrap_or(""),
                        error = %e,
                        retryable = e.is_retryable(),
                        "레이팅 페이지 조회 실패"
                    );
                    CollectorError::Data(e)
                })?;
            stats.pages += 1;

            for event in &page.events {
                stats.total += 1;

                match self.store.upsert_rating(event).await {
                    Ok(id) => {
                        stats.success += 1;
                        stats.total_records += 1;
                        tracing::debug!(
                            ticker = %event.ticker,
                            reported_at = %event.reported_at,
                            id = %id,
                            "레이팅 저장"
                        );
                    }
                    Err(e) => {
                        stats.errors += 1;
                        tracing::warn!(
                            ticker = %event.ticker,
                            reported_at = %event.reported_at,
                            error = %e,
                            "레이팅 저장 실패, 건너뜀"
                        );
                    }
                }
            }

            tracing::info!(
                page = stats.pages,
                events = page.events.len(),
                saved = stats.total_records,
                "레이팅 페이지 처리 완료"
            );

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }

            if let Some(delay) = self.page_delay {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::warn!(pages = stats.pages, "취소 요청, 레이팅 동기화 중단");
                        stats.cancelled = true;
                        break;
                    }
                    _ = self.clock.sleep(delay) => {}
                }
            }
        }

        stats.elapsed = start.elapsed();
        Ok(stats)
    }
}
