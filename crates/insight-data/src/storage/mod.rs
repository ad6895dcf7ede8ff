//! 레이팅 이벤트와 일봉의 업서트 저장소.
//!
//! - [`PgStore`]: PostgreSQL (sqlx)
//! - [`InMemoryStore`]: 테스트/로컬 실행용 메모리 저장소 (같은 고유 키와 CHECK 제약을 검사)

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::NaiveDate;
use insight_core::{NewRatingEvent, PriceBar, TickerCoverage};
use uuid::Uuid;

use crate::error::Result;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

/// 일괄 업서트 결과.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkUpsertReport {
    /// 저장된 행 수
    pub written: usize,
    /// 행 단위 오류로 건너뛴 수
    pub skipped: usize,
}

/// 레이팅 이벤트 저장소.
#[async_trait]
pub trait RatingStore: Send + Sync {
    /// (ticker, reported_at) 기준으로 삽입 또는 갱신하고 저장된 id를 반환합니다.
    ///
    /// 이미 존재하는 키라면 id와 reported_at을 제외한 모든 필드를 덮어씁니다.
    async fn upsert_rating(&self, event: &NewRatingEvent) -> Result<Uuid>;

    /// 티커별 reported_at 최소/최대 (티커 오름차순).
    async fn ticker_coverage(&self) -> Result<Vec<TickerCoverage>>;
}

/// 일봉 저장소.
#[async_trait]
pub trait PriceStore: Send + Sync {
    /// 한 트랜잭션으로 일괄 업서트합니다.
    ///
    /// 개별 행 오류는 로그를 남기고 건너뛰며 나머지는 커밋합니다.
    /// 트랜잭션 시작/커밋 실패 시에는 아무것도 저장되지 않습니다.
    async fn upsert_price_bars(&self, bars: &[PriceBar]) -> Result<BulkUpsertReport>;

    /// `[from, to]` 구간의 일봉을 날짜 오름차순으로 조회합니다.
    async fn price_bars(&self, ticker: &str, from: NaiveDate, to: NaiveDate)
        -> Result<Vec<PriceBar>>;
}
