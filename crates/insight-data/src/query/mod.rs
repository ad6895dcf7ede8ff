//! 레이팅 조회 및 추천 랭킹.
//!
//! - 필터/페이지/정렬이 있는 목록 조회 ([`QueryEngine::list`])
//! - 브로커 가중치 기반 buy → hold → sell 추천 ([`QueryEngine::recommendations`])

pub mod memory;
pub mod postgres;
pub mod request;

use async_trait::async_trait;
use insight_core::{RatingEvent, Recommendation, RECOMMENDATIONS_PER_BUCKET};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, instrument};

use crate::error::DataError;

pub use request::{
    ListingOrder, ListingPage, ListingRequest, OrderBy, OrderDir, Pagination, RatingFilter,
    DEFAULT_LIMIT, DEFAULT_PAGE, MAX_LIMIT,
};

/// 조회 오류.
#[derive(Debug, Error)]
pub enum QueryError {
    /// 잘못된 요청 값 (400)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// 저장소 읽기 실패 (500, 부분 결과 없음)
    #[error("Store error: {0}")]
    Store(#[from] DataError),
}

/// 저장소별 조회 구현.
#[async_trait]
pub trait RatingQueries: Send + Sync {
    /// 조건에 맞는 한 페이지와 전체 건수.
    async fn list_ratings(
        &self,
        filter: &RatingFilter,
        pagination: Pagination,
        order: ListingOrder,
    ) -> crate::error::Result<(Vec<RatingEvent>, u64)>;

    /// buy → hold → sell 순서로 버킷마다 가중치 상위 `per_bucket`개.
    async fn recommendations(&self, per_bucket: usize)
        -> crate::error::Result<Vec<Recommendation>>;
}

/// 조회 서비스.
#[derive(Clone)]
pub struct QueryEngine {
    queries: Arc<dyn RatingQueries>,
}

impl QueryEngine {
    pub fn new(queries: Arc<dyn RatingQueries>) -> Self {
        Self { queries }
    }

    /// 쿼리 파라미터로 목록을 조회합니다.
    pub async fn list(&self, request: ListingRequest) -> Result<ListingPage, QueryError> {
        let (filter, pagination, order) = request.into_parts()?;
        self.list_with(&filter, pagination, order).await
    }

    /// 이미 분해된 조건으로 목록을 조회합니다.
    #[instrument(skip(self, filter))]
    pub async fn list_with(
        &self,
        filter: &RatingFilter,
        pagination: Pagination,
        order: ListingOrder,
    ) -> Result<ListingPage, QueryError> {
        let (items, total) = self
            .queries
            .list_ratings(filter, pagination, order)
            .await
            .map_err(|e| {
                error!(error = %e, "레이팅 목록 조회 실패");
                QueryError::Store(e)
            })?;

        Ok(ListingPage::new(pagination, total, items))
    }

    /// 버킷당 10개씩 최대 30개의 추천.
    pub async fn recommendations(&self) -> Result<Vec<Recommendation>, QueryError> {
        self.queries
            .recommendations(RECOMMENDATIONS_PER_BUCKET)
            .await
            .map_err(|e| {
                error!(error = %e, "추천 조회 실패");
                QueryError::Store(e)
            })
    }
}
