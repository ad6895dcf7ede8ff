//! 레이팅/가격 데이터 수집과 조회.
//!
//! 이 crate는 다음을 제공합니다:
//! - 커서 기반 애널리스트 레이팅 피드 클라이언트
//! - 429 재시도를 지원하는 Yahoo 차트 일봉 스크래퍼
//! - 멱등 업서트 저장소 (PostgreSQL, 메모리)
//! - 동적 필터/페이지/정렬 목록 조회와 추천 랭킹

pub mod clock;
pub mod error;
pub mod query;
pub mod source;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{DataError, Result};

// 데이터 소스 재내보내기
pub use source::{
    HttpRatingSource, PriceScraper, RatingPage, RatingSource, ScraperConfig, YahooChartScraper,
    DEFAULT_USER_AGENTS,
};
pub use source::yahoo_chart::DEFAULT_CHART_BASE_URL;

// 저장소 재내보내기
pub use storage::postgres::DatabaseConfig;
pub use storage::{BulkUpsertReport, InMemoryStore, PgStore, PriceStore, RatingStore};

// 조회 재내보내기
pub use query::{
    ListingOrder, ListingPage, ListingRequest, OrderBy, OrderDir, Pagination, QueryEngine,
    QueryError, RatingFilter, RatingQueries,
};
