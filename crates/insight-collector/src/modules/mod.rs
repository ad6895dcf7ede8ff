//! 데이터 수집 모듈.

pub mod price_refresh;
pub mod rating_sync;

pub use price_refresh::PriceRefresh;
pub use rating_sync::RatingSync;
