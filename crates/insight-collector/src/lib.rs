//! Stock Insight 수집기.
//!
//! 이 crate는 조회 계층과 독립적으로 데이터를 수집하는 바이너리를 제공합니다:
//! - 애널리스트 레이팅 피드 동기화 (커서 페이지네이션)
//! - 레이팅 보고 기간에 맞춘 일봉 가격 갱신 (Yahoo 차트)

pub mod config;
pub mod error;
pub mod modules;
pub mod stats;

pub use config::CollectorConfig;
pub use error::{CollectorError, Result};
pub use stats::CollectionStats;
