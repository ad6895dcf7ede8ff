//! # Insight Core
//!
//! 애널리스트 레이팅 변경 이벤트와 일봉 가격 데이터를 다루는 핵심 도메인 타입을 제공합니다.
//!
//! - 레이팅 이벤트 (수집 형식 / 저장 형식)
//! - 브로커 레이팅 정규화 (buy / hold / sell)
//! - 일봉 OHLCV 가격 바와 티커 커버리지
//! - 추천 랭킹 결과 타입
//! - 로깅 인프라

pub mod logging;
pub mod types;

pub use logging::*;
pub use types::*;
