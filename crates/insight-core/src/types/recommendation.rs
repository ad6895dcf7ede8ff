//! 추천 랭킹 타입.

use serde::{Deserialize, Serialize};

use super::rating::NormalizedRating;

/// 브로커별 가중치 (외부에서 관리되는 테이블, 조회만 함).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerWeight {
    pub brokerage: String,
    pub weight_score: f64,
}

/// 브로커 가중치로 정렬된 추천 한 건.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub ticker: String,
    pub company: String,
    pub brokerage: String,
    pub action: String,
    pub normalized_rating_from: NormalizedRating,
    pub normalized_rating_to: NormalizedRating,
    pub weight_score: f64,
}

/// 레이팅 버킷별 추천 건수.
pub const RECOMMENDATIONS_PER_BUCKET: usize = 10;
