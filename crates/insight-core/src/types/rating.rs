//! 애널리스트 레이팅 이벤트 타입.
//!
//! 외부 레이팅 피드에서 수집한 원본 문자열 레이팅은 그대로 보존하고,
//! 고정된 룩업 테이블로 `buy` / `hold` / `sell` 중 하나로 정규화한 값을 함께 저장합니다.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// 정규화된 레이팅.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizedRating {
    Buy,
    Hold,
    Sell,
}

impl NormalizedRating {
    /// 추천 랭킹 출력 순서 (buy → hold → sell).
    pub const ALL: [NormalizedRating; 3] = [Self::Buy, Self::Hold, Self::Sell];

    /// DB 저장용 문자열.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Hold => "hold",
            Self::Sell => "sell",
        }
    }
}

impl fmt::Display for NormalizedRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 저장된 값이 buy/hold/sell 이 아닐 때의 에러.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("알 수 없는 정규화 레이팅: {0}")]
pub struct UnknownRating(pub String);

impl FromStr for NormalizedRating {
    type Err = UnknownRating;

    /// 이미 정규화된 값(`buy`, `hold`, `sell`)만 허용합니다.
    /// 브로커 원본 문자열은 [`normalize_broker_rating`]을 사용하세요.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(Self::Buy),
            "hold" => Ok(Self::Hold),
            "sell" => Ok(Self::Sell),
            other => Err(UnknownRating(other.to_string())),
        }
    }
}

/// 브로커 원본 레이팅 문자열을 buy/hold/sell 로 정규화합니다.
///
/// 대소문자를 무시하고 앞뒤 공백을 제거한 뒤 고정 테이블에서 찾습니다.
/// 테이블에 없는 값과 빈 문자열은 `hold`입니다.
pub fn normalize_broker_rating(raw: &str) -> NormalizedRating {
    let rating = raw.trim().to_lowercase();

    match rating.as_str() {
        "buy" | "strong-buy" | "outperform" | "outperformer" | "market outperform"
        | "mkt outperform" | "overweight" | "positive" | "sector outperform"
        | "speculative buy" | "moderate buy" => NormalizedRating::Buy,

        "sell" | "underweight" | "underperform" | "underperformer" | "sector underperform"
        | "reduce" | "negative" => NormalizedRating::Sell,

        // hold, neutral, equal weight, in-line, market/peer/sector perform, sector weight, ""
        _ => NormalizedRating::Hold,
    }
}

/// 통화 기호 접두사로 허용하는 문자.
const CURRENCY_SYMBOLS: [char; 5] = ['$', '€', '£', '¥', '₩'];

/// 목표가 문자열(예: `"$4.20"`, `"$1,050.00"`)을 숫자로 변환합니다.
///
/// 선행 통화 기호와 천 단위 구분자를 제거합니다. 파싱에 실패하면 0을 반환합니다.
pub fn parse_target_price(raw: &str) -> Decimal {
    let trimmed = raw.trim();
    let without_symbol = trimmed
        .strip_prefix(|c: char| CURRENCY_SYMBOLS.contains(&c))
        .unwrap_or(trimmed)
        .trim_start();
    let cleaned: String = without_symbol.chars().filter(|c| *c != ',').collect();

    Decimal::from_str(&cleaned).unwrap_or(Decimal::ZERO)
}

/// 수집된 레이팅 이벤트 (아직 저장되지 않음, id 없음).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRatingEvent {
    pub ticker: String,
    pub company: String,
    pub brokerage: String,
    pub action: String,
    /// 피드 원본 값
    pub rating_from: String,
    /// 피드 원본 값
    pub rating_to: String,
    pub normalized_rating_from: NormalizedRating,
    pub normalized_rating_to: NormalizedRating,
    pub target_from: Decimal,
    pub target_to: Decimal,
    pub reported_at: DateTime<Utc>,
}

/// 저장된 레이팅 이벤트.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingEvent {
    /// 저장소가 발급한 식별자
    pub id: Uuid,
    pub ticker: String,
    pub company: String,
    pub brokerage: String,
    pub action: String,
    pub rating_from: String,
    pub rating_to: String,
    pub normalized_rating_from: NormalizedRating,
    pub normalized_rating_to: NormalizedRating,
    pub target_from: Decimal,
    pub target_to: Decimal,
    pub reported_at: DateTime<Utc>,
}

impl RatingEvent {
    /// 수집 이벤트에 식별자를 붙여 저장 형식으로 변환합니다.
    pub fn from_new(id: Uuid, event: NewRatingEvent) -> Self {
        Self {
            id,
            ticker: event.ticker,
            company: event.company,
            brokerage: event.brokerage,
            action: event.action,
            rating_from: event.rating_from,
            rating_to: event.rating_to,
            normalized_rating_from: event.normalized_rating_from,
            normalized_rating_to: event.normalized_rating_to,
            target_from: event.target_from,
            target_to: event.target_to,
            reported_at: event.reported_at,
        }
    }
}
