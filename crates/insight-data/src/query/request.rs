//! 목록 조회 요청/응답 타입.
//!
//! 쿼리 파라미터 → [`ListingRequest`] → ([`RatingFilter`], [`Pagination`], [`ListingOrder`]).

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use insight_core::RatingEvent;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::QueryError;

/// 기본 페이지 번호.
pub const DEFAULT_PAGE: u32 = 1;
/// 기본 페이지 크기.
pub const DEFAULT_LIMIT: u32 = 20;
/// 페이지 크기 상한.
pub const MAX_LIMIT: u32 = 500;

// ==================== 필터 ====================

/// 레이팅 이벤트 필터.
///
/// 문자열 필드는 대소문자 무시 부분 일치, 숫자/날짜는 양 끝 포함 범위입니다.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatingFilter {
    pub ticker: Option<String>,
    pub company: Option<String>,
    pub brokerage: Option<String>,
    pub target_from_min: Option<Decimal>,
    pub target_from_max: Option<Decimal>,
    pub target_to_min: Option<Decimal>,
    pub target_to_max: Option<Decimal>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
}

impl RatingFilter {
    /// 이벤트가 모든 조건을 만족하는지 확인합니다.
    pub fn matches(&self, event: &RatingEvent) -> bool {
        contains_ci(&event.ticker, self.ticker.as_deref())
            && contains_ci(&event.company, self.company.as_deref())
            && contains_ci(&event.brokerage, self.brokerage.as_deref())
            && within(event.target_from, self.target_from_min, self.target_from_max)
            && within(event.target_to, self.target_to_min, self.target_to_max)
            && within(event.reported_at, self.date_from, self.date_to)
    }
}

fn contains_ci(value: &str, needle: Option<&str>) -> bool {
    match needle {
        Some(needle) => value.to_lowercase().contains(&needle.to_lowercase()),
        None => true,
    }
}

fn within<T: PartialOrd>(value: T, min: Option<T>, max: Option<T>) -> bool {
    min.map_or(true, |min| value >= min) && max.map_or(true, |max| value <= max)
}

// ==================== 페이지네이션 ====================

/// 페이지 정보. `limit`은 [`MAX_LIMIT`]으로 제한됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: u32,
    limit: u32,
}

impl Pagination {
    pub fn new(page: u32, limit: u32) -> Result<Self, QueryError> {
        if page < 1 {
            return Err(QueryError::InvalidInput(
                "page는 1 이상이어야 합니다".to_string(),
            ));
        }
        if limit < 1 {
            return Err(QueryError::InvalidInput(
                "limit은 1 이상이어야 합니다".to_string(),
            ));
        }
        Ok(Self {
            page,
            limit: limit.min(MAX_LIMIT),
        })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// `(page - 1) * limit`
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }

    /// `ceil(total / limit)`
    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(u64::from(self.limit))
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

// ==================== 정렬 ====================

/// 정렬 컬럼 (허용 목록).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderBy {
    #[default]
    ReportedAt,
    TargetTo,
    TargetFrom,
    Ticker,
}

impl OrderBy {
    /// 허용 목록에 없는 값은 `reported_at`으로 대체합니다.
    pub fn parse_or_default(value: &str) -> Self {
        match value.trim() {
            "target_to" => Self::TargetTo,
            "target_from" => Self::TargetFrom,
            "ticker" => Self::Ticker,
            _ => Self::ReportedAt,
        }
    }

    /// SQL 컬럼명.
    pub fn column(&self) -> &'static str {
        match self {
            Self::ReportedAt => "reported_at",
            Self::TargetTo => "target_to",
            Self::TargetFrom => "target_from",
            Self::Ticker => "ticker",
        }
    }
}

/// 정렬 방향.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDir {
    Asc,
    #[default]
    Desc,
}

impl OrderDir {
    /// "asc"(대소문자 무시)만 오름차순, 나머지는 내림차순.
    pub fn parse_or_default(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("asc") {
            Self::Asc
        } else {
            Self::Desc
        }
    }

    /// SQL 키워드.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// 목록 정렬.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListingOrder {
    pub by: OrderBy,
    pub dir: OrderDir,
}

// ==================== 요청 ====================

/// 목록 조회 요청 (쿼리 파라미터).
///
/// 알 수 없는 키는 거부합니다.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ListingRequest {
    #[validate(range(min = 1, message = "page는 1 이상이어야 합니다"))]
    pub page: Option<u32>,

    #[validate(range(min = 1, message = "limit은 1 이상이어야 합니다"))]
    pub limit: Option<u32>,

    pub ticker: Option<String>,
    pub company: Option<String>,
    pub brokerage: Option<String>,

    pub target_from_min: Option<Decimal>,
    pub target_from_max: Option<Decimal>,
    pub target_to_min: Option<Decimal>,
    pub target_to_max: Option<Decimal>,

    /// RFC3339 시각 또는 YYYY-MM-DD
    #[validate(custom(function = "validate_instant"))]
    pub date_from: Option<String>,

    /// RFC3339 시각 또는 YYYY-MM-DD (날짜만 주면 그날 끝까지 포함)
    #[validate(custom(function = "validate_instant"))]
    pub date_to: Option<String>,

    #[serde(rename = "orderBy")]
    pub order_by: Option<String>,

    #[serde(rename = "orderDir")]
    pub order_dir: Option<String>,
}

fn validate_instant(value: &str) -> Result<(), ValidationError> {
    if parse_instant(value, false).is_none() {
        return Err(ValidationError::new("invalid_date_format")
            .with_message("날짜 형식은 RFC3339 또는 YYYY-MM-DD여야 합니다".into()));
    }
    Ok(())
}

/// RFC3339 시각 또는 YYYY-MM-DD를 파싱합니다.
///
/// 날짜만 주어지면 `end_of_day`에 따라 00:00:00 또는 23:59:59.999999999 UTC입니다.
fn parse_instant(value: &str, end_of_day: bool) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }

    let day = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    let time = if end_of_day {
        NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999)?
    } else {
        NaiveTime::MIN
    };
    Some(day.and_time(time).and_utc())
}

/// 빈 문자열 필터는 없는 것으로 취급합니다.
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ListingRequest {
    /// 검증 후 필터/페이지/정렬로 분해합니다.
    pub fn into_parts(self) -> Result<(RatingFilter, Pagination, ListingOrder), QueryError> {
        if let Err(errors) = self.validate() {
            let message = errors
                .field_errors()
                .iter()
                .flat_map(|(field, errors)| {
                    errors.iter().map(move |e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| format!("{}: 유효하지 않은 값", field))
                    })
                })
                .collect::<Vec<_>>()
                .join("; ");
            return Err(QueryError::InvalidInput(message));
        }

        let pagination = Pagination::new(
            self.page.unwrap_or(DEFAULT_PAGE),
            self.limit.unwrap_or(DEFAULT_LIMIT),
        )?;

        let order = ListingOrder {
            by: self
                .order_by
                .as_deref()
                .map(OrderBy::parse_or_default)
                .unwrap_or_default(),
            dir: self
                .order_dir
                .as_deref()
                .map(OrderDir::parse_or_default)
                .unwrap_or_default(),
        };

        let filter = RatingFilter {
            ticker: non_blank(self.ticker),
            company: non_blank(self.company),
            brokerage: non_blank(self.brokerage),
            target_from_min: self.target_from_min,
            target_from_max: self.target_from_max,
            target_to_min: self.target_to_min,
            target_to_max: self.target_to_max,
            date_from: self.date_from.as_deref().and_then(|v| parse_instant(v, false)),
            date_to: self.date_to.as_deref().and_then(|v| parse_instant(v, true)),
        };

        Ok((filter, pagination, order))
    }
}

// ==================== 응답 ====================

/// 목록 조회 결과.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingPage {
    pub page: u32,
    pub limit: u32,
    /// 필터를 만족하는 전체 건수
    pub total: u64,
    pub total_pages: u64,
    pub items: Vec<RatingEvent>,
}

impl ListingPage {
    pub fn new(pagination: Pagination, total: u64, items: Vec<RatingEvent>) -> Self {
        Self {
            page: pagination.page(),
            limit: pagination.limit(),
            total,
            total_pages: pagination.total_pages(total),
            items,
        }
    }
}
