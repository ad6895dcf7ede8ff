//! PostgreSQL 동적 쿼리.
//!
//! 모든 값은 `push_bind`로 바인딩하고, SQL 텍스트로 들어가는 식별자는
//! [`OrderBy::column`] / [`OrderDir::keyword`] 허용 목록뿐입니다.

use async_trait::async_trait;
use insight_core::{NormalizedRating, RatingEvent, Recommendation};
use sqlx::{FromRow, Postgres, QueryBuilder};
use tracing::{debug, instrument};

use super::request::{ListingOrder, Pagination, RatingFilter};
use super::RatingQueries;
use crate::error::Result;
use crate::storage::postgres::{parse_normalized, RatingEventRow};
use crate::storage::PgStore;

const RATING_COLUMNS: &str = "id, ticker, company, brokerage, action, rating_from, rating_to, \
     normalized_rating_from, normalized_rating_to, target_from, target_to, reported_at";

/// ILIKE 패턴 특수문자(`%`, `_`, `\`)를 이스케이프하고 양쪽에 `%`를 붙입니다.
pub(crate) fn like_pattern(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('%');
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// WHERE 조건 추가 (기본 쿼리는 `WHERE 1=1`로 끝나야 함).
fn add_filter_conditions(builder: &mut QueryBuilder<'_, Postgres>, filter: &RatingFilter) {
    let text_filters = [
        ("ticker", &filter.ticker),
        ("company", &filter.company),
        ("brokerage", &filter.brokerage),
    ];
    for (column, value) in text_filters {
        if let Some(value) = value {
            builder.push(format!(" AND {} ILIKE ", column));
            builder.push_bind(like_pattern(value));
        }
    }

    let numeric_filters = [
        ("target_from >= ", filter.target_from_min),
        ("target_from <= ", filter.target_from_max),
        ("target_to >= ", filter.target_to_min),
        ("target_to <= ", filter.target_to_max),
    ];
    for (condition, value) in numeric_filters {
        if let Some(value) = value {
            builder.push(" AND ");
            builder.push(condition);
            builder.push_bind(value);
        }
    }

    if let Some(from) = filter.date_from {
        builder.push(" AND reported_at >= ");
        builder.push_bind(from);
    }
    if let Some(to) = filter.date_to {
        builder.push(" AND reported_at <= ");
        builder.push_bind(to);
    }
}

/// 목록 쿼리.
pub(crate) fn build_listing_query(
    filter: &RatingFilter,
    pagination: Pagination,
    order: ListingOrder,
) -> QueryBuilder<'static, Postgres> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
        "SELECT {} FROM rating_events WHERE 1=1",
        RATING_COLUMNS
    ));
    add_filter_conditions(&mut builder, filter);

    builder.push(" ORDER BY ");
    builder.push(order.by.column());
    builder.push(" ");
    builder.push(order.dir.keyword());
    // 같은 값끼리 페이지 경계가 흔들리지 않도록 id로 고정
    builder.push(", id ASC");

    builder.push(" LIMIT ");
    builder.push_bind(i64::from(pagination.limit()));
    builder.push(" OFFSET ");
    builder.push_bind(pagination.offset() as i64);

    builder
}

/// 전체 건수 쿼리 (목록과 같은 조건).
pub(crate) fn build_count_query(filter: &RatingFilter) -> QueryBuilder<'static, Postgres> {
    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT COUNT(*) FROM rating_events WHERE 1=1");
    add_filter_conditions(&mut builder, filter);
    builder
}

/// 버킷별 상위 N개를 UNION ALL로 이어 붙인 추천 쿼리.
fn build_recommendation_query(per_bucket: usize) -> QueryBuilder<'static, Postgres> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("");

    for (i, rating) in NormalizedRating::ALL.iter().enumerate() {
        if i > 0 {
            builder.push(" UNION ALL ");
        }
        builder.push(
            "(SELECT r.ticker, r.company, r.brokerage, r.action, \
             r.normalized_rating_from, r.normalized_rating_to, b.weight_score, \
             r.reported_at, r.id, ",
        );
        builder.push(format!("{} AS bucket", i));
        builder.push(
            " FROM rating_events r \
             JOIN broker_weights b ON b.brokerage = r.brokerage \
             WHERE r.normalized_rating_to = ",
        );
        builder.push_bind(rating.as_str());
        builder.push(" ORDER BY b.weight_score DESC, r.reported_at DESC, r.id ASC LIMIT ");
        builder.push_bind(per_bucket as i64);
        builder.push(")");
    }
    builder.push(" ORDER BY bucket ASC, weight_score DESC, reported_at DESC, id ASC");

    builder
}

#[derive(Debug, FromRow)]
struct RecommendationRow {
    ticker: String,
    company: String,
    brokerage: String,
    action: String,
    normalized_rating_from: String,
    normalized_rating_to: String,
    weight_score: f64,
}

#[async_trait]
impl RatingQueries for PgStore {
    #[instrument(skip(self, filter))]
    async fn list_ratings(
        &self,
        filter: &RatingFilter,
        pagination: Pagination,
        order: ListingOrder,
    ) -> Result<(Vec<RatingEvent>, u64)> {
        let rows: Vec<RatingEventRow> = build_listing_query(filter, pagination, order)
            .build_query_as()
            .fetch_all(self.pool())
            .await?;

        let (total,): (i64,) = build_count_query(filter)
            .build_query_as()
            .fetch_one(self.pool())
            .await?;

        let items = rows
            .into_iter()
            .map(RatingEvent::try_from)
            .collect::<Result<Vec<_>>>()?;

        debug!(items = items.len(), total = total, "레이팅 목록 조회");
        Ok((items, total.max(0) as u64))
    }

    async fn recommendations(&self, per_bucket: usize) -> Result<Vec<Recommendation>> {
        let rows: Vec<RecommendationRow> = build_recommendation_query(per_bucket)
            .build_query_as()
            .fetch_all(self.pool())
            .await?;

        rows.into_iter()
            .map(|r| {
                Ok(Recommendation {
                    normalized_rating_from: parse_normalized(&r.normalized_rating_from)?,
                    normalized_rating_to: parse_normalized(&r.normalized_rating_to)?,
                    ticker: r.ticker,
                    company: r.company,
                    brokerage: r.brokerage,
                    action: r.action,
                    weight_score: r.weight_score,
                })
            })
            .collect()
    }
}
