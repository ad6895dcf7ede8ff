//! 메모리 저장소용 쿼리 구현.

use async_trait::async_trait;
use insight_core::{NormalizedRating, RatingEvent, Recommendation};
use std::cmp::Ordering;

use super::request::{ListingOrder, OrderBy, OrderDir, Pagination, RatingFilter};
use super::RatingQueries;
use crate::error::Result;
use crate::storage::InMemoryStore;

fn compare(a: &RatingEvent, b: &RatingEvent, order: ListingOrder) -> Ordering {
    let primary = match order.by {
        OrderBy::ReportedAt => a.reported_at.cmp(&b.reported_at),
        OrderBy::TargetTo => a.target_to.cmp(&b.target_to),
        OrderBy::TargetFrom => a.target_from.cmp(&b.target_from),
        OrderBy::Ticker => a.ticker.cmp(&b.ticker),
    };
    let primary = match order.dir {
        OrderDir::Asc => primary,
        OrderDir::Desc => primary.reverse(),
    };
    primary.then_with(|| a.id.cmp(&b.id))
}

#[async_trait]
impl RatingQueries for InMemoryStore {
    async fn list_ratings(
        &self,
        filter: &RatingFilter,
        pagination: Pagination,
        order: ListingOrder,
    ) -> Result<(Vec<RatingEvent>, u64)> {
        let tables = self.read().await?;

        let mut matched: Vec<&RatingEvent> = tables
            .ratings
            .values()
            .filter(|event| filter.matches(event))
            .collect();
        matched.sort_by(|a, b| compare(a, b, order));

        let total = matched.len() as u64;
        let items = matched
            .into_iter()
            .skip(pagination.offset() as usize)
            .take(pagination.limit() as usize)
            .cloned()
            .collect();

        Ok((items, total))
    }

    async fn recommendations(&self, per_bucket: usize) -> Result<Vec<Recommendation>> {
        let tables = self.read().await?;
        let mut result = Vec::with_capacity(per_bucket * NormalizedRating::ALL.len());

        for rating in NormalizedRating::ALL {
            let mut bucket: Vec<(&RatingEvent, f64)> = tables
                .ratings
                .values()
                .filter(|event| event.normalized_rating_to == rating)
                .filter_map(|event| {
                    tables
                        .broker_weights
                        .get(&event.brokerage)
                        .map(|weight| (event, *weight))
                })
                .collect();

            bucket.sort_by(|(a, wa), (b, wb)| {
                wb.total_cmp(wa)
                    .then_with(|| b.reported_at.cmp(&a.reported_at))
                    .then_with(|| a.id.cmp(&b.id))
            });

            result.extend(bucket.into_iter().take(per_bucket).map(|(event, weight)| {
                Recommendation {
                    ticker: event.ticker.clone(),
                    company: event.company.clone(),
                    brokerage: event.brokerage.clone(),
                    action: event.action.clone(),
                    normalized_rating_from: event.normalized_rating_from,
                    normalized_rating_to: event.normalized_rating_to,
                    weight_score: weight,
                }
            }));
        }

        Ok(result)
    }
}
