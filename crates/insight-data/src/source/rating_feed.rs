//! 애널리스트 레이팅 피드 HTTP 클라이언트.
//!
//! 응답 형식:
//! ```json
//! { "items": [ { "ticker": "AAPL", "target_from": "$150.00", "time": "2025-01-15T00:30:05Z", ... } ],
//!   "next_page": "AAPL-2025" }
//! ```
//! `next_page`가 비어 있으면 스트림의 끝입니다.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use insight_core::{normalize_broker_rating, parse_target_price, NewRatingEvent};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::{RatingPage, RatingSource};
use crate::error::{DataError, Result};

/// 피드 응답. 필드가 없거나 `null`이면 비어 있는 것으로 취급합니다.
#[derive(Debug, Deserialize)]
struct FeedResponse {
    #[serde(default)]
    items: Option<Vec<FeedItem>>,
    #[serde(default)]
    next_page: Option<String>,
}

/// 피드 항목. 모든 필드는 문자열(또는 `null`)로 내려옵니다.
#[derive(Debug, Deserialize)]
struct FeedItem {
    #[serde(default)]
    ticker: Option<String>,
    #[serde(default)]
    company: Option<String>,
    #[serde(default)]
    brokerage: Option<String>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    rating_from: Option<String>,
    #[serde(default)]
    rating_to: Option<String>,
    #[serde(default)]
    target_from: Option<String>,
    #[serde(default)]
    target_to: Option<String>,
    #[serde(default)]
    time: Option<String>,
}

impl FeedItem {
    /// 수집 이벤트로 변환합니다. 시각을 파싱할 수 없으면 `None`.
    fn into_event(self) -> Option<NewRatingEvent> {
        let ticker = self.ticker.unwrap_or_default();
        let time = self.time.unwrap_or_default();
        let reported_at = match DateTime::parse_from_rfc3339(&time) {
            Ok(ts) => ts.with_timezone(&Utc),
            Err(e) => {
                warn!(
                    ticker = %ticker,
                    time = %time,
                    error = %e,
                    "레이팅 시각 파싱 실패, 항목 건너뜀"
                );
                return None;
            }
        };

        let rating_from = self.rating_from.unwrap_or_default();
        let rating_to = self.rating_to.unwrap_or_default();

        Some(NewRatingEvent {
            normalized_rating_from: normalize_broker_rating(&rating_from),
            normalized_rating_to: normalize_broker_rating(&rating_to),
            target_from: parse_target_price(self.target_from.as_deref().unwrap_or_default()),
            target_to: parse_target_price(self.target_to.as_deref().unwrap_or_default()),
            ticker,
            company: self.company.unwrap_or_default(),
            brokerage: self.brokerage.unwrap_or_default(),
            action: self.action.unwrap_or_default(),
            rating_from,
            rating_to,
            reported_at,
        })
    }
}

/// Bearer 토큰 인증을 사용하는 레이팅 피드 클라이언트.
#[derive(Debug, Clone)]
pub struct HttpRatingSource {
    client: reqwest::Client,
    endpoint: String,
    token: SecretString,
}

impl HttpRatingSource {
    /// 새 클라이언트를 생성합니다.
    pub fn new(endpoint: impl Into<String>, token: SecretString, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DataError::ConfigError(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            token,
        })
    }
}

#[async_trait]
impl RatingSource for HttpRatingSource {
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn fetch_page(&self, cursor: Option<&str>) -> Result<RatingPage> {
        let mut request = self
            .client
            .get(&self.endpoint)
            .bearer_auth(self.token.expose_secret())
            .header("Accept", "application/json");

        if let Some(cursor) = cursor.filter(|c| !c.is_empty()) {
            request = request.query(&[("next_page", cursor)]);
        }

        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DataError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let feed: FeedResponse = serde_json::from_str(&body)?;

        let items = feed.items.unwrap_or_default();
        let received = items.len();
        let events: Vec<NewRatingEvent> = items
            .into_iter()
            .filter_map(FeedItem::into_event)
            .collect();
        let next_cursor = feed.next_page.filter(|c| !c.is_empty());

        debug!(
            received = received,
            accepted = events.len(),
            has_next = next_cursor.is_some(),
            "레이팅 페이지 수신"
        );

        Ok(RatingPage {
            events,
            next_cursor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use insight_core::NormalizedRating;
    use mockito::Matcher;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    const FIRST_PAGE: &str = r#"{
        "items": [
            {
                "ticker": "AAPL",
                "company": "Apple Inc.",
                "brokerage": "Goldman Sachs",
                "action": "upgraded by",
                "rating_from": "Neutral",
                "rating_to": "Buy",
                "target_from": "$150.00",
                "target_to": "$1,190.50",
                "time": "2025-01-15T00:30:05.123456789Z"
            },
            {
                "ticker": "MSFT",
                "company": "Microsoft",
                "brokerage": "Barclays",
                "action": "target lowered by",
                "rating_from": "Overweight",
                "rating_to": "Underweight",
                "target_from": "N/A",
                "target_to": "$410",
                "time": "not-a-time"
            }
        ],
        "next_page": "MSFT-2"
    }"#;

    fn client(server: &mockito::ServerGuard) -> HttpRatingSource {
        HttpRatingSource::new(
            format!("{}/ratings", server.url()),
            SecretString::new("test-token".into()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_page_normalizes_items() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/ratings")
            .match_header("authorization", "Bearer test-token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(FIRST_PAGE)
            .expect(1)
            .create_async()
            .await;

        let page = client(&server).fetch_page(None).await.unwrap();
        mock.assert_async().await;

        // 시각 파싱에 실패한 항목은 제외
        assert_eq!(page.events.len(), 1);
        assert_eq!(page.next_cursor.as_deref(), Some("MSFT-2"));

        let event = &page.events[0];
        assert_eq!(event.ticker, "AAPL");
        assert_eq!(event.rating_from, "Neutral");
        assert_eq!(event.normalized_rating_from, NormalizedRating::Hold);
        assert_eq!(event.normalized_rating_to, NormalizedRating::Buy);
        assert_eq!(event.target_from, dec!(150.00));
        assert_eq!(event.target_to, dec!(1190.50));
    }

    #[tokio::test]
    async fn test_fetch_page_sends_cursor() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/ratings")
            .match_query(Matcher::UrlEncoded("next_page".into(), "MSFT-2".into()))
            .with_status(200)
            .with_body(r#"{"items": [], "next_page": ""}"#)
            .expect(1)
            .create_async()
            .await;

        let page = client(&server).fetch_page(Some("MSFT-2")).await.unwrap();
        mock.assert_async().await;

        assert!(page.events.is_empty());
        assert_eq!(page.next_cursor, None);
    }

    #[tokio::test]
    async fn test_fetch_page_http_error_is_retryable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/ratings")
            .with_status(503)
            .with_body("upstream unavailable")
            .create_async()
            .await;

        let err = client(&server).fetch_page(None).await.unwrap_err();
        assert!(matches!(err, DataError::HttpStatus { status: 503, .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_fetch_page_malformed_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/ratings")
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let err = client(&server).fetch_page(None).await.unwrap_err();
        assert!(matches!(err, DataError::Decode(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_fetch_page_accepts_null_fields() {
        let mut server = mockito::Server::new_async().await;
        // 커서가 있는 요청은 먼저 만든 mock이 응답합니다.
        let second = server
            .mock("GET", "/ratings")
            .match_query(Matcher::UrlEncoded("next_page".into(), "AAPL-9".into()))
            .with_status(200)
            .with_body(r#"{"items": null, "next_page": null}"#)
            .expect(1)
            .create_async()
            .await;
        let first = server
            .mock("GET", "/ratings")
            .with_status(200)
            .with_body(
                r#"{"items": [{
                    "ticker": "BAC",
                    "company": null,
                    "brokerage": "Barclays",
                    "action": null,
                    "rating_from": null,
                    "rating_to": "Overweight",
                    "target_from": null,
                    "target_to": "$52.00",
                    "time": "2025-02-03T13:00:00Z"
                }], "next_page": "AAPL-9"}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let source = client(&server);

        let page = source.fetch_page(None).await.unwrap();
        assert_eq!(page.events.len(), 1);
        let event = &page.events[0];
        assert_eq!(event.company, "");
        assert_eq!(event.rating_from, "");
        assert_eq!(event.normalized_rating_from, NormalizedRating::Hold);
        assert_eq!(event.normalized_rating_to, NormalizedRating::Buy);
        assert_eq!(event.target_from, Decimal::ZERO);
        assert_eq!(event.target_to, dec!(52.00));

        let next = source
            .fetch_page(page.next_cursor.as_deref())
            .await
            .unwrap();
        assert!(next.events.is_empty());
        assert_eq!(next.next_cursor, None);

        first.assert_async().await;
        second.assert_async().await;
    }
}
