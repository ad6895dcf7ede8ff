//! 환경변수 기반 설정 모듈.

use crate::error::CollectorError;
use crate::Result;
use insight_data::{DatabaseConfig, ScraperConfig, DEFAULT_CHART_BASE_URL, DEFAULT_USER_AGENTS};
use secrecy::SecretString;
use std::time::Duration;

/// Collector 전체 설정
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// 데이터베이스 URL
    pub database_url: String,
    /// 풀의 최대 연결 수
    pub database_max_connections: u32,
    /// 풀 연결 획득 타임아웃 (초)
    pub database_connect_timeout_secs: u64,
    /// 레이팅 동기화 설정
    pub rating_sync: RatingSyncConfig,
    /// 가격 갱신 설정
    pub price_refresh: PriceRefreshConfig,
    /// 차트 스크래퍼 설정
    pub scraper: ScraperSettings,
    /// HTTP 요청 타임아웃 (초)
    pub http_timeout_secs: u64,
}

/// 레이팅 동기화 설정
#[derive(Debug, Clone)]
pub struct RatingSyncConfig {
    /// 레이팅 피드 주소 (sync-ratings 실행 시 필수)
    pub endpoint: Option<String>,
    /// Bearer 토큰 (sync-ratings 실행 시 필수)
    pub token: Option<SecretString>,
    /// 실행 환경 (`dev`이면 페이지 사이에 대기)
    pub environment: String,
    /// dev 환경의 페이지 간 딜레이 (밀리초)
    pub page_delay_ms: u64,
}

/// 가격 갱신 설정
#[derive(Debug, Clone)]
pub struct PriceRefreshConfig {
    /// 티커 간 딜레이 (밀리초)
    pub throttle_ms: u64,
}

/// 차트 스크래퍼 설정
#[derive(Debug, Clone)]
pub struct ScraperSettings {
    /// 차트 API 주소
    pub base_url: String,
    /// User-Agent 후보
    pub user_agents: Vec<String>,
    /// 429 재시도 횟수
    pub max_retries: u32,
    /// 첫 백오프 (밀리초)
    pub initial_backoff_ms: u64,
}

impl CollectorConfig {
    /// 환경변수에서 설정 로드
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL").map_err(|_| {
            CollectorError::Config("DATABASE_URL 환경변수가 설정되지 않았습니다".to_string())
        })?;

        Ok(Self {
            database_url,
            database_max_connections: env_var_parse("DATABASE_MAX_CONNECTIONS", 5),
            database_connect_timeout_secs: env_var_parse("DATABASE_CONNECT_TIMEOUT_SECS", 30),
            rating_sync: RatingSyncConfig {
                endpoint: env_var_opt("RATING_API_ENDPOINT"),
                token: env_var_opt("RATING_API_TOKEN").map(|t| SecretString::new(t.into())),
                environment: std::env::var("ENVIRONMENT").unwrap_or_default(),
                page_delay_ms: env_var_parse("RATING_PAGE_DELAY_MS", 500),
            },
            price_refresh: PriceRefreshConfig {
                throttle_ms: env_var_parse("THROTTLE_MS", 500),
            },
            scraper: ScraperSettings {
                base_url: env_var_opt("CHART_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_CHART_BASE_URL.to_string()),
                user_agents: env_var_opt("SCRAPER_USER_AGENTS")
                    .map(|v| parse_list(&v))
                    .filter(|list| !list.is_empty())
                    .unwrap_or_else(|| DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect()),
                max_retries: env_var_parse("SCRAPER_MAX_RETRIES", 3),
                initial_backoff_ms: env_var_parse("SCRAPER_INITIAL_BACKOFF_MS", 1000),
            },
            http_timeout_secs: env_var_parse("HTTP_TIMEOUT_SECS", 30),
        })
    }

    /// 데이터베이스 연결 설정
    pub fn database(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.database_url.clone(),
            max_connections: self.database_max_connections,
            connect_timeout_secs: self.database_connect_timeout_secs,
        }
    }

    /// HTTP 요청 타임아웃을 Duration으로 반환
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// 스크래퍼 설정으로 변환
    pub fn scraper_config(&self) -> ScraperConfig {
        ScraperConfig {
            base_url: self.scraper.base_url.clone(),
            user_agents: self.scraper.user_agents.clone(),
            max_retries: self.scraper.max_retries,
            initial_backoff: Duration::from_millis(self.scraper.initial_backoff_ms),
            timeout: self.http_timeout(),
            ..Default::default()
        }
    }
}

impl RatingSyncConfig {
    /// 피드 주소와 토큰 (둘 중 하나라도 없으면 설정 오류)
    pub fn credentials(&self) -> Result<(String, SecretString)> {
        let endpoint = self.endpoint.clone().ok_or_else(|| {
            CollectorError::Config("RATING_API_ENDPOINT 환경변수가 설정되지 않았습니다".to_string())
        })?;
        let token = self.token.clone().ok_or_else(|| {
            CollectorError::Config("RATING_API_TOKEN 환경변수가 설정되지 않았습니다".to_string())
        })?;
        Ok((endpoint, token))
    }

    /// 페이지 간 딜레이 (dev 환경에서만)
    pub fn page_delay(&self) -> Option<Duration> {
        (self.environment == "dev").then(|| Duration::from_millis(self.page_delay_ms))
    }
}

impl PriceRefreshConfig {
    /// 티커 간 딜레이를 Duration으로 반환
    pub fn throttle(&self) -> Duration {
        Duration::from_millis(self.throttle_ms)
    }
}

/// 환경변수에서 값을 파싱 (실패 시 기본값 사용)
fn env_var_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// 비어 있지 않은 환경변수 값
fn env_var_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// 쉼표로 구분된 목록
fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
