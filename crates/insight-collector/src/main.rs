//! Stock Insight 수집기 CLI.

use clap::{Parser, Subcommand};
use insight_collector::modules::{PriceRefresh, RatingSync};
use insight_collector::{CollectorConfig, Result};
use insight_core::{init_logging, LogConfig, LogFormat};
use insight_data::{Clock, HttpRatingSource, PgStore, SystemClock, YahooChartScraper};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "insight-collector")]
#[command(about = "Stock Insight Rating & Price Collector", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// 로그 형식 (pretty, json, compact)
    #[arg(long, default_value = "pretty")]
    log_format: LogFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// 애널리스트 레이팅 피드 동기화
    SyncRatings,

    /// 레이팅 보고 기간의 일봉 가격 갱신
    RefreshPrices,

    /// 전체 워크플로우 실행 (레이팅 동기화 → 가격 갱신)
    RunAll,
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // 로깅 초기화
    init_logging(LogConfig::for_crates(&cli.log_level).with_format(cli.log_format))?;

    tracing::info!("Stock Insight Collector 시작");

    // 설정 로드
    let config = CollectorConfig::from_env()?;
    tracing::debug!(
        throttle_ms = config.price_refresh.throttle_ms,
        environment = %config.rating_sync.environment,
        "설정 로드 완료"
    );

    // DB 연결
    let store = Arc::new(PgStore::connect(&config.database()).await?);
    tracing::info!("데이터베이스 연결 성공");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // Ctrl-C 시 현재 패스를 단위 경계에서 멈춤
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("종료 신호 수신, 현재 작업 정리 중...");
                cancel.cancel();
            }
        });
    }

    match cli.command {
        Commands::SyncRatings => {
            let stats = rating_sync(&config, &store, &clock)?.run(&cancel).await?;
            stats.log_summary("레이팅 동기화");
        }
        Commands::RefreshPrices => {
            let stats = price_refresh(&config, &store, &clock)?.run(&cancel).await?;
            stats.log_summary("가격 갱신");
        }
        Commands::RunAll => {
            tracing::info!("=== 전체 워크플로우 시작 ===");

            // 1. 레이팅 동기화
            tracing::info!("Step 1/2: 레이팅 동기화");
            let sync_stats = rating_sync(&config, &store, &clock)?.run(&cancel).await?;
            sync_stats.log_summary("레이팅 동기화");

            // 2. 가격 갱신
            if cancel.is_cancelled() {
                tracing::warn!("취소되어 가격 갱신을 건너뜁니다");
            } else {
                tracing::info!("Step 2/2: 가격 갱신");
                let refresh_stats = price_refresh(&config, &store, &clock)?.run(&cancel).await?;
                refresh_stats.log_summary("가격 갱신");
            }

            tracing::info!("=== 전체 워크플로우 완료 ===");
        }
    }

    store.pool().close().await;
    tracing::info!("Stock Insight Collector 종료");

    Ok(())
}

fn rating_sync(
    config: &CollectorConfig,
    store: &Arc<PgStore>,
    clock: &Arc<dyn Clock>,
) -> Result<RatingSync> {
    let (endpoint, token) = config.rating_sync.credentials()?;
    let source = HttpRatingSource::new(endpoint, token, config.http_timeout())?;

    Ok(
        RatingSync::new(Arc::new(source), store.clone(), clock.clone())
            .with_page_delay(config.rating_sync.page_delay()),
    )
}

fn price_refresh(
    config: &CollectorConfig,
    store: &Arc<PgStore>,
    clock: &Arc<dyn Clock>,
) -> Result<PriceRefresh> {
    let scraper = YahooChartScraper::new(
        config.scraper_config(),
        clock.clone(),
        StdRng::from_entropy(),
    )?;

    Ok(PriceRefresh::new(
        store.clone(),
        Arc::new(scraper),
        store.clone(),
        clock.clone(),
        config.price_refresh.throttle(),
    ))
}
