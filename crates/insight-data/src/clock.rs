//! 현재 시각과 대기를 추상화한 시계.
//!
//! 재시도 백오프와 티커 간 스로틀은 모두 [`Clock::sleep`]을 통해 대기하므로
//! 테스트에서는 [`ManualClock`]으로 실제 대기 없이 대기 시간을 검증할 수 있습니다.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Mutex;
use std::time::Duration;

/// 시계 추상화.
#[async_trait]
pub trait Clock: Send + Sync {
    /// 현재 UTC 시각.
    fn now(&self) -> DateTime<Utc>;

    /// 주어진 시간만큼 대기합니다.
    async fn sleep(&self, duration: Duration);
}

/// 시스템 시계 (tokio 타이머 사용).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// 수동 시계.
///
/// `sleep`은 즉시 반환하며 요청된 대기 시간을 기록하고 현재 시각을 그만큼 전진시킵니다.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    /// 지금까지 요청된 대기 시간 목록.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// 대기 없이 시각만 전진시킵니다.
    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|p| p.into_inner());
        if let Ok(delta) = chrono::Duration::from_std(duration) {
            *now += delta;
        }
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|p| p.into_inner())
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(duration);
        self.advance(duration);
        tokio::task::yield_now().await;
    }
}
