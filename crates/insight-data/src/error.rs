//! 데이터 모듈 오류 타입.

use thiserror::Error;

/// 데이터 관련 오류.
#[derive(Debug, Error)]
pub enum DataError {
    /// 데이터베이스 연결 오류
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    /// 쿼리 실행 오류
    #[error("Database error: {0}")]
    Database(String),

    /// 레코드를 찾을 수 없음
    #[error("Record not found: {0}")]
    NotFound(String),

    /// 중복 레코드 (고유 제약 조건 위반)
    #[error("Duplicate record: {0}")]
    DuplicateError(String),

    /// 데이터 삽입 오류 (CHECK 제약 등)
    #[error("Insert error: {0}")]
    Insert(String),

    /// 연결 풀 소진
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// 네트워크/전송 오류
    #[error("Network error: {0}")]
    Network(String),

    /// 2xx가 아닌 HTTP 응답
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// 재시도 한도까지 429를 받음
    #[error("Rate limited after {attempts} attempts: {target}")]
    RateLimited { target: String, attempts: u32 },

    /// 응답 본문 디코딩 실패
    #[error("Decode error: {0}")]
    Decode(String),

    /// 응답은 정상이지만 유효한 데이터가 없음
    #[error("No data: {0}")]
    NoData(String),

    /// 잘못된 입력 값
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// 설정 오류
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl DataError {
    /// 같은 요청을 다시 시도하면 성공할 수 있는 오류인지 확인합니다.
    pub fn is_retryable(&self) -> bool {
        match self {
            DataError::ConnectionError(_)
            | DataError::PoolExhausted
            | DataError::Network(_)
            | DataError::RateLimited { .. } => true,
            DataError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<sqlx::Error> for DataError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DataError::NotFound("Row not found".to_string()),
            sqlx::Error::PoolTimedOut => DataError::PoolExhausted,
            sqlx::Error::Io(io_err) => DataError::ConnectionError(io_err.to_string()),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().unwrap_or_default();
                match &*code {
                    // PostgreSQL 고유 제약 조건 위반
                    "23505" => DataError::DuplicateError(db_err.message().to_string()),
                    // CHECK / NOT NULL 위반
                    "23514" | "23502" => DataError::Insert(db_err.message().to_string()),
                    _ => DataError::Database(db_err.message().to_string()),
                }
            }
            _ => DataError::Database(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for DataError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DataError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            DataError::HttpStatus {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            DataError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        DataError::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
