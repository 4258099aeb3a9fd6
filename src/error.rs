use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::error::Error;
use std::fmt;

/// Failures surfaced by the repositories.
///
/// Absence is not an error at this layer: lookups, updates and deletes return
/// `Option` and `None` means the id matched no row.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// Foreign key, uniqueness, not-null or check constraint rejected the write.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
    /// The store could not be reached or the pool is exhausted.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    /// Filesystem failure while storing an image payload.
    #[error("I/O failure: {0}")]
    Io(String),
    /// Any other query failure, including undecodable rows.
    #[error("query failed: {0}")]
    Query(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        use sqlx::error::ErrorKind;
        match err {
            sqlx::Error::Database(db_err) => {
                let constraint = matches!(
                    db_err.kind(),
                    ErrorKind::ForeignKeyViolation
                        | ErrorKind::UniqueViolation
                        | ErrorKind::NotNullViolation
                        | ErrorKind::CheckViolation
                ) || is_sqlite_constraint(db_err.code().as_deref());
                if constraint {
                    RepositoryError::ConstraintViolation(db_err.message().to_string())
                } else {
                    RepositoryError::Query(db_err.message().to_string())
                }
            }
            sqlx::Error::PoolTimedOut => {
                RepositoryError::StorageUnavailable("database connection pool timed out".to_string())
            }
            sqlx::Error::PoolClosed => RepositoryError::StorageUnavailable("database pool is closed".to_string()),
            sqlx::Error::Io(e) => RepositoryError::StorageUnavailable(e.to_string()),
            _ => RepositoryError::Query(err.to_string()),
        }
    }
}

/// True for any extended SQLite result code whose primary code is `SQLITE_CONSTRAINT` (19).
///
/// sqlx only names a few extended codes; trigger and restrict failures (e.g. 1811) come back as `Other`.
pub fn is_sqlite_constraint(code: Option<&str>) -> bool {
    code.and_then(|c| c.parse::<i32>().ok()).map(|c| (c & 0xff) == 19).unwrap_or(false)
}

impl From<std::io::Error> for RepositoryError {
    fn from(err: std::io::Error) -> Self {
        RepositoryError::Io(format!("{}: {}", err.kind(), err))
    }
}

/// The primary error type of the HTTP layer.
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    /// The store rejected a write, e.g. an unknown region id.
    Conflict(String),
    ServiceUnavailable(String),
    Database(String),
    InvalidInput(String),
    Unauthorized(String),
    /// Authenticated, but missing the role the operation needs.
    Forbidden(String),
    PayloadTooLarge(String),
    RateLimited {
        retry_after_seconds: u64,
    },
    ValidationError {
        field: String,
        message: String,
    },
    IoError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
            AppError::Database(msg) => write!(f, "Database error: {}", msg),
            AppError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::PayloadTooLarge(msg) => write!(f, "Payload too large: {}", msg),
            AppError::RateLimited { retry_after_seconds } => {
                write!(f, "Rate limited. Retry after {} seconds", retry_after_seconds)
            }
            AppError::ValidationError { field, message } => {
                write!(f, "Validation error on field '{}': {}", field, message)
            }
            AppError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, error_message, details) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg, None),
            AppError::Conflict(msg) => {
                tracing::warn!("Constraint violation: {}", msg);
                (StatusCode::CONFLICT, "CONFLICT", msg, None)
            }
            AppError::ServiceUnavailable(msg) => {
                tracing::warn!("Service unavailable: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", msg, None)
            }
            AppError::Database(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                    Some(json!({ "details": msg })),
                )
            }
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, "INVALID_INPUT", msg, None),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg, None),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg, None),
            AppError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, "PAYLOAD_TOO_LARGE", msg, None),
            AppError::RateLimited { retry_after_seconds } => (
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
                format!("Too many requests. Please retry after {} seconds", retry_after_seconds),
                Some(json!({ "retry_after_seconds": retry_after_seconds })),
            ),
            AppError::ValidationError { field, message } => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                format!("Validation failed for field '{}'", field),
                Some(json!({ "field": field, "message": message })),
            ),
            AppError::IoError(msg) => {
                tracing::error!("I/O error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "IO_ERROR",
                    "An I/O error occurred".to_string(),
                    Some(json!({ "details": msg })),
                )
            }
        };

        let mut body = json!({
            "error": {
                "code": error_code,
                "message": error_message,
            },
            "status": status.as_u16(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        if let Some(details) = details {
            body["error"]["details"] = details;
        }

        (status, Json(body)).into_response()
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::ConstraintViolation(msg) => AppError::Conflict(msg),
            RepositoryError::StorageUnavailable(msg) => AppError::ServiceUnavailable(msg),
            RepositoryError::Io(msg) => AppError::IoError(msg),
            RepositoryError::Query(msg) => AppError::Database(msg),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        RepositoryError::from(err).into()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(format!("{}: {}", err.kind(), err))
    }
}

pub type AppResult<T> = Result<T, AppError>;

/// Turns the repositories' not-found sentinel into a 404 at the boundary.
pub trait OptionExt<T> {
    fn ok_or_not_found(self, entity: &str) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self, entity: &str) -> AppResult<T> {
        self.ok_or_else(|| AppError::NotFound(format!("{} not found", entity)))
    }
}
