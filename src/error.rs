// src/error.rs
use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;

use crate::scale::ScaleError;

#[derive(Debug)]
pub enum AppError {
    DatabaseError(sqlx::Error),
    NotFound(String),
    ValidationError(String),
    Conflict(String),
    DeviceUnavailable(String),
    InsufficientStock(String),
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::ValidationError(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        AppError::Conflict(msg.into())
    }

    pub fn device_unavailable(msg: impl Into<String>) -> Self {
        AppError::DeviceUnavailable(msg.into())
    }

    pub fn insufficient_stock(msg: impl Into<String>) -> Self {
        AppError::InsufficientStock(msg.into())
    }

    pub fn db(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::DeviceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InsufficientStock(_) => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match self {
            // Storage internals are never leaked to the client.
            AppError::DatabaseError(ref e) => {
                tracing::error!(error = %e, "database error");
                "Database error occurred".to_string()
            }
            AppError::NotFound(msg)
            | AppError::ValidationError(msg)
            | AppError::Conflict(msg)
            | AppError::DeviceUnavailable(msg)
            | AppError::InsufficientStock(msg) => msg,
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err)
    }
}

impl From<ScaleError> for AppError {
    fn from(err: ScaleError) -> Self {
        AppError::DeviceUnavailable(err.to_string())
    }
}

/// Translates a Postgres unique violation (23505) into a Conflict with a
/// readable message; everything else passes through as a database error.
pub fn map_unique_violation(err: sqlx::Error, message: &str) -> AppError {
    match err {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
            AppError::conflict(message)
        }
        other => other.into(),
    }
}

/// Translates a Postgres foreign-key violation (23503) into a ValidationError.
pub fn map_fk_violation(err: sqlx::Error, message: &str) -> AppError {
    match err {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23503") => {
            AppError::validation(message)
        }
        other => other.into(),
    }
}

/// Translates a foreign-key violation into a Conflict, for deletes whose
/// emptiness guard raced a concurrent insert of a referencing row.
pub fn map_fk_conflict(err: sqlx::Error, message: &str) -> AppError {
    match err {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23503") => {
            AppError::conflict(message)
        }
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(AppError::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::validation("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::conflict("x").status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::device_unavailable("x").status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(AppError::insufficient_stock("x").status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::db(sqlx::Error::PoolClosed).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn response_body_carries_error_field() {
        let resp = AppError::not_found("Material not found").into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let bytes = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Material not found");
    }

    #[tokio::test]
    async fn database_errors_are_not_leaked() {
        let resp = AppError::db(sqlx::Error::PoolClosed).into_response();
        let bytes = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Database error occurred");
    }

    #[test]
    fn unique_violation_passthrough_for_other_errors() {
        let err = map_unique_violation(sqlx::Error::PoolClosed, "dup");
        assert!(matches!(err, AppError::DatabaseError(_)));
    }

    /// Stand-in database error carrying only a SQLSTATE code.
    #[derive(Debug)]
    struct SqlState(&'static str);

    impl std::fmt::Display for SqlState {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "sqlstate {}", self.0)
        }
    }

    impl std::error::Error for SqlState {}

    impl sqlx::error::DatabaseError for SqlState {
        fn message(&self) -> &str {
            "constraint violation"
        }

        fn code(&self) -> Option<std::borrow::Cow<'_, str>> {
            Some(std::borrow::Cow::Borrowed(self.0))
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::Other
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }
    }

    fn db_error(code: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(SqlState(code)))
    }

    #[test]
    fn unique_violation_maps_to_conflict() {
        let err = map_unique_violation(db_error("23505"), "dup");
        assert!(matches!(err, AppError::Conflict(msg) if msg == "dup"));
    }

    #[test]
    fn fk_violation_maps_per_helper() {
        // Same SQLSTATE, two readings: bad reference on writes, racing
        // referencing row on guarded deletes.
        assert!(matches!(
            map_fk_violation(db_error("23503"), "bad ref"),
            AppError::ValidationError(_)
        ));
        assert!(matches!(
            map_fk_conflict(db_error("23503"), "still referenced"),
            AppError::Conflict(_)
        ));
        assert!(matches!(
            map_fk_conflict(sqlx::Error::PoolClosed, "x"),
            AppError::DatabaseError(_)
        ));
    }
}
