use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

/// Errors surfaced by the HTTP layer. Each variant maps to exactly one status code.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),
    #[error("Not authenticated")]
    Unauthenticated,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(&'static str),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Internal(e) => {
                error!(error = ?e, "internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// Store-level failures. Constraint violations are kept apart from connectivity and
/// driver errors so callers can answer 409 instead of 500.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("unique constraint violated: {constraint}")]
    Conflict { constraint: String },
    #[error("database error")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for RepoError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                return RepoError::Conflict {
                    constraint: db_err.constraint().unwrap_or_default().to_string(),
                };
            }
        }
        RepoError::Database(e)
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::Conflict { .. } => AppError::Conflict("Resource already exists"),
            RepoError::Database(e) => AppError::Internal(anyhow::Error::new(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_of(err: AppError) -> (StatusCode, serde_json::Value) {
        let res = err.into_response();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn maps_taxonomy_to_status_codes() {
        assert_eq!(
            body_of(AppError::validation("bad")).await.0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            body_of(AppError::Unauthenticated).await.0,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            body_of(AppError::NotFound("Profile not found")).await.0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            body_of(AppError::Conflict("taken")).await.0,
            StatusCode::CONFLICT
        );
    }

    #[tokio::test]
    async fn internal_errors_hide_details() {
        let (status, body) =
            body_of(AppError::Internal(anyhow::anyhow!("connection refused on 10.0.0.3"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal server error");
    }

    #[test]
    fn non_constraint_sqlx_errors_are_database_errors() {
        let err = RepoError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, RepoError::Database(_)));
    }
}
