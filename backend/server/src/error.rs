use axum::{
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use registry::RegistryError;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload")]
    MalformedPayload,

    #[error("Invalid registration: {0}")]
    InvalidRegistration(String),

    #[error("Malformed identifier: {0}")]
    MalformedIdentifier(String),

    #[error("Stage {0} cannot be marked complete")]
    StageNotCompletable(String),

    #[error("No progression recorded for {0}")]
    ProgressionAbsent(String),

    #[error("Could not allocate an application number, retry later")]
    AllocationUnavailable,

    #[error("Internal error: {0}")]
    InternalError(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl From<RegistryError> for AppError {
    fn from(error: RegistryError) -> Self {
        match error {
            RegistryError::MalformedIdentifier(input) => AppError::MalformedIdentifier(input),
            RegistryError::AllocationConflict(reason) => {
                warn!("Allocation failed: {reason}");
                AppError::AllocationUnavailable
            }
            other => AppError::InternalError(Box::new(other)),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::MalformedPayload { .. } => StatusCode::BAD_REQUEST,
            AppError::MalformedIdentifier { .. } => StatusCode::BAD_REQUEST,
            AppError::InvalidRegistration { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::StageNotCompletable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::ProgressionAbsent { .. } => StatusCode::NOT_FOUND,
            AppError::AllocationUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let mut response = (status, self.to_string()).into_response();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from_static("1"));
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_is_retryable() {
        let error: AppError = RegistryError::AllocationConflict("lock timeout".to_string()).into();
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[RETRY_AFTER], "1");
    }

    #[test]
    fn test_statuses() {
        let malformed: AppError = RegistryError::MalformedIdentifier("x".to_string()).into();
        assert_eq!(malformed.into_response().status(), StatusCode::BAD_REQUEST);

        let absent = AppError::ProgressionAbsent("GABCONCOURS-03-05-1".to_string());
        assert_eq!(absent.into_response().status(), StatusCode::NOT_FOUND);

        let storage: AppError = RegistryError::StorageBootstrap.into();
        assert_eq!(
            storage.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
