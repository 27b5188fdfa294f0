use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ApiError {
    #[error("not found")]
    NotFound,
    #[error("paste content is empty")]
    EmptyContent,
    #[error("paste content is too large (max {max} bytes)")]
    ContentTooLarge { max: usize },
    #[error("unsupported expiry of {days} days")]
    InvalidExpiry { days: u32 },
    #[error("missing delete key")]
    MissingDeleteKey,
    #[error("wrong delete key")]
    WrongDeleteKey,
    #[error("could not allocate an unused slug")]
    SlugExhausted,
    #[error("storage unavailable")]
    StorageUnavailable { source: sqlx::Error },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status_code = match &self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::EmptyContent => StatusCode::BAD_REQUEST,
            ApiError::ContentTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::InvalidExpiry { .. } => StatusCode::BAD_REQUEST,
            ApiError::MissingDeleteKey => StatusCode::BAD_REQUEST,
            ApiError::WrongDeleteKey => StatusCode::UNAUTHORIZED,
            ApiError::SlugExhausted => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::StorageUnavailable { source } => {
                // the response body stays generic; the cause goes to the log
                error!("storage unavailable: {source}");
                StatusCode::SERVICE_UNAVAILABLE
            }
        };

        (status_code, format!("{self}")).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(source: sqlx::Error) -> Self {
        match source {
            sqlx::Error::RowNotFound => ApiError::NotFound,
            source => ApiError::StorageUnavailable { source },
        }
    }
}
