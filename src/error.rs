use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::favorites::FavoritesError;

#[derive(Serialize)]
pub struct ErrorResponse {
    error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Upstream(&'static str),

    #[error("{0}")]
    BadRequest(String),

    #[error("City not found in favorites")]
    FavoriteNotFound,

    #[error("Failed to update favorites")]
    Persistence,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::FavoriteNotFound => StatusCode::NOT_FOUND,
            ApiError::Persistence => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse {
            error: self.to_string(),
        });

        (status, body).into_response()
    }
}

impl From<FavoritesError> for ApiError {
    fn from(err: FavoritesError) -> Self {
        match err {
            FavoritesError::NotFound => ApiError::FavoriteNotFound,
            other => {
                tracing::error!("Error saving favorites: {}", other);
                ApiError::Persistence
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
