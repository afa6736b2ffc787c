use axum::{
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::warn;

#[derive(thiserror::Error, Debug)]
pub(crate) enum Error {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
    #[error(transparent)]
    Library(#[from] libbathroom::Error),
    #[error("Resource Not Found: {0}")]
    NotFound(String),
    #[error("The provided query string was rejected: {0}")]
    UnprocessableEntityQueryRejection(#[from] QueryRejection),
    #[error("Required parameter '{0}' is missing")]
    RequiredParameterMissing(String),
}

impl Error {
    pub(crate) fn to_client_status(&self) -> (StatusCode, String) {
        match self {
            Error::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            ),
            Error::Other(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Unknown error".to_string(),
            ),
            Error::Library(libbathroom::Error::InvalidCoordinates { .. }) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "The given coordinates are not valid".to_string(),
            ),
            Error::Library(libbathroom::Error::DatabaseError(sqlx::Error::RowNotFound)) => {
                (StatusCode::NOT_FOUND, "Not found".to_string())
            }
            Error::Library(libbathroom::Error::Geocoding(_) | libbathroom::Error::Http(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Unable to look up the location".to_string(),
            ),
            Error::Library(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Library error".to_string()),
            Error::NotFound(message) => (StatusCode::NOT_FOUND, message.clone()),
            Error::UnprocessableEntityQueryRejection(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "The query string was not in the expected format. The request could not be processed.".to_string(),
            ),
            Error::RequiredParameterMissing(param) => (StatusCode::UNPROCESSABLE_ENTITY, format!("Missing parameter '{param}'")),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        warn!("Got error for response: {self:?}");
        let (status, _) = self.to_client_status();
        let mut response = status.into_response();
        // the error page itself is rendered by the response mapper, which has
        // access to the templates
        response.extensions_mut().insert(Arc::new(self));
        response
    }
}
