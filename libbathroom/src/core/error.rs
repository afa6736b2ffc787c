//! Objects related to reporting errors from this library

/// A list of error types that can occur within this library
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("can't update the object, no id was specified")]
    InvalidUpdateObjectNotFound,

    #[error("can't insert the object, it already exists in the database with id = {}", .0)]
    InvalidInsertObjectAlreadyExists(i64),

    #[error("invalid coordinates: latitude={latitude:?}, longitude={longitude:?}")]
    InvalidCoordinates {
        latitude: Option<f64>,
        longitude: Option<f64>,
    },

    #[error("Geocoding failed: {0}")]
    Geocoding(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    UrlEncode(#[from] serde_urlencoded::ser::Error),

    #[error(transparent)]
    Template(#[from] minijinja::Error),

    #[error(transparent)]
    DatabaseError(#[from] sqlx::Error),

    #[error(transparent)]
    DatabaseMigrationError(#[from] sqlx::migrate::MigrateError),
}

/// A convenience type alias for a [Result] with [Error] as its error type
pub type Result<T, E = Error> = std::result::Result<T, E>;
