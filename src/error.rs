// src/error.rs
use serde::Serialize;
use thiserror::Error;

/// Coarse classification of a failed query, used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NoDataFound,
    Geometry,
    Projection,
    SourceUnavailable,
    NoValidData,
    Upstream,
    Internal,
}

impl ErrorKind {
    /// HTTP-style status code for the surrounding service layer.
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::NoDataFound => 404,
            ErrorKind::Geometry | ErrorKind::Projection => 400,
            ErrorKind::NoValidData => 422,
            ErrorKind::Upstream => 502,
            ErrorKind::SourceUnavailable | ErrorKind::Internal => 500,
        }
    }

    /// Whether the caller can act on the failure (bad input or no imagery).
    pub fn is_user_visible(self) -> bool {
        matches!(
            self,
            ErrorKind::NoDataFound
                | ErrorKind::Geometry
                | ErrorKind::Projection
                | ErrorKind::NoValidData
        )
    }
}

/// Errors produced while answering a vegetation-index query.
#[derive(Error, Debug)]
pub enum QueryError {
    /// No scene (or no usable band asset) for the requested date and region.
    #[error("no data found: {0}")]
    NoDataFound(String),

    /// Malformed or degenerate input geometry.
    #[error("invalid geometry: {0}")]
    Geometry(String),

    /// Unsupported CRS or failed coordinate transform.
    #[error("projection error: {0}")]
    Projection(String),

    /// A raster asset could not be opened or read.
    #[error("raster source {locator} unavailable: {reason}")]
    SourceUnavailable { locator: String, reason: String },

    /// Every pixel of the index array was invalid.
    #[error("no valid index values in the area of interest")]
    NoValidData,

    /// The imagery catalog failed to answer.
    #[error("catalog search failed: {0}")]
    Catalog(String),

    /// Asset signing failed.
    #[error("asset signing failed: {0}")]
    Signing(String),

    /// Paired bands with different shapes.
    #[error("band shapes differ: {left:?} vs {right:?}")]
    ShapeMismatch {
        left: (usize, usize),
        right: (usize, usize),
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl QueryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueryError::NoDataFound(_) => ErrorKind::NoDataFound,
            QueryError::Geometry(_) => ErrorKind::Geometry,
            QueryError::Projection(_) => ErrorKind::Projection,
            QueryError::SourceUnavailable { .. } => ErrorKind::SourceUnavailable,
            QueryError::NoValidData => ErrorKind::NoValidData,
            QueryError::Catalog(_) | QueryError::Signing(_) => ErrorKind::Upstream,
            QueryError::ShapeMismatch { .. } | QueryError::Config(_) | QueryError::Internal(_) => {
                ErrorKind::Internal
            }
        }
    }

    pub(crate) fn source_unavailable(locator: &str, reason: impl ToString) -> Self {
        QueryError::SourceUnavailable {
            locator: locator.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Error payload returned to callers of the public query contract.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub kind: ErrorKind,
    pub status: u16,
    pub message: String,
}

impl From<&QueryError> for ErrorResponse {
    fn from(err: &QueryError) -> Self {
        let kind = err.kind();
        Self {
            kind,
            status: kind.status_code(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, QueryError>;
