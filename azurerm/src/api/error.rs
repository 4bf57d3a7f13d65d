use thiserror::Error;

/// Error body returned by Azure Resource Manager.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct CloudError {
    pub code: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct CloudErrorBody {
    pub error: Option<CloudError>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API returned error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("resource not found (HTTP 404): {0}")]
    NotFound(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error("long-running operation ended in state '{status}': {message}")]
    OperationFailed { status: String, message: String },

    #[error("long-running operation did not complete within {0:?}")]
    OperationTimeout(std::time::Duration),

    #[error("too many requests, rate limited")]
    RateLimited,

    #[error("service unavailable, retry later")]
    ServiceUnavailable,
}

impl ApiError {
    /// On Read, a 404 clears the resource from state instead of erroring.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }
}
