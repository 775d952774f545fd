//! Error types for the match API client.

use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur during match API client operations.
///
/// "Not found" is deliberately absent: absent resources are a routine
/// outcome and surface as [`crate::Fetch::NotFound`], not as an error.
#[derive(Error, Debug)]
pub enum ClientError {
    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Non-success response from the upstream API.
    #[error("API error ({status}) at {url}: {message}")]
    ApiError {
        status: u16,
        url: String,
        message: String,
    },

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Response body did not match the expected shape.
    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    /// The client was built without any API keys.
    #[error("At least one API key is required")]
    NoApiKeys,
}

impl ClientError {
    /// Check if this error carries the given upstream status code.
    pub fn has_status(&self, wanted: u16) -> bool {
        matches!(self, Self::ApiError { status, .. } if *status == wanted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_status() {
        let err = ClientError::ApiError {
            status: 500,
            url: "https://api.example.com/match/v1/matches/M_1".to_string(),
            message: "boom".to_string(),
        };
        assert!(err.has_status(500));
        assert!(!err.has_status(503));

        let err = ClientError::InvalidUrl("nope".to_string());
        assert!(!err.has_status(500));
    }
}
