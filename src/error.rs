use thiserror::Error;

/// Main error type for the subtitle relay
#[derive(Error, Debug)]
pub enum RelayError {
    /// A required API credential is not configured.
    /// Raised before any network call is attempted.
    #[error("Missing credential: {0}")]
    MissingCredential(String),

    /// The provider endpoint could not be reached at the network level
    #[error("Provider unreachable: {0}")]
    ProviderUnreachable(String),

    /// The provider answered with a non-success status
    #[error("Provider error ({status}): {body}")]
    ProviderError { status: u16, body: String },

    /// Audio capture could not be started or was lost.
    /// Terminal for the current capture session.
    #[error("Audio capture failed: {0}")]
    CaptureFailure(String),

    /// The provider answered with a body that could not be decoded
    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    /// An error from the persisted key-value store
    #[error("Storage error: {0}")]
    Storage(String),

    /// Server configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A standard I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, RelayError>;

impl RelayError {
    /// Classify a reqwest failure into the relay taxonomy.
    /// Connection-level failures become `ProviderUnreachable`, everything
    /// else surfaces as an invalid response.
    pub fn from_request(err: reqwest::Error, hint: &str) -> Self {
        if err.is_connect() || err.is_timeout() {
            RelayError::ProviderUnreachable(format!("{}: {}", hint, err))
        } else {
            RelayError::InvalidResponse(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_display() {
        let err = RelayError::ProviderError {
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "Provider error (500): boom");
    }

    #[test]
    fn test_missing_credential_display() {
        let err = RelayError::MissingCredential("no key".to_string());
        assert!(err.to_string().contains("no key"));
    }
}
