use thiserror::Error;
use upstream::errors::UpstreamError;

#[derive(Error, Debug)]
pub enum PhotoError {
    #[error("Photo reference is empty or malformed")]
    InvalidReference,
    #[error("Upstream has no such photo")]
    NotFound,
    #[error("Upstream rejected the credential: {0}")]
    UpstreamAuthError(#[source] UpstreamError),
    #[error("Upstream could not be reached: {0}")]
    UpstreamNetworkError(#[source] UpstreamError),
}

impl PhotoError {
    /// Short name used in JSON error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidReference => "invalid_reference",
            Self::NotFound => "not_found",
            Self::UpstreamAuthError(_) => "upstream_auth",
            Self::UpstreamNetworkError(_) => "upstream_network",
        }
    }
}

impl From<UpstreamError> for PhotoError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::NotFound => Self::NotFound,
            UpstreamError::UnsafeReference => Self::InvalidReference,
            err if err.is_auth() => Self::UpstreamAuthError(err),
            err => Self::UpstreamNetworkError(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn maps_upstream_errors_to_kinds() {
        assert_eq!(PhotoError::from(UpstreamError::NotFound).kind(), "not_found");
        assert_eq!(
            PhotoError::from(UpstreamError::UnsafeReference).kind(),
            "invalid_reference"
        );
        assert_eq!(PhotoError::from(UpstreamError::SignInPage).kind(), "upstream_auth");
        assert_eq!(
            PhotoError::from(UpstreamError::RateLimited(Duration::from_secs(60))).kind(),
            "upstream_network"
        );
        assert_eq!(
            PhotoError::from(UpstreamError::PhotoTooLarge(1024)).kind(),
            "upstream_network"
        );
    }
}
