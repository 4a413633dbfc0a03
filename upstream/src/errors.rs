use std::time::Duration;

use reqwest::{
    StatusCode,
    header::{InvalidHeaderName, InvalidHeaderValue},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("Upstream rejected the credential ({0})")]
    Unauthorized(StatusCode),
    #[error("Upstream has no photo for this reference")]
    NotFound,
    #[error("Upstream answered with its sign-in page instead of a photo")]
    SignInPage,
    #[error("Upstream answered with unexpected status {0}")]
    UnexpectedStatus(StatusCode),
    #[error("Upstream answered with non-image content type {0:?}")]
    UnexpectedContentType(String),
    #[error("Upstream photo is larger than {0} bytes")]
    PhotoTooLarge(u64),
    #[error("Upstream is rate limiting, holding off for {0:?}")]
    RateLimited(Duration),
    #[error("Reference would leave the upstream base path")]
    UnsafeReference,
    #[error("Upstream request failed: {0}")]
    MiddlewareError(#[from] reqwest_middleware::Error),
    #[error("Upstream request failed: {0}")]
    ClientError(#[from] reqwest::Error),
    #[error("Upstream client failed to create header")]
    InvalidHeader,
}

impl UpstreamError {
    /// Credential problems, retrying with the same static secret cannot help
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Unauthorized(_) | Self::SignInPage)
    }
}

impl From<InvalidHeaderName> for UpstreamError {
    fn from(_err: InvalidHeaderName) -> Self {
        Self::InvalidHeader
    }
}

impl From<InvalidHeaderValue> for UpstreamError {
    fn from(_err: InvalidHeaderValue) -> Self {
        Self::InvalidHeader
    }
}
