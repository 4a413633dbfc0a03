use std::time::Duration;

use async_trait::async_trait;
use common::{
    auth::Credential,
    config::ProxyConfig,
    constants::{
        DEFAULT_RATE_LIMIT_BLOCK_SECONDS, FALLBACK_CONTENT_TYPE, MAX_RATE_LIMIT_BLOCK_SECONDS,
        PHOTO_ACCEPT_HEADER, REFERENCE_PLACEHOLDER,
    },
    photo::{CachedPhoto, has_dot_segment},
};
use reqwest::{
    StatusCode,
    header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue, RETRY_AFTER},
};
use tokio::{sync::Mutex, time::Instant};
use tracing::{debug, warn};

use crate::{
    client::UpstreamClient,
    errors::UpstreamError,
    request::RequestBuilder,
    traits::{PhotoSource, UpstreamResponse},
};

/// Fetches photos from the HR platform over HTTP with the configured credential
pub struct HttpPhotoSource {
    client: UpstreamClient,
    base_url: String,
    credential: Credential,
    // set after a 429, upstream calls are skipped until then
    blocked_until: Mutex<Option<Instant>>,
}

impl HttpPhotoSource {
    pub fn new(client: UpstreamClient, base_url: impl Into<String>, credential: Credential) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            credential,
            blocked_until: Mutex::new(None),
        }
    }

    pub fn from_config(config: &ProxyConfig) -> Result<Self, UpstreamError> {
        Ok(Self::new(
            UpstreamClient::from_config(config)?,
            config.upstream_base_url.trim(),
            config.credential(),
        ))
    }

    /// Either fills the `{reference}` slot of the base URL, or appends the
    /// reference as a path. Path separators inside the reference survive,
    /// dot segments are refused since they would climb out of the base path.
    pub fn build_url(&self, reference: &str) -> Result<String, UpstreamError> {
        if has_dot_segment(reference) {
            return Err(UpstreamError::UnsafeReference);
        }

        if self.base_url.contains(REFERENCE_PLACEHOLDER) {
            return Ok(self
                .base_url
                .replace(REFERENCE_PLACEHOLDER, &urlencoding::encode(reference)));
        }

        let encoded_path = reference
            .trim_start_matches('/')
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<String>>()
            .join("/");

        Ok(format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            encoded_path
        ))
    }

    async fn rate_limit_remaining(&self) -> Option<Duration> {
        let mut blocked_until = self.blocked_until.lock().await;

        let remaining = blocked_until.map(|until| until.saturating_duration_since(Instant::now()));

        match remaining {
            Some(remaining) if !remaining.is_zero() => Some(remaining),
            _ => {
                *blocked_until = None;
                None
            }
        }
    }

    async fn block_for(&self, headers: &HeaderMap) -> Duration {
        let block = headers
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_RATE_LIMIT_BLOCK_SECONDS)
            .min(MAX_RATE_LIMIT_BLOCK_SECONDS);
        let block = Duration::from_secs(block);

        *self.blocked_until.lock().await = Some(Instant::now() + block);

        block
    }

    fn parse_response(
        reference: &str,
        response: UpstreamResponse,
    ) -> Result<CachedPhoto, UpstreamError> {
        match response.status {
            StatusCode::OK => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(UpstreamError::Unauthorized(response.status));
            }
            StatusCode::NOT_FOUND => return Err(UpstreamError::NotFound),
            status => return Err(UpstreamError::UnexpectedStatus(status)),
        }

        let mime_type = match response.headers.get(CONTENT_TYPE) {
            Some(mime_type) => mime_type.clone(),
            None => {
                debug!("No content type for {reference}, assuming {FALLBACK_CONTENT_TYPE}");
                HeaderValue::from_static(FALLBACK_CONTENT_TYPE)
            }
        };

        let essence = mime_type
            .to_str()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if essence.starts_with("image/") {
            return Ok(CachedPhoto::new(mime_type, response.raw_bytes));
        }

        // expired sessions get bounced to an HTML sign-in form with a 200
        if essence.starts_with("text/html") {
            return Err(UpstreamError::SignInPage);
        }

        Err(UpstreamError::UnexpectedContentType(essence))
    }
}

#[async_trait]
impl PhotoSource for HttpPhotoSource {
    async fn fetch(&self, reference: &str) -> Result<CachedPhoto, UpstreamError> {
        let url = self.build_url(reference)?;

        if let Some(remaining) = self.rate_limit_remaining().await {
            debug!("Skipping upstream for {reference}, rate limited for {remaining:?}");
            return Err(UpstreamError::RateLimited(remaining));
        }

        let (auth_name, auth_value) = self.credential.header();

        let request = RequestBuilder::new()
            .set_url(url)
            .add_header(ACCEPT.as_str(), PHOTO_ACCEPT_HEADER)
            .add_header(auth_name, auth_value)
            .build();

        let response = self.client.make_web_request(request).await?;

        if response.status == StatusCode::TOO_MANY_REQUESTS {
            let block = self.block_for(&response.headers).await;
            warn!("Upstream rate limited {reference}, pausing upstream calls for {block:?}");

            return Err(UpstreamError::RateLimited(block));
        }

        let result = Self::parse_response(reference, response);

        if let Err(ref err) = result {
            warn!("Upstream fetch for {reference} failed: {err}");
        }

        result
    }
}
