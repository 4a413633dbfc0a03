use std::{str::FromStr, time::Duration};

use common::{config::ProxyConfig, constants::DEFAULT_MAX_PHOTO_BYTES};
use reqwest::{
    ClientBuilder as BaseClientBuilder,
    header::{HeaderMap, HeaderName, HeaderValue},
};
use reqwest_middleware::{ClientBuilder as RetryableClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use tracing::{debug, trace};

use crate::{errors::UpstreamError, request::Request, traits::UpstreamResponse};

const MIN_BACKOFF_MILLIS: u64 = 250;
const MAX_BACKOFF_MILLIS: u64 = 1000;

/// Retrying HTTP client for the upstream photo service.
///
/// Only transient failures (timeouts, connection errors, 5xx, 408, 429) are
/// retried. 401/403/404 come straight back to the caller.
#[derive(Clone)]
pub struct UpstreamClient {
    client: ClientWithMiddleware,
    max_body_bytes: u64,
}

impl UpstreamClient {
    pub fn new(
        timeout: Duration,
        max_retries: u32,
        user_agent: &str,
    ) -> Result<Self, UpstreamError> {
        let base_client = BaseClientBuilder::new()
            .gzip(true)
            .http1_ignore_invalid_headers_in_responses(true)
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        let retry_strat = ExponentialBackoff::builder()
            .retry_bounds(
                Duration::from_millis(MIN_BACKOFF_MILLIS),
                Duration::from_millis(MAX_BACKOFF_MILLIS),
            )
            .build_with_max_retries(max_retries);
        let retry_middleware = RetryTransientMiddleware::new_with_policy(retry_strat);

        let client = RetryableClientBuilder::new(base_client)
            .with(retry_middleware)
            .build();

        Ok(Self {
            client,
            max_body_bytes: DEFAULT_MAX_PHOTO_BYTES,
        })
    }

    pub fn from_config(config: &ProxyConfig) -> Result<Self, UpstreamError> {
        Ok(Self::new(
            config.upstream_timeout(),
            config.upstream_max_retries,
            &config.user_agent,
        )?
        .with_max_body_bytes(config.upstream_max_photo_bytes))
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: u64) -> Self {
        self.max_body_bytes = max_body_bytes;

        self
    }

    pub async fn make_web_request(
        &self,
        request: Request,
    ) -> Result<UpstreamResponse, UpstreamError> {
        let mut header_map = HeaderMap::new();

        for (key, value) in request.headers.iter() {
            header_map.append(HeaderName::from_str(key)?, HeaderValue::from_str(value)?);
        }

        debug!("Sending request to {}", request.url);

        let mut response = self
            .client
            .get(request.url.clone())
            .headers(header_map)
            .send()
            .await?;

        trace!("{response:?}");

        let status = response.status();
        let headers = response.headers().clone();

        if let Some(length) = response.content_length()
            && length > self.max_body_bytes
        {
            return Err(UpstreamError::PhotoTooLarge(self.max_body_bytes));
        }

        // content-length can be absent or wrong, so the limit holds while streaming too
        let mut raw_bytes = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if (raw_bytes.len() + chunk.len()) as u64 > self.max_body_bytes {
                return Err(UpstreamError::PhotoTooLarge(self.max_body_bytes));
            }

            raw_bytes.extend_from_slice(&chunk);
        }

        Ok(UpstreamResponse {
            status,
            headers,
            raw_bytes,
        })
    }
}
