use async_trait::async_trait;
use common::photo::CachedPhoto;
use reqwest::{StatusCode, header::HeaderMap};

use crate::errors::UpstreamError;

pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub raw_bytes: Vec<u8>,
}

/// Anything that can produce photo bytes for a reference.
///
/// The proxy only talks to the upstream through this trait so tests can
/// swap in a fake that counts calls.
#[async_trait]
pub trait PhotoSource: Send + Sync {
    async fn fetch(&self, reference: &str) -> Result<CachedPhoto, UpstreamError>;
}
