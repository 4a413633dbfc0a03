use std::{sync::Arc, time::Duration};

use common::{config::ProxyConfig, photo::CachedPhoto};
use metrics::{Metrics, put_metric};
use tracing::{debug, error, warn};
use upstream::{errors::UpstreamError, photo_source::HttpPhotoSource, traits::PhotoSource};

use crate::{
    errors::PhotoError, memory_cache::MemoryCache, reference::validate_reference,
    traits::CacheMethod,
};

#[derive(Debug)]
pub struct PhotoLookup {
    pub photo: CachedPhoto,
    pub cache_hit: bool,
}

/// Authenticated photo fetcher with an in-memory cache in front of it.
///
/// Built once at startup and shared between request handlers.
pub struct PhotoProxy {
    source: Arc<dyn PhotoSource>,
    cache: MemoryCache,
}

impl PhotoProxy {
    pub fn new(source: Arc<dyn PhotoSource>, ttl: Option<Duration>) -> Self {
        Self {
            source,
            cache: MemoryCache::new(ttl),
        }
    }

    pub fn from_config(config: &ProxyConfig) -> Result<Self, UpstreamError> {
        let source = HttpPhotoSource::from_config(config)?;

        Ok(Self::new(Arc::new(source), config.cache_ttl()))
    }

    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache.ttl()
    }

    pub async fn cache_size(&self) -> usize {
        self.cache.item_count().await
    }

    pub async fn purge_expired(&self) -> usize {
        self.cache.purge_expired().await
    }

    pub async fn fetch_photo(&self, reference: &str) -> Result<PhotoLookup, PhotoError> {
        let reference = validate_reference(reference).inspect_err(|_| {
            debug!("Rejected photo reference {reference:?}");
            put_metric!(Metrics::InvalidReference, 1);
        })?;

        if let Some(photo) = self.cache.get_item(reference).await {
            debug!("Memory cache hit for {}", reference);
            put_metric!(Metrics::PhotoCacheHit, 1);

            return Ok(PhotoLookup {
                photo,
                cache_hit: true,
            });
        }

        debug!("Memory cache miss, downloading {}", reference);
        put_metric!(Metrics::PhotoCacheMiss, 1);

        let photo = match self.source.fetch(reference).await {
            Ok(photo) => photo,
            Err(err) => return Err(Self::report_failure(reference, err)),
        };

        debug!(
            "Fetched {} bytes for {} ({:?})",
            photo.len(),
            reference,
            photo.mime_type
        );

        self.cache.insert_item(reference, photo.clone()).await;

        Ok(PhotoLookup {
            photo,
            cache_hit: false,
        })
    }

    fn report_failure(reference: &str, err: UpstreamError) -> PhotoError {
        let err = PhotoError::from(err);

        match &err {
            PhotoError::NotFound => {
                warn!("Photo {reference} does not exist upstream");
                put_metric!(Metrics::PhotoNotFound, 1);
            }
            PhotoError::UpstreamAuthError(cause) => {
                error!("Upstream rejected the credential for {reference}: {cause}");
                put_metric!(Metrics::UpstreamAuthFailure, 1);
            }
            PhotoError::UpstreamNetworkError(cause) => {
                error!("Upstream fetch for {reference} failed: {cause}");
                put_metric!(Metrics::UpstreamNetworkFailure, 1);
            }
            PhotoError::InvalidReference => {}
        }

        err
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        sync::atomic::{AtomicUsize, Ordering},
    };

    use async_trait::async_trait;
    use futures::future::join_all;
    use pretty_assertions::assert_eq;
    use reqwest::{StatusCode, header::HeaderValue};

    use super::*;

    #[derive(Clone, Copy)]
    enum Behaviour {
        Photo,
        Missing,
        Unauthorized,
        Unavailable,
    }

    struct FakeSource {
        behaviours: HashMap<&'static str, Behaviour>,
        calls: AtomicUsize,
        delay: Duration,
    }

    impl FakeSource {
        fn new(behaviours: &[(&'static str, Behaviour)]) -> Self {
            Self {
                behaviours: behaviours.iter().copied().collect(),
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PhotoSource for FakeSource {
        async fn fetch(&self, reference: &str) -> Result<CachedPhoto, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            match self.behaviours.get(reference).copied() {
                Some(Behaviour::Photo) => Ok(CachedPhoto::new(
                    HeaderValue::from_static("image/png"),
                    format!("bytes-of-{reference}").into_bytes(),
                )),
                Some(Behaviour::Missing) | None => Err(UpstreamError::NotFound),
                Some(Behaviour::Unauthorized) => {
                    Err(UpstreamError::Unauthorized(StatusCode::UNAUTHORIZED))
                }
                Some(Behaviour::Unavailable) => {
                    Err(UpstreamError::UnexpectedStatus(StatusCode::BAD_GATEWAY))
                }
            }
        }
    }

    fn proxy_with(source: FakeSource, ttl: Option<Duration>) -> (PhotoProxy, Arc<FakeSource>) {
        let source = Arc::new(source);
        let proxy = PhotoProxy::new(source.clone(), ttl);

        (proxy, source)
    }

    #[tokio::test]
    async fn second_fetch_is_served_from_cache() {
        let (proxy, source) = proxy_with(
            FakeSource::new(&[("winner.jpg", Behaviour::Photo)]),
            Some(Duration::from_secs(3600)),
        );

        let first = proxy.fetch_photo("winner.jpg").await.unwrap();
        let second = proxy.fetch_photo("winner.jpg").await.unwrap();

        assert!(!first.cache_hit);
        assert!(second.cache_hit);
        assert_eq!(first.photo, second.photo);
        assert_eq!(first.photo.mime_type, "image/png");
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn blank_reference_never_reaches_upstream() {
        let (proxy, source) = proxy_with(FakeSource::new(&[]), None);

        for reference in ["", "   ", "\t"] {
            let result = proxy.fetch_photo(reference).await;
            assert!(matches!(result, Err(PhotoError::InvalidReference)));
        }

        assert_eq!(source.calls(), 0);
        assert_eq!(proxy.cache_size().await, 0);
    }

    #[tokio::test]
    async fn missing_photo_is_not_found() {
        let (proxy, _) = proxy_with(
            FakeSource::new(&[("missing.jpg", Behaviour::Missing)]),
            None,
        );

        let err = proxy.fetch_photo("missing.jpg").await.unwrap_err();

        assert!(matches!(err, PhotoError::NotFound));
        assert_eq!(err.kind(), "not_found");
        assert_eq!(proxy.cache_size().await, 0);
    }

    #[tokio::test]
    async fn auth_failures_are_never_cached() {
        let (proxy, source) = proxy_with(
            FakeSource::new(&[("any.jpg", Behaviour::Unauthorized)]),
            None,
        );

        for _ in 0..2 {
            let err = proxy.fetch_photo("any.jpg").await.unwrap_err();
            assert!(matches!(err, PhotoError::UpstreamAuthError(_)));
            assert_eq!(err.kind(), "upstream_auth");
        }

        assert_eq!(source.calls(), 2);
        assert_eq!(proxy.cache_size().await, 0);
    }

    #[tokio::test]
    async fn upstream_outage_is_a_network_error() {
        let (proxy, _) = proxy_with(
            FakeSource::new(&[("down.jpg", Behaviour::Unavailable)]),
            None,
        );

        let err = proxy.fetch_photo("down.jpg").await.unwrap_err();

        assert!(matches!(err, PhotoError::UpstreamNetworkError(_)));
        assert_eq!(err.kind(), "upstream_network");
    }

    #[tokio::test]
    async fn concurrent_misses_leave_one_entry() {
        let (proxy, source) = proxy_with(
            FakeSource::new(&[("same.jpg", Behaviour::Photo)])
                .with_delay(Duration::from_millis(50)),
            None,
        );
        let callers = 8;

        let results = join_all((0..callers).map(|_| proxy.fetch_photo("same.jpg"))).await;

        let expected = b"bytes-of-same.jpg".to_vec();
        for result in results {
            assert_eq!(result.unwrap().photo.image, expected);
        }

        assert!(source.calls() <= callers);
        assert_eq!(proxy.cache_size().await, 1);

        let cached = proxy.fetch_photo("same.jpg").await.unwrap();
        assert!(cached.cache_hit);
        assert_eq!(cached.photo.image, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_is_fetched_again() {
        let (proxy, source) = proxy_with(
            FakeSource::new(&[("winner.jpg", Behaviour::Photo)]),
            Some(Duration::from_secs(30)),
        );

        proxy.fetch_photo("winner.jpg").await.unwrap();
        tokio::time::advance(Duration::from_secs(31)).await;

        let refetched = proxy.fetch_photo("winner.jpg").await.unwrap();

        assert!(!refetched.cache_hit);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn purge_reports_removed_entries() {
        let (proxy, _) = proxy_with(
            FakeSource::new(&[("a.jpg", Behaviour::Photo), ("b.jpg", Behaviour::Photo)]),
            Some(Duration::from_secs(30)),
        );

        proxy.fetch_photo("a.jpg").await.unwrap();
        proxy.fetch_photo("b.jpg").await.unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;

        assert_eq!(proxy.purge_expired().await, 2);
        assert_eq!(proxy.cache_size().await, 0);
    }
}
