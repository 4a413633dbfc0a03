pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 3600;
pub const DEFAULT_LISTEN_PORT: u16 = 8000;
pub const DEFAULT_UPSTREAM_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_UPSTREAM_MAX_RETRIES: u32 = 1;
pub const DEFAULT_MAX_PHOTO_BYTES: u64 = 10 * 1024 * 1024;

// how long to leave the upstream alone after a 429 without Retry-After
pub const DEFAULT_RATE_LIMIT_BLOCK_SECONDS: u64 = 60;
pub const MAX_RATE_LIMIT_BLOCK_SECONDS: u64 = 15 * 60;

pub const DEFAULT_USER_AGENT: &str = "great-save-raffle-photo-proxy/1.0";

// what browsers send for <img> tags, some upstreams sniff it
pub const PHOTO_ACCEPT_HEADER: &str = "image/webp,image/apng,image/*,*/*;q=0.8";

// upstream responses without a content-type are photos in practice
pub const FALLBACK_CONTENT_TYPE: &str = "image/jpeg";

pub const REFERENCE_PLACEHOLDER: &str = "{reference}";
