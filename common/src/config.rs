use std::{fmt, time::Duration};

use clap::Parser;
use reqwest::header::HeaderValue;
use thiserror::Error;

use crate::{
    auth::{AuthMode, Credential},
    constants::{
        DEFAULT_CACHE_TTL_SECONDS, DEFAULT_LISTEN_PORT, DEFAULT_MAX_PHOTO_BYTES,
        DEFAULT_UPSTREAM_MAX_RETRIES, DEFAULT_UPSTREAM_TIMEOUT_SECONDS, DEFAULT_USER_AGENT,
    },
};

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("UPSTREAM_BASE_URL must be an http(s) URL, got {0:?}")]
    InvalidBaseUrl(String),
    #[error("AUTH_CREDENTIAL is empty")]
    MissingCredential,
    #[error("AUTH_CREDENTIAL contains characters that cannot be sent in a header")]
    InvalidCredential,
    #[error("UPSTREAM_TIMEOUT_SECONDS must be greater than zero")]
    ZeroTimeout,
    #[error("UPSTREAM_MAX_PHOTO_BYTES must be greater than zero")]
    ZeroPhotoLimit,
}

/// Photo proxy settings, read from flags or the environment
#[derive(Parser, Clone)]
#[command(name = "photo_proxy", version, about = "Authenticated, caching photo proxy")]
pub struct ProxyConfig {
    /// Upstream photo service, either a base path or a template containing `{reference}`
    #[arg(long, env = "UPSTREAM_BASE_URL")]
    pub upstream_base_url: String,

    #[arg(long, env = "AUTH_MODE", value_enum, default_value_t = AuthMode::Cookie)]
    pub auth_mode: AuthMode,

    /// Session cookie string or bearer token, depending on the auth mode
    #[arg(long, env = "AUTH_CREDENTIAL", hide_env_values = true)]
    pub auth_credential: String,

    /// 0 keeps photos for the lifetime of the process
    #[arg(long, env = "CACHE_TTL_SECONDS", default_value_t = DEFAULT_CACHE_TTL_SECONDS)]
    pub cache_ttl_seconds: u64,

    #[arg(long, env = "LISTEN_PORT", default_value_t = DEFAULT_LISTEN_PORT)]
    pub listen_port: u16,

    #[arg(long, env = "UPSTREAM_TIMEOUT_SECONDS", default_value_t = DEFAULT_UPSTREAM_TIMEOUT_SECONDS)]
    pub upstream_timeout_seconds: u64,

    /// Retries for transient upstream failures, auth failures are never retried
    #[arg(long, env = "UPSTREAM_MAX_RETRIES", default_value_t = DEFAULT_UPSTREAM_MAX_RETRIES)]
    pub upstream_max_retries: u32,

    /// Upstream answers larger than this are refused instead of cached
    #[arg(long, env = "UPSTREAM_MAX_PHOTO_BYTES", default_value_t = DEFAULT_MAX_PHOTO_BYTES)]
    pub upstream_max_photo_bytes: u64,

    #[arg(long, env = "USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,
}

impl ProxyConfig {
    /// Config with every optional setting at its default
    pub fn new(upstream_base_url: impl Into<String>, credential: Credential) -> Self {
        Self {
            upstream_base_url: upstream_base_url.into(),
            auth_mode: credential.mode(),
            auth_credential: credential.secret().to_string(),
            cache_ttl_seconds: DEFAULT_CACHE_TTL_SECONDS,
            listen_port: DEFAULT_LISTEN_PORT,
            upstream_timeout_seconds: DEFAULT_UPSTREAM_TIMEOUT_SECONDS,
            upstream_max_retries: DEFAULT_UPSTREAM_MAX_RETRIES,
            upstream_max_photo_bytes: DEFAULT_MAX_PHOTO_BYTES,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = self.upstream_base_url.trim();

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::InvalidBaseUrl(self.upstream_base_url.clone()));
        }

        let credential = self.credential();

        if credential.is_empty() {
            return Err(ConfigError::MissingCredential);
        }

        // a trailing newline from a pasted cookie would fail every request later
        if HeaderValue::from_str(&credential.header().1).is_err() {
            return Err(ConfigError::InvalidCredential);
        }

        if self.upstream_timeout_seconds == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        if self.upstream_max_photo_bytes == 0 {
            return Err(ConfigError::ZeroPhotoLimit);
        }

        Ok(())
    }

    pub fn credential(&self) -> Credential {
        Credential::new(self.auth_mode, self.auth_credential.clone())
    }

    /// `None` means entries never expire
    pub fn cache_ttl(&self) -> Option<Duration> {
        match self.cache_ttl_seconds {
            0 => None,
            seconds => Some(Duration::from_secs(seconds)),
        }
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_seconds)
    }
}

impl fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("upstream_base_url", &self.upstream_base_url)
            .field("credential", &self.credential())
            .field("cache_ttl_seconds", &self.cache_ttl_seconds)
            .field("listen_port", &self.listen_port)
            .field("upstream_timeout_seconds", &self.upstream_timeout_seconds)
            .field("upstream_max_retries", &self.upstream_max_retries)
            .field("upstream_max_photo_bytes", &self.upstream_max_photo_bytes)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn parse(args: &[&str]) -> ProxyConfig {
        let mut argv = vec!["photo_proxy"];
        argv.extend_from_slice(args);

        ProxyConfig::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_apply_when_only_required_values_given() {
        let config = parse(&[
            "--upstream-base-url",
            "https://photos.example.com/get-upload?key={reference}",
            "--auth-credential",
            "session=abc",
        ]);

        assert_eq!(config.auth_mode, AuthMode::Cookie);
        assert_eq!(config.cache_ttl(), Some(Duration::from_secs(3600)));
        assert_eq!(config.listen_port, 8000);
        assert_eq!(config.upstream_timeout(), Duration::from_secs(10));
        assert_eq!(config.upstream_max_retries, 1);
        assert_eq!(config.upstream_max_photo_bytes, 10 * 1024 * 1024);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn zero_ttl_means_unbounded() {
        let config = parse(&[
            "--upstream-base-url",
            "https://photos.example.com",
            "--auth-mode",
            "bearer",
            "--auth-credential",
            "token",
            "--cache-ttl-seconds",
            "0",
        ]);

        assert_eq!(config.auth_mode, AuthMode::Bearer);
        assert_eq!(config.cache_ttl(), None);
    }

    #[test]
    fn rejects_unknown_auth_mode() {
        let result = ProxyConfig::try_parse_from([
            "photo_proxy",
            "--upstream-base-url",
            "https://photos.example.com",
            "--auth-mode",
            "basic",
            "--auth-credential",
            "token",
        ]);

        assert!(result.is_err());
    }

    #[test]
    fn validate_catches_bad_values() {
        let credential = Credential::new(AuthMode::Cookie, "session=abc");

        let config = ProxyConfig::new("ftp://photos.example.com", credential.clone());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidBaseUrl(_))
        ));

        let config = ProxyConfig::new(
            "https://photos.example.com",
            Credential::new(AuthMode::Bearer, "   "),
        );
        assert_eq!(config.validate(), Err(ConfigError::MissingCredential));

        let mut config = ProxyConfig::new("https://photos.example.com", credential.clone());
        config.upstream_timeout_seconds = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroTimeout));

        let mut config = ProxyConfig::new("https://photos.example.com", credential);
        config.upstream_max_photo_bytes = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroPhotoLimit));
    }

    #[test]
    fn credential_must_fit_in_a_header() {
        for secret in ["KPASESSIONID=abc\n", "token\r\nX-Injected: 1", "abc\0"] {
            for mode in [AuthMode::Cookie, AuthMode::Bearer] {
                let config = ProxyConfig::new(
                    "https://photos.example.com",
                    Credential::new(mode, secret),
                );

                assert_eq!(
                    config.validate(),
                    Err(ConfigError::InvalidCredential),
                    "{secret:?} in {mode} mode"
                );
            }
        }
    }
}
