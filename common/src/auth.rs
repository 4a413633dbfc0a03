use std::fmt;

use clap::ValueEnum;
use reqwest::header::{AUTHORIZATION, COOKIE};
use strum_macros::{Display, EnumString};

/// How the credential is presented to the upstream photo service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AuthMode {
    /// Browser session cookie, sent verbatim in the `Cookie` header
    #[default]
    Cookie,
    /// API/OKTA issued token, sent as `Authorization: Bearer <token>`
    Bearer,
}

/// Process-wide upstream secret. Loaded once at startup and never rotated.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    mode: AuthMode,
    secret: String,
}

impl Credential {
    pub fn new(mode: AuthMode, secret: impl Into<String>) -> Self {
        Self {
            mode,
            secret: secret.into(),
        }
    }

    pub fn mode(&self) -> AuthMode {
        self.mode
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn is_empty(&self) -> bool {
        self.secret.trim().is_empty()
    }

    /// Header to attach to every upstream request
    pub fn header(&self) -> (String, String) {
        match self.mode {
            AuthMode::Cookie => (COOKIE.to_string(), self.secret.clone()),
            AuthMode::Bearer => (AUTHORIZATION.to_string(), format!("Bearer {}", self.secret)),
        }
    }
}

// never let the secret end up in logs
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("mode", &self.mode)
            .field("secret", &"<redacted>")
            .finish()
    }
}
