//! Secure access token container with automatic memory zeroing.
//!
//! The catalog service authenticates with a personal access token or an
//! OAuth bearer token. The token is held in a `Zeroizing` container and
//! is never shown by `Debug` or `Display`.

use zeroize::{Zeroize, Zeroizing};

/// Bearer token for the catalog service.
///
/// # Example
///
/// ```rust
/// use lakesurveyor_core::security::AccessToken;
///
/// let token = AccessToken::new("dapi0123456789abcdef".to_string());
/// assert!(!token.is_empty());
/// assert!(!format!("{:?}", token).contains("0123456789"));
/// ```
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct AccessToken {
    secret: Zeroizing<String>,
}

impl AccessToken {
    /// Wraps a token, trimming surrounding whitespace.
    pub fn new(token: String) -> Self {
        let trimmed = token.trim().to_string();
        let mut original = token;
        original.zeroize();
        Self {
            secret: Zeroizing::new(trimmed),
        }
    }

    /// Returns true when no token was supplied.
    pub fn is_empty(&self) -> bool {
        self.secret.is_empty()
    }

    /// Exposes the token for building the `Authorization` header.
    ///
    /// Callers must not log or persist the returned value.
    pub fn expose(&self) -> &str {
        &self.secret
    }

    /// Masked form safe for logs.
    pub fn redacted(&self) -> String {
        crate::error::redact_token(&self.secret)
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &self.redacted())
            .finish()
    }
}
