//! Webhook signature verification.
//!
//! GitHub signs every delivery with an HMAC of the raw request body keyed by
//! the webhook secret and sends the result as `<algorithm>=<hex-digest>` in a
//! signature header. The legacy `X-Hub-Signature` header carries an
//! HMAC-SHA1 digest; `X-Hub-Signature-256` carries HMAC-SHA256.
//!
//! SHA-1 is the default because it is what existing senders of the legacy
//! header produce. It is a known weak point: HMAC-SHA1 is still not practically
//! forgeable, but new deployments should configure [`SignatureAlgorithm::Sha256`].
//!
//! # Security
//!
//! - The presented signature is compared in constant time
//! - Secrets are never logged and are zeroized on drop
//! - A failed comparison is a normal `false`, never an error or a panic

use crate::ValidationError;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::Sha256;
use std::fmt;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

// ============================================================================
// SignatureAlgorithm
// ============================================================================

/// Keyed-hash algorithm used to sign webhook deliveries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureAlgorithm {
    /// HMAC-SHA1, sent by GitHub in `X-Hub-Signature`.
    #[default]
    Sha1,

    /// HMAC-SHA256, sent by GitHub in `X-Hub-Signature-256`.
    Sha256,
}

impl SignatureAlgorithm {
    /// Prefix of the signature header value, including the `=`.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Sha1 => "sha1=",
            Self::Sha256 => "sha256=",
        }
    }

    /// Lowercase name of the HTTP header carrying signatures for this algorithm.
    pub fn header_name(&self) -> &'static str {
        match self {
            Self::Sha1 => "x-hub-signature",
            Self::Sha256 => "x-hub-signature-256",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// WebhookSecret
// ============================================================================

/// Shared secret configured on the GitHub webhook.
///
/// Loaded once at startup and read-only afterwards. The `Debug` output is
/// redacted and the backing memory is wiped when the value is dropped.
#[derive(Clone, Default, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct WebhookSecret(String);

impl WebhookSecret {
    /// Create a secret, rejecting empty values.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.is_empty() {
            return Err(ValidationError::Required {
                field: "webhook_secret".to_string(),
            });
        }

        Ok(Self(value))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WebhookSecret(<REDACTED>)")
    }
}

// ============================================================================
// Free functions
// ============================================================================

/// Compute the signature header value GitHub would send for `payload`.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidFormat`] if the secret cannot be used as
/// an HMAC key.
pub fn compute_signature(
    algorithm: SignatureAlgorithm,
    secret: &[u8],
    payload: &[u8],
) -> Result<String, ValidationError> {
    let digest = match algorithm {
        SignatureAlgorithm::Sha1 => {
            let mut mac = Hmac::<Sha1>::new_from_slice(secret).map_err(invalid_key)?;
            mac.update(payload);
            mac.finalize().into_bytes().to_vec()
        }
        SignatureAlgorithm::Sha256 => {
            let mut mac = Hmac::<Sha256>::new_from_slice(secret).map_err(invalid_key)?;
            mac.update(payload);
            mac.finalize().into_bytes().to_vec()
        }
    };

    Ok(format!("{}{}", algorithm.prefix(), hex::encode(digest)))
}

/// Check a presented signature header value against `payload`.
///
/// The expected string is `<prefix><lowercase hex digest>`. The comparison
/// runs over every byte regardless of where the first mismatch is. Only the
/// length check short-circuits, and the expected length is public.
pub fn verify_signature(
    algorithm: SignatureAlgorithm,
    secret: &[u8],
    payload: &[u8],
    presented: &str,
) -> bool {
    if presented.is_empty() {
        return false;
    }

    let Ok(expected) = compute_signature(algorithm, secret, payload) else {
        return false;
    };

    let expected = expected.as_bytes();
    let presented = presented.as_bytes();
    if expected.len() != presented.len() {
        return false;
    }

    expected.ct_eq(presented).into()
}

fn invalid_key(_: hmac::digest::InvalidLength) -> ValidationError {
    ValidationError::InvalidFormat {
        field: "secret".to_string(),
        message: "secret cannot be used as HMAC key".to_string(),
    }
}

// ============================================================================
// SignatureVerifier
// ============================================================================

/// Verifies webhook signatures with a fixed secret and algorithm.
///
/// # Examples
///
/// ```rust
/// use hook_relay_core::signature::{SignatureAlgorithm, SignatureVerifier, WebhookSecret};
///
/// let secret = WebhookSecret::new("It's a Secret to Everybody").unwrap();
/// let verifier = SignatureVerifier::new(secret, SignatureAlgorithm::Sha1);
///
/// let body = b"Hello, World!";
/// let signature = verifier.sign(body).unwrap();
///
/// assert!(verifier.verify(body, &signature));
/// assert!(!verifier.verify(b"Hello, World?", &signature));
/// ```
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: WebhookSecret,
    algorithm: SignatureAlgorithm,
}

impl SignatureVerifier {
    pub fn new(secret: WebhookSecret, algorithm: SignatureAlgorithm) -> Self {
        Self { secret, algorithm }
    }

    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    /// Lowercase name of the header the signature is read from.
    pub fn header_name(&self) -> &'static str {
        self.algorithm.header_name()
    }

    /// Returns `true` only if `presented` is exactly the signature of `payload`.
    pub fn verify(&self, payload: &[u8], presented: &str) -> bool {
        verify_signature(self.algorithm, self.secret.as_bytes(), payload, presented)
    }

    /// Sign `payload` the way the upstream platform does.
    pub fn sign(&self, payload: &[u8]) -> Result<String, ValidationError> {
        compute_signature(self.algorithm, self.secret.as_bytes(), payload)
    }
}

impl fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secret", &"<REDACTED>")
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

#[cfg(test)]
#[path = "signature_tests.rs"]
mod tests;
