//! # Webhook Signature Validation
//!
//! HMAC-SHA256 validation of the `X-Hub-Signature-256` header GitHub
//! attaches when the webhook has a shared secret configured.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Expected header prefix for SHA-256 signatures.
const SIGNATURE_PREFIX: &str = "sha256=";

/// Verify a webhook signature header against the raw request body.
///
/// The header must carry `sha256=<hex digest>`. Comparison is constant-time
/// through the MAC verification itself; any malformed header simply fails
/// verification.
pub fn verify_signature(secret: &str, body: &[u8], signature_header: &str) -> bool {
    let Some(hex_digest) = signature_header.strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };

    let Ok(expected) = hex::decode(hex_digest) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
#[path = "signature_tests.rs"]
mod tests;
