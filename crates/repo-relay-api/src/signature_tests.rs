//! Tests for webhook signature validation.

use super::*;

fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

#[test]
fn test_valid_signature_passes() {
    let body = br#"{"zen":"Design for failure."}"#;
    let header = sign("s3cret", body);

    assert!(verify_signature("s3cret", body, &header));
}

#[test]
fn test_wrong_secret_fails() {
    let body = b"payload";
    let header = sign("s3cret", body);

    assert!(!verify_signature("other", body, &header));
}

#[test]
fn test_tampered_body_fails() {
    let header = sign("s3cret", b"payload");

    assert!(!verify_signature("s3cret", b"payload!", &header));
}

#[test]
fn test_missing_prefix_fails() {
    let body = b"payload";
    let header = sign("s3cret", body);
    let bare = header.strip_prefix("sha256=").unwrap();

    assert!(!verify_signature("s3cret", body, bare));
}

#[test]
fn test_sha1_prefix_fails() {
    assert!(!verify_signature(
        "s3cret",
        b"payload",
        "sha1=2ef7bde608ce5404e97d5f042f95f89f1c232871"
    ));
}

#[test]
fn test_non_hex_digest_fails() {
    assert!(!verify_signature("s3cret", b"payload", "sha256=not-hex-at-all"));
}

#[test]
fn test_empty_header_fails() {
    assert!(!verify_signature("s3cret", b"payload", ""));
}
