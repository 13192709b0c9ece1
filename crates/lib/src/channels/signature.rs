//! X-Hub-Signature verification (HMAC-SHA1 over the raw request body).
//!
//! The platform sends `X-Hub-Signature: sha1=<hex>` where `<hex>` is the HMAC-SHA1 of the
//! exact body bytes keyed with the app secret.

use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Header carrying the body signature.
pub const SIGNATURE_HEADER: &str = "X-Hub-Signature";

const SIGNATURE_PREFIX: &str = "sha1=";

/// Header value the platform would send for `payload` signed with `secret`.
pub fn sign_payload(secret: &str, payload: &[u8]) -> Option<String> {
    let mut mac = HmacSha1::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(payload);
    Some(format!(
        "{}{}",
        SIGNATURE_PREFIX,
        hex::encode(mac.finalize().into_bytes())
    ))
}

/// Verify `signature_header` against `payload`. Fails closed: a missing header, missing
/// secret, wrong algorithm tag or malformed hex all return false.
pub fn verify_signature(
    payload: &[u8],
    signature_header: Option<&str>,
    secret: Option<&str>,
) -> bool {
    let Some(header) = signature_header else {
        log::warn!("no signature provided in request");
        return false;
    };
    let Some(secret) = secret else {
        log::error!("app secret not configured, cannot verify signature");
        return false;
    };
    let Some(hex_sig) = header.trim().strip_prefix(SIGNATURE_PREFIX) else {
        log::warn!("invalid signature header format (missing sha1= prefix)");
        return false;
    };
    let Ok(expected) = hex::decode(hex_sig) else {
        log::warn!("invalid signature header format (not hex)");
        return false;
    };
    let mut mac = match HmacSha1::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(e) => {
            log::error!("error verifying signature: {}", e);
            return false;
        }
    };
    mac.update(payload);
    // verify_slice compares in constant time
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "app_secret_123";

    #[test]
    fn signed_payload_verifies() {
        let body = br#"{"object":"page","entry":[]}"#;
        let sig = sign_payload(SECRET, body).unwrap();
        assert!(sig.starts_with("sha1="));
        assert_eq!(sig.len(), 5 + 40);
        assert!(verify_signature(body, Some(&sig), Some(SECRET)));
    }

    #[test]
    fn known_vector() {
        // RFC 2202 test case 2
        let sig = sign_payload("Jefe", b"what do ya want for nothing?").unwrap();
        assert_eq!(sig, "sha1=effcdf6ae5eb2fa2d27416d5f184df9c259a7c79");
    }

    #[test]
    fn any_body_mutation_fails() {
        let body = b"hello world".to_vec();
        let sig = sign_payload(SECRET, &body).unwrap();
        for i in 0..body.len() {
            let mut mutated = body.clone();
            mutated[i] ^= 0x01;
            assert!(!verify_signature(&mutated, Some(&sig), Some(SECRET)), "byte {}", i);
        }
    }

    #[test]
    fn any_signature_mutation_fails() {
        let body = b"hello world";
        let sig = sign_payload(SECRET, body).unwrap();
        for i in "sha1=".len()..sig.len() {
            let mut bytes = sig.clone().into_bytes();
            bytes[i] = if bytes[i] == b'0' { b'1' } else { b'0' };
            let mutated = String::from_utf8(bytes).unwrap();
            assert!(!verify_signature(body, Some(&mutated), Some(SECRET)), "index {}", i);
        }
    }

    #[test]
    fn wrong_secret_fails() {
        let body = b"payload";
        let sig = sign_payload(SECRET, body).unwrap();
        assert!(!verify_signature(body, Some(&sig), Some("other")));
    }

    #[test]
    fn missing_header_or_secret_fails_closed() {
        let body = b"payload";
        let sig = sign_payload(SECRET, body).unwrap();
        assert!(!verify_signature(body, None, Some(SECRET)));
        assert!(!verify_signature(body, Some(&sig), None));
    }

    #[test]
    fn wrong_prefix_or_bad_hex_fails() {
        let body = b"payload";
        let sig = sign_payload(SECRET, body).unwrap();
        let sha256_tagged = sig.replacen("sha1=", "sha256=", 1);
        assert!(!verify_signature(body, Some(&sha256_tagged), Some(SECRET)));
        assert!(!verify_signature(body, Some("sha1=zz"), Some(SECRET)));
        assert!(!verify_signature(body, Some("sha1="), Some(SECRET)));
    }
}
