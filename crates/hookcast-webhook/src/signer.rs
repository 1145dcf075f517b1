//! HMAC-SHA256 payload signing.
//!
//! Signatures are computed over the exact body bytes that go on the wire and
//! hex-encoded. Receivers must verify against the raw body, before any JSON
//! re-serialization.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::WebhookSecret;

type HmacSha256 = Hmac<Sha256>;

/// Signs `payload` with `secret` and returns the lowercase hex signature.
pub fn sign(payload: &[u8], secret: &[u8]) -> String {
    hex::encode(mac(payload, secret).finalize().into_bytes())
}

/// Verifies a hex signature in constant time.
///
/// Malformed hex never verifies.
pub fn verify(payload: &[u8], signature: &str, secret: &[u8]) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    mac(payload, secret).verify_slice(&expected).is_ok()
}

fn mac(payload: &[u8], secret: &[u8]) -> HmacSha256 {
    // HMAC accepts keys of any length, so this never fails.
    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => unreachable!("HMAC key can be of any size"),
    };
    mac.update(payload);
    mac
}

/// Signer bound to one subscription secret.
#[derive(Debug, Clone)]
pub struct WebhookSigner {
    secret: WebhookSecret,
}

impl WebhookSigner {
    /// Creates a signer for the given secret.
    pub fn new(secret: WebhookSecret) -> Self {
        Self { secret }
    }

    /// Signs the payload bytes.
    pub fn sign(&self, payload: &[u8]) -> String {
        sign(payload, self.secret.expose())
    }

    /// Verifies a hex signature over the payload bytes.
    pub fn verify(&self, payload: &[u8], signature: &str) -> bool {
        verify(payload, signature, self.secret.expose())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let payload = br#"{"event":"qr.validated","data":{"code":"ABC123"}}"#;
        let signature = sign(payload, b"secret");

        assert!(verify(payload, &signature, b"secret"));
    }

    #[test]
    fn test_signature_is_hex_encoded() {
        let signature = sign(b"test", b"secret");

        // 32 bytes of SHA-256 output
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(signature, signature.to_lowercase());
    }

    #[test]
    fn test_known_vector() {
        // RFC 4231 test case 2
        let signature = sign(b"what do ya want for nothing?", b"Jefe");
        assert_eq!(
            signature,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_verify_fails_with_modified_payload() {
        let original = br#"{"amount":100}"#;
        let modified = br#"{"amount":900}"#;
        let signature = sign(original, b"secret");

        assert!(!verify(modified, &signature, b"secret"));
    }

    #[test]
    fn test_verify_fails_with_single_flipped_byte() {
        let payload = b"{\"event\":\"tag.added\"}".to_vec();
        let signature = sign(&payload, b"secret");

        for index in 0..payload.len() {
            let mut tampered = payload.clone();
            tampered[index] ^= 0x01;
            assert!(!verify(&tampered, &signature, b"secret"));
        }
    }

    #[test]
    fn test_verify_fails_with_wrong_secret() {
        let signature = sign(b"payload", b"secret1");
        assert!(!verify(b"payload", &signature, b"secret2"));
    }

    #[test]
    fn test_verify_rejects_malformed_signature() {
        assert!(!verify(b"payload", "not-hex", b"secret"));
        assert!(!verify(b"payload", "", b"secret"));
        assert!(!verify(b"payload", "abcd", b"secret"));
    }

    #[test]
    fn test_verify_accepts_uppercase_hex() {
        let signature = sign(b"payload", b"secret").to_uppercase();
        assert!(verify(b"payload", &signature, b"secret"));
    }

    #[test]
    fn test_bound_signer() {
        let signer = WebhookSigner::new(WebhookSecret::new("secret"));
        let signature = signer.sign(b"payload");

        assert_eq!(signature, sign(b"payload", b"secret"));
        assert!(signer.verify(b"payload", &signature));
        assert!(!signer.verify(b"other", &signature));
    }
}
