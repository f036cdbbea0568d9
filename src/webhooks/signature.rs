//! GitHub webhook signature verification using HMAC-SHA256.
//!
//! GitHub signs webhook payloads with a shared secret and supplies the
//! signature in the `X-Hub-Signature-256` header as `sha256=<hex>`. Verification
//! is the first step in webhook processing: a request with a bad signature is
//! rejected before the body is parsed or any collaborator is contacted.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Parses a GitHub signature header (e.g., "sha256=abc123...") into raw bytes.
///
/// Returns `None` for malformed headers: missing or wrong algorithm prefix,
/// invalid or odd-length hex. Never panics.
pub fn parse_signature_header(header: &str) -> Option<Vec<u8>> {
    let hex_sig = header.strip_prefix("sha256=")?;
    hex::decode(hex_sig).ok()
}

/// Computes the HMAC-SHA256 signature of a payload under the given secret.
///
/// Used by tests to forge valid deliveries; production only ever verifies.
pub fn compute_signature(payload: &[u8], secret: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(payload);
    mac.finalize().into_bytes().to_vec()
}

/// Formats a signature as a GitHub-style header value (`sha256=<hex>`).
pub fn format_signature_header(signature: &[u8]) -> String {
    format!("sha256={}", hex::encode(signature))
}

/// Verifies a webhook signature against the payload and secret.
///
/// Returns `false` on any parse failure or mismatch. The comparison is
/// constant-time (via `Mac::verify_slice`); a byte-by-byte comparison would
/// leak how much of the signature prefix matched.
pub fn verify_signature(payload: &[u8], signature_header: &str, secret: &[u8]) -> bool {
    let expected = match parse_signature_header(signature_header) {
        Some(sig) => sig,
        None => return false,
    };

    let mut mac = match HmacSha256::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(payload);

    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parse_valid_header() {
        assert_eq!(
            parse_signature_header("sha256=1234abcd"),
            Some(vec![0x12, 0x34, 0xab, 0xcd])
        );
    }

    #[test]
    fn parse_rejects_malformed_headers() {
        assert_eq!(parse_signature_header(""), None);
        assert_eq!(parse_signature_header("1234abcd"), None);
        assert_eq!(parse_signature_header("sha1=1234abcd"), None);
        assert_eq!(parse_signature_header("sha256=xyz"), None);
        // Odd-length hex is invalid
        assert_eq!(parse_signature_header("sha256=abc"), None);
    }

    /// Payload and secret from GitHub's webhook validation documentation:
    /// <https://docs.github.com/en/webhooks/using-webhooks/validating-webhook-deliveries>
    #[test]
    fn github_documentation_vector() {
        let payload = b"Hello, World!";
        let secret = b"It's a Secret to Everybody";

        let header = format_signature_header(&compute_signature(payload, secret));
        assert_eq!(
            header,
            "sha256=757107ea0eb2509fc211221cce984b8a37570b6d7586c22c46f4379c8b043e17"
        );
        assert!(verify_signature(payload, &header, secret));
    }

    #[test]
    fn wrong_secret_fails() {
        let payload = b"test payload";
        let header = format_signature_header(&compute_signature(payload, b"correct"));

        assert!(verify_signature(payload, &header, b"correct"));
        assert!(!verify_signature(payload, &header, b"wrong"));
    }

    #[test]
    fn malformed_header_returns_false() {
        let payload = b"test";
        let secret = b"secret";

        assert!(!verify_signature(payload, "", secret));
        assert!(!verify_signature(payload, "sha256=", secret));
        assert!(!verify_signature(payload, "sha256=zzzz", secret));
        assert!(!verify_signature(payload, "not-a-header", secret));
    }

    #[test]
    fn empty_payload_and_empty_secret_roundtrip() {
        let header = format_signature_header(&compute_signature(b"", b""));
        assert!(verify_signature(b"", &header, b""));
    }

    proptest! {
        /// Signing then verifying under the same secret always succeeds.
        #[test]
        fn prop_sign_verify_roundtrip(payload: Vec<u8>, secret: Vec<u8>) {
            let header = format_signature_header(&compute_signature(&payload, &secret));
            prop_assert!(verify_signature(&payload, &header, &secret));
        }

        /// Tamper sensitivity: flipping a single bit of the payload breaks
        /// verification.
        #[test]
        fn prop_flipped_payload_bit_fails(
            payload in proptest::collection::vec(any::<u8>(), 1..256),
            secret: Vec<u8>,
            byte_index: prop::sample::Index,
            bit in 0u8..8,
        ) {
            let header = format_signature_header(&compute_signature(&payload, &secret));

            let mut tampered = payload.clone();
            let i = byte_index.index(tampered.len());
            tampered[i] ^= 1 << bit;

            prop_assert!(!verify_signature(&tampered, &header, &secret));
        }

        /// Tamper sensitivity: flipping a single bit of the secret breaks
        /// verification.
        #[test]
        fn prop_flipped_secret_bit_fails(
            payload: Vec<u8>,
            secret in proptest::collection::vec(any::<u8>(), 1..64),
            byte_index: prop::sample::Index,
            bit in 0u8..8,
        ) {
            let header = format_signature_header(&compute_signature(&payload, &secret));

            let mut tampered = secret.clone();
            let i = byte_index.index(tampered.len());
            tampered[i] ^= 1 << bit;

            prop_assert!(!verify_signature(&payload, &header, &tampered));
        }

        /// Header round-trip: parse(format(sig)) == sig.
        #[test]
        fn prop_format_parse_roundtrip(signature: [u8; 32]) {
            let header = format_signature_header(&signature);
            prop_assert_eq!(parse_signature_header(&header), Some(signature.to_vec()));
        }

        /// Arbitrary headers never cause a panic.
        #[test]
        fn prop_arbitrary_header_no_panic(header: String, payload: Vec<u8>, secret: Vec<u8>) {
            let _ = parse_signature_header(&header);
            let _ = verify_signature(&payload, &header, &secret);
        }
    }
}
