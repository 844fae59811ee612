//! Shared-secret request authentication for the events webhook.

use std::time::{SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";
pub const SIGNATURE_HEADER: &str = "x-slack-signature";

const SIGNATURE_PREFIX: &str = "v0=";
const DEFAULT_TOLERANCE_SECONDS: u64 = 300;

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("signing secret must not be empty")]
    EmptySecret,
    #[error("timestamp header is missing")]
    MissingTimestamp,
    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),
    #[error("timestamp skew {skew}s exceeds tolerance {tolerance}s")]
    StaleTimestamp { skew: u64, tolerance: u64 },
    #[error("signature header is missing")]
    MissingSignature,
    #[error("signature must use {SIGNATURE_PREFIX}<hex> format")]
    MalformedSignature,
    #[error("signature verification failed")]
    Mismatch,
}

/// Verifies the `v0` HMAC-SHA256 scheme: hex digest over the literal byte
/// string `v0:<timestamp>:<body>`, keyed by the signing secret, with a replay
/// tolerance window on the timestamp. Callers must answer any failure with an
/// opaque rejection; the precise reason is only for the logs.
pub struct SignatureVerifier {
    secret: String,
    tolerance_seconds: u64,
    timestamp_header: String,
    signature_header: String,
}

impl SignatureVerifier {
    pub fn new(secret: impl Into<String>) -> Result<Self, SignatureError> {
        let secret = secret.into();
        if secret.trim().is_empty() {
            return Err(SignatureError::EmptySecret);
        }
        Ok(Self {
            secret,
            tolerance_seconds: DEFAULT_TOLERANCE_SECONDS,
            timestamp_header: TIMESTAMP_HEADER.to_string(),
            signature_header: SIGNATURE_HEADER.to_string(),
        })
    }

    pub fn with_tolerance_seconds(mut self, tolerance_seconds: u64) -> Self {
        self.tolerance_seconds = tolerance_seconds;
        self
    }

    pub fn with_header_names(
        mut self,
        timestamp_header: impl Into<String>,
        signature_header: impl Into<String>,
    ) -> Self {
        self.timestamp_header = timestamp_header.into();
        self.signature_header = signature_header.into();
        self
    }

    pub fn timestamp_header(&self) -> &str {
        &self.timestamp_header
    }

    pub fn signature_header(&self) -> &str {
        &self.signature_header
    }

    pub fn verify(
        &self,
        body: &[u8],
        timestamp: Option<&str>,
        signature: Option<&str>,
        now_unix_seconds: u64,
    ) -> Result<(), SignatureError> {
        let timestamp = timestamp
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(SignatureError::MissingTimestamp)?;
        let timestamp_seconds = timestamp
            .parse::<u64>()
            .map_err(|_| SignatureError::InvalidTimestamp(timestamp.to_string()))?;

        let skew = now_unix_seconds.abs_diff(timestamp_seconds);
        if skew > self.tolerance_seconds {
            return Err(SignatureError::StaleTimestamp {
                skew,
                tolerance: self.tolerance_seconds,
            });
        }

        let signature = signature
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(SignatureError::MissingSignature)?;
        let digest_hex = signature
            .strip_prefix(SIGNATURE_PREFIX)
            .ok_or(SignatureError::MalformedSignature)?;
        let digest = decode_hex(digest_hex)?;

        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret.as_bytes())
            .map_err(|_| SignatureError::EmptySecret)?;
        mac.update(b"v0:");
        mac.update(timestamp.as_bytes());
        mac.update(b":");
        mac.update(body);
        mac.verify_slice(&digest)
            .map_err(|_| SignatureError::Mismatch)
    }
}

fn decode_hex(value: &str) -> Result<Vec<u8>, SignatureError> {
    if value.is_empty() || value.len() % 2 != 0 {
        return Err(SignatureError::MalformedSignature);
    }
    let raw = value.as_bytes();
    let mut bytes = Vec::with_capacity(raw.len() / 2);
    for pair in raw.chunks_exact(2) {
        let hex = std::str::from_utf8(pair).map_err(|_| SignatureError::MalformedSignature)?;
        let byte =
            u8::from_str_radix(hex, 16).map_err(|_| SignatureError::MalformedSignature)?;
        bytes.push(byte);
    }
    Ok(bytes)
}

pub fn current_unix_timestamp_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "8f742231b10e8888abcd99yyyzzz85a5";
    const NOW: u64 = 1_700_000_000;

    fn sign(secret: &str, timestamp: u64, body: &str) -> String {
        let mut mac =
            Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("hmac accepts any key");
        mac.update(format!("v0:{timestamp}:{body}").as_bytes());
        let digest = mac.finalize().into_bytes();
        let hex = digest
            .iter()
            .map(|byte| format!("{byte:02x}"))
            .collect::<String>();
        format!("v0={hex}")
    }

    fn verifier() -> SignatureVerifier {
        SignatureVerifier::new(SECRET).expect("non-empty secret")
    }

    #[test]
    fn accepts_a_correctly_signed_request() {
        let body = r#"{"type":"event_callback"}"#;
        let signature = sign(SECRET, NOW, body);
        verifier()
            .verify(body.as_bytes(), Some(&NOW.to_string()), Some(&signature), NOW)
            .expect("valid signature must be accepted");
    }

    #[test]
    fn rejects_a_tampered_body() {
        let signature = sign(SECRET, NOW, r#"{"type":"event_callback"}"#);
        let err = verifier()
            .verify(
                br#"{"type":"event_callback"}"#,
                Some(&NOW.to_string()),
                Some(&signature),
                NOW,
            )
            .expect_err("flipped body byte must be rejected");
        assert!(matches!(err, SignatureError::Mismatch));
    }

    #[test]
    fn rejects_a_tampered_timestamp() {
        let body = "payload";
        let signature = sign(SECRET, NOW, body);
        let err = verifier()
            .verify(
                body.as_bytes(),
                Some(&(NOW + 1).to_string()),
                Some(&signature),
                NOW,
            )
            .expect_err("timestamp not covered by the signature must be rejected");
        assert!(matches!(err, SignatureError::Mismatch));
    }

    #[test]
    fn rejects_an_identical_length_forged_signature() {
        let body = "payload";
        let mut forged = sign(SECRET, NOW, body).into_bytes();
        let last = forged.last_mut().expect("signature is non-empty");
        *last = if *last == b'0' { b'1' } else { b'0' };
        let forged = String::from_utf8(forged).expect("still ascii");
        let err = verifier()
            .verify(body.as_bytes(), Some(&NOW.to_string()), Some(&forged), NOW)
            .expect_err("forged signature must be rejected");
        assert!(matches!(err, SignatureError::Mismatch));
    }

    #[test]
    fn rejects_timestamps_outside_the_tolerance_window_in_both_directions() {
        let body = "payload";
        for timestamp in [NOW - 301, NOW + 301] {
            let signature = sign(SECRET, timestamp, body);
            let err = verifier()
                .verify(
                    body.as_bytes(),
                    Some(&timestamp.to_string()),
                    Some(&signature),
                    NOW,
                )
                .expect_err("stale timestamp must be rejected even with a valid signature");
            assert!(matches!(err, SignatureError::StaleTimestamp { .. }));
        }
        // Just inside the window still passes.
        let signature = sign(SECRET, NOW - 300, body);
        verifier()
            .verify(
                body.as_bytes(),
                Some(&(NOW - 300).to_string()),
                Some(&signature),
                NOW,
            )
            .expect("skew equal to the tolerance is allowed");
    }

    #[test]
    fn rejects_missing_or_malformed_headers() {
        let body = "payload";
        let signature = sign(SECRET, NOW, body);
        assert!(matches!(
            verifier().verify(body.as_bytes(), None, Some(&signature), NOW),
            Err(SignatureError::MissingTimestamp)
        ));
        assert!(matches!(
            verifier().verify(body.as_bytes(), Some("not-a-number"), Some(&signature), NOW),
            Err(SignatureError::InvalidTimestamp(_))
        ));
        assert!(matches!(
            verifier().verify(body.as_bytes(), Some(&NOW.to_string()), None, NOW),
            Err(SignatureError::MissingSignature)
        ));
        assert!(matches!(
            verifier().verify(
                body.as_bytes(),
                Some(&NOW.to_string()),
                Some("sha256=abcd"),
                NOW
            ),
            Err(SignatureError::MalformedSignature)
        ));
        assert!(matches!(
            verifier().verify(body.as_bytes(), Some(&NOW.to_string()), Some("v0=xyz"), NOW),
            Err(SignatureError::MalformedSignature)
        ));
    }

    #[test]
    fn construction_rejects_an_empty_secret() {
        assert!(matches!(
            SignatureVerifier::new("   "),
            Err(SignatureError::EmptySecret)
        ));
    }

    #[test]
    fn header_names_are_overridable() {
        let verifier = verifier().with_header_names("x-relay-ts", "x-relay-sig");
        assert_eq!(verifier.timestamp_header(), "x-relay-ts");
        assert_eq!(verifier.signature_header(), "x-relay-sig");
    }
}
