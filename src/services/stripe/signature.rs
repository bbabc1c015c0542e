use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::StripeServiceError;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";
pub const DEFAULT_TOLERANCE_SECONDS: i64 = 300;

struct ParsedHeader<'a> {
    timestamp: i64,
    signatures: Vec<&'a str>,
}

fn parse_header(header: &str) -> Result<ParsedHeader<'_>, StripeServiceError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = value.parse::<i64>().ok();
            }
            Some(("v1", value)) if !value.is_empty() => signatures.push(value),
            _ => {}
        }
    }
    let timestamp = timestamp
        .ok_or_else(|| StripeServiceError::Webhook("signature header has no timestamp".into()))?;
    if signatures.is_empty() {
        return Err(StripeServiceError::Webhook(
            "signature header has no v1 signature".into(),
        ));
    }
    Ok(ParsedHeader {
        timestamp,
        signatures,
    })
}

fn compute(secret: &str, timestamp: i64, payload: &[u8]) -> Result<Vec<u8>, StripeServiceError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| StripeServiceError::Config(e.to_string()))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Checks `header` against the raw request bytes. The payload must be exactly
/// what arrived on the wire; a re-serialized body will not verify.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
    tolerance_seconds: i64,
) -> Result<(), StripeServiceError> {
    let parsed = parse_header(header)?;
    if now.abs_diff(parsed.timestamp) > tolerance_seconds.unsigned_abs() {
        return Err(StripeServiceError::Webhook(
            "signature timestamp outside tolerance".into(),
        ));
    }

    let expected = compute(secret, parsed.timestamp, payload)?;
    let matched = parsed.signatures.iter().any(|candidate| {
        hex::decode(candidate)
            .map(|provided| bool::from(expected.as_slice().ct_eq(provided.as_slice())))
            .unwrap_or(false)
    });

    if matched {
        Ok(())
    } else {
        Err(StripeServiceError::Webhook(
            "no signature matched the payload".into(),
        ))
    }
}

/// Builds a header value the way the processor does. Used by test doubles and tooling.
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let digest = compute(secret, timestamp, payload)
        .map(hex::encode)
        .unwrap_or_default();
    format!("t={},v1={}", timestamp, digest)
}
