use axum::http::HeaderMap;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::models::WebhookHeaders;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-whoop-signature";
pub const TIMESTAMP_HEADER: &str = "x-whoop-signature-timestamp";

/// Maximum age of a delivery before it is treated as a replay
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

// Epoch values at or above this are milliseconds (year 2001 onwards in ms,
// year ~33658 in seconds)
const MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

/// Pull the WHOOP signature headers off a request.
///
/// Returns `None` when either header is missing or blank, the timestamp is not
/// an epoch integer, or it is older than `tolerance_secs` or in the future.
pub fn extract_webhook_headers(
    headers: &HeaderMap,
    now: DateTime<Utc>,
    tolerance_secs: i64,
) -> Option<WebhookHeaders> {
    let (Some(signature), Some(timestamp)) = (
        header_text(headers, SIGNATURE_HEADER),
        header_text(headers, TIMESTAMP_HEADER),
    ) else {
        tracing::warn!(reason = "missing_header", "WHOOP webhook signature headers missing");
        return None;
    };

    let Some(sent_at_ms) = parse_timestamp_ms(&timestamp) else {
        tracing::warn!(reason = "invalid_timestamp", "WHOOP webhook timestamp is not an epoch value");
        return None;
    };

    let age_ms = now.timestamp_millis() - sent_at_ms;
    if age_ms < 0 {
        tracing::warn!(reason = "timestamp_in_future", age_ms, "WHOOP webhook rejected");
        return None;
    }
    if age_ms > tolerance_secs.saturating_mul(1000) {
        tracing::warn!(reason = "timestamp_expired", age_ms, "WHOOP webhook rejected");
        return None;
    }

    Some(WebhookHeaders {
        signature,
        timestamp,
    })
}

/// Verify a WHOOP webhook signature.
///
/// The expected signature is base64(HMAC-SHA256(secret, timestamp + body)),
/// compared in constant time. The timestamp must lie within
/// `tolerance_secs` of `now`. Every failure is logged and reported as `false`.
pub fn verify_whoop_webhook(
    body: &str,
    signature: &str,
    timestamp: &str,
    secret: Option<&str>,
    now: DateTime<Utc>,
    tolerance_secs: i64,
) -> bool {
    let Some(secret) = secret.filter(|s| !s.is_empty()) else {
        tracing::error!(reason = "missing_secret", "WHOOP webhook secret is not configured");
        return false;
    };

    let Some(sent_at_ms) = parse_timestamp_ms(timestamp) else {
        tracing::warn!(reason = "invalid_timestamp", "WHOOP webhook rejected");
        return false;
    };

    let skew_ms = (now.timestamp_millis() - sent_at_ms).abs();
    if skew_ms > tolerance_secs.saturating_mul(1000) {
        tracing::warn!(reason = "timestamp_out_of_window", skew_ms, "WHOOP webhook rejected");
        return false;
    }

    let provided = match STANDARD.decode(signature.trim()) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(reason = "malformed_signature", error = %e, "WHOOP webhook rejected");
            return false;
        }
    };

    let mac = match signing_mac(secret, timestamp, body) {
        Some(mac) => mac,
        None => {
            tracing::error!(reason = "invalid_secret", "WHOOP webhook secret cannot key HMAC");
            return false;
        }
    };

    // verify_slice compares in constant time
    if mac.verify_slice(&provided).is_err() {
        tracing::warn!(reason = "signature_mismatch", "WHOOP webhook rejected");
        return false;
    }

    true
}

/// Sender-side signature: base64(HMAC-SHA256(secret, timestamp + body))
pub fn sign_whoop_payload(body: &str, timestamp: &str, secret: &str) -> Option<String> {
    let mac = signing_mac(secret, timestamp, body)?;
    Some(STANDARD.encode(mac.finalize().into_bytes()))
}

fn signing_mac(secret: &str, timestamp: &str, body: &str) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(timestamp.as_bytes());
    mac.update(body.as_bytes());
    Some(mac)
}

fn header_text(headers: &HeaderMap, name: &str) -> Option<String> {
    let value = headers.get(name)?.to_str().ok()?.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Parse an epoch timestamp in seconds or milliseconds into milliseconds
fn parse_timestamp_ms(raw: &str) -> Option<i64> {
    let value: i64 = raw.trim().parse().ok()?;
    if value <= 0 {
        return None;
    }
    if value >= MILLIS_THRESHOLD {
        Some(value)
    } else {
        value.checked_mul(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use chrono::Duration;

    const SECRET: &str = "whsec_test";
    const BODY: &str = r#"{"user_id":10129,"id":173958,"type":"recovery.updated","trace_id":"t-1"}"#;

    fn headers(signature: Option<&str>, timestamp: Option<&str>) -> HeaderMap {
        let mut map = HeaderMap::new();
        if let Some(sig) = signature {
            map.insert(SIGNATURE_HEADER, HeaderValue::from_str(sig).unwrap());
        }
        if let Some(ts) = timestamp {
            map.insert(TIMESTAMP_HEADER, HeaderValue::from_str(ts).unwrap());
        }
        map
    }

    #[test]
    fn test_valid_signature_ms_timestamp() {
        let now = Utc::now();
        let ts = now.timestamp_millis().to_string();
        let sig = sign_whoop_payload(BODY, &ts, SECRET).unwrap();

        assert!(verify_whoop_webhook(BODY, &sig, &ts, Some(SECRET), now, 300));
    }

    #[test]
    fn test_valid_signature_seconds_timestamp() {
        let now = Utc::now();
        let ts = now.timestamp().to_string();
        let sig = sign_whoop_payload(BODY, &ts, SECRET).unwrap();

        assert!(verify_whoop_webhook(BODY, &sig, &ts, Some(SECRET), now, 300));
    }

    #[test]
    fn test_rejects_tampered_body() {
        let now = Utc::now();
        let ts = now.timestamp_millis().to_string();
        let sig = sign_whoop_payload(BODY, &ts, SECRET).unwrap();
        let tampered = BODY.replace("10129", "10130");

        assert!(!verify_whoop_webhook(&tampered, &sig, &ts, Some(SECRET), now, 300));
    }

    #[test]
    fn test_rejects_wrong_secret() {
        let now = Utc::now();
        let ts = now.timestamp_millis().to_string();
        let sig = sign_whoop_payload(BODY, &ts, "other").unwrap();

        assert!(!verify_whoop_webhook(BODY, &sig, &ts, Some(SECRET), now, 300));
    }

    #[test]
    fn test_rejects_missing_secret() {
        let now = Utc::now();
        let ts = now.timestamp_millis().to_string();
        let sig = sign_whoop_payload(BODY, &ts, SECRET).unwrap();

        assert!(!verify_whoop_webhook(BODY, &sig, &ts, None, now, 300));
        assert!(!verify_whoop_webhook(BODY, &sig, &ts, Some(""), now, 300));
    }

    #[test]
    fn test_rejects_malformed_base64() {
        let now = Utc::now();
        let ts = now.timestamp_millis().to_string();

        assert!(!verify_whoop_webhook(BODY, "not base64!!", &ts, Some(SECRET), now, 300));
    }

    #[test]
    fn test_rejects_stale_and_future_timestamps() {
        let now = Utc::now();
        for offset in [Duration::minutes(6), Duration::minutes(-6)] {
            let ts = (now - offset).timestamp_millis().to_string();
            let sig = sign_whoop_payload(BODY, &ts, SECRET).unwrap();
            assert!(!verify_whoop_webhook(BODY, &sig, &ts, Some(SECRET), now, 300));
        }
    }

    #[test]
    fn test_signature_covers_timestamp() {
        let now = Utc::now();
        let ts = now.timestamp_millis().to_string();
        let other_ts = (now - Duration::seconds(1)).timestamp_millis().to_string();
        let sig = sign_whoop_payload(BODY, &other_ts, SECRET).unwrap();

        assert!(!verify_whoop_webhook(BODY, &sig, &ts, Some(SECRET), now, 300));
    }

    #[test]
    fn test_extract_headers() {
        let now = Utc::now();
        let ts = (now - Duration::seconds(30)).timestamp_millis().to_string();

        let extracted = extract_webhook_headers(&headers(Some("abc="), Some(&ts)), now, 300).unwrap();
        assert_eq!(extracted.signature, "abc=");
        assert_eq!(extracted.timestamp, ts);
    }

    #[test]
    fn test_extract_headers_missing() {
        let now = Utc::now();
        let ts = now.timestamp_millis().to_string();

        assert!(extract_webhook_headers(&headers(None, Some(&ts)), now, 300).is_none());
        assert!(extract_webhook_headers(&headers(Some("abc="), None), now, 300).is_none());
        assert!(extract_webhook_headers(&headers(Some(" "), Some(&ts)), now, 300).is_none());
    }

    #[test]
    fn test_extract_headers_time_window() {
        let now = Utc::now();
        let stale = (now - Duration::minutes(5) - Duration::seconds(1))
            .timestamp_millis()
            .to_string();
        let future = (now + Duration::seconds(5)).timestamp_millis().to_string();
        let garbage = "yesterday".to_string();

        for ts in [stale, future, garbage] {
            assert!(extract_webhook_headers(&headers(Some("abc="), Some(&ts)), now, 300).is_none());
        }
    }

    #[test]
    fn test_huge_tolerance_does_not_overflow() {
        let now = Utc::now();
        let ts = now.timestamp_millis().to_string();
        let sig = sign_whoop_payload(BODY, &ts, SECRET).unwrap();

        assert!(verify_whoop_webhook(BODY, &sig, &ts, Some(SECRET), now, i64::MAX / 100));
        assert!(extract_webhook_headers(&headers(Some(&sig), Some(&ts)), now, i64::MAX).is_some());
    }
}
