//! HMAC request signing for the downstream API proxy
//!
//! The broker forwards API calls on the user's behalf using per-user
//! credentials. Each request is signed with HMAC-SHA256 over
//!
//! ```text
//! {timestamp}\n{METHOD}\n{path}\n{sha256_hex(canonical_body)}
//! ```
//!
//! where the canonical body is key-sorted, separator-compact JSON with
//! non-ASCII characters escaped as `\uXXXX`, and the method is uppercased.
//! The proxy verifies the same construction, so the canonicalization must
//! be bit-identical on both sides. serde_json's default `Map` is
//! BTreeMap-backed, which yields sorted keys; the `preserve_order` feature
//! must stay off.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt::Write;

type HmacSha256 = Hmac<Sha256>;

/// Serialize a JSON body in canonical form: sorted keys, compact
/// separators, no extra whitespace, non-ASCII escaped as `\uXXXX`
/// (UTF-16 surrogate pairs above the BMP).
///
/// The escaping matters: the proxy verifier hashes the ASCII-escaped
/// form, so a raw UTF-8 body (common here, the user base writes Japanese)
/// would hash differently and fail verification.
pub fn canonical_json(body: &serde_json::Value) -> String {
    // Compact output and BTreeMap key ordering are serde_json defaults
    let raw = serde_json::to_string(body).unwrap_or_else(|_| "null".to_string());
    if raw.is_ascii() {
        return raw;
    }

    // Non-ASCII can only occur inside string literals, so escaping
    // per-char never alters JSON structure
    let mut out = String::with_capacity(raw.len() + 8);
    for c in raw.chars() {
        if c.is_ascii() {
            out.push(c);
        } else if (c as u32) <= 0xFFFF {
            let _ = write!(out, "\\u{:04x}", c as u32);
        } else {
            let v = c as u32 - 0x10000;
            let _ = write!(out, "\\u{:04x}\\u{:04x}", 0xD800 + (v >> 10), 0xDC00 + (v & 0x3FF));
        }
    }
    out
}

/// Current Unix timestamp, as the string the signature format expects.
pub fn current_timestamp() -> String {
    chrono::Utc::now().timestamp().to_string()
}

/// Compute the hex HMAC-SHA256 signature for a proxy request.
pub fn generate_signature(
    client_secret: &str,
    timestamp: &str,
    method: &str,
    path: &str,
    body: &serde_json::Value,
) -> String {
    let body_hash = hex::encode(Sha256::digest(canonical_json(body).as_bytes()));

    // Method must be uppercase to match the proxy's verification
    let signature_string = format!(
        "{}\n{}\n{}\n{}",
        timestamp,
        method.to_uppercase(),
        path,
        body_hash
    );

    let mut mac = HmacSha256::new_from_slice(client_secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(signature_string.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Compute the alternative simple signature: HMAC-SHA256 over the
/// timestamp directly concatenated with the canonical body, no method or
/// path binding. Used by endpoints that sign payloads rather than
/// requests.
pub fn generate_simple_signature(
    client_secret: &str,
    timestamp: &str,
    data: &serde_json::Value,
) -> String {
    let signature_string = format!("{}{}", timestamp, canonical_json(data));

    let mut mac = HmacSha256::new_from_slice(client_secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(signature_string.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a received signature in constant time.
pub fn verify_signature(
    client_secret: &str,
    timestamp: &str,
    method: &str,
    path: &str,
    body: &serde_json::Value,
    signature_hex: &str,
) -> bool {
    let Ok(signature) = hex::decode(signature_hex) else {
        return false;
    };

    let body_hash = hex::encode(Sha256::digest(canonical_json(body).as_bytes()));
    let signature_string = format!(
        "{}\n{}\n{}\n{}",
        timestamp,
        method.to_uppercase(),
        path,
        body_hash
    );

    let mut mac = HmacSha256::new_from_slice(client_secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(signature_string.as_bytes());
    mac.verify_slice(&signature).is_ok()
}

/// Build the signed header set for a proxy request.
pub fn signed_headers(
    client_id: &str,
    client_secret: &str,
    timestamp: &str,
    method: &str,
    path: &str,
    body: &serde_json::Value,
) -> HashMap<String, String> {
    let signature = generate_signature(client_secret, timestamp, method, path, body);

    let mut headers = HashMap::new();
    headers.insert("X-Client-ID".to_string(), client_id.to_string());
    headers.insert("X-Signature".to_string(), signature);
    headers.insert("X-Timestamp".to_string(), timestamp.to_string());
    headers.insert("Content-Type".to_string(), "application/json".to_string());

    tracing::debug!(client_id = %client_id, method = %method, path = %path,
        "Created signed proxy headers");
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_json_sorts_keys_compactly() {
        let body = json!({"zebra": 1, "apple": {"y": 2, "x": 3}});
        assert_eq!(canonical_json(&body), r#"{"apple":{"x":3,"y":2},"zebra":1}"#);
    }

    #[test]
    fn test_canonical_json_escapes_non_ascii() {
        let body = json!({"name": "山田"});
        assert_eq!(canonical_json(&body), r#"{"name":"山田"}"#);
    }

    #[test]
    fn test_canonical_json_surrogate_pairs_above_bmp() {
        let body = json!({"m": "😀"});
        assert_eq!(canonical_json(&body), r#"{"m":"😀"}"#);
    }

    // Expected values computed with an independent HMAC-SHA256
    // implementation over the documented signature format
    #[test]
    fn test_known_vector_ascii_body() {
        let body = json!({"q": "hello"});
        assert_eq!(
            generate_signature("secret", "1700000000", "post", "/v1/chat", &body),
            "042ea6ef0a07e06c337d25c5961c7cc8aa46f67ebbc1a9f91bbf31b848f0eda4"
        );
    }

    #[test]
    fn test_known_vector_japanese_body() {
        let body = json!({"name": "山田"});
        assert_eq!(
            generate_signature("secret", "1700000000", "post", "/v1/chat", &body),
            "43ae746268965275026eaafb0f9829ce07c2fb15eebea27cda33cc9a5fcfe77e"
        );
    }

    #[test]
    fn test_known_vector_simple_signature() {
        let data = json!({"b": 2, "a": 1});
        assert_eq!(
            generate_simple_signature("secret", "1700000000", &data),
            "3781fce5d1f6fa9794ce45f00f78b5cc0af63311899f7cc09a398c192cd581f1"
        );
    }

    #[test]
    fn test_signature_is_deterministic_and_method_case_insensitive() {
        let body = json!({"q": "hello"});

        let a = generate_signature("secret", "1700000000", "post", "/v1/chat", &body);
        let b = generate_signature("secret", "1700000000", "POST", "/v1/chat", &body);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_signature_changes_with_inputs() {
        let body = json!({"q": "hello"});
        let base = generate_signature("secret", "1700000000", "POST", "/v1/chat", &body);

        assert_ne!(
            base,
            generate_signature("other", "1700000000", "POST", "/v1/chat", &body)
        );
        assert_ne!(
            base,
            generate_signature("secret", "1700000001", "POST", "/v1/chat", &body)
        );
        assert_ne!(
            base,
            generate_signature("secret", "1700000000", "GET", "/v1/chat", &body)
        );
        assert_ne!(
            base,
            generate_signature("secret", "1700000000", "POST", "/v1/other", &body)
        );
        assert_ne!(
            base,
            generate_signature("secret", "1700000000", "POST", "/v1/chat", &json!({"q": "bye"}))
        );
    }

    #[test]
    fn test_simple_signature_has_no_request_binding() {
        let data = json!({"a": 1});
        let sig = generate_simple_signature("secret", "1700000000", &data);

        assert_ne!(
            sig,
            generate_signature("secret", "1700000000", "POST", "/v1/x", &data)
        );
        assert_ne!(sig, generate_simple_signature("secret", "1700000001", &data));
    }

    #[test]
    fn test_signer_and_verifier_agree() {
        let body = json!({"b": 2, "a": 1, "jp": "テスト"});
        let signature = generate_signature("secret", "1700000000", "post", "/v1/x", &body);

        assert!(verify_signature(
            "secret",
            "1700000000",
            "POST",
            "/v1/x",
            &body,
            &signature
        ));
        assert!(!verify_signature(
            "wrong",
            "1700000000",
            "POST",
            "/v1/x",
            &body,
            &signature
        ));
        assert!(!verify_signature(
            "secret",
            "1700000000",
            "POST",
            "/v1/x",
            &body,
            "not-hex"
        ));
    }

    #[test]
    fn test_signed_headers() {
        let body = json!({"q": "hello"});
        let headers = signed_headers("client-1", "secret", "1700000000", "post", "/v1/x", &body);

        assert_eq!(headers["X-Client-ID"], "client-1");
        assert_eq!(headers["X-Timestamp"], "1700000000");
        assert_eq!(headers["Content-Type"], "application/json");
        assert_eq!(
            headers["X-Signature"],
            generate_signature("secret", "1700000000", "POST", "/v1/x", &body)
        );
    }
}
