//! OAuth 1.0a request signing (HMAC-SHA1), as Flickr expects it.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use rand::{distr::Alphanumeric, Rng};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

#[derive(Debug, Clone)]
pub struct OAuthKeys {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub token: String,
    pub token_secret: String,
}

/// RFC 3986 encoding: everything but `A-Z a-z 0-9 - _ . ~`.
fn encode(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

/// `METHOD&url&params`, params encoded, sorted, joined and encoded again.
pub fn signature_base_string(method: &str, url: &str, params: &[(String, String)]) -> String {
    let mut pairs: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (encode(k), encode(v)))
        .collect();
    pairs.sort();
    let joined = pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        encode(url),
        encode(&joined)
    )
}

pub fn hmac_sha1_signature(base: &str, consumer_secret: &str, token_secret: &str) -> String {
    let key = format!("{}&{}", encode(consumer_secret), encode(token_secret));
    let mut mac = HmacSha1::new_from_slice(key.as_bytes()).expect("HMAC can take key of any size");
    mac.update(base.as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}

pub fn nonce() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

/// Append the `oauth_*` protocol parameters and the signature to `params`.
pub fn sign_with(
    method: &str,
    url: &str,
    params: &mut Vec<(String, String)>,
    keys: &OAuthKeys,
    nonce: &str,
    timestamp: i64,
) {
    params.extend([
        ("oauth_consumer_key".to_string(), keys.consumer_key.clone()),
        ("oauth_nonce".to_string(), nonce.to_string()),
        ("oauth_signature_method".to_string(), "HMAC-SHA1".to_string()),
        ("oauth_timestamp".to_string(), timestamp.to_string()),
        ("oauth_token".to_string(), keys.token.clone()),
        ("oauth_version".to_string(), "1.0".to_string()),
    ]);
    let base = signature_base_string(method, url, params);
    let signature = hmac_sha1_signature(&base, &keys.consumer_secret, &keys.token_secret);
    params.push(("oauth_signature".to_string(), signature));
}

/// Sign with a fresh nonce and the current time.
pub fn sign(method: &str, url: &str, params: &mut Vec<(String, String)>, keys: &OAuthKeys) {
    let ts = chrono::Utc::now().timestamp();
    sign_with(method, url, params, keys, &nonce(), ts);
}
