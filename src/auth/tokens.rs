//! Activation links: the encoded user id and the one-shot account token.
//!
//! A token is `"{timestamp in base36}-{hmac}"`. The HMAC covers the user id,
//! the user's active flag and the timestamp, so a token stops validating as
//! soon as the account is activated, and it expires after the configured TTL.
//! Timestamps from the future never validate.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::model::user::User;

type HmacSha256 = Hmac<Sha256>;

const KEY_SALT: &[u8] = b"portal_users.tokens.AccountActivationTokenGenerator";
/// Hex chars of the MAC kept in the token (20 bytes).
const MAC_HEX_LEN: usize = 40;

/// URL-safe base64 of the decimal user id.
pub fn encode_uid(id: u64) -> String {
    URL_SAFE_NO_PAD.encode(id.to_string())
}

/// Inverse of [`encode_uid`]; `None` for anything that is not an encoded id.
pub fn decode_uid(uidb64: &str) -> Option<u64> {
    let bytes = URL_SAFE_NO_PAD.decode(uidb64.trim_end_matches('=')).ok()?;
    let text = String::from_utf8(bytes).ok()?;
    text.parse().ok()
}

pub(crate) fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

fn from_base36(s: &str) -> Option<u64> {
    if s.is_empty() || s.len() > 13 {
        return None;
    }
    u64::from_str_radix(s, 36).ok()
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[derive(Clone)]
pub struct ActivationTokens {
    secret: String,
    ttl_secs: u64,
}

impl ActivationTokens {
    pub fn new(secret: impl Into<String>, ttl_secs: u64) -> Self {
        Self {
            secret: secret.into(),
            ttl_secs,
        }
    }

    fn mac(&self, user: &User, timestamp: u64) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(KEY_SALT);
        // fixed-width fields, so no id/timestamp split can collide with another
        mac.update(&user.id.to_be_bytes());
        mac.update(&timestamp.to_be_bytes());
        mac.update(&[u8::from(user.is_active)]);
        mac
    }

    pub fn make_token(&self, user: &User) -> String {
        self.make_token_at(user, now_secs())
    }

    pub(crate) fn make_token_at(&self, user: &User, timestamp: u64) -> String {
        let digest = hex::encode(self.mac(user, timestamp).finalize().into_bytes());
        format!("{}-{}", to_base36(timestamp), &digest[..MAC_HEX_LEN])
    }

    pub fn check_token(&self, user: &User, token: &str) -> bool {
        self.check_token_at(user, token, now_secs())
    }

    fn check_token_at(&self, user: &User, token: &str, now: u64) -> bool {
        let Some((ts_b36, mac_hex)) = token.split_once('-') else {
            return false;
        };
        let Some(timestamp) = from_base36(ts_b36) else {
            return false;
        };
        if mac_hex.len() != MAC_HEX_LEN {
            return false;
        }
        let Ok(expected) = hex::decode(mac_hex) else {
            return false;
        };
        if timestamp > now {
            return false;
        }
        if self.mac(user, timestamp).verify_truncated_left(&expected).is_err() {
            return false;
        }
        now - timestamp <= self.ttl_secs
    }
}
