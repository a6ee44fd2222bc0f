use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying `sha256=<hex digest>` of the raw body.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";
/// Header naming the GitHub event type (`push`, `pull_request`, ...).
pub const EVENT_HEADER: &str = "x-github-event";

/// Checks a webhook signature header against the shared secret.
///
/// An absent or empty secret puts the ingress in open mode and every request
/// passes. With a secret configured, the header must be present and have the
/// form `<algorithm>=<hex digest>`; only the digest part is compared, in
/// constant time, against HMAC-SHA256(secret, body).
pub fn verify_signature(secret: Option<&str>, header: Option<&str>, body: &[u8]) -> bool {
    let Some(secret) = secret.filter(|s| !s.is_empty()) else {
        return true;
    };
    let Some(header) = header else {
        tracing::debug!("signature header missing");
        return false;
    };
    let Some((_algorithm, provided)) = header.split_once('=') else {
        tracing::debug!("signature header has no digest separator");
        return false;
    };
    let expected = match digest_hex(secret, body) {
        Ok(hex) => hex,
        Err(_) => return false,
    };
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Produces the `sha256=<hex>` header value GitHub would send for `body`.
pub fn sign(secret: &str, body: &[u8]) -> Result<String, InvalidLength> {
    Ok(format!("sha256={}", digest_hex(secret, body)?))
}

fn digest_hex(secret: &str, body: &[u8]) -> Result<String, InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}
