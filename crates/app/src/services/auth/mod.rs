//! Request authentication.
//!
//! Two things are verified here:
//! - the HMAC Shopify adds to the OAuth callback query, and
//! - the App Bridge session token carried by embedded requests (HS256 JWT
//!   signed with the app secret).

mod error;

pub use error::SessionTokenError;

use hmac::{Hmac, Mac};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use shopi_section_core::ShopDomain;

type HmacSha256 = Hmac<Sha256>;

/// Clock skew tolerated on `exp` and `nbf`, in seconds.
pub const SESSION_TOKEN_LEEWAY_SECS: u64 = 10;

/// Verify the `hmac` parameter of an OAuth callback query.
///
/// The message is every other parameter (`signature` excluded too) sorted by
/// key and joined as `k=v&k=v`.
#[must_use]
pub fn verify_callback_hmac(params: &[(String, String)], api_secret: &SecretString) -> bool {
    let Some(provided) = params
        .iter()
        .find(|(k, _)| k == "hmac")
        .map(|(_, v)| v.as_str())
    else {
        return false;
    };

    let mut pairs: Vec<&(String, String)> = params
        .iter()
        .filter(|(k, _)| k != "hmac" && k != "signature")
        .collect();
    pairs.sort();

    let message = pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let Ok(mut mac) = HmacSha256::new_from_slice(api_secret.expose_secret().as_bytes()) else {
        return false;
    };
    mac.update(message.as_bytes());
    let computed = hex::encode(mac.finalize().into_bytes());

    constant_time_compare(&computed, &provided.to_ascii_lowercase())
}

/// Claims of an App Bridge session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// `https://{shop}/admin`
    pub iss: String,
    /// `https://{shop}`
    pub dest: String,
    /// App client ID.
    pub aud: String,
    /// Staff user ID.
    #[serde(default)]
    pub sub: Option<String>,
    pub exp: u64,
    pub nbf: u64,
    #[serde(default)]
    pub iat: Option<u64>,
    #[serde(default)]
    pub jti: Option<String>,
    #[serde(default)]
    pub sid: Option<String>,
}

impl SessionClaims {
    /// Shop the token was issued for.
    ///
    /// # Errors
    ///
    /// Returns `SessionTokenError::InvalidDestination` if `dest` is not a
    /// `myshopify.com` URL.
    pub fn shop(&self) -> Result<ShopDomain, SessionTokenError> {
        let host = self
            .dest
            .strip_prefix("https://")
            .ok_or_else(|| SessionTokenError::InvalidDestination(self.dest.clone()))?;
        ShopDomain::parse(host)
            .map_err(|_| SessionTokenError::InvalidDestination(self.dest.clone()))
    }
}

/// Verify a session token and return the shop it identifies.
///
/// # Errors
///
/// Returns an error if the signature does not match `api_secret`, `aud` is
/// not `api_key`, the token is outside its `nbf..exp` window (with
/// [`SESSION_TOKEN_LEEWAY_SECS`] of slack), or `dest` is not a shop.
pub fn verify_session_token(
    token: &str,
    api_key: &str,
    api_secret: &SecretString,
) -> Result<(ShopDomain, SessionClaims), SessionTokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[api_key]);
    validation.set_required_spec_claims(&["exp", "nbf", "aud"]);
    validation.validate_nbf = true;
    validation.leeway = SESSION_TOKEN_LEEWAY_SECS;

    let key = DecodingKey::from_secret(api_secret.expose_secret().as_bytes());
    let claims = decode::<SessionClaims>(token, &key, &validation)?.claims;
    let shop = claims.shop()?;
    Ok((shop, claims))
}

/// Random OAuth `state` value.
#[must_use]
pub fn generate_oauth_state() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}
