//! # OAuth Signatures
//!
//! HMAC signing and verification over the signature base string
//! (RFC 5849 Section 3.4.2).
//!
//! ## Security Notes
//!
//! - The signing key is `encode(consumer_secret) & encode(token_secret)`; LTI
//!   launches carry no token, so the token half is empty
//! - Signatures are compared with `subtle::ConstantTimeEq`
//! - Only methods in the verifier's accepted set are considered; anything
//!   else is rejected before any HMAC work

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::Sha256;
use std::fmt;
use std::str::FromStr;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use super::base_string::{signature_base_string, CanonicalError};
use super::encoding::percent_encode;
use super::entities::{param, LaunchRequest};
use super::errors::Rejection;

type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;

/// Supported `oauth_signature_method` values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureMethod {
    #[serde(rename = "HMAC-SHA1")]
    HmacSha1,
    #[serde(rename = "HMAC-SHA256")]
    HmacSha256,
}

impl SignatureMethod {
    /// Wire name as it appears in `oauth_signature_method`.
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureMethod::HmacSha1 => "HMAC-SHA1",
            SignatureMethod::HmacSha256 => "HMAC-SHA256",
        }
    }
}

impl fmt::Display for SignatureMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignatureMethod {
    type Err = Rejection;

    /// Method names are matched exactly; protocol values are case-sensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HMAC-SHA1" => Ok(SignatureMethod::HmacSha1),
            "HMAC-SHA256" => Ok(SignatureMethod::HmacSha256),
            _ => Err(Rejection::SignatureMethodRejected),
        }
    }
}

// =============================================================================
// PRIMITIVES
// =============================================================================

/// Build the HMAC key from the consumer and token secrets.
///
/// The key is wiped from memory when dropped.
pub fn signing_key(consumer_secret: &str, token_secret: &str) -> Zeroizing<String> {
    Zeroizing::new(format!(
        "{}&{}",
        percent_encode(consumer_secret),
        percent_encode(token_secret)
    ))
}

/// HMAC the base string with `key` and return the Base64 digest.
///
/// Returns `None` only if the MAC rejects the key length, which HMAC never
/// does.
pub fn compute_signature(method: SignatureMethod, base_string: &str, key: &str) -> Option<String> {
    let digest = match method {
        SignatureMethod::HmacSha1 => mac_digest::<HmacSha1>(key, base_string)?,
        SignatureMethod::HmacSha256 => mac_digest::<HmacSha256>(key, base_string)?,
    };
    Some(STANDARD.encode(digest))
}

fn mac_digest<M: Mac + hmac::digest::KeyInit>(key: &str, data: &str) -> Option<Vec<u8>> {
    let mut mac = <M as Mac>::new_from_slice(key.as_bytes()).ok()?;
    mac.update(data.as_bytes());
    Some(mac.finalize().into_bytes().to_vec())
}

/// Check `provided` against the signature of `base_string` in constant time.
pub fn verify_base_string(
    method: SignatureMethod,
    base_string: &str,
    consumer_secret: &str,
    provided: &str,
) -> bool {
    let key = signing_key(consumer_secret, "");
    let Some(expected) = compute_signature(method, base_string, &key) else {
        return false;
    };

    let expected = expected.as_bytes();
    let provided = provided.as_bytes();
    if expected.len() != provided.len() {
        return false;
    }
    expected.ct_eq(provided).into()
}

// =============================================================================
// VERIFIER
// =============================================================================

/// Verifies request signatures against a fixed set of accepted methods.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignatureVerifier {
    accepted: Vec<SignatureMethod>,
}

impl SignatureVerifier {
    /// Create a verifier that accepts the given methods.
    pub fn new(accepted: Vec<SignatureMethod>) -> Self {
        Self { accepted }
    }

    /// A verifier accepting only `HMAC-SHA1`.
    pub fn hmac_sha1_only() -> Self {
        Self::new(vec![SignatureMethod::HmacSha1])
    }

    pub fn accepts(&self, method: SignatureMethod) -> bool {
        self.accepted.contains(&method)
    }

    /// Resolve the request's declared method against the accepted set.
    pub fn method_for(&self, request: &LaunchRequest) -> Result<SignatureMethod, Rejection> {
        let method: SignatureMethod = request
            .signature_method()
            .ok_or(Rejection::SignatureMethodRejected)?
            .parse()?;

        if self.accepts(method) {
            Ok(method)
        } else {
            Err(Rejection::SignatureMethodRejected)
        }
    }

    /// Verify the request signature with the consumer secret.
    ///
    /// # Errors
    /// * `SignatureMethodRejected` - method missing or not accepted
    /// * `SignatureInvalid` - signature absent, URL not canonicalizable, or mismatch
    pub fn verify(&self, request: &LaunchRequest, consumer_secret: &str) -> Result<(), Rejection> {
        let method = self.method_for(request)?;
        let provided = request.signature().ok_or(Rejection::SignatureInvalid)?;

        let base = signature_base_string(request.method(), request.url(), request.params())
            .map_err(|_| Rejection::SignatureInvalid)?;

        if verify_base_string(method, &base, consumer_secret, provided) {
            Ok(())
        } else {
            Err(Rejection::SignatureInvalid)
        }
    }
}

impl Default for SignatureVerifier {
    fn default() -> Self {
        Self::hmac_sha1_only()
    }
}

/// Sign a request in place as a tool consumer would.
///
/// Sets `oauth_signature_method` to `method` and replaces any existing
/// `oauth_signature`.
pub fn sign_request(
    request: &mut LaunchRequest,
    consumer_secret: &str,
    method: SignatureMethod,
) -> Result<(), CanonicalError> {
    request.remove_param(param::OAUTH_SIGNATURE);
    request.set_param(param::OAUTH_SIGNATURE_METHOD, method.as_str());

    let base = signature_base_string(request.method(), request.url(), request.params())?;
    let key = signing_key(consumer_secret, "");
    // HMAC accepts keys of any length.
    let signature = compute_signature(method, &base, &key).unwrap_or_default();

    request.set_param(param::OAUTH_SIGNATURE, signature);
    Ok(())
}
