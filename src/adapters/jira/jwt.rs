//! Connect-style request signing for the tracker.
//!
//! Tokens are HS256 over the installation's shared secret and bind the
//! request through a query-string hash of its canonical form.

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Lifetime of a signed token.
pub const TOKEN_TTL_SECS: i64 = 180;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    pub qsh: String,
}

/// `METHOD&path&sorted-query`, hashed with SHA-256.
pub fn query_string_hash(method: &str, path: &str, query: &[(&str, &str)]) -> String {
    let mut params: Vec<String> = query.iter().map(|(k, v)| format!("{k}={v}")).collect();
    params.sort();
    let canonical = format!("{}&{}&{}", method.to_uppercase(), path, params.join("&"));
    hex::encode(Sha256::digest(canonical.as_bytes()))
}

pub fn sign(
    issuer: &str,
    shared_secret: &str,
    method: &str,
    path: &str,
    now_secs: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        iss: issuer.to_string(),
        iat: now_secs,
        exp: now_secs + TOKEN_TTL_SECS,
        qsh: query_string_hash(method, path, &[]),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(shared_secret.as_bytes()),
    )
}
