//! Sealed token bundle passed from the auth host to a club host.
//!
//! The auth host owns the provider callback, but the tokens belong in the
//! session of the club site the user started from. The bundle travels in the
//! `handoff` query parameter of the club's `/login/finish` redirect, sealed
//! with the shared session secret and valid for [`HANDOFF_TTL_SECS`].
//!
//! Each bundle also carries the nonce the club site stored in the browser's
//! session when the login started. The club accepts a bundle only against
//! that nonce and consumes it, so a bundle cannot be replayed or planted in
//! another browser.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use oauth2::CsrfToken;
use serde::{Deserialize, Serialize};

use crate::services::encryption::{EncryptionError, SealKey};

pub const HANDOFF_TTL_SECS: i64 = 120;

const HANDOFF_CONTEXT: &[u8] = b"clubweb.handoff.v1";

#[derive(thiserror::Error, Debug)]
pub enum HandoffError {
    #[error("Handoff is not valid base64")]
    Encoding(#[from] base64::DecodeError),

    #[error("Handoff could not be opened: {0}")]
    Crypto(#[from] EncryptionError),

    #[error("Handoff payload is malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Handoff expired {age_secs}s after issue")]
    Expired { age_secs: i64 },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Handoff {
    pub id_token: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Unix seconds at which the access token expires.
    pub expires_at: i64,
    /// Unix seconds at which the bundle was sealed.
    pub issued_at: i64,
    /// Login nonce of the club session the bundle is meant for.
    pub nonce: String,
}

/// Fresh random login nonce.
pub fn new_nonce() -> String {
    CsrfToken::new_random().secret().clone()
}

impl Handoff {
    pub fn new(tokens: &super::cognito::TokenSet, nonce: String, now: DateTime<Utc>) -> Self {
        Self {
            id_token: tokens.id_token.clone(),
            access_token: tokens.access_token.clone(),
            refresh_token: tokens.refresh_token.clone(),
            expires_at: tokens.expires_at.timestamp(),
            issued_at: now.timestamp(),
            nonce,
        }
    }

    /// Whether the bundle was issued for the login that stored `expected`.
    pub fn matches_nonce(&self, expected: Option<&str>) -> bool {
        matches!(expected, Some(nonce) if !nonce.is_empty() && nonce == self.nonce)
    }

    pub fn seal(&self, key: &SealKey) -> Result<String, HandoffError> {
        let json = serde_json::to_vec(self)?;
        let sealed = key.seal(HANDOFF_CONTEXT, &json)?;
        Ok(URL_SAFE_NO_PAD.encode(sealed))
    }

    /// Opens a sealed bundle, rejecting it once it is older than the TTL.
    pub fn open(key: &SealKey, blob: &str, now: DateTime<Utc>) -> Result<Self, HandoffError> {
        let sealed = URL_SAFE_NO_PAD.decode(blob.trim())?;
        let json = key.open(HANDOFF_CONTEXT, &sealed)?;
        let handoff: Handoff = serde_json::from_slice(&json)?;

        let age_secs = now.timestamp() - handoff.issued_at;
        if !(-HANDOFF_TTL_SECS..=HANDOFF_TTL_SECS).contains(&age_secs) {
            return Err(HandoffError::Expired { age_secs });
        }

        Ok(handoff)
    }
}
