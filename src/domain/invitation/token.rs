//! Invitation secrets and their stored hashes.
//!
//! The raw token is 256 bits from the OS RNG, hex-encoded. Only the
//! SHA-256 of the raw token is persisted.

use rand::rngs::OsRng;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use subtle::ConstantTimeEq;

use crate::domain::foundation::ValidationError;

const TOKEN_BYTES: usize = 32;

/// Raw invitation secret. Handed to the caller once and never stored.
pub struct InvitationToken(SecretString);

impl InvitationToken {
    /// Generates a fresh random token.
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(SecretString::new(hex::encode(bytes)))
    }

    /// Wraps a token presented by an invitee.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(SecretString::new(raw.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    pub fn hash(&self) -> TokenHash {
        TokenHash::of(self.expose())
    }
}

impl fmt::Debug for InvitationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("InvitationToken([REDACTED])")
    }
}

/// Hex-encoded SHA-256 of an invitation token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenHash(String);

impl TokenHash {
    pub fn of(raw: &str) -> Self {
        Self(hex::encode(Sha256::digest(raw.trim().as_bytes())))
    }

    /// Rehydrates a hash loaded from storage.
    pub fn from_stored(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.len() != 64 || !value.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ValidationError::invalid_format("token_hash", "expected 64 hex characters"));
        }
        Ok(Self(value.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Constant-time equality.
    pub fn matches(&self, other: &TokenHash) -> bool {
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}
