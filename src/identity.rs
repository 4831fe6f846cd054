//! Key generation and ownership checks.
//!
//! Secrets and public keys travel as lowercase hex: 32-byte secp256k1 secret
//! keys and 32-byte x-only public keys, the format Nostr relays expect in the
//! `pubkey` field.

use secp256k1::{Keypair, Secp256k1, SecretKey};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A freshly generated identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedKeys {
    /// Secret key (hex). Named after the client-side field it is stored in.
    pub nsec: String,
    /// x-only public key (hex).
    pub npub: String,
}

/// Parsed signing identity.
pub struct Keys {
    keypair: Keypair,
    public_hex: String,
}

impl Keys {
    /// Parse a hex secret key.
    pub fn from_secret_hex(secret: &str) -> Result<Self> {
        let bytes = hex::decode(secret.trim()).map_err(|_| Error::InvalidSecret)?;
        let sk = SecretKey::from_slice(&bytes).map_err(|_| Error::InvalidSecret)?;
        let secp = Secp256k1::new();
        let keypair = Keypair::from_secret_key(&secp, &sk);
        let public_hex = hex::encode(keypair.x_only_public_key().0.serialize());
        Ok(Self {
            keypair,
            public_hex,
        })
    }

    /// x-only public key (hex).
    pub fn public_hex(&self) -> &str {
        &self.public_hex
    }

    pub(crate) fn keypair(&self) -> &Keypair {
        &self.keypair
    }
}

/// Generate a fresh keypair with no external state.
pub fn generate_keypair() -> GeneratedKeys {
    let secp = Secp256k1::new();
    let keypair = Keypair::new(&secp, &mut rand::thread_rng());
    GeneratedKeys {
        nsec: hex::encode(keypair.secret_bytes()),
        npub: hex::encode(keypair.x_only_public_key().0.serialize()),
    }
}

/// Derive the public key for `secret`.
pub fn derive_public(secret: &str) -> Result<String> {
    Ok(Keys::from_secret_hex(secret)?.public_hex)
}

/// True when `secret` derives exactly `claimed_public`.
pub fn verify_ownership(secret: &str, claimed_public: &str) -> bool {
    derive_public(secret)
        .map(|derived| derived.eq_ignore_ascii_case(claimed_public.trim()))
        .unwrap_or(false)
}

/// Reject a request whose declared author does not own `secret`.
pub fn ensure_ownership(secret: &str, declared: Option<&str>) -> Result<()> {
    let derived = derive_public(secret)?;
    match declared {
        Some(claimed) if !derived.eq_ignore_ascii_case(claimed.trim()) => Err(Error::KeyMismatch),
        _ => Ok(()),
    }
}
