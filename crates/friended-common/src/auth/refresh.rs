//! Opaque refresh tokens
//!
//! The client receives a random hex token; only its SHA-256 digest is stored, and
//! every refresh rotates it.

use rand::RngCore;
use sha2::{Digest, Sha256};

const REFRESH_TOKEN_BYTES: usize = 10;

/// A freshly minted refresh token and the digest to persist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshToken {
    pub token: String,
    pub digest: String,
}

impl RefreshToken {
    pub fn generate() -> Self {
        let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        let token: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
        let digest = digest_refresh_token(&token);
        Self { token, digest }
    }
}

pub fn digest_refresh_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}
