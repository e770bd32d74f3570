//! Password hashing compatible with the platform's stored digests.
//!
//! The bcrypt salt is derived from a shared salt string: its SHA-256 hex
//! digest, truncated to 22 characters, read as bcrypt base64. Equal inputs
//! therefore hash to equal digests, which makes comparisons idempotent.

use crate::error::{Error, Result};
use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use sha2::{Digest, Sha256};

const SALT_CHARS: usize = 22;

static BCRYPT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::BCRYPT,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Hashes and verifies passwords.
pub trait PasswordHasher: Send + Sync {
    /// Hash `password` with a salt derived from `salt`.
    fn hash(&self, password: &str, salt: &str) -> Result<String>;

    /// Whether `password` matches `hash`. Malformed hashes never match.
    fn verify(&self, password: &str, hash: &str) -> bool;
}

/// bcrypt in `$2a$` form.
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    /// Work factor used by the platform.
    pub const DEFAULT_COST: u32 = 13;

    #[must_use]
    pub fn new() -> Self {
        Self::with_cost(Self::DEFAULT_COST)
    }

    #[must_use]
    pub fn with_cost(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new()
    }
}

/// First 22 characters of the salt's SHA-256 hex digest, decoded.
fn derive_salt(salt: &str) -> Result<[u8; 16]> {
    let hex: String = Sha256::digest(salt.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect();
    let bytes = BCRYPT_BASE64
        .decode(&hex[..SALT_CHARS])
        .map_err(|e| Error::Hash(e.to_string()))?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| Error::Hash(format!("derived salt has {} bytes", b.len())))
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, password: &str, salt: &str) -> Result<String> {
        let parts = bcrypt::hash_with_salt(password, self.cost, derive_salt(salt)?)?;
        Ok(parts.format_for_version(bcrypt::Version::TwoA))
    }

    fn verify(&self, password: &str, hash: &str) -> bool {
        match bcrypt::verify(password, hash) {
            Ok(matches) => matches,
            Err(e) => {
                log::debug!("not a bcrypt hash: {e}");
                false
            }
        }
    }
}
