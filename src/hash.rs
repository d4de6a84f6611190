// src/hash.rs

//! Hashing for patch payloads
//!
//! Patch files may pin their content with a prefixed checksum such as
//! `sha256:<hex>` or `xxh128:<hex>`. Run reports always record the SHA-256
//! of every diff that was applied or skipped.

use crate::error::{Error, Result};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use xxhash_rust::xxh3::xxh3_128;

/// Hash algorithm selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HashAlgorithm {
    /// SHA-256, the default for checksums written by hand
    #[default]
    Sha256,
    /// XXH128, accepted for large vendored diffs
    Xxh128,
}

impl HashAlgorithm {
    /// Hex digest length
    #[inline]
    pub const fn hex_len(&self) -> usize {
        match self {
            Self::Sha256 => 64,
            Self::Xxh128 => 32,
        }
    }

    #[inline]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Xxh128 => "xxh128",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "xxh128" | "xxh3" => Ok(Self::Xxh128),
            _ => Err(Error::ParseError(format!(
                "Unsupported checksum algorithm: {} (supported: sha256, xxh128)",
                s
            ))),
        }
    }
}

/// Compute the hex digest of a byte slice
pub fn hash_bytes(algorithm: HashAlgorithm, data: &[u8]) -> String {
    match algorithm {
        HashAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            hasher.update(data);
            format!("{:x}", hasher.finalize())
        }
        HashAlgorithm::Xxh128 => format!("{:032x}", xxh3_128(data)),
    }
}

/// Compute SHA-256 hex digest
#[inline]
pub fn sha256(data: &[u8]) -> String {
    hash_bytes(HashAlgorithm::Sha256, data)
}

/// Split an `algorithm:hex` checksum into its parts
pub fn parse_checksum(checksum: &str) -> Result<(HashAlgorithm, String)> {
    let (algorithm, value) = checksum.split_once(':').ok_or_else(|| {
        Error::ParseError(format!(
            "Invalid checksum format: {}. Expected sha256:... or xxh128:...",
            checksum
        ))
    })?;

    let algorithm: HashAlgorithm = algorithm.parse()?;
    let value = value.trim().to_lowercase();

    if value.len() != algorithm.hex_len() || !value.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::ParseError(format!(
            "Invalid {} digest: {}",
            algorithm, value
        )));
    }

    Ok((algorithm, value))
}

/// Verify data against an `algorithm:hex` checksum
pub fn verify_checksum(data: &[u8], checksum: &str) -> Result<()> {
    let (algorithm, expected) = parse_checksum(checksum)?;
    let actual = hash_bytes(algorithm, data);
    if actual == expected {
        Ok(())
    } else {
        Err(Error::ChecksumMismatch(format!(
            "{} mismatch: expected {}, got {}",
            algorithm, expected, actual
        )))
    }
}
