//! Digest name resolution and HMAC compute/verify.
//!
//! Records name their HMAC digest as a string (`SHA256`, `SHA512`, ...).
//! Resolution is a pure lookup; unknown names are rejected rather than
//! falling back to a default.

use std::fmt;
use std::str::FromStr;

use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use md5::Md5;
use sha1::Sha1;
use sha2::{Sha224, Sha256, Sha384, Sha512};

use crate::error::{CredstashError, Result};

/// Digest functions a stored record may name for its HMAC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
    Md5,
}

/// Every supported algorithm, in the order names are listed to users.
pub const SUPPORTED_DIGESTS: &[DigestAlgorithm] = &[
    DigestAlgorithm::Sha1,
    DigestAlgorithm::Sha224,
    DigestAlgorithm::Sha256,
    DigestAlgorithm::Sha384,
    DigestAlgorithm::Sha512,
    DigestAlgorithm::Md5,
];

/// Map a stored digest name to its algorithm.
///
/// Names are matched exactly (upper case, as written by credstash).
///
/// # Errors
/// Returns `CredstashError::UnsupportedDigest` naming the value for anything
/// outside [`SUPPORTED_DIGESTS`].
pub fn resolve_digest(name: &str) -> Result<DigestAlgorithm> {
    match name {
        "SHA1" => Ok(DigestAlgorithm::Sha1),
        "SHA224" => Ok(DigestAlgorithm::Sha224),
        "SHA256" => Ok(DigestAlgorithm::Sha256),
        "SHA384" => Ok(DigestAlgorithm::Sha384),
        "SHA512" => Ok(DigestAlgorithm::Sha512),
        "MD5" => Ok(DigestAlgorithm::Md5),
        other => Err(CredstashError::UnsupportedDigest(other.to_string())),
    }
}

impl DigestAlgorithm {
    /// The stored name of this algorithm.
    pub fn name(self) -> &'static str {
        match self {
            DigestAlgorithm::Sha1 => "SHA1",
            DigestAlgorithm::Sha224 => "SHA224",
            DigestAlgorithm::Sha256 => "SHA256",
            DigestAlgorithm::Sha384 => "SHA384",
            DigestAlgorithm::Sha512 => "SHA512",
            DigestAlgorithm::Md5 => "MD5",
        }
    }

    /// Compute HMAC(key, data) with this digest.
    pub fn compute(self, key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
        match self {
            DigestAlgorithm::Sha1 => compute_with::<Hmac<Sha1>>(key, data),
            DigestAlgorithm::Sha224 => compute_with::<Hmac<Sha224>>(key, data),
            DigestAlgorithm::Sha256 => compute_with::<Hmac<Sha256>>(key, data),
            DigestAlgorithm::Sha384 => compute_with::<Hmac<Sha384>>(key, data),
            DigestAlgorithm::Sha512 => compute_with::<Hmac<Sha512>>(key, data),
            DigestAlgorithm::Md5 => compute_with::<Hmac<Md5>>(key, data),
        }
    }

    /// Check `tag` against HMAC(key, data) in constant time.
    ///
    /// A tag of the wrong length never matches.
    pub fn verify(self, key: &[u8], data: &[u8], tag: &[u8]) -> Result<bool> {
        match self {
            DigestAlgorithm::Sha1 => verify_with::<Hmac<Sha1>>(key, data, tag),
            DigestAlgorithm::Sha224 => verify_with::<Hmac<Sha224>>(key, data, tag),
            DigestAlgorithm::Sha256 => verify_with::<Hmac<Sha256>>(key, data, tag),
            DigestAlgorithm::Sha384 => verify_with::<Hmac<Sha384>>(key, data, tag),
            DigestAlgorithm::Sha512 => verify_with::<Hmac<Sha512>>(key, data, tag),
            DigestAlgorithm::Md5 => verify_with::<Hmac<Md5>>(key, data, tag),
        }
    }
}

impl FromStr for DigestAlgorithm {
    type Err = CredstashError;

    fn from_str(s: &str) -> Result<Self> {
        resolve_digest(s)
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// HMAC pads or hashes keys of any length, so this does not fail for the
/// supported digests.
fn new_mac<M: Mac + KeyInit>(key: &[u8]) -> Result<M> {
    <M as Mac>::new_from_slice(key)
        .map_err(|_| CredstashError::HmacKeyRejected { len: key.len() })
}

fn compute_with<M: Mac + KeyInit>(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = new_mac::<M>(key)?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn verify_with<M: Mac + KeyInit>(key: &[u8], data: &[u8], tag: &[u8]) -> Result<bool> {
    let mut mac = new_mac::<M>(key)?;
    mac.update(data);
    Ok(mac.verify_slice(tag).is_ok())
}
