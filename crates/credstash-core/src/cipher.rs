//! AES-256-CTR body decryption.
//!
//! Credstash encrypts every secret body with AES-256 in counter mode using a
//! fixed initial counter block: fifteen zero bytes followed by `0x01`.
//! Every credstash implementation uses this exact block, so it is a wire
//! constant and must not be randomized.
//!
//! The fixed nonce is only sound because each data key comes from a fresh
//! KMS `GenerateDataKey` call and encrypts exactly one body. Never reuse a
//! data key with this module.

use aes::cipher::{KeyIvInit, StreamCipher};
use zeroize::Zeroizing;

use crate::error::{CredstashError, Result};
use crate::types::{AES_BLOCK_LENGTH, DATA_KEY_LENGTH};

/// AES-256 keystream with a 128-bit big-endian counter.
type Aes256Ctr = ctr::Ctr128BE<aes::Aes256>;

/// Initial counter block shared with every other credstash implementation.
pub const FIXED_NONCE: [u8; AES_BLOCK_LENGTH] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1];

/// Returns the fixed initial counter block.
pub fn create_nonce() -> [u8; AES_BLOCK_LENGTH] {
    FIXED_NONCE
}

/// XOR the AES-256-CTR keystream for (`key`, `nonce`) over `data`.
///
/// Counter mode is symmetric: the same call encrypts and decrypts.
///
/// # Errors
/// `CredstashError::InvalidKeyLength` unless `key` is exactly 32 bytes.
pub fn apply_keystream(
    key: &[u8],
    nonce: &[u8; AES_BLOCK_LENGTH],
    data: &[u8],
) -> Result<Vec<u8>> {
    if key.len() != DATA_KEY_LENGTH {
        return Err(invalid_key_length(key));
    }
    let mut cipher = Aes256Ctr::new_from_slices(key, nonce)
        .map_err(|_| invalid_key_length(key))?;
    let mut out = data.to_vec();
    cipher.apply_keystream(&mut out);
    Ok(out)
}

fn invalid_key_length(key: &[u8]) -> CredstashError {
    CredstashError::InvalidKeyLength {
        expected: DATA_KEY_LENGTH,
        got: key.len(),
    }
}

/// Decrypt a secret body with its data key under [`FIXED_NONCE`].
///
/// The caller must have verified the body's HMAC first.
pub fn decrypt_body(content: &[u8], data_key: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    apply_keystream(data_key, &FIXED_NONCE, content).map(Zeroizing::new)
}
