use std::collections::HashMap;

/// Length of the plaintext key material returned by KMS: data key followed by HMAC key.
pub const KEY_MATERIAL_LENGTH: usize = 64;

/// AES key length in bytes (256 bits). Also the length of the HMAC key half.
pub const DATA_KEY_LENGTH: usize = 32;

/// AES block length in bytes; the CTR counter block is one block wide.
pub const AES_BLOCK_LENGTH: usize = 16;

/// Digest assumed for records written before the `digest` attribute existed.
pub const DEFAULT_DIGEST: &str = "SHA256";

/// Table used when neither the caller nor the configuration names one.
pub const DEFAULT_TABLE: &str = "credential-store";

/// KMS encryption context. Bound into the wrapped key at write time, so the
/// same pairs must be supplied to unwrap it. Order is irrelevant.
pub type EncryptionContext = HashMap<String, String>;

/// Canonical, decoded form of a stored credential record.
///
/// `key` is still the KMS ciphertext blob; nothing here has been decrypted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyMaterial {
    pub name: String,
    pub version: String,
    /// Digest name used for the HMAC, e.g. `SHA256`.
    pub digest: String,
    /// AES-CTR ciphertext of the secret value.
    pub content: Vec<u8>,
    /// Stored HMAC over `content`.
    pub hmac: Vec<u8>,
    /// KMS-encrypted 64-byte key material.
    pub key: Vec<u8>,
}
