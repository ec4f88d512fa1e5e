//! Unwrapping the per-secret key material through KMS.
//!
//! Each record stores a KMS ciphertext blob that decrypts to 64 bytes:
//! `[data key:32][hmac key:32]`. The encryption context supplied by the
//! caller is forwarded to KMS untouched; KMS rejects the call if it does not
//! match the context used when the secret was written.

use std::sync::Arc;

use async_trait::async_trait;
use zeroize::{Zeroize, Zeroizing};

use crate::error::{CredstashError, KmsError, Result};
use crate::types::{EncryptionContext, DATA_KEY_LENGTH, KEY_MATERIAL_LENGTH};

/// Caller-provided KMS `Decrypt` capability.
#[async_trait]
pub trait KeyDecrypter: Send + Sync {
    /// Decrypt `ciphertext_blob` under `context`, returning the plaintext.
    async fn decrypt(
        &self,
        ciphertext_blob: &[u8],
        context: &EncryptionContext,
    ) -> std::result::Result<Vec<u8>, KmsError>;
}

#[async_trait]
impl<T: KeyDecrypter + ?Sized> KeyDecrypter for Arc<T> {
    async fn decrypt(
        &self,
        ciphertext_blob: &[u8],
        context: &EncryptionContext,
    ) -> std::result::Result<Vec<u8>, KmsError> {
        (**self).decrypt(ciphertext_blob, context).await
    }
}

/// The two halves of unwrapped key material. Zeroized on drop.
pub struct DataKeys {
    /// AES-256 key for the secret body.
    pub data_key: Zeroizing<[u8; DATA_KEY_LENGTH]>,
    /// HMAC key for the body's authentication tag.
    pub hmac_key: Zeroizing<[u8; DATA_KEY_LENGTH]>,
}

impl std::fmt::Debug for DataKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataKeys").finish_non_exhaustive()
    }
}

/// Split 64 bytes of key material into data key (first half) and HMAC key
/// (second half).
///
/// # Errors
/// `InvalidKeyMaterialLength` for anything other than exactly 64 bytes.
pub fn split_key_material(plaintext: &[u8]) -> Result<DataKeys> {
    if plaintext.len() != KEY_MATERIAL_LENGTH {
        return Err(CredstashError::InvalidKeyMaterialLength {
            expected: KEY_MATERIAL_LENGTH,
            got: plaintext.len(),
        });
    }
    let mut data_key = Zeroizing::new([0u8; DATA_KEY_LENGTH]);
    let mut hmac_key = Zeroizing::new([0u8; DATA_KEY_LENGTH]);
    data_key.copy_from_slice(&plaintext[..DATA_KEY_LENGTH]);
    hmac_key.copy_from_slice(&plaintext[DATA_KEY_LENGTH..]);
    Ok(DataKeys { data_key, hmac_key })
}

/// Decrypt the wrapped key material with KMS and split it.
///
/// KMS failures, including context mismatches, are returned unchanged as
/// `CredstashError::Kms`.
pub async fn unwrap_key<K>(
    decrypter: &K,
    wrapped_key: &[u8],
    context: &EncryptionContext,
) -> Result<DataKeys>
where
    K: KeyDecrypter + ?Sized,
{
    tracing::debug!(
        context_keys = ?context.keys().collect::<Vec<_>>(),
        "decrypting key material with KMS"
    );
    let mut plaintext = decrypter.decrypt(wrapped_key, context).await?;
    let keys = split_key_material(&plaintext);
    plaintext.zeroize();
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticDecrypter {
        plaintext: Vec<u8>,
        expected_context: EncryptionContext,
    }

    #[async_trait]
    impl KeyDecrypter for StaticDecrypter {
        async fn decrypt(
            &self,
            _ciphertext_blob: &[u8],
            context: &EncryptionContext,
        ) -> std::result::Result<Vec<u8>, KmsError> {
            if *context != self.expected_context {
                return Err(KmsError::new("InvalidCiphertextException"));
            }
            Ok(self.plaintext.clone())
        }
    }

    fn key_material() -> Vec<u8> {
        let mut material = vec![b'b'; 32];
        material.extend_from_slice(&[b'a'; 32]);
        material
    }

    fn context(pairs: &[(&str, &str)]) -> EncryptionContext {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn split_first_half_is_data_key() {
        let keys = split_key_material(&key_material()).unwrap();
        assert_eq!(*keys.data_key, [b'b'; 32]);
        assert_eq!(*keys.hmac_key, [b'a'; 32]);
    }

    #[test]
    fn split_rejects_wrong_lengths() {
        for len in [0usize, 32, 63, 65, 128] {
            let err = split_key_material(&vec![0u8; len]).unwrap_err();
            assert!(matches!(
                err,
                CredstashError::InvalidKeyMaterialLength { expected: 64, got } if got == len
            ));
        }
    }

    #[test]
    fn debug_does_not_print_keys() {
        let keys = split_key_material(&key_material()).unwrap();
        let printed = format!("{keys:?}");
        assert!(!printed.contains("98"));
        assert!(printed.starts_with("DataKeys"));
    }

    #[tokio::test]
    async fn unwrap_with_matching_context() {
        let ctx = context(&[("app", "web"), ("env", "prod")]);
        let decrypter = StaticDecrypter {
            plaintext: key_material(),
            expected_context: ctx.clone(),
        };
        // Insertion order does not matter.
        let reordered = context(&[("env", "prod"), ("app", "web")]);
        let keys = unwrap_key(&decrypter, b"blob", &reordered).await.unwrap();
        assert_eq!(*keys.data_key, [b'b'; 32]);
    }

    #[tokio::test]
    async fn context_mismatch_propagates_kms_error() {
        let decrypter = StaticDecrypter {
            plaintext: key_material(),
            expected_context: context(&[("app", "web")]),
        };
        let err = unwrap_key(&decrypter, b"blob", &EncryptionContext::new())
            .await
            .unwrap_err();
        match err {
            CredstashError::Kms(inner) => assert_eq!(inner.message, "InvalidCiphertextException"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn short_kms_response_is_rejected() {
        let decrypter = StaticDecrypter {
            plaintext: vec![1u8; 32],
            expected_context: EncryptionContext::new(),
        };
        let err = unwrap_key(&decrypter, b"blob", &EncryptionContext::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CredstashError::InvalidKeyMaterialLength { .. }
        ));
    }
}
