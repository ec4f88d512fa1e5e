//! Secret retrieval pipeline.
//!
//! locate record → decode → unwrap key (KMS) → verify HMAC → decrypt body
//!
//! Every stage is terminal on failure and nothing is retried or cached. The
//! HMAC is always checked before any ciphertext is decrypted.

use zeroize::Zeroize;

use crate::cipher::decrypt_body;
use crate::config::ClientConfig;
use crate::digest::resolve_digest;
use crate::error::{CredstashError, Result};
use crate::kms::{unwrap_key, KeyDecrypter};
use crate::record::key_material_from_record;
use crate::store::{locate_record, RecordStore};
use crate::types::{EncryptionContext, KeyMaterial};

/// Parameters of a single retrieval.
#[derive(Debug, Clone, Default)]
pub struct GetSecretRequest {
    pub name: String,
    /// Empty selects the client's configured table.
    pub table: String,
    /// Empty selects the latest version.
    pub version: String,
    pub encryption_context: EncryptionContext,
}

impl GetSecretRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.encryption_context.insert(key.into(), value.into());
        self
    }
}

/// Reads and decrypts credstash secrets.
///
/// Holds no per-request state, so one client can serve concurrent requests.
pub struct Client<S, K> {
    config: ClientConfig,
    store: S,
    decrypter: K,
}

impl<S, K> Client<S, K>
where
    S: RecordStore,
    K: KeyDecrypter,
{
    pub fn new(config: ClientConfig, store: S, decrypter: K) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            store,
            decrypter,
        })
    }

    /// Client whose default table is `table`.
    pub fn with_table(table: impl Into<String>, store: S, decrypter: K) -> Result<Self> {
        Self::new(ClientConfig::with_table(table), store, decrypter)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Fetch and decrypt secret `name`.
    ///
    /// Empty `table` uses the configured table; empty `version` fetches the
    /// latest version.
    pub async fn get_secret(
        &self,
        name: &str,
        table: &str,
        version: &str,
        context: &EncryptionContext,
    ) -> Result<String> {
        let table = self.config.resolve_table(table);
        let record = locate_record(&self.store, table, name, version).await?;
        let material = key_material_from_record(&record)?;
        decrypt_key_material(&material, &self.decrypter, context).await
    }

    pub async fn get(&self, request: &GetSecretRequest) -> Result<String> {
        self.get_secret(
            &request.name,
            &request.table,
            &request.version,
            &request.encryption_context,
        )
        .await
    }
}

/// Unwrap, verify and decrypt already-decoded key material.
pub async fn decrypt_key_material<K>(
    material: &KeyMaterial,
    decrypter: &K,
    context: &EncryptionContext,
) -> Result<String>
where
    K: KeyDecrypter + ?Sized,
{
    let keys = unwrap_key(decrypter, &material.key, context).await?;
    verify_hmac(material, keys.hmac_key.as_slice())?;
    decrypt_data(material, keys.data_key.as_slice())
}

/// Check the stored HMAC over the ciphertext in constant time.
///
/// # Errors
/// `UnsupportedDigest` for an unknown digest name, `HmacMismatch` if the tag
/// does not verify.
pub fn verify_hmac(material: &KeyMaterial, hmac_key: &[u8]) -> Result<()> {
    let digest = resolve_digest(&material.digest)?;
    tracing::debug!(name = %material.name, digest = %digest, "verifying HMAC");
    if !digest.verify(hmac_key, &material.content, &material.hmac)? {
        tracing::warn!(
            name = %material.name,
            version = %material.version,
            digest = %digest,
            "HMAC verification failed"
        );
        return Err(CredstashError::HmacMismatch {
            name: material.name.clone(),
        });
    }
    Ok(())
}

/// Decrypt the body with the fixed-nonce AES-256-CTR and decode it as UTF-8.
///
/// Only call after [`verify_hmac`] succeeded.
pub fn decrypt_data(material: &KeyMaterial, data_key: &[u8]) -> Result<String> {
    let mut plaintext = decrypt_body(&material.content, data_key)?;
    String::from_utf8(std::mem::take(&mut *plaintext)).map_err(|err| {
        err.into_bytes().zeroize();
        CredstashError::InvalidUtf8 {
            name: material.name.clone(),
        }
    })
}
