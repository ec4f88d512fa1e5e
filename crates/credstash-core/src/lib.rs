//! Credstash secret retrieval.
//!
//! Secrets live in a key-value table, one item per (name, version). Each item
//! carries a KMS-wrapped 64-byte key (data key + HMAC key), an HMAC over the
//! ciphertext, and the AES-256-CTR ciphertext itself.
//!
//! Table access and KMS are provided by the caller through [`RecordStore`]
//! and [`KeyDecrypter`]. This crate only implements the read protocol.

pub mod cipher;
pub mod client;
pub mod config;
pub mod digest;
pub mod error;
pub mod kms;
pub mod record;
pub mod store;
pub mod types;

pub use cipher::{apply_keystream, create_nonce, decrypt_body, FIXED_NONCE};
pub use client::{decrypt_data, decrypt_key_material, verify_hmac, Client, GetSecretRequest};
pub use config::ClientConfig;
pub use digest::{resolve_digest, DigestAlgorithm, SUPPORTED_DIGESTS};
pub use error::{CredstashError, KmsError, Result, StoreError};
pub use kms::{split_key_material, unwrap_key, DataKeys, KeyDecrypter};
pub use record::{key_material_from_record, AttributeValue, StoredRecord};
pub use store::{locate_record, MemoryStore, RecordStore};
pub use types::{
    EncryptionContext, KeyMaterial, DATA_KEY_LENGTH, DEFAULT_DIGEST, DEFAULT_TABLE,
    KEY_MATERIAL_LENGTH,
};
