use thiserror::Error;

/// Failure reported by a [`RecordStore`](crate::store::RecordStore) implementation.
///
/// Wraps the message from the underlying client (network, throttling,
/// permissions). The core never retries; retry policy belongs to the client.
#[derive(Debug, Clone)]
pub struct StoreError {
    pub message: String,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for StoreError {}

/// Failure reported by a [`KeyDecrypter`](crate::kms::KeyDecrypter) implementation,
/// including an encryption context that does not match the wrapped key.
#[derive(Debug, Clone)]
pub struct KmsError {
    pub message: String,
}

impl KmsError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for KmsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for KmsError {}

#[derive(Debug, Error)]
pub enum CredstashError {
    #[error("Secret with name {name} could not be found")]
    NotFound { name: String },

    #[error("Secret {name} has no version {version}")]
    VersionNotFound { name: String, version: String },

    #[error("Missing key: {field}")]
    MissingField { field: &'static str },

    #[error("Field {field} has unexpected type: expected {expected}")]
    UnexpectedType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("Invalid base64 in field {field}: {source}")]
    InvalidBase64 {
        field: &'static str,
        #[source]
        source: base64::DecodeError,
    },

    #[error("Invalid hex in field {field}: {source}")]
    InvalidHex {
        field: &'static str,
        #[source]
        source: hex::FromHexError,
    },

    #[error("Digest {0} is not supported")]
    UnsupportedDigest(String),

    #[error("Computed HMAC on {name} does not match stored HMAC")]
    HmacMismatch { name: String },

    #[error("Store request failed: {0}")]
    Store(#[from] StoreError),

    #[error("KMS decrypt failed: {0}")]
    Kms(#[from] KmsError),

    #[error("Invalid key material length: expected {expected} bytes, got {got}")]
    InvalidKeyMaterialLength { expected: usize, got: usize },

    #[error("Invalid key length: expected {expected} bytes, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    #[error("HMAC key of {len} bytes was rejected")]
    HmacKeyRejected { len: usize },

    #[error("Decrypted secret {name} is not valid UTF-8")]
    InvalidUtf8 { name: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, CredstashError>;
